//! House price estimation with comparable-property lookup.
//!
//! Property attributes are encoded into a fixed-order feature vector, priced
//! by a trained regression model, formatted as Rupiah and matched against a
//! reference dataset of listings with similar size and layout.

pub mod config;
pub mod data;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod server;
pub mod session;
pub mod similarity;
pub mod training;
pub mod utils;

pub use error::{Error, Result};
pub use model::encoder::{CategoricalField, EncodeMap};
pub use model::features::{FeatureVector, PropertyInput};
pub use model::predictor::{FeatureImportance, PricePredictor, TrainedModel};
pub use pipeline::{Estimate, Estimator, SimilarProperties};
pub use session::history::{PredictionHistory, PredictionResult};
pub use similarity::find_similar;
pub use utils::currency::format_currency;
