use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::preprocessing::DataStats;
use crate::error::{Error, Result};
use crate::model::encoder::EncodeMap;
use crate::model::features::FeatureVector;
use crate::model::network::RegressionNetwork;

/// Weight a model assigns to one input feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub weight: f64,
}

/// Anything that turns a feature vector into a price.
pub trait PricePredictor: Send + Sync {
    /// Feature names in the order the model was fitted on.
    fn feature_names(&self) -> &[String];

    /// Price estimate in rupiah; finite and non-negative on success.
    fn predict(&self, vector: &FeatureVector) -> Result<f64>;

    /// Per-feature weights in declared feature order.
    fn importances(&self) -> Vec<FeatureImportance>;
}

/// Hold-out evaluation of a trained model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub r2: f64,
    pub mae: f64,
    pub rmse: f64,
    pub train_rows: usize,
    pub test_rows: usize,
}

/// Everything persisted in a model artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedModel {
    pub network: RegressionNetwork,
    pub stats: DataStats,
    pub features: Vec<String>,
    pub encode_map: EncodeMap,
    pub importances: Vec<f64>,
    pub metrics: Metrics,
}

impl TrainedModel {
    /// Raw network output for already aligned rows, in rupiah.
    pub fn predict_rows(&self, x: &Array2<f64>) -> Vec<f64> {
        let normalized = self.stats.normalize(x);
        self.network
            .predict_batch(&normalized)
            .iter()
            .map(|v| self.stats.denormalize_target(*v))
            .collect()
    }
}

impl PricePredictor for TrainedModel {
    fn feature_names(&self) -> &[String] {
        &self.features
    }

    fn predict(&self, vector: &FeatureVector) -> Result<f64> {
        let row = vector.aligned(&self.features)?;
        if row.len() != self.network.input_size() {
            return Err(Error::Prediction(format!(
                "model expects {} features, artifact declares {}",
                self.network.input_size(),
                row.len()
            )));
        }

        let input = row.insert_axis(ndarray::Axis(0));
        let raw = self
            .predict_rows(&input)
            .first()
            .copied()
            .ok_or_else(|| Error::Prediction("model returned no output".to_string()))?;

        if !raw.is_finite() {
            return Err(Error::Prediction(format!("model returned {}", raw)));
        }
        debug!(raw, "Model output");
        Ok(raw.max(0.0))
    }

    fn importances(&self) -> Vec<FeatureImportance> {
        self.features
            .iter()
            .zip(self.importances.iter().chain(std::iter::repeat(&0.0)))
            .map(|(feature, weight)| FeatureImportance {
                feature: feature.clone(),
                weight: *weight,
            })
            .collect()
    }
}

/// Importances ordered by weight, largest first, as shown in the chart.
pub fn ranked_importances(predictor: &dyn PricePredictor) -> Vec<FeatureImportance> {
    let mut ranked = predictor.importances();
    ranked.sort_by(|a, b| b.weight.total_cmp(&a.weight));
    ranked
}
