pub mod encoder;
pub mod features;
pub mod layers;
pub mod network;
pub mod predictor;
