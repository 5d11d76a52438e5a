use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::model::features::FeatureVector;

pub const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M";

/// One successful prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub predicted_price: f64,
    pub input: FeatureVector,
    pub timestamp: DateTime<Local>,
}

impl PredictionResult {
    pub fn new(predicted_price: f64, input: FeatureVector) -> Self {
        PredictionResult {
            predicted_price,
            input,
            timestamp: Local::now(),
        }
    }

    pub fn display_time(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }
}

/// Predictions made during one session, oldest first.
///
/// Owned by the session that produced the entries and dropped with it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictionHistory {
    entries: Vec<PredictionResult>,
}

impl PredictionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: PredictionResult) {
        self.entries.push(result);
    }

    pub fn entries(&self) -> &[PredictionResult] {
        &self.entries
    }

    pub fn latest(&self) -> Option<&PredictionResult> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
