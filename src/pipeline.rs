//! Request pipeline: validate, encode, predict, record, format, look up
//! comparable listings.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::data::reference::{PropertyRecord, ReferenceDataset};
use crate::error::{Error, Result};
use crate::model::encoder::{CategoricalField, EncodeMap};
use crate::model::features::PropertyInput;
use crate::model::predictor::{ranked_importances, FeatureImportance, PricePredictor, TrainedModel};
use crate::session::history::{PredictionHistory, PredictionResult};
use crate::similarity::{find_similar, SimilarityQuery, DEFAULT_LIMIT};
use crate::utils::currency::CurrencyFormat;

/// Outcome of the comparable-property lookup for one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "records", rename_all = "snake_case")]
pub enum SimilarProperties {
    Found(Vec<PropertyRecord>),
    NoMatch,
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct Estimate {
    pub result: PredictionResult,
    pub formatted_price: String,
    pub similar: SimilarProperties,
}

/// Shared, read-only state needed to serve estimates.
#[derive(Clone)]
pub struct Estimator {
    predictor: Arc<dyn PricePredictor>,
    encoder: Arc<EncodeMap>,
    dataset: Arc<ReferenceDataset>,
    similar_limit: usize,
    currency: CurrencyFormat,
}

impl Estimator {
    pub fn new(predictor: Arc<dyn PricePredictor>, encoder: EncodeMap, dataset: ReferenceDataset) -> Self {
        Estimator {
            predictor,
            encoder: Arc::new(encoder),
            dataset: Arc::new(dataset),
            similar_limit: DEFAULT_LIMIT,
            currency: CurrencyFormat::rupiah(),
        }
    }

    /// Uses the encode map stored alongside the trained network.
    pub fn from_model(model: TrainedModel, dataset: ReferenceDataset) -> Self {
        let encoder = model.encode_map.clone();
        Self::new(Arc::new(model), encoder, dataset)
    }

    pub fn with_similar_limit(mut self, limit: usize) -> Self {
        self.similar_limit = limit;
        self
    }

    pub fn with_currency(mut self, currency: CurrencyFormat) -> Self {
        self.currency = currency;
        self
    }

    pub fn encoder(&self) -> &EncodeMap {
        &self.encoder
    }

    pub fn dataset(&self) -> &ReferenceDataset {
        &self.dataset
    }

    pub fn currency(&self) -> &CurrencyFormat {
        &self.currency
    }

    pub fn format_price(&self, value: f64) -> String {
        self.currency.format(value)
    }

    /// Importances sorted by weight, largest first.
    pub fn importances(&self) -> Vec<FeatureImportance> {
        ranked_importances(self.predictor.as_ref())
    }

    /// Runs one submission and appends the prediction to `history`.
    ///
    /// Validation and prediction failures return an error and leave `history`
    /// unchanged. A failed lookup is reported inside the estimate.
    pub fn estimate(&self, input: &PropertyInput, history: &mut PredictionHistory) -> Result<Estimate> {
        if let Err(e) = input.validate() {
            warn!(error = %e, "Rejected estimate request");
            return Err(e);
        }

        for field in CategoricalField::ALL {
            let label = input.label(field);
            if self.encoder.lookup(field, label).is_none() {
                debug!(%field, label, code = field.default_code(), "Unknown label, using default code");
            }
        }

        let vector = input.to_feature_vector(&self.encoder);
        let price = self.predictor.predict(&vector).map_err(|e| {
            error!(error = %e, "Prediction failed");
            match e {
                Error::Prediction(_) => e,
                other => Error::Prediction(other.to_string()),
            }
        })?;

        let result = PredictionResult::new(price, vector);
        history.push(result.clone());
        info!(price, history = history.len(), "Prediction recorded");

        Ok(Estimate {
            formatted_price: self.currency.format(price),
            similar: self.similar_to(input, price),
            result,
        })
    }

    fn similar_to(&self, input: &PropertyInput, price: f64) -> SimilarProperties {
        let query = SimilarityQuery::from(input);
        let found = self
            .dataset
            .records()
            .and_then(|records| find_similar(records, &query, price, self.similar_limit));

        match found {
            Ok(records) if records.is_empty() => SimilarProperties::NoMatch,
            Ok(records) => SimilarProperties::Found(records.into_iter().cloned().collect()),
            Err(e) => {
                warn!(error = %e, "Similar property lookup failed");
                SimilarProperties::Failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::features::FeatureVector;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedPrice {
        price: f64,
        calls: AtomicUsize,
        names: Vec<String>,
    }

    impl FixedPrice {
        fn new(price: f64) -> Self {
            FixedPrice {
                price,
                calls: AtomicUsize::new(0),
                names: crate::model::features::FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            }
        }
    }

    impl PricePredictor for FixedPrice {
        fn feature_names(&self) -> &[String] {
            &self.names
        }

        fn predict(&self, vector: &FeatureVector) -> Result<f64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            vector.aligned(&self.names)?;
            if self.price < 0.0 {
                return Err(Error::Prediction("model exploded".to_string()));
            }
            Ok(self.price)
        }

        fn importances(&self) -> Vec<FeatureImportance> {
            vec![
                FeatureImportance { feature: "bedrooms".to_string(), weight: 0.2 },
                FeatureImportance { feature: "land_size_m2".to_string(), weight: 0.8 },
            ]
        }
    }

    fn record(title: &str, price: f64) -> PropertyRecord {
        PropertyRecord {
            bedrooms: 2.0,
            bathrooms: 1.0,
            land_size_m2: 100.0,
            building_size_m2: 80.0,
            floors: 1.0,
            building_age: None,
            garages: None,
            price_in_rp: price,
            title: title.to_string(),
            address: String::new(),
            url: String::new(),
        }
    }

    fn estimator(predictor: Arc<FixedPrice>, dataset: ReferenceDataset) -> Estimator {
        Estimator::new(predictor, EncodeMap::default(), dataset)
    }

    #[test]
    fn zero_area_short_circuits_before_the_model() {
        let predictor = Arc::new(FixedPrice::new(1.0));
        let estimator = estimator(Arc::clone(&predictor), ReferenceDataset::from(Vec::new()));
        let mut history = PredictionHistory::new();
        let input = PropertyInput {
            land_size_m2: 0.0,
            ..PropertyInput::default()
        };

        assert!(matches!(estimator.estimate(&input, &mut history), Err(Error::Validation(_))));
        assert_eq!(predictor.calls.load(Ordering::SeqCst), 0);
        assert!(history.is_empty());
    }

    #[test]
    fn successful_estimate_is_recorded_and_formatted() {
        let predictor = Arc::new(FixedPrice::new(1_000_000.0));
        let dataset = ReferenceDataset::from(vec![
            record("a", 100.0),
            record("b", 500.0),
            record("c", 1_000_000.0),
            record("d", 1_000_005.0),
        ]);
        let estimator = estimator(predictor, dataset);
        let mut history = PredictionHistory::new();

        let estimate = estimator.estimate(&PropertyInput::default(), &mut history).unwrap();
        assert_eq!(estimate.formatted_price, "Rp 1.000.000");
        assert_eq!(history.len(), 1);
        match estimate.similar {
            SimilarProperties::Found(records) => {
                let titles: Vec<&str> = records.iter().map(|r| r.title.as_str()).collect();
                assert_eq!(titles, vec!["c", "d", "b"]);
            }
            other => panic!("unexpected lookup outcome {:?}", other),
        }
    }

    #[test]
    fn prediction_failure_leaves_history_alone() {
        let estimator = estimator(Arc::new(FixedPrice::new(-1.0)), ReferenceDataset::from(Vec::new()));
        let mut history = PredictionHistory::new();
        assert!(matches!(
            estimator.estimate(&PropertyInput::default(), &mut history),
            Err(Error::Prediction(_))
        ));
        assert!(history.is_empty());
    }

    #[test]
    fn lookup_failure_still_returns_the_price() {
        let dataset = ReferenceDataset::Unavailable("missing columns".to_string());
        let estimator = estimator(Arc::new(FixedPrice::new(5.0)), dataset);
        let mut history = PredictionHistory::new();

        let estimate = estimator.estimate(&PropertyInput::default(), &mut history).unwrap();
        assert_eq!(estimate.result.predicted_price, 5.0);
        assert!(matches!(estimate.similar, SimilarProperties::Failed(_)));
    }

    #[test]
    fn no_match_is_reported_explicitly() {
        let estimator = estimator(Arc::new(FixedPrice::new(5.0)), ReferenceDataset::from(Vec::new()));
        let mut history = PredictionHistory::new();
        let estimate = estimator.estimate(&PropertyInput::default(), &mut history).unwrap();
        assert_eq!(estimate.similar, SimilarProperties::NoMatch);
    }

    #[test]
    fn importances_are_ranked() {
        let estimator = estimator(Arc::new(FixedPrice::new(5.0)), ReferenceDataset::from(Vec::new()));
        let ranked = estimator.importances();
        assert_eq!(ranked[0].feature, "land_size_m2");
    }
}
