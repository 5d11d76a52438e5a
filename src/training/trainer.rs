use ndarray::{Array1, Axis};
use ndarray_rand::rand::rngs::SmallRng;
use ndarray_rand::rand::seq::SliceRandom;
use ndarray_rand::rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use crate::data::preprocessing::{load_training_data, DataStats, TrainingData};
use crate::error::{Error, Result};
use crate::model::network::{mean_squared_error, RegressionNetwork};
use crate::model::predictor::{Metrics, TrainedModel};
use crate::training::history::TrainingHistory;
use crate::training::importance::permutation_importance;

/// Hyper-parameters for [`train_model`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingOptions {
    pub epochs: usize,
    pub learning_rate: f64,
    pub lambda: f64,
    pub hidden: [usize; 3],
    pub test_fraction: f64,
    pub seed: u64,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        TrainingOptions {
            epochs: 2000,
            learning_rate: 0.01,
            lambda: 0.0001,
            hidden: [32, 16, 8],
            test_fraction: 0.2,
            seed: 42,
        }
    }
}

// Below this many rows every row is used for training and evaluation.
const MIN_ROWS_FOR_SPLIT: usize = 5;

pub fn train_model(csv_path: impl AsRef<Path>, options: &TrainingOptions) -> Result<(TrainedModel, TrainingHistory)> {
    let data = load_training_data(csv_path)?;
    train_on(data, options)
}

pub fn train_on(data: TrainingData, options: &TrainingOptions) -> Result<(TrainedModel, TrainingHistory)> {
    if options.epochs == 0 {
        return Err(Error::Training("epochs must be greater than zero".to_string()));
    }
    if !(0.0..1.0).contains(&options.test_fraction) {
        return Err(Error::Training(format!(
            "test_fraction must be in [0, 1), got {}",
            options.test_fraction
        )));
    }

    let (train_idx, test_idx) = split_indices(data.x.nrows(), options.test_fraction, options.seed);
    let x_train = data.x.select(Axis(0), &train_idx);
    let y_train = data.y.select(Axis(0), &train_idx);
    let (x_test, y_test) = if test_idx.is_empty() {
        (x_train.clone(), y_train.clone())
    } else {
        (data.x.select(Axis(0), &test_idx), data.y.select(Axis(0), &test_idx))
    };

    let stats = DataStats::fit(x_train.view(), y_train.view())?;
    let x_train_n = stats.normalize(&x_train);
    let y_train_n = stats.normalize_target(&y_train);
    let x_test_n = stats.normalize(&x_test);
    let y_test_n = stats.normalize_target(&y_test);

    let mut nn = RegressionNetwork::new(data.features.len(), options.hidden, options.seed);
    let mut history = TrainingHistory::default();

    info!(
        epochs = options.epochs,
        train_rows = train_idx.len(),
        test_rows = test_idx.len(),
        "Starting training"
    );

    for epoch in 0..options.epochs {
        let learning_rate = options.learning_rate / (1.0 + 0.001 * epoch as f64);
        nn.train(&x_train_n, &y_train_n, learning_rate, options.lambda);

        if epoch % 10 == 0 || epoch == options.epochs - 1 {
            let train_loss = nn.loss(&y_train_n, &nn.predict_batch(&x_train_n));
            let test_loss = nn.loss(&y_test_n, &nn.predict_batch(&x_test_n));
            if !train_loss.is_finite() {
                return Err(Error::Training(format!("loss diverged at epoch {}", epoch)));
            }
            history.record(epoch, train_loss, test_loss);

            if epoch % 100 == 0 || epoch == options.epochs - 1 {
                debug!(epoch, train_loss, test_loss, "Training progress");
            }
        }
    }

    let mut model = TrainedModel {
        network: nn,
        stats,
        features: data.features,
        encode_map: data.encoder,
        importances: Vec::new(),
        metrics: Metrics::default(),
    };

    let predicted = Array1::from(model.predict_rows(&x_test));
    model.metrics = evaluate(&y_test, &predicted, train_idx.len(), test_idx.len());
    let importances = permutation_importance(&x_test, &y_test, options.seed, |x| {
        Array1::from(model.predict_rows(x))
    });
    model.importances = importances;

    info!(
        r2 = model.metrics.r2,
        mae = model.metrics.mae,
        rmse = model.metrics.rmse,
        "Training completed"
    );

    Ok((model, history))
}

/// Shuffled train/test row indices; small datasets are not split.
fn split_indices(rows: usize, test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..rows).collect();
    if rows < MIN_ROWS_FOR_SPLIT || test_fraction <= 0.0 {
        return (indices, Vec::new());
    }

    let mut rng = SmallRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);
    let test_rows = ((rows as f64 * test_fraction).round() as usize).clamp(1, rows - 1);
    let test = indices.split_off(rows - test_rows);
    (indices, test)
}

pub fn evaluate(y_true: &Array1<f64>, y_pred: &Array1<f64>, train_rows: usize, test_rows: usize) -> Metrics {
    let mse = mean_squared_error(y_true, y_pred);
    let mae = (y_pred - y_true).mapv(f64::abs).mean().unwrap_or(0.0);
    let mean = y_true.mean().unwrap_or(0.0);
    let total = y_true.mapv(|v| (v - mean).powi(2)).sum();
    let residual = (y_pred - y_true).mapv(|e| e * e).sum();
    let r2 = if total > 0.0 { 1.0 - residual / total } else { 0.0 };

    Metrics {
        r2,
        mae,
        rmse: mse.sqrt(),
        train_rows,
        test_rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::preprocessing::read_training_data;
    use crate::model::features::PropertyInput;
    use crate::model::predictor::PricePredictor;
    use ndarray::array;

    fn synthetic_csv(rows: usize) -> String {
        let mut csv = String::from(
            "bedrooms,bathrooms,land_size_m2,building_size_m2,floors,building_age,garages,property_type,furnishing,property_condition,price_in_rp\n",
        );
        for i in 0..rows {
            let bedrooms = 1 + i % 5;
            let land = 60 + (i * 17) % 240;
            let building = 40 + (i * 13) % 200;
            let furnishing = ["furnished", "semi furnished", "unfurnished"][i % 3];
            let price = 100_000_000 + land * 3_000_000 + building * 4_000_000 + bedrooms * 20_000_000;
            csv.push_str(&format!(
                "{},{},{},{},{},{},{},rumah,{},bagus,{}\n",
                bedrooms,
                1 + i % 3,
                land,
                building,
                1 + i % 2,
                i % 30,
                i % 3,
                furnishing,
                price
            ));
        }
        csv
    }

    #[test]
    fn split_keeps_every_row_once() {
        let (train, test) = split_indices(10, 0.2, 1);
        assert_eq!(train.len(), 8);
        assert_eq!(test.len(), 2);
        let mut all: Vec<usize> = train.iter().chain(test.iter()).copied().collect();
        all.sort();
        assert_eq!(all, (0..10).collect::<Vec<_>>());

        let (train, test) = split_indices(3, 0.2, 1);
        assert_eq!(train.len(), 3);
        assert!(test.is_empty());
    }

    #[test]
    fn metrics_of_perfect_prediction() {
        let y = array![1.0, 2.0, 3.0];
        let metrics = evaluate(&y, &y, 3, 3);
        assert_eq!(metrics.r2, 1.0);
        assert_eq!(metrics.mae, 0.0);
        assert_eq!(metrics.rmse, 0.0);
    }

    #[test]
    fn trains_a_usable_model() {
        let data = read_training_data(synthetic_csv(60).as_bytes()).unwrap();
        let options = TrainingOptions {
            epochs: 400,
            hidden: [16, 8, 8],
            ..TrainingOptions::default()
        };
        let (model, history) = train_on(data, &options).unwrap();

        assert!(!history.is_empty());
        assert!(history.last_train_loss().unwrap() < history.train_losses[0]);
        assert_eq!(model.metrics.test_rows, 12);
        assert_eq!(model.importances.len(), 10);
        assert!((model.importances.iter().sum::<f64>() - 1.0).abs() < 1e-6);

        let vector = PropertyInput::default().to_feature_vector(&model.encode_map);
        let price = model.predict(&vector).unwrap();
        assert!(price.is_finite() && price >= 0.0);
    }

    #[test]
    fn rejects_bad_options() {
        let data = read_training_data(synthetic_csv(10).as_bytes()).unwrap();
        let options = TrainingOptions {
            epochs: 0,
            ..TrainingOptions::default()
        };
        assert!(matches!(train_on(data, &options), Err(Error::Training(_))));
    }
}
