use ndarray::{Array1, Array2, Axis};
use ndarray_rand::rand::rngs::SmallRng;
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::layers::{relu, relu_derivative};

/// Feed-forward regressor: three ReLU hidden layers and one linear output.
#[derive(Clone, Serialize, Deserialize)]
pub struct RegressionNetwork {
    pub weights1: Array2<f64>,
    pub bias1: Array2<f64>,
    pub weights2: Array2<f64>,
    pub bias2: Array2<f64>,
    pub weights3: Array2<f64>,
    pub bias3: Array2<f64>,
    pub weights4: Array2<f64>,
    pub bias4: Array2<f64>,
}

impl fmt::Debug for RegressionNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegressionNetwork")
            .field("input", &self.input_size())
            .field("hidden1", &self.weights1.ncols())
            .field("hidden2", &self.weights2.ncols())
            .field("hidden3", &self.weights3.ncols())
            .finish()
    }
}

impl RegressionNetwork {
    pub fn new(input_size: usize, hidden: [usize; 3], seed: u64) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        let he_init = |size: usize| (2.0 / size as f64).sqrt();
        let mut layer = |rows: usize, cols: usize| {
            let bound = he_init(rows);
            Array2::random_using((rows, cols), Uniform::new(-bound, bound), &mut rng)
        };

        let weights1 = layer(input_size, hidden[0]);
        let weights2 = layer(hidden[0], hidden[1]);
        let weights3 = layer(hidden[1], hidden[2]);
        let weights4 = layer(hidden[2], 1);

        RegressionNetwork {
            weights1,
            bias1: Array2::zeros((1, hidden[0])),
            weights2,
            bias2: Array2::zeros((1, hidden[1])),
            weights3,
            bias3: Array2::zeros((1, hidden[2])),
            weights4,
            bias4: Array2::zeros((1, 1)),
        }
    }

    pub fn input_size(&self) -> usize {
        self.weights1.nrows()
    }

    pub fn forward(&self, x: &Array2<f64>) -> (Array2<f64>, Array2<f64>, Array2<f64>, Array2<f64>) {
        let hidden_output1 = relu(&(x.dot(&self.weights1) + &self.bias1));
        let hidden_output2 = relu(&(hidden_output1.dot(&self.weights2) + &self.bias2));
        let hidden_output3 = relu(&(hidden_output2.dot(&self.weights3) + &self.bias3));
        let output = hidden_output3.dot(&self.weights4) + &self.bias4;

        (hidden_output1, hidden_output2, hidden_output3, output)
    }

    /// Normalised predictions, one per input row.
    pub fn predict_batch(&self, x: &Array2<f64>) -> Array1<f64> {
        let (_, _, _, output) = self.forward(x);
        output.column(0).to_owned()
    }

    /// One full-batch gradient step on mean squared error with L2 decay.
    pub fn train(&mut self, x: &Array2<f64>, y: &Array1<f64>, learning_rate: f64, lambda: f64) {
        let n = x.nrows().max(1) as f64;
        let (hidden_output1, hidden_output2, hidden_output3, output) = self.forward(x);
        let target = y.view().insert_axis(Axis(1));

        let output_delta = (&output - &target) * (2.0 / n);

        let hidden_delta3 = output_delta.dot(&self.weights4.t()) * relu_derivative(&hidden_output3);
        let hidden_delta2 = hidden_delta3.dot(&self.weights3.t()) * relu_derivative(&hidden_output2);
        let hidden_delta1 = hidden_delta2.dot(&self.weights2.t()) * relu_derivative(&hidden_output1);

        self.weights4 -= &(learning_rate * (hidden_output3.t().dot(&output_delta) + lambda * &self.weights4));
        self.bias4 -= &(learning_rate * output_delta.sum_axis(Axis(0)).insert_axis(Axis(0)));

        self.weights3 -= &(learning_rate * (hidden_output2.t().dot(&hidden_delta3) + lambda * &self.weights3));
        self.bias3 -= &(learning_rate * hidden_delta3.sum_axis(Axis(0)).insert_axis(Axis(0)));

        self.weights2 -= &(learning_rate * (hidden_output1.t().dot(&hidden_delta2) + lambda * &self.weights2));
        self.bias2 -= &(learning_rate * hidden_delta2.sum_axis(Axis(0)).insert_axis(Axis(0)));

        self.weights1 -= &(learning_rate * (x.t().dot(&hidden_delta1) + lambda * &self.weights1));
        self.bias1 -= &(learning_rate * hidden_delta1.sum_axis(Axis(0)).insert_axis(Axis(0)));
    }

    pub fn loss(&self, y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
        mean_squared_error(y_true, y_pred)
    }
}

pub fn mean_squared_error(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    (y_pred - y_true).mapv(|e| e * e).mean().unwrap_or(0.0)
}
