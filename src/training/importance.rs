//! Permutation feature importance.
//!
//! Each column is shuffled in turn and the rise in mean squared error over the
//! untouched baseline becomes that feature's raw score. Scores are clipped at
//! zero and scaled to sum to one.

use ndarray::{Array1, Array2, Axis};
use ndarray_rand::rand::rngs::SmallRng;
use ndarray_rand::rand::seq::SliceRandom;
use ndarray_rand::rand::SeedableRng;

use crate::model::network::mean_squared_error;

pub fn permutation_importance<F>(x: &Array2<f64>, y: &Array1<f64>, seed: u64, predict: F) -> Vec<f64>
where
    F: Fn(&Array2<f64>) -> Array1<f64>,
{
    let n_features = x.ncols();
    if x.nrows() < 2 || n_features == 0 {
        return vec![uniform(n_features); n_features];
    }

    let baseline = mean_squared_error(y, &predict(x));
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut scores = Vec::with_capacity(n_features);

    for column in 0..n_features {
        let mut shuffled = x.clone();
        let mut values = x.column(column).to_vec();
        values.shuffle(&mut rng);
        shuffled
            .index_axis_mut(Axis(1), column)
            .assign(&Array1::from(values));

        let loss = mean_squared_error(y, &predict(&shuffled));
        scores.push((loss - baseline).max(0.0));
    }

    let total: f64 = scores.iter().sum();
    if total <= f64::EPSILON || !total.is_finite() {
        return vec![uniform(n_features); n_features];
    }
    scores.iter().map(|s| s / total).collect()
}

fn uniform(n: usize) -> f64 {
    if n == 0 {
        0.0
    } else {
        1.0 / n as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn only_informative_column_gets_weight() {
        let x = Array2::from_shape_fn((20, 2), |(i, j)| if j == 0 { i as f64 } else { 7.0 });
        let y = x.column(0).to_owned();
        let scores = permutation_importance(&x, &y, 11, |m| m.column(0).to_owned());

        assert_eq!(scores.len(), 2);
        assert!((scores.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert_eq!(scores[1], 0.0);
        assert_eq!(scores[0], 1.0);
    }

    #[test]
    fn constant_model_gets_uniform_scores() {
        let x = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let y = array![1.0, 2.0];
        let scores = permutation_importance(&x, &y, 0, |m| Array1::zeros(m.nrows()));
        assert_eq!(scores, vec![1.0 / 3.0; 3]);
    }
}
