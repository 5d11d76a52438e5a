use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::model::encoder::{CategoricalField, EncodeMap};
use crate::model::features::FEATURE_NAMES;

/// Normalisation parameters for the inputs and the price target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataStats {
    pub mean: Array1<f64>,
    pub std: Array1<f64>,
    pub target_mean: f64,
    pub target_std: f64,
}

/// Feature matrix in declared order plus the price target.
#[derive(Debug, Clone)]
pub struct TrainingData {
    pub features: Vec<String>,
    pub x: Array2<f64>,
    pub y: Array1<f64>,
    pub encoder: EncodeMap,
}

#[derive(Debug, Deserialize)]
struct TrainingRow {
    bedrooms: Option<f64>,
    bathrooms: Option<f64>,
    land_size_m2: Option<f64>,
    building_size_m2: Option<f64>,
    floors: Option<f64>,
    building_age: Option<f64>,
    garages: Option<f64>,
    #[serde(default)]
    property_type: Option<String>,
    #[serde(default)]
    furnishing: Option<String>,
    #[serde(default)]
    property_condition: Option<String>,
    price_in_rp: Option<f64>,
}

impl TrainingRow {
    fn numeric(&self) -> Option<[f64; 7]> {
        Some([
            self.bedrooms?,
            self.bathrooms?,
            self.land_size_m2?,
            self.building_size_m2?,
            self.floors?,
            self.building_age?,
            self.garages?,
        ])
    }

    fn label(&self, field: CategoricalField) -> &str {
        let label = match field {
            CategoricalField::PropertyType => &self.property_type,
            CategoricalField::Furnishing => &self.furnishing,
            CategoricalField::PropertyCondition => &self.property_condition,
        };
        label.as_deref().unwrap_or("")
    }
}

pub fn load_training_data(csv_path: impl AsRef<Path>) -> Result<TrainingData> {
    let path = csv_path.as_ref();
    let file = File::open(path)?;
    let data = read_training_data(file)?;
    info!(
        path = %path.display(),
        rows = data.x.nrows(),
        "Loaded training data"
    );
    Ok(data)
}

pub fn read_training_data<R: Read>(reader: R) -> Result<TrainingData> {
    let mut rdr = ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut rows = Vec::new();
    let mut skipped = 0usize;

    for (line, result) in rdr.deserialize::<TrainingRow>().enumerate() {
        match result {
            Ok(row) => match (row.numeric(), row.price_in_rp) {
                (Some(numeric), Some(price)) => rows.push((row, numeric, price)),
                _ => skipped += 1,
            },
            Err(e) => {
                warn!(line = line + 2, error = %e, "Skipping malformed training row");
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        warn!(skipped, "Dropped training rows with missing values");
    }
    if rows.is_empty() {
        return Err(Error::Training("training data has no usable rows".to_string()));
    }

    let encoder = EncodeMap::fit(rows.iter().flat_map(|(row, _, _)| {
        CategoricalField::ALL
            .into_iter()
            .map(move |field| (field, row.label(field)))
    }));

    let mut inputs = Vec::with_capacity(rows.len() * FEATURE_NAMES.len());
    let mut outputs = Vec::with_capacity(rows.len());
    for (row, numeric, price) in &rows {
        inputs.extend_from_slice(numeric);
        for field in CategoricalField::ALL {
            inputs.push(encoder.encode(field, row.label(field)) as f64);
        }
        outputs.push(*price);
    }

    let x = Array2::from_shape_vec((outputs.len(), FEATURE_NAMES.len()), inputs)
        .map_err(|e| Error::Training(e.to_string()))?;
    let y = Array1::from(outputs);

    Ok(TrainingData {
        features: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
        x,
        y,
        encoder,
    })
}

fn safe_std(std: f64) -> f64 {
    if std.is_finite() && std > f64::EPSILON {
        std
    } else {
        1.0
    }
}

impl DataStats {
    /// Column means and sample standard deviations; constant columns get a
    /// unit deviation.
    pub fn fit(x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<Self> {
        let mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| Error::Training("cannot normalise an empty matrix".to_string()))?;
        let ddof = if x.nrows() > 1 { 1.0 } else { 0.0 };
        let std = x.std_axis(Axis(0), ddof).mapv(safe_std);

        let target_mean = y
            .mean()
            .ok_or_else(|| Error::Training("cannot normalise an empty target".to_string()))?;
        let target_std = safe_std(y.std(ddof));

        Ok(DataStats {
            mean,
            std,
            target_mean,
            target_std,
        })
    }

    pub fn normalize(&self, x: &Array2<f64>) -> Array2<f64> {
        (x - &self.mean) / &self.std
    }

    pub fn normalize_target(&self, y: &Array1<f64>) -> Array1<f64> {
        (y - self.target_mean) / self.target_std
    }

    pub fn denormalize_target(&self, value: f64) -> f64 {
        value * self.target_std + self.target_mean
    }
}
