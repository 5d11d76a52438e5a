use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

use crate::error::{Error, Result};

/// One listing of the reference dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRecord {
    pub bedrooms: f64,
    pub bathrooms: f64,
    pub land_size_m2: f64,
    pub building_size_m2: f64,
    pub floors: f64,
    #[serde(default)]
    pub building_age: Option<f64>,
    #[serde(default)]
    pub garages: Option<f64>,
    pub price_in_rp: f64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub url: String,
}

/// Read-only listings, loaded once per process.
///
/// A dataset that failed to load stays `Unavailable` so predictions can still
/// be served; only the comparable-property lookup reports the failure.
#[derive(Debug, Clone)]
pub enum ReferenceDataset {
    Loaded(Vec<PropertyRecord>),
    Unavailable(String),
}

impl ReferenceDataset {
    pub fn load(csv_path: impl AsRef<Path>) -> Self {
        let path = csv_path.as_ref();
        match load_records(path) {
            Ok(records) => {
                info!(path = %path.display(), records = records.len(), "Loaded reference dataset");
                ReferenceDataset::Loaded(records)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Reference dataset unavailable");
                ReferenceDataset::Unavailable(e.to_string())
            }
        }
    }

    pub fn records(&self) -> Result<&[PropertyRecord]> {
        match self {
            ReferenceDataset::Loaded(records) => Ok(records),
            ReferenceDataset::Unavailable(reason) => Err(Error::Filter(format!(
                "reference dataset unavailable: {}",
                reason
            ))),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ReferenceDataset::Loaded(records) => records.len(),
            ReferenceDataset::Unavailable(_) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Vec<PropertyRecord>> for ReferenceDataset {
    fn from(records: Vec<PropertyRecord>) -> Self {
        ReferenceDataset::Loaded(records)
    }
}

pub fn load_records(csv_path: impl AsRef<Path>) -> Result<Vec<PropertyRecord>> {
    let file = File::open(csv_path)?;
    read_records(file)
}

/// Parses listings; rows whose numeric cells cannot be read are skipped.
pub fn read_records<R: Read>(reader: R) -> Result<Vec<PropertyRecord>> {
    let mut rdr = ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let headers = rdr.headers()?.clone();
    for column in ["bedrooms", "bathrooms", "land_size_m2", "building_size_m2", "floors", "price_in_rp"] {
        if !headers.iter().any(|h| h == column) {
            return Err(Error::Filter(format!(
                "reference dataset is missing column '{}'",
                column
            )));
        }
    }

    let mut records = Vec::new();
    let mut skipped = 0usize;
    for result in rdr.deserialize::<PropertyRecord>() {
        match result {
            Ok(record) => records.push(record),
            Err(e) => {
                skipped += 1;
                tracing::debug!(error = %e, "Skipping reference row");
            }
        }
    }
    if skipped > 0 {
        warn!(skipped, "Skipped unreadable reference rows");
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
title,address,url,bedrooms,bathrooms,land_size_m2,building_size_m2,floors,building_age,garages,price_in_rp,extra
Rumah A,Jl. Mawar 1,https://example.test/a,2,1,100,80,1,5,0,500000000,x
Rumah B,Jl. Melati 2,https://example.test/b,3,2,,120,2,10,1,900000000,y
Rumah C,Jl. Kenanga 3,https://example.test/c,3,2,150,120,2,,,950000000,z
";

    #[test]
    fn reads_valid_rows_and_ignores_extra_columns() {
        let records = read_records(CSV.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].title, "Rumah A");
        assert_eq!(records[1].building_age, None);
        assert_eq!(records[1].price_in_rp, 950000000.0);
    }

    #[test]
    fn missing_required_column_is_an_error() {
        let csv = "bedrooms,bathrooms,floors,price_in_rp\n2,1,1,100\n";
        assert!(matches!(read_records(csv.as_bytes()), Err(Error::Filter(_))));
    }

    #[test]
    fn unavailable_dataset_reports_filter_error() {
        let dataset = ReferenceDataset::load("/nonexistent/rumah.csv");
        assert!(dataset.is_empty());
        assert!(matches!(dataset.records(), Err(Error::Filter(_))));
    }
}
