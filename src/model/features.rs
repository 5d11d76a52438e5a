use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::encoder::{CategoricalField, EncodeMap};

/// Feature names in the order the model is fitted on.
pub const FEATURE_NAMES: [&str; 10] = [
    "bedrooms",
    "bathrooms",
    "land_size_m2",
    "building_size_m2",
    "floors",
    "building_age",
    "garages",
    "property_type",
    "furnishing",
    "property_condition",
];

/// Input bounds of the estimation form.
pub mod limits {
    pub const ROOMS: (u32, u32) = (0, 10);
    pub const AREA_M2: (f64, f64) = (0.0, 1000.0);
    pub const FLOORS: (u32, u32) = (1, 3);
    pub const BUILDING_AGE: (u32, u32) = (0, 100);
    pub const GARAGES: (u32, u32) = (0, 3);
}

/// Raw selections coming from the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyInput {
    pub bedrooms: u32,
    pub bathrooms: u32,
    pub land_size_m2: f64,
    pub building_size_m2: f64,
    pub floors: u32,
    pub building_age: u32,
    pub garages: u32,
    pub property_type: String,
    pub furnishing: String,
    pub property_condition: String,
}

impl Default for PropertyInput {
    fn default() -> Self {
        PropertyInput {
            bedrooms: 2,
            bathrooms: 1,
            land_size_m2: 100.0,
            building_size_m2: 80.0,
            floors: 1,
            building_age: 5,
            garages: 0,
            property_type: "rumah".to_string(),
            furnishing: "unfurnished".to_string(),
            property_condition: "bagus".to_string(),
        }
    }
}

fn check_range<T: PartialOrd + std::fmt::Display>(name: &str, value: T, (lo, hi): (T, T)) -> Result<()> {
    if value < lo || value > hi {
        return Err(Error::Validation(format!(
            "{} must be between {} and {}, got {}",
            name, lo, hi, value
        )));
    }
    Ok(())
}

impl PropertyInput {
    /// Rejects inputs the model must not be asked about.
    ///
    /// A zero land or building area is refused outright, as are values
    /// outside the form limits.
    pub fn validate(&self) -> Result<()> {
        if self.land_size_m2 == 0.0 || self.building_size_m2 == 0.0 {
            return Err(Error::Validation(
                "land size and building size must not be zero".to_string(),
            ));
        }
        if !self.land_size_m2.is_finite() || !self.building_size_m2.is_finite() {
            return Err(Error::Validation("areas must be finite numbers".to_string()));
        }
        check_range("bedrooms", self.bedrooms, limits::ROOMS)?;
        check_range("bathrooms", self.bathrooms, limits::ROOMS)?;
        check_range("land_size_m2", self.land_size_m2, limits::AREA_M2)?;
        check_range("building_size_m2", self.building_size_m2, limits::AREA_M2)?;
        check_range("floors", self.floors, limits::FLOORS)?;
        check_range("building_age", self.building_age, limits::BUILDING_AGE)?;
        check_range("garages", self.garages, limits::GARAGES)?;
        Ok(())
    }

    pub fn label(&self, field: CategoricalField) -> &str {
        match field {
            CategoricalField::PropertyType => &self.property_type,
            CategoricalField::Furnishing => &self.furnishing,
            CategoricalField::PropertyCondition => &self.property_condition,
        }
    }

    /// Encodes the categorical selections and lays the fields out in
    /// declared feature order.
    pub fn to_feature_vector(&self, encoder: &EncodeMap) -> FeatureVector {
        let code = |field: CategoricalField| encoder.encode(field, self.label(field)) as f64;
        let values = [
            self.bedrooms as f64,
            self.bathrooms as f64,
            self.land_size_m2,
            self.building_size_m2,
            self.floors as f64,
            self.building_age as f64,
            self.garages as f64,
            code(CategoricalField::PropertyType),
            code(CategoricalField::Furnishing),
            code(CategoricalField::PropertyCondition),
        ];
        FeatureVector::new(FEATURE_NAMES.iter().zip(values).map(|(n, v)| (n.to_string(), v)))
    }
}

/// Named numeric features in a fixed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    entries: Vec<(String, f64)>,
}

impl FeatureVector {
    pub fn new<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, f64)>,
    {
        FeatureVector {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn entries(&self) -> &[(String, f64)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Values ordered by `names`; every name must be present.
    pub fn aligned(&self, names: &[String]) -> Result<Array1<f64>> {
        let values = names
            .iter()
            .map(|name| {
                self.get(name)
                    .ok_or_else(|| Error::Prediction(format!("missing feature '{}'", name)))
            })
            .collect::<Result<Vec<f64>>>()?;
        Ok(Array1::from(values))
    }
}
