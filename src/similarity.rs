//! Comparable-property lookup.
//!
//! A listing qualifies when its bedroom and bathroom counts are within one of
//! the query, both areas are within 80-120% of the query's, and the floor
//! count matches exactly. Qualifying listings are ranked by how close their
//! price is to the predicted one.

use serde::{Deserialize, Serialize};

use crate::data::reference::PropertyRecord;
use crate::error::{Error, Result};
use crate::model::features::PropertyInput;

pub const DEFAULT_LIMIT: usize = 3;

const ROOM_TOLERANCE: f64 = 1.0;
const AREA_LOWER: f64 = 0.8;
const AREA_UPPER: f64 = 1.2;

/// The attributes the lookup compares.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityQuery {
    pub bedrooms: f64,
    pub bathrooms: f64,
    pub land_size_m2: f64,
    pub building_size_m2: f64,
    pub floors: f64,
}

impl From<&PropertyInput> for SimilarityQuery {
    fn from(input: &PropertyInput) -> Self {
        SimilarityQuery {
            bedrooms: input.bedrooms as f64,
            bathrooms: input.bathrooms as f64,
            land_size_m2: input.land_size_m2,
            building_size_m2: input.building_size_m2,
            floors: input.floors as f64,
        }
    }
}

impl SimilarityQuery {
    pub fn matches(&self, record: &PropertyRecord) -> bool {
        (record.bedrooms - self.bedrooms).abs() <= ROOM_TOLERANCE
            && (record.bathrooms - self.bathrooms).abs() <= ROOM_TOLERANCE
            && within_area(record.land_size_m2, self.land_size_m2)
            && within_area(record.building_size_m2, self.building_size_m2)
            && record.floors == self.floors
    }

    fn check(&self) -> Result<()> {
        let values = [
            self.bedrooms,
            self.bathrooms,
            self.land_size_m2,
            self.building_size_m2,
            self.floors,
        ];
        if values.iter().all(|v| v.is_finite()) {
            Ok(())
        } else {
            Err(Error::Filter("query contains non-finite values".to_string()))
        }
    }
}

fn within_area(value: f64, reference: f64) -> bool {
    value >= AREA_LOWER * reference && value <= AREA_UPPER * reference
}

/// Up to `limit` qualifying records, closest price first.
///
/// Ties keep dataset order. The records themselves are left untouched;
/// distances live only in the scratch list used for ranking.
pub fn find_similar<'a>(
    records: &'a [PropertyRecord],
    query: &SimilarityQuery,
    predicted_price: f64,
    limit: usize,
) -> Result<Vec<&'a PropertyRecord>> {
    query.check()?;
    if !predicted_price.is_finite() {
        return Err(Error::Filter(format!(
            "predicted price {} is not a number",
            predicted_price
        )));
    }

    let mut scored: Vec<(f64, &PropertyRecord)> = records
        .iter()
        .filter(|record| query.matches(record))
        .map(|record| ((record.price_in_rp - predicted_price).abs(), record))
        .collect();

    // sort_by is stable
    scored.sort_by(|a, b| a.0.total_cmp(&b.0));

    Ok(scored.into_iter().take(limit).map(|(_, record)| record).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: &str, bedrooms: f64, land: f64, building: f64, floors: f64, price: f64) -> PropertyRecord {
        PropertyRecord {
            bedrooms,
            bathrooms: 1.0,
            land_size_m2: land,
            building_size_m2: building,
            floors,
            building_age: Some(5.0),
            garages: Some(0.0),
            price_in_rp: price,
            title: title.to_string(),
            address: format!("Jl. {}", title),
            url: format!("https://example.test/{}", title),
        }
    }

    fn query() -> SimilarityQuery {
        SimilarityQuery::from(&PropertyInput::default())
    }

    #[test]
    fn closest_price_comes_first() {
        let records = vec![
            record("a", 2.0, 100.0, 80.0, 1.0, 100.0),
            record("b", 2.0, 100.0, 80.0, 1.0, 500.0),
            record("c", 2.0, 100.0, 80.0, 1.0, 1_000_000.0),
            record("d", 2.0, 100.0, 80.0, 1.0, 1_000_005.0),
        ];
        let result = find_similar(&records, &query(), 1_000_000.0, DEFAULT_LIMIT).unwrap();

        assert_eq!(result.len(), 3);
        assert_eq!(result[0].price_in_rp, 1_000_000.0);
        let distances: Vec<f64> = result
            .iter()
            .map(|r| (r.price_in_rp - 1_000_000.0).abs())
            .collect();
        assert!(distances.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(result[1].title, "d");
    }

    #[test]
    fn tolerance_bounds_are_inclusive() {
        let records = vec![
            record("rooms-low", 1.0, 100.0, 80.0, 1.0, 1.0),
            record("rooms-high", 3.0, 100.0, 80.0, 1.0, 1.0),
            record("rooms-out", 4.0, 100.0, 80.0, 1.0, 1.0),
            record("land-low", 2.0, 80.0, 80.0, 1.0, 1.0),
            record("land-high", 2.0, 120.0, 80.0, 1.0, 1.0),
            record("land-out", 2.0, 121.0, 80.0, 1.0, 1.0),
            record("building-out", 2.0, 100.0, 63.0, 1.0, 1.0),
            record("floors-out", 2.0, 100.0, 80.0, 2.0, 1.0),
        ];
        let result = find_similar(&records, &query(), 1.0, records.len()).unwrap();
        let titles: Vec<&str> = result.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["rooms-low", "rooms-high", "land-low", "land-high"]);
    }

    #[test]
    fn every_result_satisfies_the_predicates() {
        let records: Vec<PropertyRecord> = (0..40)
            .map(|i| {
                let i = i as f64;
                record(&i.to_string(), i % 5.0, 70.0 + i * 2.0, 60.0 + i, 1.0 + i % 2.0, i * 1000.0)
            })
            .collect();
        let q = query();
        let result = find_similar(&records, &q, 12_000.0, DEFAULT_LIMIT).unwrap();
        assert!(result.len() <= DEFAULT_LIMIT);
        assert!(result.iter().all(|r| q.matches(r)));
    }

    #[test]
    fn ties_keep_dataset_order() {
        let records = vec![
            record("first", 2.0, 100.0, 80.0, 1.0, 90.0),
            record("second", 2.0, 100.0, 80.0, 1.0, 110.0),
            record("third", 2.0, 100.0, 80.0, 1.0, 90.0),
        ];
        let result = find_similar(&records, &query(), 100.0, DEFAULT_LIMIT).unwrap();
        let titles: Vec<&str> = result.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["first", "second", "third"]);
    }

    #[test]
    fn no_match_is_empty_and_dataset_is_untouched() {
        let records = vec![record("far", 9.0, 900.0, 800.0, 3.0, 1.0)];
        let before = records.clone();
        let result = find_similar(&records, &query(), 1.0, DEFAULT_LIMIT).unwrap();
        assert!(result.is_empty());
        assert_eq!(records, before);
    }

    #[test]
    fn non_finite_price_is_a_filter_error() {
        let records = vec![record("a", 2.0, 100.0, 80.0, 1.0, 1.0)];
        assert!(matches!(
            find_similar(&records, &query(), f64::NAN, DEFAULT_LIMIT),
            Err(Error::Filter(_))
        ));
    }
}
