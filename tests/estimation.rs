//! End-to-end estimation: train from CSV, persist the artifact, reload it
//! and run a full estimate against a reference dataset on disk.

use std::fs;
use std::path::Path;

use rumah_estimator::data::reference::ReferenceDataset;
use rumah_estimator::training::trainer::{train_model, TrainingOptions};
use rumah_estimator::utils::io::{load_model, save_model};
use rumah_estimator::{
    CategoricalField, Error, Estimator, PredictionHistory, PricePredictor, PropertyInput, SimilarProperties,
};

const HEADER: &str = "bedrooms,bathrooms,land_size_m2,building_size_m2,floors,building_age,garages,\
property_type,furnishing,property_condition,price_in_rp,title,address,url\n";

fn write_listings(path: &Path, rows: usize) {
    let mut csv = String::from(HEADER);
    for i in 0..rows {
        let bedrooms = 1 + i % 4;
        let bathrooms = 1 + i % 2;
        let land = 70 + (i * 11) % 90;
        let building = 50 + (i * 7) % 70;
        let floors = 1 + i % 2;
        let furnishing = ["unfurnished", "furnished", "semi furnished"][i % 3];
        let condition = ["bagus", "bagus sekali"][i % 2];
        let price = 150_000_000 + land * 2_500_000 + building * 3_000_000 + bedrooms * 15_000_000;
        csv.push_str(&format!(
            "{},{},{},{},{},{},{},rumah,{},{},{},Rumah {},Jl. Contoh {},https://listing.test/{}\n",
            bedrooms,
            bathrooms,
            land,
            building,
            floors,
            i % 25,
            i % 3,
            furnishing,
            condition,
            price,
            i,
            i,
            i
        ));
    }
    fs::write(path, csv).unwrap();
}

fn quick_options() -> TrainingOptions {
    TrainingOptions {
        epochs: 300,
        hidden: [16, 8, 8],
        ..TrainingOptions::default()
    }
}

#[test]
fn trained_model_survives_a_round_trip_and_estimates() {
    let dir = tempfile::tempdir().unwrap();
    let data_path = dir.path().join("rumah.csv");
    let model_path = dir.path().join("models/model.bin");
    write_listings(&data_path, 80);

    let (model, history) = train_model(&data_path, &quick_options()).unwrap();
    assert!(!history.is_empty());
    save_model(&model_path, &model).unwrap();
    let reloaded = load_model(&model_path).unwrap();

    let input = PropertyInput::default();
    let vector = input.to_feature_vector(&reloaded.encode_map);
    assert_eq!(vector.get("property_type"), Some(0.0));
    assert_eq!(
        vector.get("furnishing"),
        reloaded
            .encode_map
            .lookup(CategoricalField::Furnishing, "unfurnished")
            .map(|c| c as f64)
    );
    assert_eq!(model.predict(&vector).unwrap(), reloaded.predict(&vector).unwrap());

    let estimator = Estimator::from_model(reloaded, ReferenceDataset::load(&data_path));
    let mut session = PredictionHistory::new();
    let estimate = estimator.estimate(&input, &mut session).unwrap();

    let price = estimate.result.predicted_price;
    assert!(price.is_finite() && price >= 0.0);
    assert!(estimate.formatted_price.starts_with("Rp "));
    assert!(!estimate.formatted_price.contains(','));
    assert_eq!(session.len(), 1);

    if let SimilarProperties::Found(records) = &estimate.similar {
        assert!(records.len() <= 3);
        for record in records {
            assert!((record.bedrooms - 2.0).abs() <= 1.0);
            assert!((record.bathrooms - 1.0).abs() <= 1.0);
            assert!(record.land_size_m2 >= 80.0 && record.land_size_m2 <= 120.0);
            assert!(record.building_size_m2 >= 64.0 && record.building_size_m2 <= 96.0);
            assert_eq!(record.floors, 1.0);
        }
        let distances: Vec<f64> = records.iter().map(|r| (r.price_in_rp - price).abs()).collect();
        assert!(distances.windows(2).all(|w| w[0] <= w[1]));
    } else {
        panic!("expected comparable listings, got {:?}", estimate.similar);
    }
}

#[test]
fn missing_reference_data_still_prices_the_property() {
    let dir = tempfile::tempdir().unwrap();
    let data_path = dir.path().join("rumah.csv");
    write_listings(&data_path, 40);
    let (model, _) = train_model(&data_path, &quick_options()).unwrap();

    let estimator = Estimator::from_model(model, ReferenceDataset::load(dir.path().join("absent.csv")));
    let mut session = PredictionHistory::new();
    let estimate = estimator.estimate(&PropertyInput::default(), &mut session).unwrap();

    assert!(matches!(estimate.similar, SimilarProperties::Failed(_)));
    assert_eq!(session.len(), 1);
}

#[test]
fn separate_histories_stay_separate() {
    let dir = tempfile::tempdir().unwrap();
    let data_path = dir.path().join("rumah.csv");
    write_listings(&data_path, 40);
    let (model, _) = train_model(&data_path, &quick_options()).unwrap();
    let estimator = Estimator::from_model(model, ReferenceDataset::load(&data_path));

    let mut first = PredictionHistory::new();
    let mut second = PredictionHistory::new();
    estimator.estimate(&PropertyInput::default(), &mut first).unwrap();
    estimator.estimate(&PropertyInput::default(), &mut first).unwrap();
    let rejected = PropertyInput {
        building_size_m2: 0.0,
        ..PropertyInput::default()
    };
    assert!(matches!(
        estimator.estimate(&rejected, &mut second),
        Err(Error::Validation(_))
    ));

    assert_eq!(first.len(), 2);
    assert!(second.is_empty());
}

#[test]
fn unreadable_training_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(train_model(dir.path().join("none.csv"), &quick_options()).is_err());
    assert!(load_model(dir.path().join("none.bin")).is_err());
}
