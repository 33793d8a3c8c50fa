//! Tests mapping readings onto the feature layout

use chrono::Utc;

use super::layout::{LightScale, FEATURE_COUNT};
use super::vector::{FeatureVector, MissingFeature};
use crate::logic::sensor::SensorReading;

fn reading(temperature: Option<f64>, humidity: Option<f64>, light: Option<f64>, raw: Option<f64>) -> SensorReading {
    SensorReading {
        received_at: Utc::now(),
        temperature,
        humidity,
        light,
        raw_light: raw,
        edge_label: None,
    }
}

#[test]
fn test_vector_follows_layout_order() {
    let r = reading(Some(30.0), Some(60.0), Some(3500.0), Some(595.0));
    let fv = FeatureVector::from_reading(&r, LightScale::Inverted).unwrap();

    assert_eq!(fv.values, [30.0, 60.0, 3500.0]);
    assert_eq!(fv.get_by_name("humidity"), Some(60.0));
    assert_eq!(fv.as_slice().len(), FEATURE_COUNT);
    assert!(fv.is_compatible());
}

#[test]
fn test_vector_uses_raw_light_when_schema_says_raw() {
    let r = reading(Some(30.0), Some(60.0), Some(3500.0), Some(595.0));
    let fv = FeatureVector::from_reading(&r, LightScale::Raw).unwrap();
    assert_eq!(fv.values[2], 595.0);
}

#[test]
fn test_vector_reports_first_missing_feature() {
    let r = reading(Some(30.0), None, None, None);
    let err = FeatureVector::from_reading(&r, LightScale::Inverted).unwrap_err();
    assert_eq!(err, MissingFeature("humidity"));

    let r = reading(Some(30.0), Some(50.0), None, None);
    let err = FeatureVector::from_reading(&r, LightScale::Raw).unwrap_err();
    assert_eq!(err, MissingFeature("light"));
}

#[test]
fn test_vector_rejects_values_beyond_f32() {
    let r = reading(Some(1e300), Some(60.0), Some(3500.0), None);
    let err = FeatureVector::from_reading(&r, LightScale::Inverted).unwrap_err();
    assert_eq!(err, MissingFeature("temperature"));

    let r = reading(Some(30.0), Some(-1e39), Some(3500.0), None);
    let err = FeatureVector::from_reading(&r, LightScale::Inverted).unwrap_err();
    assert_eq!(err, MissingFeature("humidity"));
}

#[test]
fn test_vector_converts_light_from_other_channel() {
    let r = reading(Some(20.0), Some(40.0), None, Some(95.0));
    let fv = FeatureVector::from_reading(&r, LightScale::Inverted).unwrap();
    assert_eq!(fv.values[2], 4000.0);
}
