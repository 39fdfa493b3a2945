//! Normalizer contract from the caller's side.

use campaign_features::normalize::normalize_json;
use campaign_features::{normalize, PipelineError, ScaleMethod};
use serde_json::json;

#[test]
fn documented_cases() {
    assert!(normalize(&[], ScaleMethod::MinMax).is_empty());
    assert_eq!(normalize(&[5.0, 5.0, 5.0], ScaleMethod::MinMax), vec![0.0; 3]);
    assert_eq!(normalize(&[1.0, 2.0, 3.0], ScaleMethod::MinMax), vec![0.0, 0.5, 1.0]);
    assert_eq!(normalize(&[7.0, 7.0], ScaleMethod::Standard), vec![0.0; 2]);
}

#[test]
fn standard_scaling_has_zero_mean_unit_variance() {
    let out = normalize(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0], ScaleMethod::Standard);
    let n = out.len() as f64;
    let mean = out.iter().sum::<f64>() / n;
    let var = out.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    assert!(mean.abs() < 1e-12);
    assert!((var - 1.0).abs() < 1e-12);
    assert!((out[0] + 1.5).abs() < 1e-12);
}

#[test]
fn minmax_output_is_bounded_and_order_preserving() {
    let input = [3.2, -1.0, 8.5, 0.0, 8.5, 2.2];
    let out = normalize(&input, ScaleMethod::MinMax);
    assert_eq!(out.len(), input.len());
    for (i, a) in out.iter().enumerate() {
        assert!((0.0..=1.0).contains(a));
        for (j, b) in out.iter().enumerate() {
            if input[i] < input[j] {
                assert!(a < b);
            }
        }
    }
}

#[test]
fn json_cells_are_coerced() {
    let out = normalize_json(&[json!(1), json!("3"), json!("n/a"), json!(null)], ScaleMethod::MinMax);
    assert_eq!(out[0], 0.0);
    assert_eq!(out[1], 1.0);
    assert!(out[2].is_nan());
    assert!(out[3].is_nan());
}

#[test]
fn method_names_parse() {
    assert_eq!("minmax".parse::<ScaleMethod>().unwrap(), ScaleMethod::MinMax);
    assert_eq!(" Standard ".parse::<ScaleMethod>().unwrap(), ScaleMethod::Standard);
    assert!(matches!(
        "robust".parse::<ScaleMethod>(),
        Err(PipelineError::UnknownScaleMethod(m)) if m == "robust"
    ));
}
