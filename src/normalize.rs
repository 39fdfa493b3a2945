//! # Normalizer
//! Column rescaling used by the store and weather builders.
//!
//! Missing values are carried as `NaN`. They are ignored when fitting and stay
//! `NaN` in the output. Degenerate columns (empty, all missing, constant) never
//! divide by zero: they come back as zeros of the same length.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleMethod {
    /// `(x - min) / (max - min)`, output in [0, 1].
    MinMax,
    /// `(x - mean) / stddev` with the population standard deviation.
    Standard,
}

impl FromStr for ScaleMethod {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minmax" => Ok(ScaleMethod::MinMax),
            "standard" => Ok(ScaleMethod::Standard),
            other => Err(PipelineError::UnknownScaleMethod(other.to_string())),
        }
    }
}

/// Rescale `values` with `method`. Output has the same length as the input.
pub fn normalize(values: &[f64], method: ScaleMethod) -> Vec<f64> {
    if values.is_empty() {
        warn!("empty column passed to normalize; returning empty output");
        return Vec::new();
    }

    let usable: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if usable.is_empty() {
        warn!(len = values.len(), "column holds no numeric values; returning zeros");
        return vec![0.0; values.len()];
    }

    let min = usable.iter().copied().fold(f64::INFINITY, f64::min);
    let max = usable.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if min == max {
        warn!(len = values.len(), "column has no variation; returning zeros");
        return vec![0.0; values.len()];
    }

    match method {
        ScaleMethod::MinMax => {
            let span = max - min;
            values.iter().map(|&x| (x - min) / span).collect()
        }
        ScaleMethod::Standard => {
            let n = usable.len() as f64;
            let mean = usable.iter().sum::<f64>() / n;
            let var = usable.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
            let std = var.sqrt();
            values.iter().map(|&x| (x - mean) / std).collect()
        }
    }
}

/// Same as [`normalize`] over raw JSON cells; non-numeric cells become missing.
pub fn normalize_json(values: &[Value], method: ScaleMethod) -> Vec<f64> {
    let coerced: Vec<f64> = values
        .iter()
        .map(|v| coerce_f64(v).unwrap_or(f64::NAN))
        .collect();
    normalize(&coerced, method)
}

/// Lenient numeric coercion: numbers and numeric strings; everything else is `None`.
pub fn coerce_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64().filter(|x| x.is_finite()),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|x| x.is_finite()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn approx(a: &[f64], b: &[f64]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-9)
    }

    #[test]
    fn minmax_basic() {
        let out = normalize(&[1.0, 2.0, 3.0], ScaleMethod::MinMax);
        assert!(approx(&out, &[0.0, 0.5, 1.0]), "got {out:?}");
    }

    #[test]
    fn empty_in_empty_out() {
        assert!(normalize(&[], ScaleMethod::MinMax).is_empty());
        assert!(normalize(&[], ScaleMethod::Standard).is_empty());
    }

    #[test]
    fn constant_column_is_zeros() {
        assert_eq!(normalize(&[5.0, 5.0, 5.0], ScaleMethod::MinMax), vec![0.0; 3]);
        assert_eq!(normalize(&[5.0, 5.0, 5.0], ScaleMethod::Standard), vec![0.0; 3]);
    }

    #[test]
    fn all_missing_is_zeros() {
        let out = normalize(&[f64::NAN, f64::NAN], ScaleMethod::Standard);
        assert_eq!(out, vec![0.0, 0.0]);
    }

    #[test]
    fn standard_has_zero_mean_unit_variance() {
        let out = normalize(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0], ScaleMethod::Standard);
        let mean = out.iter().sum::<f64>() / out.len() as f64;
        let var = out.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / out.len() as f64;
        assert!(mean.abs() < 1e-9);
        assert!((var - 1.0).abs() < 1e-9);
        // population std of this column is exactly 2
        assert!((out[0] + 1.5).abs() < 1e-9);
    }

    #[test]
    fn missing_entries_stay_missing() {
        let out = normalize(&[0.0, f64::NAN, 10.0], ScaleMethod::MinMax);
        assert_eq!(out[0], 0.0);
        assert!(out[1].is_nan());
        assert_eq!(out[2], 1.0);
    }

    #[test]
    fn json_cells_are_coerced() {
        let cells = vec![json!(1), json!("3"), json!("n/a"), json!(null)];
        let out = normalize_json(&cells, ScaleMethod::MinMax);
        assert_eq!(out[0], 0.0);
        assert_eq!(out[1], 1.0);
        assert!(out[2].is_nan() && out[3].is_nan());

        let junk = vec![json!("x"), json!(true)];
        assert_eq!(normalize_json(&junk, ScaleMethod::MinMax), vec![0.0, 0.0]);
    }

    #[test]
    fn method_parses_from_str() {
        assert_eq!("MinMax".parse::<ScaleMethod>().unwrap(), ScaleMethod::MinMax);
        assert_eq!(" standard ".parse::<ScaleMethod>().unwrap(), ScaleMethod::Standard);
        assert!(matches!(
            "zscore".parse::<ScaleMethod>(),
            Err(PipelineError::UnknownScaleMethod(_))
        ));
    }
}
