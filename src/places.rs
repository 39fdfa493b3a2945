//! Input boundary types: the payload handed over by the fetch layer.
//!
//! Everything is optional and leniently typed; the builders decide on defaults.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::normalize::coerce_f64;

/// Rating used when a place has none (or a non-numeric one).
pub const DEFAULT_RATING: f64 = 3.0;
/// Bucket for places without a usable primary type.
pub const UNKNOWN_CATEGORY: &str = "unknown";

/// `{zipcode, stores, weather}` as produced by the fetch step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketData {
    #[serde(default, deserialize_with = "lenient_zipcode")]
    pub zipcode: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub stores: Vec<PlaceRecord>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub weather: crate::weather::RawWeather,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalizedText {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(default)]
    pub text: Option<LocalizedText>,
    #[serde(default)]
    pub original_text: Option<LocalizedText>,
}

impl Review {
    /// `text.text`, falling back to `originalText.text`. Blank strings count as absent.
    pub fn body(&self) -> Option<&str> {
        fn non_blank(t: &Option<LocalizedText>) -> Option<&str> {
            t.as_ref()
                .and_then(|lt| lt.text.as_deref())
                .filter(|s| !s.trim().is_empty())
        }
        non_blank(&self.text).or_else(|| non_blank(&self.original_text))
    }
}

/// One competitor place (Places API shape).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceRecord {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_name: Option<LocalizedText>,
    #[serde(default)]
    pub formatted_address: Option<String>,
    #[serde(default)]
    pub location: Option<LatLng>,
    #[serde(default)]
    pub primary_type: Option<String>,
    #[serde(default)]
    pub types: Option<Vec<String>>,
    /// Kept raw: numbers, numeric strings and junk all show up in the wild.
    #[serde(default)]
    pub rating: Option<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub reviews: Vec<Review>,
}

impl PlaceRecord {
    /// Primary type, with absent or blank values bucketed as `"unknown"`.
    pub fn category(&self) -> &str {
        self.primary_type
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(UNKNOWN_CATEGORY)
    }

    /// Numeric rating or [`DEFAULT_RATING`].
    pub fn rating_or_default(&self) -> f64 {
        self.rating
            .as_ref()
            .and_then(coerce_f64)
            .unwrap_or(DEFAULT_RATING)
    }

    /// `(latitude, longitude)`, each defaulting to 0.0.
    pub fn coordinates(&self) -> (f64, f64) {
        let loc = self.location.unwrap_or_default();
        (
            loc.latitude.filter(|v| v.is_finite()).unwrap_or(0.0),
            loc.longitude.filter(|v| v.is_finite()).unwrap_or(0.0),
        )
    }

    pub fn type_tags(&self) -> &[String] {
        self.types.as_deref().unwrap_or(&[])
    }

    /// `name`, else `displayName.text`.
    pub fn label(&self) -> Option<&str> {
        self.name
            .as_deref()
            .or_else(|| self.display_name.as_ref().and_then(|d| d.text.as_deref()))
    }
}

/// Accepts `"10001"`, `10001` or null.
fn lenient_zipcode<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(de)?;
    Ok(match v {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// `null` behaves like an absent key.
fn null_as_default<'de, D, T>(de: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(de)?.unwrap_or_default())
}
