//! # Store features
//! Turns competitor place records into a cleaned table (one-hot categories,
//! normalized ratings, distance to centroid) and aggregated market metrics.
//!
//! Distances are planar Euclidean in coordinate degrees. That is only a fair
//! approximation over a small area such as one postal code; no geodesic
//! correction is applied.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::normalize::{normalize, ScaleMethod};
use crate::places::PlaceRecord;

/// Default density radius, in coordinate degrees (~1 km at mid latitudes).
pub const DEFAULT_DENSITY_RADIUS: f64 = 0.01;

/// `(latitude, longitude)`; serializes as a two-element array.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Centroid(pub f64, pub f64);

impl Centroid {
    pub fn latitude(&self) -> f64 {
        self.0
    }
    pub fn longitude(&self) -> f64 {
        self.1
    }

    fn distance_to(&self, lat: f64, lon: f64) -> f64 {
        ((lat - self.0).powi(2) + (lon - self.1).powi(2)).sqrt()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregatedStoreMetrics {
    pub store_counts: BTreeMap<String, usize>,
    pub avg_ratings: BTreeMap<String, f64>,
    pub spatial_density: usize,
    pub centroid: Centroid,
}

impl AggregatedStoreMetrics {
    /// Mean of the per-category average ratings; 0.0 when there are none.
    pub fn overall_rating(&self) -> f64 {
        if self.avg_ratings.is_empty() {
            return 0.0;
        }
        self.avg_ratings.values().sum::<f64>() / self.avg_ratings.len() as f64
    }
}

/// One cleaned place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreRow {
    pub name: Option<String>,
    pub formatted_address: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub primary_type: String,
    pub rating: f64,
    pub rating_normalized: f64,
    pub distance_from_centroid: f64,
    /// Aligned with [`StoreTable::categories`].
    pub one_hot: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreTable {
    /// Sorted union of every `types` tag seen in this call.
    pub categories: Vec<String>,
    pub rows: Vec<StoreRow>,
}

impl StoreTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// One-hot column for `category`, if it is part of this call's universe.
    pub fn column(&self, category: &str) -> Option<Vec<u8>> {
        let idx = self.categories.iter().position(|c| c == category)?;
        Some(self.rows.iter().map(|r| r.one_hot[idx]).collect())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoreFeatures {
    pub table: StoreTable,
    pub metrics: AggregatedStoreMetrics,
}

#[derive(Debug, Clone, Copy)]
pub struct StoreFeatureBuilder {
    radius: f64,
    centroid: Option<Centroid>,
}

impl Default for StoreFeatureBuilder {
    fn default() -> Self {
        Self {
            radius: DEFAULT_DENSITY_RADIUS,
            centroid: None,
        }
    }
}

impl StoreFeatureBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    /// Fix the market center instead of deriving it from the places.
    pub fn with_centroid(mut self, centroid: Centroid) -> Self {
        self.centroid = Some(centroid);
        self
    }

    pub fn build(&self, places: &[PlaceRecord]) -> StoreFeatures {
        if places.is_empty() {
            warn!("no stores found; returning empty store features");
            return StoreFeatures::default();
        }

        // (1) Category universe for this call only.
        let categories: Vec<String> = places
            .iter()
            .flat_map(|p| p.type_tags().iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        // (2) Ratings and coordinates with defaults.
        let ratings: Vec<f64> = places.iter().map(PlaceRecord::rating_or_default).collect();
        let normalized = normalize(&ratings, ScaleMethod::MinMax);
        let coords: Vec<(f64, f64)> = places.iter().map(PlaceRecord::coordinates).collect();

        let centroid = self.centroid.unwrap_or_else(|| {
            let n = coords.len() as f64;
            let (lat, lon) = coords
                .iter()
                .fold((0.0, 0.0), |(a, b), (la, lo)| (a + la, b + lo));
            Centroid(lat / n, lon / n)
        });

        // (3) Rows.
        let rows: Vec<StoreRow> = places
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let (lat, lon) = coords[i];
                let tags: BTreeSet<&str> = p.type_tags().iter().map(String::as_str).collect();
                StoreRow {
                    name: p.label().map(str::to_string),
                    formatted_address: p.formatted_address.clone(),
                    latitude: lat,
                    longitude: lon,
                    primary_type: p.category().to_string(),
                    rating: ratings[i],
                    rating_normalized: normalized[i],
                    distance_from_centroid: centroid.distance_to(lat, lon),
                    one_hot: categories
                        .iter()
                        .map(|c| u8::from(tags.contains(c.as_str())))
                        .collect(),
                }
            })
            .collect();

        // (4) Aggregates by primary type.
        let mut store_counts: BTreeMap<String, usize> = BTreeMap::new();
        let mut rating_sums: BTreeMap<String, f64> = BTreeMap::new();
        for row in &rows {
            *store_counts.entry(row.primary_type.clone()).or_default() += 1;
            *rating_sums.entry(row.primary_type.clone()).or_default() += row.rating;
        }
        let avg_ratings = rating_sums
            .into_iter()
            .map(|(k, sum)| {
                let n = store_counts[&k] as f64;
                (k, sum / n)
            })
            .collect();

        let spatial_density = rows
            .iter()
            .filter(|r| r.distance_from_centroid <= self.radius)
            .count();

        debug!(
            places = rows.len(),
            categories = categories.len(),
            spatial_density,
            "store features built"
        );

        StoreFeatures {
            table: StoreTable { categories, rows },
            metrics: AggregatedStoreMetrics {
                store_counts,
                avg_ratings,
                spatial_density,
                centroid,
            },
        }
    }
}
