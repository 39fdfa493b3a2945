//! Debug snapshots of each pipeline stage, written as pretty JSON.
//!
//! Files are written to a per-write temp name and renamed into place, so concurrent
//! runs never share a temp file. Nothing reads them back.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::features::FeatureReport;

pub const CLEANED_STORES: &str = "cleaned_stores.json";
pub const CLEANED_WEATHER: &str = "cleaned_weather.json";
pub const AGGREGATED_METRICS: &str = "aggregated_metrics.json";
pub const WEATHER_FEATURES: &str = "weather_features.json";
pub const FEATURE_VECTOR: &str = "feature_vector.json";

static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    dir: PathBuf,
}

impl SnapshotWriter {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write every stage of `report`. The first failure is returned; earlier files stay.
    pub fn write_report(&self, report: &FeatureReport) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        self.write_json(CLEANED_STORES, &report.store_table)?;
        self.write_json(CLEANED_WEATHER, &report.weather_table)?;
        self.write_json(AGGREGATED_METRICS, &report.metrics)?;
        self.write_json(WEATHER_FEATURES, &report.weather)?;
        self.write_json(FEATURE_VECTOR, &report.vector)?;
        debug!(dir = %self.dir.display(), "snapshots written");
        Ok(())
    }

    /// Like [`write_report`](Self::write_report) but only logs failures.
    pub fn write_best_effort(&self, report: &FeatureReport) {
        if let Err(e) = self.write_report(report) {
            warn!(dir = %self.dir.display(), error = %e, "snapshot write failed");
        }
    }

    /// Best-effort write on the blocking pool; the caller does not wait.
    pub fn spawn_best_effort(&self, report: FeatureReport) -> JoinHandle<()> {
        let writer = self.clone();
        tokio::task::spawn_blocking(move || writer.write_best_effort(&report))
    }

    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> io::Result<()> {
        let path = self.dir.join(name);
        let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
        let tmp = self
            .dir
            .join(format!("{name}.{}.{seq}.tmp", std::process::id()));
        let json = serde_json::to_string_pretty(value)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let mut f = fs::File::create(&tmp)?;
        f.write_all(json.as_bytes())?;
        f.write_all(b"\n")?;
        fs::rename(tmp, path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureVectorAssembler;
    use crate::places::MarketData;
    use serde_json::json;

    fn scratch_dir(tag: &str) -> PathBuf {
        let d = std::env::temp_dir().join(format!(
            "campaign-features-snap-{tag}-{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&d);
        d
    }

    #[test]
    fn writes_all_five_files() {
        let data: MarketData = serde_json::from_value(json!({
            "zipcode": "10001",
            "stores": [{"primaryType": "cafe", "rating": 4.0, "types": ["cafe"]}]
        }))
        .unwrap();
        let report = FeatureVectorAssembler::default().report(&data).unwrap();

        let dir = scratch_dir("all");
        let w = SnapshotWriter::new(&dir);
        w.write_report(&report).unwrap();

        for name in [
            CLEANED_STORES,
            CLEANED_WEATHER,
            AGGREGATED_METRICS,
            WEATHER_FEATURES,
            FEATURE_VECTOR,
        ] {
            let raw = fs::read_to_string(dir.join(name)).unwrap();
            let _: serde_json::Value = serde_json::from_str(&raw).unwrap();
        }
        assert_eq!(leftover_tmp_files(&dir), 0);
        let v: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.join(FEATURE_VECTOR)).unwrap()).unwrap();
        assert_eq!(v["zipcode"], "10001");
        let _ = fs::remove_dir_all(&dir);
    }

    fn leftover_tmp_files(dir: &Path) -> usize {
        fs::read_dir(dir)
            .unwrap()
            .filter(|e| {
                e.as_ref()
                    .map(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
                    .unwrap_or(false)
            })
            .count()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_writers_do_not_collide() {
        let dir = scratch_dir("concurrent");
        let w = SnapshotWriter::new(&dir);
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let data: MarketData = serde_json::from_value(json!({
                    "zipcode": format!("1000{i}"),
                    "stores": [{"primaryType": "cafe", "rating": 4.0}]
                }))
                .unwrap();
                let report = FeatureVectorAssembler::default().report(&data).unwrap();
                let w = w.clone();
                tokio::task::spawn_blocking(move || w.write_report(&report))
            })
            .collect();
        for h in handles {
            h.await.unwrap().unwrap();
        }
        w.spawn_best_effort(
            FeatureVectorAssembler::default()
                .report(&MarketData::default())
                .unwrap(),
        )
        .await
        .unwrap();

        let v: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.join(FEATURE_VECTOR)).unwrap()).unwrap();
        assert!(v.get("zipcode").is_some());
        assert_eq!(leftover_tmp_files(&dir), 0);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn unwritable_dir_is_not_fatal() {
        let dir = scratch_dir("blocked");
        fs::write(&dir, b"not a directory").unwrap();
        let report = FeatureVectorAssembler::default()
            .report(&MarketData::default())
            .unwrap();
        let w = SnapshotWriter::new(&dir);
        assert!(w.write_report(&report).is_err());
        w.write_best_effort(&report);
        let _ = fs::remove_file(&dir);
    }
}
