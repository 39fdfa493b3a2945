//! # Weather features
//! Current-condition flags and forecast aggregates from an Open-Meteo style payload.
//!
//! Two payload shapes are understood:
//! - **daily**: 7-day outlook (`temperature_2m_max/min`, `precipitation_sum`, `weathercode`).
//!   Missing data falls back to a fixed, mild record so downstream scoring never branches.
//! - **hourly**: near-term samples (`temperature_2m`, `relative_humidity_2m`,
//!   `wind_speed_10m`). This mode expects fresh data: misaligned arrays or an empty
//!   temperature series are errors, not defaults. A misaligned hourly block is an
//!   error even when a daily block is present and drives the features.
//!
//! Adverse weather means something different in each mode (precipitation vs. wind);
//! both rules are kept as they are.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::PipelineError;
use crate::normalize::{normalize, ScaleMethod};

pub const DEFAULT_COLD_THRESHOLD: f64 = 10.0;
pub const DEFAULT_HOURLY_WINDOW: usize = 24;

/// Daily mode: any day wetter than this (mm) is adverse.
const ADVERSE_PRECIP_MM: f64 = 10.0;
/// Hourly mode: any gust above this (km/h) is adverse.
const ADVERSE_WIND_KMH: f64 = 25.0;

// Fallback record for a daily payload without temperatures.
const FALLBACK_AVG_TEMP: f64 = 20.0;
const FALLBACK_MAX_TEMP: f64 = 25.0;
const FALLBACK_MIN_TEMP: f64 = 15.0;
const FALLBACK_VARIABILITY: f64 = 10.0;
const FALLBACK_TOTAL_PRECIP: f64 = 0.0;

/* ----------------------------
Raw payload
---------------------------- */

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawWeather {
    #[serde(default)]
    pub current: Option<CurrentWeather>,
    #[serde(default)]
    pub hourly: Option<HourlySeries>,
    #[serde(default)]
    pub daily: Option<DailySeries>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentWeather {
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub temperature_2m: Option<f64>,
    #[serde(default)]
    pub wind_speed_10m: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HourlySeries {
    #[serde(default)]
    pub time: Option<Vec<Option<String>>>,
    #[serde(default)]
    pub temperature_2m: Option<Vec<Option<f64>>>,
    #[serde(default)]
    pub relative_humidity_2m: Option<Vec<Option<f64>>>,
    #[serde(default)]
    pub wind_speed_10m: Option<Vec<Option<f64>>>,
}

impl HourlySeries {
    pub fn is_empty(&self) -> bool {
        len_of(&self.time) == 0
            && len_of(&self.temperature_2m) == 0
            && len_of(&self.relative_humidity_2m) == 0
            && len_of(&self.wind_speed_10m) == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailySeries {
    #[serde(default)]
    pub time: Option<Vec<Option<String>>>,
    #[serde(default)]
    pub temperature_2m_max: Option<Vec<Option<f64>>>,
    #[serde(default)]
    pub temperature_2m_min: Option<Vec<Option<f64>>>,
    #[serde(default)]
    pub precipitation_sum: Option<Vec<Option<f64>>>,
    #[serde(default)]
    pub weathercode: Option<Vec<Option<i64>>>,
}

impl DailySeries {
    pub fn is_empty(&self) -> bool {
        len_of(&self.time) == 0
            && len_of(&self.temperature_2m_max) == 0
            && len_of(&self.temperature_2m_min) == 0
            && len_of(&self.precipitation_sum) == 0
            && len_of(&self.weathercode) == 0
    }
}

/* ----------------------------
Features
---------------------------- */

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TempFlag {
    Cold,
    /// Also used when the current temperature is unknown.
    #[default]
    Warm,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    pub date: Option<String>,
    pub max_temp: Option<f64>,
    pub min_temp: Option<f64>,
    pub precipitation: Option<f64>,
    pub weathercode: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherFeatures {
    pub current_temp: Option<f64>,
    pub current_wind: Option<f64>,
    pub temp_flag: TempFlag,
    pub avg_temp: Option<f64>,
    pub max_temp: Option<f64>,
    pub min_temp: Option<f64>,
    pub temp_variability: Option<f64>,
    pub avg_humidity: Option<f64>,
    pub max_wind: Option<f64>,
    pub adverse_weather: bool,
    pub weekly_forecast: Vec<DailyForecast>,
    pub avg_max_temp: Option<f64>,
    pub avg_min_temp: Option<f64>,
    pub total_precip: Option<f64>,
}

/// Hourly sample after forward-fill, with min-max scaled temperature and wind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyRow {
    pub time: Option<String>,
    pub temperature_2m: Option<f64>,
    pub relative_humidity_2m: Option<f64>,
    pub wind_speed_10m: Option<f64>,
    pub temperature_norm: Option<f64>,
    pub wind_speed_norm: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherShape {
    Hourly,
    Daily,
    Empty,
}

/// Cleaned weather rows kept for inspection snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherTable {
    pub shape: WeatherShape,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hourly: Vec<HourlyRow>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub daily: Vec<DailyForecast>,
}

impl WeatherTable {
    fn empty() -> Self {
        Self {
            shape: WeatherShape::Empty,
            hourly: Vec::new(),
            daily: Vec::new(),
        }
    }
}

/* ----------------------------
Builder
---------------------------- */

/// Which payload shape to aggregate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherMode {
    /// Daily when a daily block is present, else hourly when an hourly block is, else daily.
    #[default]
    Auto,
    Daily,
    Hourly,
}

#[derive(Debug, Clone, Copy)]
pub struct WeatherFeatureBuilder {
    mode: WeatherMode,
    cold_threshold: f64,
    hourly_window: usize,
}

impl Default for WeatherFeatureBuilder {
    fn default() -> Self {
        Self {
            mode: WeatherMode::Auto,
            cold_threshold: DEFAULT_COLD_THRESHOLD,
            hourly_window: DEFAULT_HOURLY_WINDOW,
        }
    }
}

impl WeatherFeatureBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mut self, mode: WeatherMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_cold_threshold(mut self, celsius: f64) -> Self {
        self.cold_threshold = celsius;
        self
    }

    pub fn with_hourly_window(mut self, samples: usize) -> Self {
        self.hourly_window = samples.max(1);
        self
    }

    /// Resolve `Auto` against the payload.
    pub fn effective_mode(&self, raw: &RawWeather) -> WeatherMode {
        match self.mode {
            WeatherMode::Auto => {
                if raw.daily.as_ref().is_some_and(|d| !d.is_empty()) {
                    WeatherMode::Daily
                } else if raw.hourly.as_ref().is_some_and(|h| !h.is_empty()) {
                    WeatherMode::Hourly
                } else {
                    WeatherMode::Daily
                }
            }
            m => m,
        }
    }

    /// Any non-empty hourly block is validated, whichever mode builds the features.
    pub fn build(&self, raw: &RawWeather) -> Result<WeatherFeatures, PipelineError> {
        let mode = self.effective_mode(raw);
        if mode != WeatherMode::Hourly {
            if let Some(hourly) = present_hourly(raw) {
                hourly_rows(hourly)?;
            }
        }
        let features = match mode {
            WeatherMode::Hourly => self.hourly_features(raw)?,
            _ => self.daily_features(raw),
        };
        debug!(
            adverse = features.adverse_weather,
            days = features.weekly_forecast.len(),
            "weather features built"
        );
        Ok(features)
    }

    /// Cleaned rows: hourly samples when present, else the daily forecast.
    pub fn clean(&self, raw: &RawWeather) -> Result<WeatherTable, PipelineError> {
        if let Some(hourly) = present_hourly(raw) {
            return Ok(WeatherTable {
                shape: WeatherShape::Hourly,
                hourly: hourly_rows(hourly)?,
                daily: Vec::new(),
            });
        }
        match self.effective_mode(raw) {
            WeatherMode::Hourly => Ok(WeatherTable {
                shape: WeatherShape::Hourly,
                hourly: Vec::new(),
                daily: Vec::new(),
            }),
            _ => match raw.daily.as_ref().filter(|d| !d.is_empty()) {
                Some(daily) => Ok(WeatherTable {
                    shape: WeatherShape::Daily,
                    hourly: Vec::new(),
                    daily: daily_rows(daily),
                }),
                None => {
                    warn!("no hourly or daily weather data found; cleaned table is empty");
                    Ok(WeatherTable::empty())
                }
            },
        }
    }

    fn current(&self, raw: &RawWeather) -> (Option<f64>, Option<f64>, TempFlag) {
        let cur = raw.current.clone().unwrap_or_default();
        let temp = cur.temperature_2m;
        let flag = match temp {
            Some(t) if t < self.cold_threshold => TempFlag::Cold,
            _ => TempFlag::Warm,
        };
        (temp, cur.wind_speed_10m, flag)
    }

    fn daily_features(&self, raw: &RawWeather) -> WeatherFeatures {
        let (current_temp, current_wind, temp_flag) = self.current(raw);
        let daily = raw.daily.clone().unwrap_or_default();

        let maxes = present(&daily.temperature_2m_max);
        if maxes.is_empty() {
            warn!("no daily temperature data available; using default weather features");
            return WeatherFeatures {
                current_temp,
                current_wind,
                temp_flag,
                avg_temp: Some(FALLBACK_AVG_TEMP),
                max_temp: Some(FALLBACK_MAX_TEMP),
                min_temp: Some(FALLBACK_MIN_TEMP),
                temp_variability: Some(FALLBACK_VARIABILITY),
                avg_humidity: None,
                max_wind: None,
                adverse_weather: false,
                weekly_forecast: Vec::new(),
                avg_max_temp: Some(FALLBACK_MAX_TEMP),
                avg_min_temp: Some(FALLBACK_MIN_TEMP),
                total_precip: Some(FALLBACK_TOTAL_PRECIP),
            };
        }

        let mins = present(&daily.temperature_2m_min);
        let precip = present(&daily.precipitation_sum);

        let avg_temp = mean(&maxes);
        let max_temp = maximum(&maxes);
        let min_temp = minimum(&mins);
        let temp_variability = max_temp.zip(min_temp).map(|(hi, lo)| hi - lo);

        let adverse_weather = min_temp.is_some_and(|t| t < 0.0)
            || precip.iter().any(|&p| p > ADVERSE_PRECIP_MM);

        let weekly_forecast = daily_rows(&daily);
        let (avg_max_temp, avg_min_temp, total_precip) = weekly_stats(&weekly_forecast);

        WeatherFeatures {
            current_temp,
            current_wind,
            temp_flag,
            avg_temp,
            max_temp,
            min_temp,
            temp_variability,
            avg_humidity: None,
            max_wind: None,
            adverse_weather,
            weekly_forecast,
            avg_max_temp,
            avg_min_temp,
            total_precip,
        }
    }

    fn hourly_features(&self, raw: &RawWeather) -> Result<WeatherFeatures, PipelineError> {
        let (current_temp, current_wind, temp_flag) = self.current(raw);
        let hourly = raw.hourly.clone().unwrap_or_default();
        let rows = hourly_rows(&hourly)?;
        let window = &rows[..rows.len().min(self.hourly_window)];

        let temps: Vec<f64> = window.iter().filter_map(|r| r.temperature_2m).collect();
        if temps.is_empty() {
            return Err(PipelineError::NoHourlyTemperature);
        }
        let humidity: Vec<f64> = window.iter().filter_map(|r| r.relative_humidity_2m).collect();
        let wind: Vec<f64> = window.iter().filter_map(|r| r.wind_speed_10m).collect();

        let max_temp = maximum(&temps);
        let min_temp = minimum(&temps);
        let max_wind = maximum(&wind);

        let adverse_weather =
            min_temp.is_some_and(|t| t < 0.0) || max_wind.is_some_and(|w| w > ADVERSE_WIND_KMH);

        Ok(WeatherFeatures {
            current_temp,
            current_wind,
            temp_flag,
            avg_temp: mean(&temps),
            max_temp,
            min_temp,
            temp_variability: max_temp.zip(min_temp).map(|(hi, lo)| hi - lo),
            avg_humidity: mean(&humidity),
            max_wind,
            adverse_weather,
            weekly_forecast: Vec::new(),
            avg_max_temp: None,
            avg_min_temp: None,
            total_precip: None,
        })
    }
}

/* ----------------------------
Helpers
---------------------------- */

fn present_hourly(raw: &RawWeather) -> Option<&HourlySeries> {
    raw.hourly.as_ref().filter(|h| !h.is_empty())
}

fn len_of<T>(v: &Option<Vec<T>>) -> usize {
    v.as_ref().map_or(0, Vec::len)
}

fn present(v: &Option<Vec<Option<f64>>>) -> Vec<f64> {
    v.iter()
        .flatten()
        .flatten()
        .copied()
        .filter(|x| x.is_finite())
        .collect()
}

fn at<T: Clone>(v: &Option<Vec<Option<T>>>, i: usize) -> Option<T> {
    v.as_ref().and_then(|xs| xs.get(i).cloned().flatten())
}

fn mean(xs: &[f64]) -> Option<f64> {
    (!xs.is_empty()).then(|| xs.iter().sum::<f64>() / xs.len() as f64)
}

fn maximum(xs: &[f64]) -> Option<f64> {
    xs.iter().copied().reduce(f64::max)
}

fn minimum(xs: &[f64]) -> Option<f64> {
    xs.iter().copied().reduce(f64::min)
}

/// One entry per forecast date; missing fields stay null individually.
fn daily_rows(daily: &DailySeries) -> Vec<DailyForecast> {
    (0..len_of(&daily.time))
        .map(|i| DailyForecast {
            date: at(&daily.time, i),
            max_temp: at(&daily.temperature_2m_max, i),
            min_temp: at(&daily.temperature_2m_min, i),
            precipitation: at(&daily.precipitation_sum, i),
            weathercode: at(&daily.weathercode, i),
        })
        .collect()
}

/// `(avg_max_temp, avg_min_temp, total_precip)` over the forecast, nulls ignored.
fn weekly_stats(days: &[DailyForecast]) -> (Option<f64>, Option<f64>, Option<f64>) {
    if days.is_empty() {
        return (None, None, None);
    }
    let maxes: Vec<f64> = days.iter().filter_map(|d| d.max_temp).collect();
    let mins: Vec<f64> = days.iter().filter_map(|d| d.min_temp).collect();
    let total: f64 = days.iter().filter_map(|d| d.precipitation).sum();
    (mean(&maxes), mean(&mins), Some(total))
}

fn forward_fill(v: &Option<Vec<Option<f64>>>, len: usize) -> Vec<Option<f64>> {
    let mut last = None;
    (0..len)
        .map(|i| {
            if let Some(x) = at(v, i).filter(|x| x.is_finite()) {
                last = Some(x);
            }
            last
        })
        .collect()
}

/// Validate alignment, forward-fill gaps, and attach scaled temperature / wind.
fn hourly_rows(h: &HourlySeries) -> Result<Vec<HourlyRow>, PipelineError> {
    let lengths = [
        ("time", len_of(&h.time)),
        ("temperature_2m", len_of(&h.temperature_2m)),
        ("relative_humidity_2m", len_of(&h.relative_humidity_2m)),
        ("wind_speed_10m", len_of(&h.wind_speed_10m)),
    ];
    let n = lengths[0].1;
    if lengths.iter().any(|(_, l)| *l != n) {
        let lengths = lengths
            .iter()
            .map(|(k, l)| format!("{k}={l}"))
            .collect::<Vec<_>>()
            .join(", ");
        return Err(PipelineError::MisalignedHourly { lengths });
    }

    let has_gaps = [&h.temperature_2m, &h.relative_humidity_2m, &h.wind_speed_10m]
        .iter()
        .any(|s| s.iter().flatten().any(Option::is_none));
    if has_gaps {
        warn!("missing values in hourly weather data; forward-filling");
    }

    let temp = forward_fill(&h.temperature_2m, n);
    let humidity = forward_fill(&h.relative_humidity_2m, n);
    let wind = forward_fill(&h.wind_speed_10m, n);

    let as_nan = |v: &[Option<f64>]| v.iter().map(|x| x.unwrap_or(f64::NAN)).collect::<Vec<_>>();
    let temp_norm = normalize(&as_nan(&temp), ScaleMethod::MinMax);
    let wind_norm = normalize(&as_nan(&wind), ScaleMethod::MinMax);
    let finite = |x: f64| x.is_finite().then_some(x);

    Ok((0..n)
        .map(|i| HourlyRow {
            time: at(&h.time, i),
            temperature_2m: temp[i],
            relative_humidity_2m: humidity[i],
            wind_speed_10m: wind[i],
            temperature_norm: finite(temp_norm[i]),
            wind_speed_norm: finite(wind_norm[i]),
        })
        .collect())
}
