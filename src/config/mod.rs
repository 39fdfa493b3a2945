//! Runtime configuration: pipeline tuning (TOML) and the text-generation provider (JSON).

pub mod ai;
pub mod pipeline;
