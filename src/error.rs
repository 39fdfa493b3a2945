//! Error types for the feature pipeline and the campaign flow.
//!
//! Most missing or sparse upstream data degrades to defaults and a `warn!` log.
//! Only contract violations end up here.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Hourly arrays must line up index by index.
    #[error("hourly weather arrays are not aligned (lengths: {lengths})")]
    MisalignedHourly { lengths: String },

    #[error("hourly weather payload carries no temperature samples")]
    NoHourlyTemperature,

    #[error("unknown scaling method '{0}' (expected 'minmax' or 'standard')")]
    UnknownScaleMethod(String),

    #[error("sentiment lexicon could not be loaded: {0}")]
    Lexicon(String),
}

impl PipelineError {
    /// True for errors caused by an inconsistent upstream payload.
    pub fn is_data_integrity(&self) -> bool {
        matches!(
            self,
            PipelineError::MisalignedHourly { .. } | PipelineError::NoHourlyTemperature
        )
    }
}

/// Failures of the campaign text-generation flow.
#[derive(Debug, Error)]
pub enum CampaignError {
    #[error("text generation is disabled")]
    Disabled,

    #[error("{provider} request failed: {message}")]
    Generation {
        provider: &'static str,
        message: String,
    },

    #[error("could not find a JSON object in the model response")]
    NoJsonObject,

    #[error("invalid JSON in model response: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

impl CampaignError {
    pub fn generation(provider: &'static str, message: impl Into<String>) -> Self {
        CampaignError::Generation {
            provider,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integrity_classification() {
        assert!(PipelineError::NoHourlyTemperature.is_data_integrity());
        assert!(PipelineError::MisalignedHourly {
            lengths: "time=3, temperature_2m=2".into()
        }
        .is_data_integrity());
        assert!(!PipelineError::UnknownScaleMethod("zscore".into()).is_data_integrity());
        assert!(!PipelineError::Lexicon("x".into()).is_data_integrity());
    }

    #[test]
    fn generation_message_names_provider() {
        let e = CampaignError::generation("gemini", "HTTP 503");
        assert_eq!(e.to_string(), "gemini request failed: HTTP 503");
    }
}
