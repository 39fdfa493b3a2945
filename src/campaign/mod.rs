//! # Campaign recommendations
//! Two generation passes over a finished [`FeatureReport`]: a first draft from the
//! feature vector, then an expert refinement. A refinement that does not parse
//! falls back to the draft.

pub mod extract;
pub mod generator;
pub mod prompt;

use metrics::counter;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::ai::AiConfig;
use crate::error::CampaignError;
use crate::features::FeatureReport;

pub use extract::{extract_json_object, parse_json_object};
pub use generator::{build_generator, DynGenerator, MockGenerator, TextGenerator};
pub use prompt::CampaignContext;

#[derive(Clone)]
pub struct CampaignPlanner {
    generator: DynGenerator,
    initial_temperature: f32,
    refine_temperature: f32,
}

impl CampaignPlanner {
    pub fn new(generator: DynGenerator, config: &AiConfig) -> Self {
        Self {
            generator,
            initial_temperature: config.initial_temperature,
            refine_temperature: config.refine_temperature,
        }
    }

    pub fn from_config(config: &AiConfig) -> Self {
        Self::new(build_generator(config), config)
    }

    pub fn provider_name(&self) -> &'static str {
        self.generator.provider_name()
    }

    pub async fn recommend(
        &self,
        store_type: &str,
        report: &FeatureReport,
        ctx: &CampaignContext,
    ) -> Result<Value, CampaignError> {
        let draft = self.draft(report, ctx).await.inspect_err(|e| {
            counter!("campaign_generation_errors_total").increment(1);
            warn!(error = %e, provider = self.provider_name(), "campaign draft failed");
        })?;

        let refine = prompt::expert_prompt(ctx, store_type, report, &draft);
        let refined = match self.generator.generate(&refine, self.refine_temperature).await {
            Ok(text) => parse_json_object(&text),
            Err(e) => Err(e),
        };
        match refined {
            Ok(v) => {
                info!(store_type, provider = self.provider_name(), "campaign refined");
                Ok(v)
            }
            Err(e) => {
                counter!("campaign_refine_fallback_total").increment(1);
                warn!(error = %e, "refinement unusable; returning initial recommendation");
                Ok(draft)
            }
        }
    }

    async fn draft(
        &self,
        report: &FeatureReport,
        ctx: &CampaignContext,
    ) -> Result<Value, CampaignError> {
        let prompt = prompt::marketing_prompt(ctx, &report.vector);
        let text = self
            .generator
            .generate(&prompt, self.initial_temperature)
            .await?;
        parse_json_object(&text)
    }
}
