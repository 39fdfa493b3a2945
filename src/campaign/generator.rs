//! Text-generation providers behind one trait.
//!
//! The provider is picked by `config/ai.json`. `AI_TEST_MODE=mock` swaps in a
//! deterministic mock regardless of config, so HTTP tests never hit the network.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::ai::AiConfig;
use crate::error::CampaignError;

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

const USER_AGENT: &str = concat!("campaign-features/", env!("CARGO_PKG_VERSION"));

pub type GenerateFuture<'a> =
    Pin<Box<dyn Future<Output = Result<String, CampaignError>> + Send + 'a>>;

/// Anything that turns a prompt into text.
pub trait TextGenerator: Send + Sync {
    fn generate<'a>(&'a self, prompt: &'a str, temperature: f32) -> GenerateFuture<'a>;
    /// Provider name for logs and diagnostics.
    fn provider_name(&self) -> &'static str;
}

pub type DynGenerator = Arc<dyn TextGenerator>;

/// Factory: build a generator according to config and environment variables.
///
/// * If `AI_TEST_MODE=mock`, returns [`MockGenerator::campaign`].
/// * Else if `config.enabled==false`, returns a disabled generator.
/// * Else builds the configured remote provider.
pub fn build_generator(config: &AiConfig) -> DynGenerator {
    if std::env::var("AI_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Arc::new(MockGenerator::campaign());
    }

    if !config.enabled {
        return Arc::new(DisabledGenerator);
    }

    let built: Result<DynGenerator, reqwest::Error> = match config.provider.as_str() {
        "openai" => OpenAiProvider::new(&config.api_key, config.model.as_deref())
            .map(|p| Arc::new(p) as DynGenerator),
        "gemini" => GeminiProvider::new(&config.api_key, config.model.as_deref())
            .map(|p| Arc::new(p) as DynGenerator),
        other => {
            warn!(provider = other, "unsupported text provider; generation disabled");
            return Arc::new(DisabledGenerator);
        }
    };

    match built {
        Ok(g) => {
            info!(provider = g.provider_name(), "text generator ready");
            g
        }
        Err(e) => {
            warn!(error = %e, "failed to build HTTP client; generation disabled");
            Arc::new(DisabledGenerator)
        }
    }
}

fn http_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(5))
        .timeout(Duration::from_secs(60))
        .build()
}

/* ----------------------------
OpenAI
---------------------------- */

/// OpenAI Chat Completions.
pub struct OpenAiProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiProvider {
    pub fn new(api_key: &str, model: Option<&str>) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: http_client()?,
            api_key: api_key.to_string(),
            model: model.unwrap_or(DEFAULT_OPENAI_MODEL).to_string(),
        })
    }

    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String, CampaignError> {
        if self.api_key.is_empty() {
            return Err(CampaignError::generation("openai", "missing API key"));
        }

        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            #[serde(default)]
            content: Option<String>,
        }

        let req = Req {
            model: &self.model,
            messages: vec![Msg {
                role: "user",
                content: prompt,
            }],
            temperature,
        };

        let resp = self
            .http
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| CampaignError::generation("openai", e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CampaignError::generation("openai", format!("HTTP {status}")));
        }
        let body: Resp = resp
            .json()
            .await
            .map_err(|e| CampaignError::generation("openai", e.to_string()))?;
        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| CampaignError::generation("openai", "empty completion"))
    }
}

impl TextGenerator for OpenAiProvider {
    fn generate<'a>(&'a self, prompt: &'a str, temperature: f32) -> GenerateFuture<'a> {
        Box::pin(self.complete(prompt, temperature))
    }
    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

/* ----------------------------
Gemini
---------------------------- */

/// Google Generative Language `generateContent`.
pub struct GeminiProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiProvider {
    pub fn new(api_key: &str, model: Option<&str>) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: http_client()?,
            api_key: api_key.to_string(),
            model: model.unwrap_or(DEFAULT_GEMINI_MODEL).to_string(),
        })
    }

    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String, CampaignError> {
        if self.api_key.is_empty() {
            return Err(CampaignError::generation("gemini", "missing API key"));
        }

        #[derive(Serialize)]
        struct Part<'a> {
            text: &'a str,
        }
        #[derive(Serialize)]
        struct Content<'a> {
            parts: Vec<Part<'a>>,
        }
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct GenerationConfig {
            temperature: f32,
        }
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Req<'a> {
            contents: Vec<Content<'a>>,
            generation_config: GenerationConfig,
        }
        #[derive(Deserialize)]
        struct Resp {
            #[serde(default)]
            candidates: Vec<Candidate>,
        }
        #[derive(Deserialize)]
        struct Candidate {
            #[serde(default)]
            content: Option<RespContent>,
        }
        #[derive(Deserialize)]
        struct RespContent {
            #[serde(default)]
            parts: Vec<RespPart>,
        }
        #[derive(Deserialize)]
        struct RespPart {
            #[serde(default)]
            text: Option<String>,
        }

        let req = Req {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig { temperature },
        };
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            self.model
        );

        let resp = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| CampaignError::generation("gemini", e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CampaignError::generation("gemini", format!("HTTP {status}")));
        }
        let body: Resp = resp
            .json()
            .await
            .map_err(|e| CampaignError::generation("gemini", e.to_string()))?;

        let text: String = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(CampaignError::generation("gemini", "empty candidate"));
        }
        Ok(text)
    }
}

impl TextGenerator for GeminiProvider {
    fn generate<'a>(&'a self, prompt: &'a str, temperature: f32) -> GenerateFuture<'a> {
        Box::pin(self.complete(prompt, temperature))
    }
    fn provider_name(&self) -> &'static str {
        "gemini"
    }
}

/* ----------------------------
Disabled / mock
---------------------------- */

/// Always fails with [`CampaignError::Disabled`].
pub struct DisabledGenerator;

impl TextGenerator for DisabledGenerator {
    fn generate<'a>(&'a self, _prompt: &'a str, _temperature: f32) -> GenerateFuture<'a> {
        Box::pin(async { Err(CampaignError::Disabled) })
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Replays canned replies in order; the last one repeats.
pub struct MockGenerator {
    replies: Vec<String>,
    calls: AtomicUsize,
}

impl MockGenerator {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: replies.into_iter().map(Into::into).collect(),
            calls: AtomicUsize::new(0),
        }
    }

    /// A fixed, well-formed campaign recommendation.
    pub fn campaign() -> Self {
        Self::new([MOCK_CAMPAIGN])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TextGenerator for MockGenerator {
    fn generate<'a>(&'a self, _prompt: &'a str, _temperature: f32) -> GenerateFuture<'a> {
        let i = self.calls.fetch_add(1, Ordering::SeqCst);
        let out = self
            .replies
            .get(i)
            .or_else(|| self.replies.last())
            .cloned()
            .ok_or_else(|| CampaignError::generation("mock", "no replies configured"));
        Box::pin(async move { out })
    }
    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

const MOCK_CAMPAIGN: &str = r#"{
  "Insights": [
    "Mild weather all week favors foot traffic",
    "Few direct competitors nearby",
    "Low spatial density leaves room to stand out",
    "Competitor reviews are broadly positive",
    "Weekend mornings are the busiest window"
  ],
  "Campaigns": [
    {
      "Campaign Title": "Weekend Warm-Up (mock)",
      "Campaign Description": "Morning specials for the weekend crowd.",
      "Campaign Duration": "This weekend",
      "Discount/Promo": "10% off before noon"
    }
  ]
}"#;

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[tokio::test]
    async fn mock_replays_then_repeats_last() {
        let g = MockGenerator::new(["one", "two"]);
        assert_eq!(g.generate("p", 0.7).await.unwrap(), "one");
        assert_eq!(g.generate("p", 0.8).await.unwrap(), "two");
        assert_eq!(g.generate("p", 0.8).await.unwrap(), "two");
        assert_eq!(g.calls(), 3);
    }

    #[tokio::test]
    async fn empty_mock_errors() {
        let g = MockGenerator::new(Vec::<String>::new());
        assert!(g.generate("p", 0.7).await.is_err());
    }

    #[tokio::test]
    async fn disabled_always_errors() {
        assert!(matches!(
            DisabledGenerator.generate("p", 0.7).await,
            Err(CampaignError::Disabled)
        ));
    }

    #[tokio::test]
    async fn provider_without_key_fails_fast() {
        let g = GeminiProvider::new("", None).unwrap();
        assert!(matches!(
            g.generate("p", 0.7).await,
            Err(CampaignError::Generation { provider: "gemini", .. })
        ));
    }

    #[test]
    #[serial]
    fn factory_respects_test_mode_and_enabled_flag() {
        std::env::remove_var("AI_TEST_MODE");
        let off = AiConfig::default();
        assert_eq!(build_generator(&off).provider_name(), "disabled");

        let on = AiConfig {
            enabled: true,
            provider: "gemini".into(),
            api_key: "k".into(),
            ..AiConfig::default()
        };
        assert_eq!(build_generator(&on).provider_name(), "gemini");

        std::env::set_var("AI_TEST_MODE", "mock");
        assert_eq!(build_generator(&off).provider_name(), "mock");
        std::env::remove_var("AI_TEST_MODE");
    }

    #[test]
    fn mock_campaign_is_valid_json() {
        let v: serde_json::Value = serde_json::from_str(MOCK_CAMPAIGN).unwrap();
        assert_eq!(v["Insights"].as_array().map(Vec::len), Some(5));
    }
}
