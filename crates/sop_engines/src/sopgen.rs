#![forbid(unsafe_code)]

use std::env;
use std::fmt;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use sop_kernel_contracts::sopgen::{
    disabled_placeholder, SopGenMode, SopGenModelConfig, SOPGEN_ERROR_MARKER,
    SOPGEN_SYSTEM_PROMPT,
};
use sop_kernel_contracts::{ContractViolation, Validate};
use tracing::{info, warn};

const PROVIDER: &str = "openai";
const DEFAULT_CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TIMEOUT_MS: u32 = 30_000;
const DEFAULT_USER_AGENT: &str = "sop-engines/1.0";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeneratorError {
    #[error("text generator config invalid: {0}")]
    Config(#[from] ContractViolation),
    #[error("invalid proxy url")]
    InvalidProxy,
    #[error("{}", safe_detail(.kind, .http_status))]
    Upstream {
        kind: &'static str,
        http_status: Option<u16>,
    },
    #[error("provider=openai error=malformed_response")]
    MalformedResponse,
}

fn safe_detail(kind: &str, http_status: &Option<u16>) -> String {
    match http_status {
        Some(status) => format!("provider={PROVIDER} error={kind} status={status}"),
        None => format!("provider={PROVIDER} error={kind}"),
    }
}

/// Everything needed to pick and build a text generator.
#[derive(Clone, PartialEq, Eq)]
pub struct SopGenProviderConfig {
    pub api_key: Option<String>,
    pub model: SopGenModelConfig,
    pub proxy_url: Option<String>,
}

impl SopGenProviderConfig {
    pub fn from_env() -> Self {
        Self::from_env_var_map(|key| env::var(key).ok())
    }

    pub fn from_env_var_map<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).and_then(trim_non_empty);
        Self {
            api_key: non_empty("OPENAI_API_KEY"),
            model: SopGenModelConfig {
                endpoint: non_empty("OPENAI_CHAT_COMPLETIONS_URL")
                    .unwrap_or_else(|| DEFAULT_CHAT_COMPLETIONS_URL.to_string()),
                model: non_empty("OPENAI_SOP_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                timeout_ms: non_empty("SOP_AI_TIMEOUT_MS")
                    .and_then(|v| v.parse::<u32>().ok())
                    .filter(|v| (100..=120_000).contains(v))
                    .unwrap_or(DEFAULT_TIMEOUT_MS),
                user_agent: non_empty("SOP_AI_USER_AGENT")
                    .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            },
            proxy_url: non_empty("SOP_AI_PROXY_URL"),
        }
    }
}

impl fmt::Debug for SopGenProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SopGenProviderConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("proxy_url", &self.proxy_url)
            .finish()
    }
}

fn trim_non_empty(v: String) -> Option<String> {
    let t = v.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}

/// Turns free-form text into an SOP. The variant is fixed when the runtime is built.
#[derive(Debug, Clone)]
pub enum TextGenerator {
    Disabled,
    Live(LiveSopGenerator),
}

impl TextGenerator {
    /// `Live` when an API key is configured, `Disabled` otherwise.
    pub fn from_provider_config(config: SopGenProviderConfig) -> Result<Self, GeneratorError> {
        match config.api_key {
            Some(api_key) => {
                let generator = LiveSopGenerator::new(api_key, config.model, config.proxy_url)?;
                info!(model = %generator.model.model, "sop text generator live");
                Ok(Self::Live(generator))
            }
            None => {
                info!("OPENAI_API_KEY not set; sop text generator disabled");
                Ok(Self::Disabled)
            }
        }
    }

    pub fn mode(&self) -> SopGenMode {
        match self {
            Self::Disabled => SopGenMode::Disabled,
            Self::Live(_) => SopGenMode::Live,
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Live(_))
    }

    /// Never fails: a disabled generator answers with a placeholder and an
    /// upstream failure collapses to the error marker.
    pub fn generate_sop(&self, raw_text: &str) -> String {
        match self {
            Self::Disabled => {
                warn!("sop text generator disabled; returning placeholder");
                disabled_placeholder(raw_text)
            }
            Self::Live(generator) => match generator.try_generate(raw_text) {
                Ok(sop) => sop,
                Err(err) => {
                    warn!(detail = %err, "sop generation failed");
                    SOPGEN_ERROR_MARKER.to_string()
                }
            },
        }
    }
}

#[derive(Clone)]
pub struct LiveSopGenerator {
    api_key: String,
    model: SopGenModelConfig,
    proxy_url: Option<String>,
    response_fixture_json: Option<String>,
}

impl fmt::Debug for LiveSopGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveSopGenerator")
            .field("model", &self.model)
            .field("proxy_url", &self.proxy_url)
            .field("fixture", &self.response_fixture_json.is_some())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl LiveSopGenerator {
    pub fn new(
        api_key: String,
        model: SopGenModelConfig,
        proxy_url: Option<String>,
    ) -> Result<Self, GeneratorError> {
        model.validate()?;
        if let Some(url) = proxy_url.as_deref() {
            ureq::Proxy::new(url).map_err(|_| GeneratorError::InvalidProxy)?;
        }
        Ok(Self {
            api_key,
            model,
            proxy_url,
            response_fixture_json: None,
        })
    }

    /// Answers from a canned response body instead of calling the provider.
    pub fn with_response_fixture(mut self, body: impl Into<String>) -> Self {
        self.response_fixture_json = Some(body.into());
        self
    }

    pub fn model_config(&self) -> &SopGenModelConfig {
        &self.model
    }

    pub fn try_generate(&self, raw_text: &str) -> Result<String, GeneratorError> {
        let payload = ChatCompletionRequest {
            model: &self.model.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SOPGEN_SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: raw_text,
                },
            ],
        };
        let body: Value = match self.response_fixture_json.as_deref() {
            Some(fixture) => {
                serde_json::from_str(fixture).map_err(|_| GeneratorError::MalformedResponse)?
            }
            None => self.post_chat_completion(&payload)?,
        };
        extract_completion_text(&body).ok_or(GeneratorError::MalformedResponse)
    }

    fn post_chat_completion(
        &self,
        payload: &ChatCompletionRequest<'_>,
    ) -> Result<Value, GeneratorError> {
        let agent = self.build_http_agent()?;
        let response = agent
            .post(&self.model.endpoint)
            .set("Content-Type", "application/json")
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .set("Accept", "application/json")
            .send_json(payload)
            .map_err(generator_error_from_ureq)?;
        serde_json::from_reader(response.into_reader())
            .map_err(|_| GeneratorError::MalformedResponse)
    }

    fn build_http_agent(&self) -> Result<ureq::Agent, GeneratorError> {
        let timeout = Duration::from_millis(u64::from(self.model.timeout_ms).max(100));
        let mut builder = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout_read(timeout)
            .timeout_write(timeout)
            .user_agent(&self.model.user_agent)
            .try_proxy_from_env(self.proxy_url.is_none());
        if let Some(url) = self.proxy_url.as_deref() {
            let proxy = ureq::Proxy::new(url).map_err(|_| GeneratorError::InvalidProxy)?;
            builder = builder.proxy(proxy);
        }
        Ok(builder.build())
    }
}

fn extract_completion_text(body: &Value) -> Option<String> {
    body.pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

fn generator_error_from_ureq(err: ureq::Error) -> GeneratorError {
    match err {
        ureq::Error::Status(status, _) => GeneratorError::Upstream {
            kind: "http_non_200",
            http_status: Some(status),
        },
        ureq::Error::Transport(transport) => {
            let combined = format!("{:?} {}", transport.kind(), transport);
            GeneratorError::Upstream {
                kind: classify_transport_error_kind(&combined),
                http_status: None,
            }
        }
    }
}

fn classify_transport_error_kind(raw: &str) -> &'static str {
    let lower = raw.to_ascii_lowercase();
    if lower.contains("timeout") || lower.contains("timed out") {
        "timeout"
    } else if lower.contains("tls") || lower.contains("ssl") {
        "tls"
    } else if lower.contains("dns") {
        "dns"
    } else if lower.contains("connection") || lower.contains("connect") {
        "connection"
    } else {
        "transport"
    }
}
