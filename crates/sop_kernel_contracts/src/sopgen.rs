#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::common::{ContractViolation, Validate};

pub const SOPGEN_SYSTEM_PROMPT: &str = "You are an SOP generator.";
pub const SOPGEN_ERROR_MARKER: &str = "AI error — unable to generate SOP.";

pub fn disabled_placeholder(raw_text: &str) -> String {
    format!("AI is disabled. You entered: \"{raw_text}\"")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SopGenerateRequest {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SopGenerateResponse {
    pub sop: String,
}

/// Which text generator variant was selected at composition time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SopGenMode {
    Disabled,
    Live,
}

impl SopGenMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Live => "live",
        }
    }
}

/// Chat-completion settings for the live generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SopGenModelConfig {
    pub endpoint: String,
    pub model: String,
    pub timeout_ms: u32,
    pub user_agent: String,
}

impl Validate for SopGenModelConfig {
    fn validate(&self) -> Result<(), ContractViolation> {
        if !(self.endpoint.starts_with("https://") || self.endpoint.starts_with("http://")) {
            return Err(ContractViolation::InvalidValue {
                field: "sopgen_model_config.endpoint",
                reason: "must be an http(s) url",
            });
        }
        if self.model.trim().is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "sopgen_model_config.model",
                reason: "must not be empty",
            });
        }
        if self.timeout_ms == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "sopgen_model_config.timeout_ms",
                reason: "must be > 0",
            });
        }
        Ok(())
    }
}
