// Invocation request/response types

use crate::catalog::{ModelCatalog, ModelInfo};
use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_MAX_TOKENS: u32 = 4096;
pub const MAX_TOKENS_LIMIT: u32 = 8192;
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_TOP_P: f64 = 0.9;

/// Text returned when Bedrock answers without any text content
pub const EMPTY_RESPONSE_TEXT: &str = "No response received";

/// Raw `invoke_claude` arguments as sent by the MCP client
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvocationRequest {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub max_tokens: Option<f64>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub top_p: Option<f64>,
}

impl InvocationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: Some(prompt.into()),
            ..Default::default()
        }
    }

    /// Apply defaults and bounds, resolving the model against `catalog`
    pub fn validate(&self, catalog: &ModelCatalog) -> Result<InvocationParams, ValidationError> {
        let prompt = self.prompt.as_deref().ok_or(ValidationError::MissingPrompt)?;
        if prompt.trim().is_empty() {
            return Err(ValidationError::EmptyPrompt);
        }

        let model = catalog.resolve(self.model.as_deref())?;

        let max_tokens = match self.max_tokens {
            None => DEFAULT_MAX_TOKENS,
            Some(value) => {
                check_range("max_tokens", value, 1.0, MAX_TOKENS_LIMIT as f64)?;
                if value.fract() != 0.0 {
                    return Err(ValidationError::NotAnInteger {
                        field: "max_tokens",
                        value,
                    });
                }
                value as u32
            }
        };

        let temperature = self.temperature.unwrap_or(DEFAULT_TEMPERATURE);
        check_range("temperature", temperature, 0.0, 1.0)?;

        let top_p = self.top_p.unwrap_or(DEFAULT_TOP_P);
        check_range("top_p", top_p, 0.0, 1.0)?;

        Ok(InvocationParams {
            prompt: prompt.to_string(),
            model,
            max_tokens,
            temperature,
            top_p,
        })
    }
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ValidationError> {
    // NaN fails both comparisons and is rejected too
    if value >= min && value <= max {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

/// A validated invocation ready to send upstream
#[derive(Debug, Clone)]
pub struct InvocationParams {
    pub prompt: String,
    pub model: &'static ModelInfo,
    pub max_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
}

impl InvocationParams {
    /// Model id sent to Bedrock, routed through a cross-region inference profile if given
    pub fn model_id(&self, inference_profile: Option<&str>) -> String {
        match inference_profile {
            Some(profile) if !profile.is_empty() => {
                format!("{}.{}", profile.trim_end_matches('.'), self.model.id)
            }
            _ => self.model.id.to_string(),
        }
    }
}

/// Token accounting reported by Bedrock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
        }
    }
}

/// Generated completion for one invocation
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub usage: Option<TokenUsage>,
    pub stop_reason: Option<String>,
    pub latency: Duration,
}

impl Completion {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: None,
            stop_reason: None,
            latency: Duration::ZERO,
        }
    }
}

/// Truncate `text` to at most `max_chars` characters for log output
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
