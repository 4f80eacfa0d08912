// Claude model catalog for the two Bedrock invocation APIs

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};

/// Which Bedrock runtime API a server instance talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ApiFlavor {
    /// Unified request/response format
    #[default]
    Converse,
    /// Per-model JSON bodies
    InvokeModel,
}

impl ApiFlavor {
    /// Label used in user-facing messages
    pub fn label(&self) -> &'static str {
        match self {
            Self::Converse => "Converse API",
            Self::InvokeModel => "InvokeModel API",
        }
    }
}

impl std::fmt::Display for ApiFlavor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Converse => write!(f, "converse"),
            Self::InvokeModel => write!(f, "invoke_model"),
        }
    }
}

impl std::str::FromStr for ApiFlavor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "converse" => Ok(Self::Converse),
            "invoke_model" | "invokemodel" | "invoke" => Ok(Self::InvokeModel),
            other => Err(format!(
                "unknown API flavor '{}' (expected 'converse' or 'invoke_model')",
                other
            )),
        }
    }
}

/// Request body shape a model expects on InvokeModel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptFormat {
    /// Anthropic Messages API body
    Messages,
    /// Legacy `Human:`/`Assistant:` text completion body
    TextCompletion,
}

/// A Claude model known to this server
#[derive(Debug, PartialEq, Eq)]
pub struct ModelInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub format: PromptFormat,
    pub apis: &'static [ApiFlavor],
}

impl ModelInfo {
    pub fn supports(&self, api: ApiFlavor) -> bool {
        self.apis.contains(&api)
    }
}

const BOTH: &[ApiFlavor] = &[ApiFlavor::Converse, ApiFlavor::InvokeModel];
const INVOKE_ONLY: &[ApiFlavor] = &[ApiFlavor::InvokeModel];

/// Every model the server knows about, newest first
pub static MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: "anthropic.claude-opus-4-1-20250805-v1:0",
        name: "Claude Opus 4.1",
        format: PromptFormat::Messages,
        apis: BOTH,
    },
    ModelInfo {
        id: "anthropic.claude-sonnet-4-20250514-v1:0",
        name: "Claude Sonnet 4",
        format: PromptFormat::Messages,
        apis: BOTH,
    },
    ModelInfo {
        id: "anthropic.claude-opus-4-20250514-v1:0",
        name: "Claude Opus 4",
        format: PromptFormat::Messages,
        apis: BOTH,
    },
    ModelInfo {
        id: "anthropic.claude-3-7-sonnet-20250219-v1:0",
        name: "Claude 3.7 Sonnet",
        format: PromptFormat::Messages,
        apis: BOTH,
    },
    ModelInfo {
        id: "anthropic.claude-3-5-sonnet-20241022-v2:0",
        name: "Claude 3.5 Sonnet v2",
        format: PromptFormat::Messages,
        apis: BOTH,
    },
    ModelInfo {
        id: "anthropic.claude-3-5-sonnet-20240620-v1:0",
        name: "Claude 3.5 Sonnet v1",
        format: PromptFormat::Messages,
        apis: BOTH,
    },
    ModelInfo {
        id: "anthropic.claude-3-5-haiku-20241022-v1:0",
        name: "Claude 3.5 Haiku",
        format: PromptFormat::Messages,
        apis: BOTH,
    },
    ModelInfo {
        id: "anthropic.claude-3-haiku-20240307-v1:0",
        name: "Claude 3 Haiku",
        format: PromptFormat::Messages,
        apis: BOTH,
    },
    ModelInfo {
        id: "anthropic.claude-3-sonnet-20240229-v1:0",
        name: "Claude 3 Sonnet",
        format: PromptFormat::Messages,
        apis: INVOKE_ONLY,
    },
    ModelInfo {
        id: "anthropic.claude-3-opus-20240229-v1:0",
        name: "Claude 3 Opus",
        format: PromptFormat::Messages,
        apis: INVOKE_ONLY,
    },
    ModelInfo {
        id: "anthropic.claude-v2:1",
        name: "Claude 2.1",
        format: PromptFormat::TextCompletion,
        apis: INVOKE_ONLY,
    },
    ModelInfo {
        id: "anthropic.claude-instant-v1",
        name: "Claude Instant",
        format: PromptFormat::TextCompletion,
        apis: INVOKE_ONLY,
    },
];

/// Look up a model by id across the whole table
pub fn find_model(id: &str) -> Option<&'static ModelInfo> {
    MODELS.iter().find(|m| m.id == id)
}

/// Human-readable name for logging, falling back to the raw id
pub fn display_name(id: &str) -> &str {
    find_model(id).map(|m| m.name).unwrap_or(id)
}

/// The set of models advertised for one API flavor
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    api: ApiFlavor,
    models: Vec<&'static ModelInfo>,
    default_model: &'static ModelInfo,
}

impl ModelCatalog {
    pub fn for_api(api: ApiFlavor) -> Self {
        let models: Vec<&'static ModelInfo> = MODELS.iter().filter(|m| m.supports(api)).collect();
        // MODELS is non-empty for both flavors and opens with Opus 4.1
        let default_model = models[0];
        Self {
            api,
            models,
            default_model,
        }
    }

    /// Replace the default model; it must be part of this catalog
    pub fn with_default(mut self, id: &str) -> Result<Self, ValidationError> {
        self.default_model = self.lookup(id)?;
        Ok(self)
    }

    pub fn api(&self) -> ApiFlavor {
        self.api
    }

    pub fn models(&self) -> &[&'static ModelInfo] {
        &self.models
    }

    pub fn default_model(&self) -> &'static ModelInfo {
        self.default_model
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.models.iter().map(|m| m.id).collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.models.iter().any(|m| m.id == id)
    }

    /// Resolve an optional requested model id against this catalog
    pub fn resolve(&self, requested: Option<&str>) -> Result<&'static ModelInfo, ValidationError> {
        match requested {
            None => Ok(self.default_model),
            Some(id) => self.lookup(id),
        }
    }

    fn lookup(&self, id: &str) -> Result<&'static ModelInfo, ValidationError> {
        self.models
            .iter()
            .copied()
            .find(|m| m.id == id)
            .ok_or_else(|| ValidationError::UnknownModel {
                model: id.to_string(),
                api: self.api,
            })
    }
}
