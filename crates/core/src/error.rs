//! Error types for parameter validation and upstream invocation.

use crate::catalog::ApiFlavor;

/// Tool arguments that cannot be turned into an invocation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Missing required argument 'prompt'")]
    MissingPrompt,

    #[error("Argument 'prompt' must not be empty")]
    EmptyPrompt,

    #[error("Unknown model '{model}' for the {}", .api.label())]
    UnknownModel { model: String, api: ApiFlavor },

    #[error("Argument '{field}' must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Argument '{field}' must be a whole number, got {value}")]
    NotAnInteger { field: &'static str, value: f64 },
}

/// A failed model invocation, classified by what the user can do about it.
#[derive(Debug, thiserror::Error)]
pub enum InvocationError {
    /// Bedrock rejected the request shape or model id.
    #[error("{0}")]
    Validation(String),

    /// The account has no access to the model.
    #[error("{0}")]
    AccessDenied(String),

    /// The model does not exist in this region.
    #[error("{0}")]
    ResourceNotFound(String),

    /// Rate limited (HTTP 429).
    #[error("{0}")]
    Throttled(String),

    /// Any other service-side error.
    #[error("{message}")]
    Service {
        code: Option<String>,
        status: Option<u16>,
        message: String,
    },

    /// The request never produced a service response (credentials, network, timeouts).
    #[error("{0}")]
    Transport(String),

    /// The request could not be assembled locally.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The response body could not be interpreted.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl InvocationError {
    /// Map an upstream error code and HTTP status to a category.
    pub fn classify(code: Option<&str>, status: Option<u16>, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            Some("ValidationException") => Self::Validation(message),
            Some("AccessDeniedException") => Self::AccessDenied(message),
            Some("ResourceNotFoundException") => Self::ResourceNotFound(message),
            Some("ThrottlingException") | Some("TooManyRequestsException") => {
                Self::Throttled(message)
            }
            _ if status == Some(429) => Self::Throttled(message),
            None if status.is_none() => Self::Transport(message),
            _ => Self::Service {
                code: code.map(str::to_string),
                status,
                message,
            },
        }
    }

    /// Short name of the category for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::AccessDenied(_) => "access_denied",
            Self::ResourceNotFound(_) => "resource_not_found",
            Self::Throttled(_) => "throttled",
            Self::Service { .. } => "service",
            Self::Transport(_) => "transport",
            Self::InvalidRequest(_) => "invalid_request",
            Self::MalformedResponse(_) => "malformed_response",
        }
    }

    /// Hint shown to the user after the error message.
    pub fn tip(&self, api: ApiFlavor) -> Option<String> {
        match self {
            Self::Validation(_) => Some(format!(
                "Tip: Check if the model ID is correct and supports the {}.",
                api.label()
            )),
            Self::AccessDenied(_) => Some(
                "Tip: You may need to request access to this model in the AWS Bedrock console."
                    .to_string(),
            ),
            Self::ResourceNotFound(_) => Some(
                "Tip: This model might not be available in your region. Try a different model."
                    .to_string(),
            ),
            Self::Throttled(_) => {
                Some("Tip: Rate limit exceeded. Try again in a moment.".to_string())
            }
            _ => None,
        }
    }

    /// Full message returned to the MCP client.
    pub fn user_message(&self, api: ApiFlavor) -> String {
        let mut message = format!("Error with {}: {}", api.label(), self);
        if let Some(tip) = self.tip(api) {
            message.push_str("\n\n");
            message.push_str(&tip);
        }
        message
    }
}
