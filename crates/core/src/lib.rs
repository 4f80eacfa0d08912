// Core types and Bedrock invocation for the Bedrock MCP adapter

pub mod bedrock;
pub mod catalog;
pub mod config;
pub mod error;
pub mod invoker;
pub mod probe;
pub mod types;

pub use catalog::{ApiFlavor, ModelCatalog, ModelInfo, PromptFormat};
pub use config::BedrockConfig;
pub use error::{InvocationError, ValidationError};
pub use invoker::ModelInvoker;
pub use types::*;
