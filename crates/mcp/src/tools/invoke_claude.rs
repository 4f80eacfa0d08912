// The invoke_claude tool: one MCP tool call mapped to one Bedrock invocation

use crate::protocol::{CallToolResult, ToolSchema};
use crate::tools::{json_schema_enum, json_schema_number, json_schema_object, json_schema_string, Tool};
use anyhow::Result;
use bedrock_mcp_core::catalog::{display_name, ModelCatalog};
use bedrock_mcp_core::{
    InvocationRequest, ModelInvoker, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, DEFAULT_TOP_P,
    MAX_TOKENS_LIMIT,
};
use std::sync::Arc;

pub const TOOL_NAME: &str = "invoke_claude";

/// Sends a prompt to a Claude model on Bedrock and returns the completion text
pub struct InvokeClaudeTool {
    invoker: Arc<dyn ModelInvoker>,
    catalog: ModelCatalog,
}

impl InvokeClaudeTool {
    pub fn new(invoker: Arc<dyn ModelInvoker>, catalog: ModelCatalog) -> Self {
        Self { invoker, catalog }
    }
}

#[async_trait::async_trait]
impl Tool for InvokeClaudeTool {
    fn schema(&self) -> ToolSchema {
        let api = self.invoker.api();
        ToolSchema {
            name: TOOL_NAME.to_string(),
            description: format!("Invoke Claude models using AWS Bedrock {}", api.label()),
            input_schema: json_schema_object(
                serde_json::json!({
                    "prompt": json_schema_string("The prompt to send to Claude"),
                    "model": json_schema_enum(
                        "The Claude model to use",
                        &self.catalog.ids(),
                        self.catalog.default_model().id,
                    ),
                    "max_tokens": json_schema_number(
                        "Maximum tokens to generate",
                        DEFAULT_MAX_TOKENS as f64,
                        1.0,
                        MAX_TOKENS_LIMIT as f64,
                    ),
                    "temperature": json_schema_number(
                        "Sampling temperature (0.0 to 1.0)",
                        DEFAULT_TEMPERATURE,
                        0.0,
                        1.0,
                    ),
                    "top_p": json_schema_number(
                        "Top-p sampling (0.0 to 1.0)",
                        DEFAULT_TOP_P,
                        0.0,
                        1.0,
                    ),
                }),
                vec!["prompt"],
            ),
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<CallToolResult> {
        let api = self.invoker.api();

        let arguments = if arguments.is_null() {
            serde_json::json!({})
        } else {
            arguments
        };
        let request: InvocationRequest = match serde_json::from_value(arguments) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, "Rejected malformed {} arguments", TOOL_NAME);
                return Ok(CallToolResult::error(format!(
                    "Invalid arguments for {}: {}",
                    TOOL_NAME, e
                )));
            }
        };

        let params = match request.validate(&self.catalog) {
            Ok(params) => params,
            Err(e) => {
                tracing::warn!(error = %e, "Rejected {} arguments", TOOL_NAME);
                return Ok(CallToolResult::error(e.to_string()));
            }
        };

        tracing::info!(
            model = params.model.id,
            model_name = display_name(params.model.id),
            prompt_chars = params.prompt.chars().count(),
            "Calling model via {}",
            api.label()
        );

        match self.invoker.invoke(&params).await {
            Ok(completion) => Ok(CallToolResult::text(completion.text)),
            Err(e) => Ok(CallToolResult::error(e.user_message(api))),
        }
    }
}
