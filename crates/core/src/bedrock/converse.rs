use super::{log_completion, log_request, sdk_error, BedrockClient};
use crate::catalog::ApiFlavor;
use crate::error::InvocationError;
use crate::invoker::ModelInvoker;
use crate::types::{Completion, InvocationParams, TokenUsage, EMPTY_RESPONSE_TEXT};
use aws_sdk_bedrockruntime::types::{
    ContentBlock, ConversationRole, InferenceConfiguration, Message,
};
use std::time::Instant;

/// Invokes models through the Converse API
pub struct ConverseInvoker {
    client: BedrockClient,
}

impl ConverseInvoker {
    pub fn new(client: BedrockClient) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl ModelInvoker for ConverseInvoker {
    fn api(&self) -> ApiFlavor {
        ApiFlavor::Converse
    }

    async fn invoke(&self, params: &InvocationParams) -> Result<Completion, InvocationError> {
        let model_id = self.client.model_id(params);
        log_request(self.api(), &model_id, params);

        let message = Message::builder()
            .role(ConversationRole::User)
            .content(ContentBlock::Text(params.prompt.clone()))
            .build()
            .map_err(|e| InvocationError::InvalidRequest(e.to_string()))?;

        let max_tokens = i32::try_from(params.max_tokens).map_err(|_| {
            InvocationError::InvalidRequest(format!("max_tokens {} is too large", params.max_tokens))
        })?;
        let inference_config = InferenceConfiguration::builder()
            .max_tokens(max_tokens)
            .temperature(params.temperature as f32)
            .top_p(params.top_p as f32)
            .build();

        let started = Instant::now();
        let output = self
            .client
            .client
            .converse()
            .model_id(&model_id)
            .messages(message)
            .inference_config(inference_config)
            .send()
            .await
            .map_err(|e| sdk_error(self.api(), &model_id, e))?;
        let latency = started.elapsed();

        let text = output
            .output()
            .and_then(|o| o.as_message().ok())
            .map(|m| extract_text(m.content()))
            .unwrap_or_else(|| EMPTY_RESPONSE_TEXT.to_string());

        let usage = output.usage().map(|u| TokenUsage {
            input_tokens: u.input_tokens().max(0) as u32,
            output_tokens: u.output_tokens().max(0) as u32,
            total_tokens: u.total_tokens().max(0) as u32,
        });

        let completion = Completion {
            text,
            usage,
            stop_reason: Some(output.stop_reason().as_str().to_string()),
            latency,
        };
        log_completion(self.api(), &model_id, &completion);

        Ok(completion)
    }
}

/// Concatenate the text blocks of an assistant message
fn extract_text(blocks: &[ContentBlock]) -> String {
    let text: String = blocks
        .iter()
        .filter_map(|block| block.as_text().ok())
        .map(String::as_str)
        .collect();

    if text.is_empty() {
        EMPTY_RESPONSE_TEXT.to_string()
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ModelCatalog;
    use crate::types::InvocationRequest;
    use aws_smithy_http_client::test_util::capture_request;
    use aws_smithy_types::body::SdkBody;

    fn params() -> InvocationParams {
        let catalog = ModelCatalog::for_api(ApiFlavor::Converse);
        let mut request = InvocationRequest::new("Say hi");
        request.model = Some("anthropic.claude-3-5-haiku-20241022-v1:0".to_string());
        request.max_tokens = Some(100.0);
        request.validate(&catalog).unwrap()
    }

    fn json_response(body: serde_json::Value) -> http::Response<SdkBody> {
        http::Response::builder()
            .status(200)
            .header("content-type", "application/json")
            .body(SdkBody::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_invoke_maps_converse_output() {
        let (http_client, request) = capture_request(Some(json_response(serde_json::json!({
            "output": {
                "message": {
                    "role": "assistant",
                    "content": [{"text": "Hi "}, {"text": "there"}]
                }
            },
            "stopReason": "max_tokens",
            "usage": {"inputTokens": 12, "outputTokens": -3, "totalTokens": 9},
            "metrics": {"latencyMs": 42}
        }))));
        let invoker = ConverseInvoker::new(BedrockClient::with_http_client(http_client, Some("us")));

        let completion = invoker.invoke(&params()).await.unwrap();

        assert_eq!(completion.text, "Hi there");
        assert_eq!(completion.stop_reason.as_deref(), Some("max_tokens"));
        // negative counts from upstream are clamped
        assert_eq!(
            completion.usage,
            Some(TokenUsage {
                input_tokens: 12,
                output_tokens: 0,
                total_tokens: 9,
            })
        );

        let request = request.expect_request();
        assert!(request
            .uri()
            .contains("/model/us.anthropic.claude-3-5-haiku-20241022-v1"));
        let sent: serde_json::Value =
            serde_json::from_slice(request.body().bytes().unwrap()).unwrap();
        assert_eq!(sent["messages"][0]["role"], "user");
        assert_eq!(sent["messages"][0]["content"][0]["text"], "Say hi");
        assert_eq!(sent["inferenceConfig"]["maxTokens"], 100);
    }

    #[tokio::test]
    async fn test_oversized_max_tokens_is_rejected_locally() {
        let (http_client, request) = capture_request(None);
        let invoker = ConverseInvoker::new(BedrockClient::with_http_client(http_client, None));
        let mut params = params();
        params.max_tokens = u32::MAX;

        let err = invoker.invoke(&params).await.unwrap_err();

        assert_eq!(err.kind(), "invalid_request");
        request.expect_no_request();
    }

    #[test]
    fn test_extract_text_joins_text_blocks() {
        let blocks = vec![
            ContentBlock::Text("Hello, ".to_string()),
            ContentBlock::Text("world!".to_string()),
        ];
        assert_eq!(extract_text(&blocks), "Hello, world!");
    }

    #[test]
    fn test_extract_text_empty() {
        assert_eq!(extract_text(&[]), EMPTY_RESPONSE_TEXT);
        assert_eq!(
            extract_text(&[ContentBlock::Text(String::new())]),
            EMPTY_RESPONSE_TEXT
        );
    }
}
