use super::{log_completion, log_request, sdk_error, BedrockClient};
use crate::catalog::{ApiFlavor, PromptFormat};
use crate::error::InvocationError;
use crate::invoker::ModelInvoker;
use crate::types::{Completion, InvocationParams, TokenUsage, EMPTY_RESPONSE_TEXT};
use aws_sdk_bedrockruntime::primitives::Blob;
use serde::Deserialize;
use serde_json::json;
use std::time::Instant;

const ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";
const CONTENT_TYPE: &str = "application/json";

/// Invokes models through InvokeModel with per-model JSON bodies
pub struct InvokeModelInvoker {
    client: BedrockClient,
}

impl InvokeModelInvoker {
    pub fn new(client: BedrockClient) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl ModelInvoker for InvokeModelInvoker {
    fn api(&self) -> ApiFlavor {
        ApiFlavor::InvokeModel
    }

    async fn invoke(&self, params: &InvocationParams) -> Result<Completion, InvocationError> {
        let model_id = self.client.model_id(params);
        log_request(self.api(), &model_id, params);

        let body = serde_json::to_vec(&build_request_body(params))
            .map_err(|e| InvocationError::InvalidRequest(e.to_string()))?;

        let started = Instant::now();
        let output = self
            .client
            .client
            .invoke_model()
            .model_id(&model_id)
            .content_type(CONTENT_TYPE)
            .accept(CONTENT_TYPE)
            .body(Blob::new(body))
            .send()
            .await
            .map_err(|e| sdk_error(self.api(), &model_id, e))?;
        let latency = started.elapsed();

        let mut completion = parse_response_body(output.body().as_ref())?;
        completion.latency = latency;
        log_completion(self.api(), &model_id, &completion);

        Ok(completion)
    }
}

/// JSON request body for the model's prompt format
pub fn build_request_body(params: &InvocationParams) -> serde_json::Value {
    match params.model.format {
        PromptFormat::Messages => json!({
            "anthropic_version": ANTHROPIC_VERSION,
            "max_tokens": params.max_tokens,
            "temperature": params.temperature,
            "top_p": params.top_p,
            "messages": [
                {
                    "role": "user",
                    "content": params.prompt,
                }
            ],
        }),
        PromptFormat::TextCompletion => json!({
            "prompt": format!("\n\nHuman: {}\n\nAssistant:", params.prompt),
            "max_tokens_to_sample": params.max_tokens,
            "temperature": params.temperature,
            "top_p": params.top_p,
        }),
    }
}

#[derive(Debug, Deserialize)]
struct ResponseBody {
    #[serde(default)]
    content: Vec<ResponseBlock>,
    #[serde(default)]
    completion: Option<String>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Option<ResponseUsage>,
}

#[derive(Debug, Deserialize)]
struct ResponseBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseUsage {
    input_tokens: u32,
    output_tokens: u32,
}

/// Extract the completion from either response shape
pub fn parse_response_body(body: &[u8]) -> Result<Completion, InvocationError> {
    let response: ResponseBody = serde_json::from_slice(body)
        .map_err(|e| InvocationError::MalformedResponse(e.to_string()))?;

    let text: String = response
        .content
        .iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text.as_deref())
        .collect();

    let text = if !text.is_empty() {
        text
    } else {
        response
            .completion
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| EMPTY_RESPONSE_TEXT.to_string())
    };

    let mut completion = Completion::text(text);
    completion.usage = response
        .usage
        .map(|u| TokenUsage::new(u.input_tokens, u.output_tokens));
    completion.stop_reason = response.stop_reason;
    Ok(completion)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ModelCatalog;
    use crate::types::InvocationRequest;
    use aws_smithy_http_client::test_util::capture_request;
    use aws_smithy_types::body::SdkBody;

    fn params_for(model: &str) -> InvocationParams {
        let catalog = ModelCatalog::for_api(ApiFlavor::InvokeModel);
        let mut request = InvocationRequest::new("Say hi");
        request.model = Some(model.to_string());
        request.max_tokens = Some(100.0);
        request.temperature = Some(0.3);
        request.validate(&catalog).unwrap()
    }

    #[test]
    fn test_messages_body() {
        let body = build_request_body(&params_for("anthropic.claude-3-haiku-20240307-v1:0"));

        assert_eq!(body["anthropic_version"], "bedrock-2023-05-31");
        assert_eq!(body["max_tokens"], 100);
        assert_eq!(body["temperature"], 0.3);
        assert_eq!(body["top_p"], 0.9);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "Say hi");
        assert!(body.get("prompt").is_none());
    }

    #[test]
    fn test_text_completion_body() {
        let body = build_request_body(&params_for("anthropic.claude-v2:1"));

        assert_eq!(body["prompt"], "\n\nHuman: Say hi\n\nAssistant:");
        assert_eq!(body["max_tokens_to_sample"], 100);
        assert_eq!(body["temperature"], 0.3);
        assert_eq!(body["top_p"], 0.9);
        assert!(body.get("messages").is_none());
    }

    #[test]
    fn test_body_serializes_sampling_values_exactly() {
        let body = build_request_body(&params_for("anthropic.claude-3-haiku-20240307-v1:0"));
        let encoded = serde_json::to_string(&body).unwrap();

        assert!(encoded.contains(r#""temperature":0.3"#));
        assert!(encoded.contains(r#""top_p":0.9"#));
    }

    #[tokio::test]
    async fn test_invoke_sends_body_and_parses_reply() {
        let reply = serde_json::json!({
            "type": "message",
            "role": "assistant",
            "content": [{"type": "text", "text": "Connection successful!"}],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 14, "output_tokens": 4}
        });
        let (http_client, request) = capture_request(Some(
            http::Response::builder()
                .status(200)
                .header("content-type", "application/json")
                .body(SdkBody::from(reply.to_string()))
                .unwrap(),
        ));
        let invoker = InvokeModelInvoker::new(BedrockClient::with_http_client(http_client, None));

        let completion = invoker
            .invoke(&params_for("anthropic.claude-3-haiku-20240307-v1:0"))
            .await
            .unwrap();

        assert_eq!(completion.text, "Connection successful!");
        assert_eq!(completion.usage, Some(TokenUsage::new(14, 4)));
        assert_eq!(completion.stop_reason.as_deref(), Some("end_turn"));

        let request = request.expect_request();
        assert!(request
            .uri()
            .contains("/model/anthropic.claude-3-haiku-20240307-v1"));
        let sent: serde_json::Value =
            serde_json::from_slice(request.body().bytes().unwrap()).unwrap();
        assert_eq!(sent, build_request_body(&params_for("anthropic.claude-3-haiku-20240307-v1:0")));
    }

    #[test]
    fn test_parse_messages_response() {
        let body = serde_json::json!({
            "id": "msg_01",
            "type": "message",
            "role": "assistant",
            "content": [
                {"type": "text", "text": "Connection "},
                {"type": "text", "text": "successful!"}
            ],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 12, "output_tokens": 5}
        });

        let completion = parse_response_body(body.to_string().as_bytes()).unwrap();
        assert_eq!(completion.text, "Connection successful!");
        assert_eq!(completion.stop_reason.as_deref(), Some("end_turn"));
        assert_eq!(completion.usage, Some(TokenUsage::new(12, 5)));
        assert_eq!(completion.usage.unwrap().total_tokens, 17);
    }

    #[test]
    fn test_parse_legacy_response() {
        let body = br#"{"completion": " Connection successful!", "stop_reason": "stop_sequence"}"#;

        let completion = parse_response_body(body).unwrap();
        assert_eq!(completion.text, " Connection successful!");
        assert!(completion.usage.is_none());
    }

    #[test]
    fn test_parse_empty_response() {
        let completion = parse_response_body(br#"{"content": []}"#).unwrap();
        assert_eq!(completion.text, EMPTY_RESPONSE_TEXT);
    }

    #[test]
    fn test_parse_malformed_response() {
        let err = parse_response_body(b"not json").unwrap_err();
        assert!(matches!(err, InvocationError::MalformedResponse(_)));
    }
}
