//! AWS Bedrock runtime invokers.
//!
//! Both invokers share one SDK client and translate SDK errors through
//! [`InvocationError::classify`].

mod converse;
mod invoke_model;

pub use converse::ConverseInvoker;
pub use invoke_model::{build_request_body, parse_response_body, InvokeModelInvoker};

use crate::catalog::ApiFlavor;
use crate::config::BedrockConfig;
use crate::error::InvocationError;
use crate::invoker::ModelInvoker;
use crate::types::{preview, Completion, InvocationParams};
use aws_sdk_bedrockruntime::config::http::HttpResponse;
use aws_sdk_bedrockruntime::config::Region;
use aws_sdk_bedrockruntime::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_bedrockruntime::operation::RequestId;
use std::sync::Arc;

const PROMPT_PREVIEW_CHARS: usize = 150;
const RESPONSE_PREVIEW_CHARS: usize = 200;

/// Shared Bedrock runtime client
#[derive(Clone, Debug)]
pub struct BedrockClient {
    client: aws_sdk_bedrockruntime::Client,
    inference_profile: Option<String>,
}

impl BedrockClient {
    /// Resolve credentials and region through the standard AWS provider chain
    pub async fn connect(config: &BedrockConfig) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));
        if let Some(profile) = &config.profile {
            loader = loader.profile_name(profile);
        }
        let sdk_config = loader.load().await;

        tracing::info!(
            region = %config.region,
            profile = config.profile.as_deref().unwrap_or("default"),
            inference_profile = config.inference_profile.as_deref().unwrap_or("none"),
            "Initialized Bedrock runtime client"
        );

        Self {
            client: aws_sdk_bedrockruntime::Client::new(&sdk_config),
            inference_profile: config.inference_profile.clone(),
        }
    }

    /// Build the invoker for an API flavor
    pub fn invoker(&self, api: ApiFlavor) -> Arc<dyn ModelInvoker> {
        match api {
            ApiFlavor::Converse => Arc::new(ConverseInvoker::new(self.clone())),
            ApiFlavor::InvokeModel => Arc::new(InvokeModelInvoker::new(self.clone())),
        }
    }

    fn model_id(&self, params: &InvocationParams) -> String {
        params.model_id(self.inference_profile.as_deref())
    }
}

fn log_request(api: ApiFlavor, model_id: &str, params: &InvocationParams) {
    tracing::info!(
        api = api.label(),
        model = %model_id,
        model_name = params.model.name,
        max_tokens = params.max_tokens,
        temperature = params.temperature,
        top_p = params.top_p,
        "Invoking model"
    );
    tracing::debug!(prompt = %preview(&params.prompt, PROMPT_PREVIEW_CHARS), "Prompt preview");
}

fn log_completion(api: ApiFlavor, model_id: &str, completion: &Completion) {
    let usage = completion.usage.unwrap_or_default();
    tracing::info!(
        api = api.label(),
        model = %model_id,
        latency_ms = completion.latency.as_millis() as u64,
        response_chars = completion.text.chars().count(),
        input_tokens = usage.input_tokens,
        output_tokens = usage.output_tokens,
        total_tokens = usage.total_tokens,
        stop_reason = completion.stop_reason.as_deref().unwrap_or("unknown"),
        "Model responded"
    );
    tracing::debug!(
        response = %preview(&completion.text, RESPONSE_PREVIEW_CHARS),
        "Response preview"
    );
}

/// Convert an SDK failure into a classified invocation error
fn sdk_error<E>(api: ApiFlavor, model_id: &str, err: SdkError<E, HttpResponse>) -> InvocationError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    let status = err.raw_response().map(|response| response.status().as_u16());
    let code = err.code().map(str::to_string);
    let request_id = err.request_id().map(str::to_string);
    let message = err
        .message()
        .map(str::to_string)
        .unwrap_or_else(|| DisplayErrorContext(&err).to_string());

    let error = InvocationError::classify(code.as_deref(), status, message);
    tracing::error!(
        api = api.label(),
        model = %model_id,
        kind = error.kind(),
        code = code.as_deref().unwrap_or("none"),
        status = status.unwrap_or_default(),
        request_id = request_id.as_deref().unwrap_or("none"),
        error = %error,
        "Model invocation failed"
    );
    error
}

#[cfg(test)]
impl BedrockClient {
    /// Client that sends every request to `http_client` with static credentials
    pub(crate) fn with_http_client(
        http_client: impl aws_sdk_bedrockruntime::config::HttpClient + 'static,
        inference_profile: Option<&str>,
    ) -> Self {
        let config = aws_sdk_bedrockruntime::Config::builder()
            .behavior_version(aws_sdk_bedrockruntime::config::BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(aws_sdk_bedrockruntime::config::Credentials::new(
                "AKIDTEST", "secret", None, None, "test",
            ))
            .http_client(http_client)
            .build();

        Self {
            client: aws_sdk_bedrockruntime::Client::from_conf(config),
            inference_profile: inference_profile.map(str::to_string),
        }
    }
}
