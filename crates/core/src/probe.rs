// Model availability probe: try models one at a time and report which respond

use crate::catalog::ModelInfo;
use crate::invoker::ModelInvoker;
use crate::types::{preview, InvocationParams};

pub const DEFAULT_PROBE_PROMPT: &str = "Hello! Please respond with 'Connection successful!'";

/// Settings for a probe run
#[derive(Debug, Clone)]
pub struct ProbeOptions {
    pub prompt: String,
    pub max_tokens: u32,
    /// Stop after the first model that answers
    pub stop_at_first: bool,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROBE_PROMPT.to_string(),
            max_tokens: 50,
            stop_at_first: false,
        }
    }
}

/// Result of probing a single model
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    pub model_id: &'static str,
    pub model_name: &'static str,
    /// Response preview on success, user-facing error message on failure
    pub result: Result<String, String>,
}

impl ProbeOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Probe `models` sequentially with a short prompt
pub async fn probe_models(
    invoker: &dyn ModelInvoker,
    models: &[&'static ModelInfo],
    options: &ProbeOptions,
) -> Vec<ProbeOutcome> {
    let mut outcomes = Vec::with_capacity(models.len());

    for &model in models {
        tracing::info!(model = model.id, "Probing model");

        let params = InvocationParams {
            prompt: options.prompt.clone(),
            model,
            max_tokens: options.max_tokens,
            temperature: 0.1,
            top_p: 1.0,
        };

        let result = match invoker.invoke(&params).await {
            Ok(completion) => Ok(preview(completion.text.trim(), 80)),
            Err(e) => Err(e.user_message(invoker.api())),
        };

        let success = result.is_ok();
        outcomes.push(ProbeOutcome {
            model_id: model.id,
            model_name: model.name,
            result,
        });

        if success && options.stop_at_first {
            break;
        }
    }

    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ApiFlavor, ModelCatalog};
    use crate::error::InvocationError;
    use crate::types::Completion;
    use std::sync::Mutex;

    /// Answers only for the listed model ids, records every call
    struct SelectiveInvoker {
        available: Vec<&'static str>,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl ModelInvoker for SelectiveInvoker {
        fn api(&self) -> ApiFlavor {
            ApiFlavor::InvokeModel
        }

        async fn invoke(&self, params: &InvocationParams) -> Result<Completion, InvocationError> {
            self.calls.lock().unwrap().push(params.model.id.to_string());
            if self.available.contains(&params.model.id) {
                Ok(Completion::text(" Connection successful! "))
            } else {
                Err(InvocationError::AccessDenied(
                    "You don't have access to the model with the specified model ID.".to_string(),
                ))
            }
        }
    }

    fn invoker(available: Vec<&'static str>) -> SelectiveInvoker {
        SelectiveInvoker {
            available,
            calls: Mutex::new(Vec::new()),
        }
    }

    #[tokio::test]
    async fn test_probe_all_models() {
        let catalog = ModelCatalog::for_api(ApiFlavor::InvokeModel);
        let models = &catalog.models()[..3];
        let invoker = invoker(vec![models[1].id]);

        let outcomes = probe_models(&invoker, models, &ProbeOptions::default()).await;

        assert_eq!(outcomes.len(), 3);
        assert!(!outcomes[0].is_success());
        assert_eq!(outcomes[1].result.as_deref(), Ok("Connection successful!"));
        let failure = outcomes[2].result.as_ref().unwrap_err();
        assert!(failure.starts_with("Error with InvokeModel API"));
        assert!(failure.contains("AWS Bedrock console"));
    }

    #[tokio::test]
    async fn test_probe_stops_at_first_success() {
        let catalog = ModelCatalog::for_api(ApiFlavor::InvokeModel);
        let models = catalog.models();
        let invoker = invoker(vec![models[1].id, models[2].id]);
        let options = ProbeOptions {
            stop_at_first: true,
            ..Default::default()
        };

        let outcomes = probe_models(&invoker, models, &options).await;

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[1].is_success());
        assert_eq!(invoker.calls.lock().unwrap().len(), 2);
    }

    struct Recorder(Mutex<Option<(String, u32)>>);

    #[async_trait::async_trait]
    impl ModelInvoker for Recorder {
        fn api(&self) -> ApiFlavor {
            ApiFlavor::Converse
        }

        async fn invoke(&self, params: &InvocationParams) -> Result<Completion, InvocationError> {
            *self.0.lock().unwrap() = Some((params.prompt.clone(), params.max_tokens));
            Ok(Completion::text("ok"))
        }
    }

    #[tokio::test]
    async fn test_probe_uses_options() {
        let catalog = ModelCatalog::for_api(ApiFlavor::Converse);
        let recorder = Recorder(Mutex::new(None));
        let options = ProbeOptions {
            prompt: "ping".to_string(),
            max_tokens: 10,
            stop_at_first: true,
        };

        let outcomes = probe_models(&recorder, catalog.models(), &options).await;

        assert_eq!(outcomes.len(), 1);
        assert_eq!(
            recorder.0.lock().unwrap().clone(),
            Some(("ping".to_string(), 10))
        );
    }
}
