use crate::catalog::ApiFlavor;
use crate::error::InvocationError;
use crate::types::{Completion, InvocationParams};

/// One outbound model invocation per call
#[async_trait::async_trait]
pub trait ModelInvoker: Send + Sync {
    /// The Bedrock API this invoker talks to
    fn api(&self) -> ApiFlavor;

    /// Send a validated request and return the completion
    async fn invoke(&self, params: &InvocationParams) -> Result<Completion, InvocationError>;
}
