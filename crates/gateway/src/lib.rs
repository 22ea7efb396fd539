pub mod error;
pub mod http;

pub use error::{GatewayError, GatewayResult};
pub use futures::future::BoxFuture;
pub use http::HttpGateway;

/// Canned reply substituted for any transport failure, so the conversation
/// continues instead of surfacing an error.
pub const FALLBACK_REPLY: &str = "Sorry, I couldn't process your request.";

/// One resolved backend exchange: the reply text plus the id the backend
/// assigned to the exchange. The id is `None` when the call fell back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayReply {
    pub response: String,
    pub id: Option<u64>,
}

impl GatewayReply {
    pub fn new(response: impl Into<String>, id: Option<u64>) -> Self {
        Self {
            response: response.into(),
            id,
        }
    }

    /// The degraded reply used when the backend is unreachable.
    pub fn fallback() -> Self {
        Self::new(FALLBACK_REPLY, None)
    }
}

/// Remote assistant service consumed by the chat engine.
///
/// Both operations are infallible by contract: implementations must degrade
/// transport failures to `GatewayReply::fallback()` rather than erroring, so
/// the caller never has a failure path to handle.
pub trait BackendGateway: Send + Sync {
    /// Submits a new user message and resolves to the assistant reply.
    fn send_message(&self, content: String) -> BoxFuture<'_, GatewayReply>;

    /// Replaces the content of a previously sent message and resolves to the
    /// regenerated reply.
    fn edit_message(&self, id: u64, new_content: String) -> BoxFuture<'_, GatewayReply>;
}
