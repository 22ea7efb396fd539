use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::error::GatewayResult;
use crate::{BackendGateway, BoxFuture, GatewayError, GatewayReply};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

#[derive(Debug, Serialize)]
struct SendBody {
    content: String,
}

#[derive(Debug, Serialize)]
struct EditBody {
    new_content: String,
}

#[derive(Debug, Deserialize)]
struct ReplyBody {
    response: String,
    id: Option<u64>,
}

/// HTTP client for the assistant backend.
///
/// POST `{base}/messages/` submits a message; PUT `{base}/messages/{id}`
/// edits one. Any transport or status failure degrades to the fallback
/// reply; failures are logged, never propagated.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    messages_url: Url,
}

impl HttpGateway {
    pub fn new(base_url: &str) -> GatewayResult<Self> {
        let base = Url::parse(base_url).map_err(|source| GatewayError::InvalidBaseUrl {
            stage: "parse-base-url",
            raw: base_url.to_string(),
            message: source.to_string(),
        })?;

        // Trailing slash matters: this exact URL is the POST endpoint and the
        // base that per-id PUT endpoints join onto.
        let messages_url =
            base.join("messages/")
                .map_err(|source| GatewayError::InvalidEndpoint {
                    stage: "join-messages-endpoint",
                    base: base_url.to_string(),
                    message: source.to_string(),
                })?;

        Ok(Self {
            client: Client::new(),
            messages_url,
        })
    }

    fn edit_url(&self, id: u64) -> Option<Url> {
        self.messages_url.join(&id.to_string()).ok()
    }

    async fn post_message(&self, content: String) -> Result<GatewayReply, reqwest::Error> {
        let reply = self
            .client
            .post(self.messages_url.clone())
            .json(&SendBody { content })
            .send()
            .await?
            .error_for_status()?
            .json::<ReplyBody>()
            .await?;

        Ok(GatewayReply::new(reply.response, reply.id))
    }

    async fn put_message(
        &self,
        url: Url,
        new_content: String,
    ) -> Result<GatewayReply, reqwest::Error> {
        let reply = self
            .client
            .put(url)
            .json(&EditBody { new_content })
            .send()
            .await?
            .error_for_status()?
            .json::<ReplyBody>()
            .await?;

        Ok(GatewayReply::new(reply.response, reply.id))
    }
}

impl BackendGateway for HttpGateway {
    fn send_message(&self, content: String) -> BoxFuture<'_, GatewayReply> {
        Box::pin(async move {
            match self.post_message(content).await {
                Ok(reply) => reply,
                Err(error) => {
                    tracing::warn!(
                        url = %self.messages_url,
                        error = %error,
                        "send failed, substituting fallback reply"
                    );
                    GatewayReply::fallback()
                }
            }
        })
    }

    fn edit_message(&self, id: u64, new_content: String) -> BoxFuture<'_, GatewayReply> {
        Box::pin(async move {
            let Some(url) = self.edit_url(id) else {
                tracing::warn!(id, "could not build edit endpoint, substituting fallback reply");
                return GatewayReply::fallback();
            };

            match self.put_message(url, new_content).await {
                Ok(reply) => reply,
                Err(error) => {
                    tracing::warn!(
                        id,
                        error = %error,
                        "edit failed, substituting fallback reply"
                    );
                    GatewayReply::fallback()
                }
            }
        })
    }
}
