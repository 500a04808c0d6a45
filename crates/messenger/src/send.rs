use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

use crate::messages::OutboundMessage;

#[derive(Debug, Error)]
pub enum SendError {
    #[error("send request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("send api rejected message with status {status}: {body}")]
    Platform { status: u16, body: String },
}

/// Acknowledgment returned by the Send API on success.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct SendAck {
    #[serde(default)]
    pub recipient_id: Option<String>,
    #[serde(default)]
    pub message_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SendRequest<'a> {
    pub recipient: Recipient<'a>,
    pub message: &'a OutboundMessage,
}

#[derive(Debug, Serialize)]
pub struct Recipient<'a> {
    pub id: &'a str,
}

/// Client for the platform's message send endpoint. Authenticates with the
/// page access token passed as the `access_token` query parameter.
pub struct SendClient {
    http: reqwest::Client,
    api_base_url: String,
    page_access_token: SecretString,
}

impl SendClient {
    pub fn new(api_base_url: impl Into<String>, page_access_token: SecretString) -> Self {
        Self::with_client(reqwest::Client::new(), api_base_url, page_access_token)
    }

    pub fn with_client(
        http: reqwest::Client,
        api_base_url: impl Into<String>,
        page_access_token: SecretString,
    ) -> Self {
        let api_base_url = api_base_url.into().trim_end_matches('/').to_owned();
        Self { http, api_base_url, page_access_token }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/me/messages", self.api_base_url)
    }

    /// Submit one message. Failures are returned, never retried.
    pub async fn send(
        &self,
        psid: &str,
        message: &OutboundMessage,
    ) -> Result<SendAck, SendError> {
        let request = SendRequest { recipient: Recipient { id: psid }, message };
        let response = self
            .http
            .post(self.endpoint())
            .query(&[("access_token", self.page_access_token.expose_secret())])
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SendError::Platform { status: status.as_u16(), body });
        }

        Ok(response.json::<SendAck>().await?)
    }
}

/// Fire-and-forget delivery. The caller never awaits the result; completion
/// is observed only through logging.
pub fn spawn_send(
    client: Arc<SendClient>,
    psid: String,
    message: OutboundMessage,
    correlation_id: String,
) {
    tokio::spawn(async move {
        match client.send(&psid, &message).await {
            Ok(ack) => {
                info!(
                    event_name = "messenger.send.delivered",
                    correlation_id = %correlation_id,
                    psid = %psid,
                    message_id = ack.message_id.as_deref().unwrap_or("unknown"),
                    "message sent"
                );
            }
            Err(send_error) => {
                error!(
                    event_name = "messenger.send.failed",
                    correlation_id = %correlation_id,
                    psid = %psid,
                    error = %send_error,
                    "unable to send message"
                );
            }
        }
    });
}
