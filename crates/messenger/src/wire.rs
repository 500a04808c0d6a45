//! Serde view of the Messenger webhook protocol: the POST event payload and
//! the GET verification handshake query.

use serde::Deserialize;

use crate::events::{InboundEvent, PostbackEvent, TextMessageEvent};

/// Subscription object this webhook is wired to. Anything else is rejected
/// with 404 at the HTTP layer.
pub const PAGE_OBJECT: &str = "page";

pub const SUBSCRIBE_MODE: &str = "subscribe";

#[derive(Clone, Debug, Deserialize)]
pub struct WebhookPayload {
    pub object: String,
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

impl WebhookPayload {
    pub fn is_page_subscription(&self) -> bool {
        self.object == PAGE_OBJECT
    }

    /// Every messaging item across every entry, in arrival order. The
    /// platform batches events; each item is routed independently.
    pub fn events(&self) -> impl Iterator<Item = InboundEvent> + '_ {
        self.entry
            .iter()
            .flat_map(|entry| entry.messaging.iter())
            .filter_map(MessagingItem::to_event)
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct WebhookEntry {
    #[serde(default)]
    pub messaging: Vec<MessagingItem>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct MessagingItem {
    pub sender: Sender,
    #[serde(default)]
    pub message: Option<MessagePayload>,
    #[serde(default)]
    pub postback: Option<PostbackPayload>,
}

impl MessagingItem {
    /// Message takes precedence over postback when both are present, matching
    /// platform behavior (a single item never legitimately carries both).
    /// Items carrying neither are dropped.
    pub fn to_event(&self) -> Option<InboundEvent> {
        let psid = self.sender.id.clone();
        if let Some(message) = &self.message {
            return Some(InboundEvent::TextMessage(TextMessageEvent {
                psid,
                text: message.text.clone(),
            }));
        }
        if let Some(postback) = &self.postback {
            return Some(InboundEvent::Postback(PostbackEvent {
                psid,
                payload: postback.payload.clone(),
            }));
        }
        None
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Sender {
    pub id: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct MessagePayload {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PostbackPayload {
    #[serde(default)]
    pub payload: String,
}

/// Query parameters of the one-time verification handshake.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// Mode and token check out; echo the challenge verbatim with 200.
    Verified { challenge: String },
    /// Mode or token present but wrong; answer 403.
    Forbidden,
    /// Mode or token missing entirely; answer 400.
    Incomplete,
}

pub fn verify_subscription(params: &VerifyParams, expected_token: &str) -> VerifyOutcome {
    let (Some(mode), Some(token)) = (&params.mode, &params.verify_token) else {
        return VerifyOutcome::Incomplete;
    };

    if mode == SUBSCRIBE_MODE && token == expected_token {
        VerifyOutcome::Verified { challenge: params.challenge.clone().unwrap_or_default() }
    } else {
        VerifyOutcome::Forbidden
    }
}
