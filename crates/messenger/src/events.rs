use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use innkeeper_core::responder::{normalize, PhraseTable};
use thiserror::Error;
use uuid::Uuid;

use crate::messages::{
    self, booking_confirmation, room_preferences_prompt, text_message, OutboundMessage,
};

/// Reserved keyword that routes to the webview hand-off instead of the
/// responder. Compared after normalization, so case and punctuation are
/// irrelevant.
pub const ROOM_PREFERENCES_KEYWORD: &str = "room preferences";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InboundEvent {
    TextMessage(TextMessageEvent),
    Postback(PostbackEvent),
    FormSubmission(FormSubmissionEvent),
}

impl InboundEvent {
    pub fn event_type(&self) -> InboundEventType {
        match self {
            Self::TextMessage(_) => InboundEventType::TextMessage,
            Self::Postback(_) => InboundEventType::Postback,
            Self::FormSubmission(_) => InboundEventType::FormSubmission,
        }
    }

    pub fn psid(&self) -> &str {
        match self {
            Self::TextMessage(event) => &event.psid,
            Self::Postback(event) => &event.psid,
            Self::FormSubmission(event) => &event.psid,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum InboundEventType {
    TextMessage,
    Postback,
    FormSubmission,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextMessageEvent {
    pub psid: String,
    /// `None` for attachment-only messages (stickers, images).
    pub text: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostbackEvent {
    pub psid: String,
    pub payload: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormSubmissionEvent {
    pub psid: String,
    pub bed: String,
    pub pillows: String,
    pub view: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl EventContext {
    pub fn new() -> Self {
        Self { correlation_id: Uuid::new_v4().to_string() }
    }
}

impl Default for EventContext {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    /// A reply to send back to the originating sender.
    Responded(OutboundMessage),
    /// Handled, deliberately no reply (e.g. unrecognized postback payload).
    Processed,
    /// No handler registered for this event type.
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error("missing sender id on {0} event")]
    MissingSender(&'static str),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> InboundEventType;
    async fn handle(
        &self,
        event: &InboundEvent,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<InboundEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        event: &InboundEvent,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&event.event_type()) else {
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(event, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

/// Dispatcher wired with the default handlers. `options_url` is the
/// externally reachable URL of the room-preferences webview form.
pub fn default_dispatcher(options_url: impl Into<String>) -> EventDispatcher {
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(TextMessageHandler::new(PhraseTable::default(), options_url));
    dispatcher.register(PostbackHandler);
    dispatcher.register(FormSubmissionHandler);
    dispatcher
}

pub struct TextMessageHandler {
    table: PhraseTable,
    options_url: String,
}

impl TextMessageHandler {
    pub fn new(table: PhraseTable, options_url: impl Into<String>) -> Self {
        Self { table, options_url: options_url.into() }
    }
}

#[async_trait]
impl EventHandler for TextMessageHandler {
    fn event_type(&self) -> InboundEventType {
        InboundEventType::TextMessage
    }

    async fn handle(
        &self,
        event: &InboundEvent,
        _ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let InboundEvent::TextMessage(event) = event else {
            return Ok(HandlerResult::Ignored);
        };
        if event.psid.is_empty() {
            return Err(EventHandlerError::MissingSender("text message"));
        }

        let Some(text) = &event.text else {
            return Ok(HandlerResult::Responded(text_message(messages::NON_TEXT_MESSAGE_REPLY)));
        };

        let message = if normalize(text) == ROOM_PREFERENCES_KEYWORD {
            room_preferences_prompt(self.options_url.clone())
        } else {
            text_message(self.table.classify(text))
        };
        Ok(HandlerResult::Responded(message))
    }
}

pub struct PostbackHandler;

#[async_trait]
impl EventHandler for PostbackHandler {
    fn event_type(&self) -> InboundEventType {
        InboundEventType::Postback
    }

    async fn handle(
        &self,
        event: &InboundEvent,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let InboundEvent::Postback(event) = event else {
            return Ok(HandlerResult::Ignored);
        };
        if event.psid.is_empty() {
            return Err(EventHandlerError::MissingSender("postback"));
        }

        match event.payload.as_str() {
            "yes" => Ok(HandlerResult::Responded(text_message(messages::POSTBACK_YES_REPLY))),
            "no" => Ok(HandlerResult::Responded(text_message(messages::POSTBACK_NO_REPLY))),
            other => {
                tracing::warn!(
                    event_name = "messenger.postback.unrecognized",
                    correlation_id = %ctx.correlation_id,
                    psid = %event.psid,
                    payload = %other,
                    "unrecognized postback payload, no reply produced"
                );
                Ok(HandlerResult::Processed)
            }
        }
    }
}

pub struct FormSubmissionHandler;

#[async_trait]
impl EventHandler for FormSubmissionHandler {
    fn event_type(&self) -> InboundEventType {
        InboundEventType::FormSubmission
    }

    async fn handle(
        &self,
        event: &InboundEvent,
        _ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let InboundEvent::FormSubmission(event) = event else {
            return Ok(HandlerResult::Ignored);
        };
        if event.psid.is_empty() {
            return Err(EventHandlerError::MissingSender("form submission"));
        }

        Ok(HandlerResult::Responded(booking_confirmation(&event.bed, &event.pillows, &event.view)))
    }
}
