use serde::Serialize;

pub const ROOM_PREFERENCES_PROMPT: &str =
    "OK, let's set your room preferences so I won't need to ask for them in the future.";
pub const SET_PREFERENCES_BUTTON_TITLE: &str = "Set preferences";
pub const NON_TEXT_MESSAGE_REPLY: &str = "Sorry, I don't understand what you mean.";
pub const POSTBACK_YES_REPLY: &str = "Thanks!";
pub const POSTBACK_NO_REPLY: &str = "Oops, try sending another image.";

/// A message in Send API shape: either plain text or a template attachment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OutboundMessage {
    Text { text: String },
    Attachment { attachment: Attachment },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Attachment {
    Template { payload: TemplatePayload },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "template_type", rename_all = "snake_case")]
pub enum TemplatePayload {
    Button { text: String, buttons: Vec<Button> },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Button {
    WebUrl {
        url: String,
        title: String,
        webview_height_ratio: WebviewHeightRatio,
        messenger_extensions: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WebviewHeightRatio {
    Compact,
    Tall,
    Full,
}

pub fn text_message(text: impl Into<String>) -> OutboundMessage {
    OutboundMessage::Text { text: text.into() }
}

/// Button template pointing the user at the room-preferences webview form.
/// `options_url` is the externally reachable URL of the form page.
pub fn room_preferences_prompt(options_url: impl Into<String>) -> OutboundMessage {
    OutboundMessage::Attachment {
        attachment: Attachment::Template {
            payload: TemplatePayload::Button {
                text: ROOM_PREFERENCES_PROMPT.to_owned(),
                buttons: vec![Button::WebUrl {
                    url: options_url.into(),
                    title: SET_PREFERENCES_BUTTON_TITLE.to_owned(),
                    webview_height_ratio: WebviewHeightRatio::Compact,
                    messenger_extensions: true,
                }],
            },
        },
    }
}

/// Confirmation sent back into the chat after the webview form submits.
pub fn booking_confirmation(bed: &str, pillows: &str, view: &str) -> OutboundMessage {
    text_message(format!(
        "Great, I will book you a {bed} bed, with {pillows} pillows and a {view} view."
    ))
}
