//! Transport envelope codec
//!
//! Wire-level types for the duplex chat protocol. Every outbound frame is a
//! JSON object carrying the command payload plus the caller credential
//! (`key`) and the conversation identifier (`id`). Inbound frames are JSON
//! objects discriminated by their `event` field.
//!
//! Classification of inbound frames is exhaustive over the known
//! discriminators with a default arm that preserves the unknown tag; the
//! engine turns that arm into a synthesized failure event.

use serde::{Deserialize, Serialize};

/// Response language for a conversation.
///
/// Wire quirk: `English` is capitalized on the wire, the rest are not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    #[serde(rename = "English")]
    English,
    Arabic,
    German,
    Chinese,
    Hindi,
    Japanese,
    French,
    Spanish,
    Slovak,
    Turkish,
}

/// Immutable per-conversation settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ConversationSettings {
    pub language: Language,
}

// ============================================================================
// Outbound commands
// ============================================================================

/// Command payloads the client can send
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Command {
    /// Submit a user turn, carrying the full history and settings
    UserMessage {
        conversation: Vec<String>,
        settings: ConversationSettings,
    },
    /// Advisory cancellation of the in-flight turn
    Interrupt,
    /// Terminate the conversation on the peer
    Close,
}

/// Outbound envelope: the command payload plus credential and conversation id
#[derive(Serialize)]
struct Envelope<'a> {
    #[serde(flatten)]
    command: &'a Command,
    key: &'a str,
    id: &'a str,
}

/// Serialize an outbound frame
pub fn encode(command: &Command, key: &str, id: &str) -> Result<String, serde_json::Error> {
    serde_json::to_string(&Envelope { command, key, id })
}

// ============================================================================
// Inbound frames
// ============================================================================

/// A supporting source attached to an agent answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub url: String,
    pub authors: Vec<String>,
    pub year: String,
}

/// Remote (or locally synthesized) failure codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureCode {
    /// Bad or exhausted API key
    #[serde(rename = "error_auth")]
    Auth,
    /// Credential missing from the frame
    #[serde(rename = "error_missing_key")]
    MissingKey,
    /// Internal peer bug
    #[serde(rename = "error_internal")]
    Internal,
    /// Model failure
    #[serde(rename = "error_llm")]
    Llm,
    /// Not enough relevant supporting sources found
    #[serde(rename = "error_not_enough_articles")]
    NotEnoughArticles,
    /// Conversation ran out of context space
    #[serde(rename = "error_out_of_tokens")]
    OutOfTokens,
    /// Synthesized locally for frames with an unknown discriminator;
    /// never sent by the peer
    #[serde(rename = "unrecognized_event")]
    UnrecognizedEvent,
}

/// Wire payload of an `llm_response` frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerFrame {
    pub text: String,
    #[serde(default)]
    pub citations: Vec<String>,
    pub id: String,
}

/// Wire payload of an `articles` frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceFrame {
    pub articles: Vec<Article>,
    pub id: String,
}

/// Wire payload of an `error` frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureFrame {
    pub error_code: FailureCode,
    pub id: String,
}

/// A classified inbound frame
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    Answer(AnswerFrame),
    Evidence(EvidenceFrame),
    Failure(FailureFrame),
    /// Discriminator not in the known set; the payload is not preserved
    Unrecognized { kind: String },
}

/// Parse and classify one inbound frame.
///
/// Returns `None` when the text is not valid JSON, has no `event`
/// discriminator, or carries a known discriminator with a malformed payload.
/// Such frames produce no event (the caller decides whether to log the drop).
pub fn decode(text: &str) -> Option<InboundFrame> {
    let value: serde_json::Value = serde_json::from_str(text).ok()?;
    let kind = value.get("event").and_then(serde_json::Value::as_str)?.to_string();

    match kind.as_str() {
        "llm_response" => serde_json::from_value(value).ok().map(InboundFrame::Answer),
        "articles" => serde_json::from_value(value).ok().map(InboundFrame::Evidence),
        "error" => serde_json::from_value(value).ok().map(InboundFrame::Failure),
        _ => Some(InboundFrame::Unrecognized { kind }),
    }
}
