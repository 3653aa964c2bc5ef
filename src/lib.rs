//! medichat — async client engine for a stateful, bidirectional chat
//! protocol over a persistent duplex socket.
//!
//! A [`Session`] owns one transport connection and a registry of live
//! [`Conversation`]s. Callers submit natural-language turns with
//! [`Conversation::ask`] and observe the asynchronously-arriving typed
//! events on the conversation's subscription surfaces; the engine
//! reconciles those events into a coherent alternating turn history.
//!
//! The socket itself is an external collaborator behind the
//! [`Transport`] trait; readiness is gated by a one-shot
//! [`transport::ReadinessGate`].

pub mod conversation;
pub mod error;
pub mod event;
pub mod hub;
pub mod protocol;
pub mod session;
pub mod transport;

pub use conversation::{Conversation, OverlapPolicy};
pub use error::ChatError;
pub use event::{Answer, ChatEvent, Evidence, EventKind, Failure};
pub use hub::EventHub;
pub use protocol::{Article, Command, ConversationSettings, FailureCode, Language};
pub use session::{ConversationOptions, Session, SessionConfig, DEFAULT_ENDPOINT};
pub use transport::{ReadinessGate, ReadinessHandle, Transport, TransportError};
