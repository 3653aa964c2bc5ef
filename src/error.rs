//! Crate error taxonomy
//!
//! Setup and usage errors are raised synchronously to the caller. Remote
//! failure codes are *not* errors: they arrive as ordinary [`ChatEvent`]s
//! on the subscription surfaces and never surface through this type.
//!
//! [`ChatEvent`]: crate::event::ChatEvent

use thiserror::Error;

use crate::transport::TransportError;

/// Errors surfaced directly to the caller
#[derive(Debug, Error)]
pub enum ChatError {
    /// The transport never became usable (or failed before opening)
    #[error("connection is not ready, create the session again later")]
    NotReady,

    /// Seed history must end on a completed agent turn (even length)
    #[error(
        "seed history has odd length ({0}): turns must alternate user, agent, \
         user, agent and end on an agent turn"
    )]
    MalformedSeedHistory(usize),

    /// A turn is already in flight and the overlap policy forbids overriding it
    #[error("the previous response has not completed yet; wait, or create the \
             conversation with OverlapPolicy::Interrupt")]
    GenerationInProgress,

    /// The conversation was closed; no further turns can be submitted
    #[error("conversation is closed")]
    ConversationClosed,

    /// Internal invariant violation (history parity corrupted)
    #[error("internal invariant violation: {0}")]
    Internal(String),

    /// Failure writing to the underlying connection
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Failure serializing an outbound frame
    #[error("failed to encode outbound frame: {0}")]
    Codec(#[from] serde_json::Error),
}
