//! Transport boundary
//!
//! The duplex socket itself is an external collaborator; this module pins
//! down its seam: a [`Transport`] sends text frames, fans raw inbound frames
//! out to any number of observers, and exposes a [`ReadinessGate`] that
//! resolves exactly once from the connection's open/error lifecycle.

#[cfg(test)]
pub mod testing;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{broadcast, watch};

/// Errors from the underlying connection
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection closed while sending frame")]
    ConnectionClosed,
    #[error("failed to write frame: {0}")]
    Send(String),
}

/// A duplex frame socket at its boundary
#[async_trait]
pub trait Transport: Send + Sync {
    /// The readiness gate for this connection instance
    fn readiness(&self) -> ReadinessGate;

    /// Write one outbound text frame. Issued immediately, never queued.
    async fn send(&self, frame: String) -> Result<(), TransportError>;

    /// Subscribe to the raw inbound frame feed. Every subscriber observes
    /// every frame; frames carry their conversation id in-band.
    fn frames(&self) -> broadcast::Receiver<String>;

    /// Close the underlying connection
    async fn shutdown(&self);
}

// ============================================================================
// Readiness Gate
// ============================================================================

/// One-shot latch resolving transport usability.
///
/// Suspends callers until the connection reaches a definitive open-or-error
/// state, then answers from cache forever after. Failure is terminal for the
/// connection instance; there is no retry or reconnection.
#[derive(Debug, Clone)]
pub struct ReadinessGate {
    rx: watch::Receiver<Option<bool>>,
}

/// Write side of the gate, held by the transport implementation
#[derive(Debug)]
pub struct ReadinessHandle {
    tx: watch::Sender<Option<bool>>,
}

/// Create an unresolved gate and its write handle
pub fn readiness_gate() -> (ReadinessHandle, ReadinessGate) {
    let (tx, rx) = watch::channel(None);
    (ReadinessHandle { tx }, ReadinessGate { rx })
}

impl ReadinessHandle {
    /// Resolve the gate. Only the first call has any effect.
    pub fn resolve(&self, ready: bool) {
        self.tx.send_if_modified(|state| {
            if state.is_none() {
                *state = Some(ready);
                true
            } else {
                false
            }
        });
    }
}

impl ReadinessGate {
    /// An already-resolved gate
    pub fn resolved(ready: bool) -> Self {
        let (handle, gate) = readiness_gate();
        handle.resolve(ready);
        gate
    }

    /// Wait for resolution and return the cached verdict.
    ///
    /// A handle dropped before resolving counts as a failed connection.
    pub async fn is_ready(&self) -> bool {
        let mut rx = self.rx.clone();
        let ready = match rx.wait_for(Option::is_some).await {
            Ok(state) => state.unwrap_or(false),
            Err(_) => false,
        };
        ready
    }
}
