//! In-memory transport for tests
//!
//! Records every outbound frame and lets tests drive the inbound feed and
//! the readiness lifecycle by hand.

use super::{readiness_gate, ReadinessGate, ReadinessHandle, Transport, TransportError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tokio::sync::broadcast;

/// Transport backed by channels instead of a socket
pub struct MemoryTransport {
    readiness_handle: ReadinessHandle,
    gate: ReadinessGate,
    inbound_tx: broadcast::Sender<String>,
    shut_down: AtomicBool,
    /// Record of all frames sent
    pub sent: Mutex<Vec<String>>,
}

impl MemoryTransport {
    /// A transport whose readiness is still undecided
    pub fn new() -> Self {
        let (readiness_handle, gate) = readiness_gate();
        let (inbound_tx, _) = broadcast::channel(128);
        Self {
            readiness_handle,
            gate,
            inbound_tx,
            shut_down: AtomicBool::new(false),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// A transport that already opened successfully
    pub fn open() -> Self {
        let transport = Self::new();
        transport.readiness_handle.resolve(true);
        transport
    }

    /// Resolve the readiness lifecycle
    pub fn resolve_ready(&self, ready: bool) {
        self.readiness_handle.resolve(ready);
    }

    /// Deliver a raw inbound frame to all subscribers
    pub fn push_inbound(&self, frame: impl Into<String>) {
        let _ = self.inbound_tx.send(frame.into());
    }

    /// All frames sent so far
    pub fn sent_frames(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    /// Sent frames parsed as JSON values
    pub fn sent_json(&self) -> Vec<serde_json::Value> {
        self.sent_frames()
            .iter()
            .map(|frame| serde_json::from_str(frame).unwrap())
            .collect()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    fn readiness(&self) -> ReadinessGate {
        self.gate.clone()
    }

    async fn send(&self, frame: String) -> Result<(), TransportError> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectionClosed);
        }
        self.sent.lock().unwrap().push(frame);
        Ok(())
    }

    fn frames(&self) -> broadcast::Receiver<String> {
        self.inbound_tx.subscribe()
    }

    async fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
    }
}
