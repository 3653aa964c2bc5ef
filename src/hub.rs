//! Event broadcast hub
//!
//! Fans one conversation's typed events out to any number of subscribers.
//! Feeds are hot: a subscriber sees only events emitted after it subscribed,
//! never historical ones. There is no replay buffer; that is a deliberate
//! simplicity/latency trade-off, not an oversight. Lagged subscribers skip
//! missed events rather than erroring.
//!
//! Closing the hub terminates every live subscriber stream (stream end, not
//! an error) and turns later emissions into no-ops.

use crate::event::{ChatEvent, EventKind};
use futures::stream::Stream;
use std::sync::Mutex;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

const HUB_CAPACITY: usize = 128;

/// Hot fan-out of one conversation's delivered events
pub struct EventHub {
    tx: Mutex<Option<broadcast::Sender<ChatEvent>>>,
}

impl EventHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(HUB_CAPACITY);
        Self {
            tx: Mutex::new(Some(tx)),
        }
    }

    /// Deliver an event to all current subscribers. No-op after close.
    pub fn emit(&self, event: ChatEvent) {
        if let Some(tx) = self.tx.lock().unwrap().as_ref() {
            // send only fails when there are no subscribers; that is fine
            let _ = tx.send(event);
        }
    }

    fn receiver(&self) -> broadcast::Receiver<ChatEvent> {
        match self.tx.lock().unwrap().as_ref() {
            Some(tx) => tx.subscribe(),
            // Closed hub: a receiver whose sender is already gone yields an
            // immediately-terminated stream.
            None => broadcast::channel(1).1,
        }
    }

    /// Live feed of all events
    pub fn subscribe(&self) -> impl Stream<Item = ChatEvent> {
        BroadcastStream::new(self.receiver()).filter_map(|result| result.ok())
    }

    /// Live feed of events of one kind only
    pub fn subscribe_kind(&self, kind: EventKind) -> impl Stream<Item = ChatEvent> {
        BroadcastStream::new(self.receiver())
            .filter_map(move |result| result.ok().filter(|event| event.kind() == kind))
    }

    /// Complete the hub: all subscriber streams end, later emits are dropped.
    pub fn close(&self) {
        self.tx.lock().unwrap().take();
    }

    pub fn is_closed(&self) -> bool {
        self.tx.lock().unwrap().is_none()
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}
