//! Conversation engine
//!
//! Owns one conversation's history, generation lock and last agent draft,
//! and reconciles the asynchronously-arriving inbound events with the
//! caller-driven writes. A spawned reader task consumes the transport's raw
//! frame feed, classifies each frame through the codec and applies the pure
//! fold in [`reconcile`]; resulting events fan out through the conversation's
//! [`EventHub`].

pub mod reconcile;

#[cfg(test)]
mod proptests;

use crate::error::ChatError;
use crate::event::{Answer, ChatEvent, EventKind};
use crate::hub::EventHub;
use crate::protocol::{self, Command, ConversationSettings};
use crate::transport::Transport;
use futures::stream::Stream;
use reconcile::{NextTurn, ReconcileState};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// What `ask` does when a turn is already in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlapPolicy {
    /// Fail the overlapping `ask` immediately
    #[default]
    Reject,
    /// Send an advisory interrupt for the in-flight turn, then proceed.
    /// Fire-and-forget: the new turn is not held back waiting for an
    /// interrupt acknowledgment.
    Interrupt,
}

struct EngineState {
    reconcile: ReconcileState,
    closed: bool,
}

/// A live conversation over the shared transport
pub struct Conversation {
    id: String,
    settings: ConversationSettings,
    overlap_policy: OverlapPolicy,
    api_key: String,
    transport: Arc<dyn Transport>,
    hub: Arc<EventHub>,
    state: Arc<Mutex<EngineState>>,
    cancel: CancellationToken,
}

impl Conversation {
    /// Create the engine and start its reader task.
    ///
    /// The caller (the session) has already validated readiness and seed
    /// history parity.
    pub(crate) fn spawn(
        id: String,
        api_key: String,
        settings: ConversationSettings,
        seed_history: Vec<String>,
        overlap_policy: OverlapPolicy,
        transport: Arc<dyn Transport>,
    ) -> Arc<Self> {
        let state = Arc::new(Mutex::new(EngineState {
            reconcile: ReconcileState::with_seed(seed_history),
            closed: false,
        }));
        let hub = Arc::new(EventHub::new());
        let cancel = CancellationToken::new();

        tokio::spawn(reader_loop(
            id.clone(),
            transport.frames(),
            Arc::clone(&state),
            Arc::clone(&hub),
            cancel.clone(),
        ));

        Arc::new(Self {
            id,
            settings,
            overlap_policy,
            api_key,
            transport,
            hub,
            state,
            cancel,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn settings(&self) -> ConversationSettings {
        self.settings
    }

    /// Snapshot of the turn history (even index = user, odd = agent)
    pub fn history(&self) -> Vec<String> {
        self.state.lock().unwrap().reconcile.history.clone()
    }

    /// Whether a caller request is outstanding
    pub fn is_generating(&self) -> bool {
        self.state.lock().unwrap().reconcile.generating
    }

    /// The most recent agent answer, if any
    pub fn last_answer(&self) -> Option<Answer> {
        self.state.lock().unwrap().reconcile.last_answer.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }

    /// Live feed of all of this conversation's events
    pub fn events(&self) -> impl Stream<Item = ChatEvent> {
        self.hub.subscribe()
    }

    /// Live feed of events of one kind only
    pub fn events_of(&self, kind: EventKind) -> impl Stream<Item = ChatEvent> {
        self.hub.subscribe_kind(kind)
    }

    /// Submit a user turn.
    ///
    /// Results arrive on the subscription surfaces, not as a return value.
    /// While a turn is in flight the overlap policy decides between failing
    /// fast and interrupting; interrupting discards the in-flight turn
    /// locally so the history invariant holds before the new turn is
    /// appended.
    pub async fn ask(&self, question: impl Into<String>) -> Result<(), ChatError> {
        let question = question.into();

        let (interrupt_frame, user_frame) = {
            let mut state = self.state.lock().unwrap();
            if state.closed {
                return Err(ChatError::ConversationClosed);
            }

            let interrupt_frame = if state.reconcile.generating {
                match self.overlap_policy {
                    OverlapPolicy::Reject => return Err(ChatError::GenerationInProgress),
                    OverlapPolicy::Interrupt => {
                        state.reconcile.rollback();
                        Some(protocol::encode(&Command::Interrupt, &self.api_key, &self.id)?)
                    }
                }
            } else {
                None
            };

            if state.reconcile.next_turn() != NextTurn::User {
                return Err(ChatError::Internal(format!(
                    "history of length {} does not end on an agent turn",
                    state.reconcile.history.len()
                )));
            }

            state.reconcile.history.push(question);
            state.reconcile.generating = true;

            let user_frame = protocol::encode(
                &Command::UserMessage {
                    conversation: state.reconcile.history.clone(),
                    settings: self.settings,
                },
                &self.api_key,
                &self.id,
            )?;
            (interrupt_frame, user_frame)
        };

        if let Some(frame) = interrupt_frame {
            self.transport.send(frame).await?;
        }
        self.transport.send(user_frame).await?;
        tracing::debug!(conversation_id = %self.id, "sent user turn");
        Ok(())
    }

    /// Advisory cancellation of the in-flight turn. Does not change local
    /// state; the peer decides what to do with it.
    pub async fn interrupt(&self) -> Result<(), ChatError> {
        if self.is_closed() {
            return Err(ChatError::ConversationClosed);
        }
        let frame = protocol::encode(&Command::Interrupt, &self.api_key, &self.id)?;
        self.transport.send(frame).await?;
        Ok(())
    }

    /// Close the conversation: send the close frame once, stop the reader
    /// task and complete the hub. Idempotent; `ask` afterwards is an error.
    pub async fn close(&self) -> Result<(), ChatError> {
        {
            let mut state = self.state.lock().unwrap();
            if state.closed {
                return Ok(());
            }
            state.closed = true;
        }

        let frame = protocol::encode(&Command::Close, &self.api_key, &self.id)?;
        let sent = self.transport.send(frame).await;

        self.cancel.cancel();
        self.hub.close();
        tracing::info!(conversation_id = %self.id, "conversation closed");

        sent.map_err(ChatError::from)
    }
}

/// Consume raw inbound frames until cancellation or transport end.
async fn reader_loop(
    conversation_id: String,
    mut frames: broadcast::Receiver<String>,
    state: Arc<Mutex<EngineState>>,
    hub: Arc<EventHub>,
    cancel: CancellationToken,
) {
    loop {
        let text = tokio::select! {
            () = cancel.cancelled() => break,
            frame = frames.recv() => match frame {
                Ok(text) => text,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        conversation_id = %conversation_id,
                        skipped,
                        "inbound feed lagged"
                    );
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        };

        let Some(frame) = protocol::decode(&text) else {
            // Malformed inbound JSON produces no event; the log line is the
            // only trace of it.
            tracing::warn!(conversation_id = %conversation_id, "dropping malformed inbound frame");
            continue;
        };

        let event = {
            let mut state = state.lock().unwrap();
            let outcome = reconcile::reconcile(&state.reconcile, &conversation_id, frame);
            state.reconcile = outcome.new_state;
            outcome.event
        };

        if let Some(event) = event {
            hub.emit(event);
        }
    }

    tracing::debug!(conversation_id = %conversation_id, "reader task finished");
}
