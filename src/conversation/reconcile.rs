//! Pure reconciliation fold
//!
//! Given the current per-conversation state and one classified inbound
//! frame, produce the next state and the event (if any) to deliver to
//! subscribers. This function is pure: no I/O, same inputs always produce
//! the same outputs. The effectful reader loop in the parent module applies
//! it and emits the resulting events.
//!
//! Lock-clearing rule: the generation lock is cleared by the event that is
//! terminal for a turn — `Evidence`, `Failure`, or an unrecognized frame.
//! A bare `Answer` keeps the lock held, because its supporting `Evidence`
//! is still forthcoming.

use crate::event::{Answer, ChatEvent, Evidence, Failure};
use crate::protocol::{FailureCode, InboundFrame};

/// Whose turn the history parity says is next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextTurn {
    User,
    Agent,
}

/// Per-conversation reconciliation state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileState {
    /// Alternating turn texts: even index = user, odd index = agent
    pub history: Vec<String>,
    /// Generation lock: true while a caller request is outstanding
    pub generating: bool,
    /// Most recent agent answer, kept so later evidence can be joined to it
    pub last_answer: Option<Answer>,
}

impl ReconcileState {
    /// State carrying forward an (even-length) seed history
    pub fn with_seed(seed: Vec<String>) -> Self {
        Self {
            history: seed,
            ..Self::default()
        }
    }

    pub fn next_turn(&self) -> NextTurn {
        if self.history.len() % 2 == 0 {
            NextTurn::User
        } else {
            NextTurn::Agent
        }
    }

    /// Discard the optimistic user turn from `ask`, if one is pending,
    /// and release the generation lock.
    pub fn rollback(&mut self) {
        if self.history.len() % 2 == 1 {
            self.history.pop();
        }
        self.generating = false;
    }
}

/// Result of folding one inbound frame
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileOutcome {
    pub new_state: ReconcileState,
    /// Event to deliver to subscribers, if any
    pub event: Option<ChatEvent>,
}

/// Fold one classified inbound frame into the conversation state.
pub fn reconcile(
    state: &ReconcileState,
    conversation_id: &str,
    frame: InboundFrame,
) -> ReconcileOutcome {
    match frame {
        // Answer: record the draft; history and lock are untouched until
        // the matching evidence arrives. Re-emitted unchanged.
        InboundFrame::Answer(frame) => {
            let answer = Answer::from(frame);
            let mut new_state = state.clone();
            new_state.last_answer = Some(answer.clone());
            ReconcileOutcome {
                new_state,
                event: Some(ChatEvent::Answer(answer)),
            }
        }

        // Evidence: fold the drafted answer into history as the agent turn
        // and attach the denormalized answer to the delivered event.
        InboundFrame::Evidence(frame) => {
            let Some(answer) = state.last_answer.clone() else {
                // No preceding answer to join against; nothing to deliver.
                return ReconcileOutcome {
                    new_state: state.clone(),
                    event: None,
                };
            };

            let mut new_state = state.clone();
            match new_state.next_turn() {
                NextTurn::Agent => new_state.history.push(answer.text.clone()),
                // The peer may send the articles frame more than once per
                // turn; overwrite the agent turn instead of duplicating it.
                NextTurn::User => {
                    if let Some(last) = new_state.history.last_mut() {
                        answer.text.clone_into(last);
                    }
                }
            }
            new_state.generating = false;

            ReconcileOutcome {
                new_state,
                event: Some(ChatEvent::Evidence(Evidence {
                    articles: frame.articles,
                    answer,
                    id: frame.id,
                })),
            }
        }

        // Failure: roll back the optimistic user turn, release the lock,
        // re-emit unchanged.
        InboundFrame::Failure(frame) => {
            let mut new_state = state.clone();
            new_state.rollback();
            ReconcileOutcome {
                new_state,
                event: Some(ChatEvent::Failure(Failure {
                    code: frame.error_code,
                    id: frame.id,
                })),
            }
        }

        // Unrecognized discriminator: same lock/history treatment as a
        // failure, but the delivered event is synthesized locally and the
        // original payload is not forwarded.
        InboundFrame::Unrecognized { kind } => {
            tracing::warn!(
                conversation_id = %conversation_id,
                kind = %kind,
                "unrecognized inbound event"
            );
            let mut new_state = state.clone();
            new_state.rollback();
            ReconcileOutcome {
                new_state,
                event: Some(ChatEvent::Failure(Failure {
                    code: FailureCode::UnrecognizedEvent,
                    id: conversation_id.to_string(),
                })),
            }
        }
    }
}
