//! Delivered event union
//!
//! The typed events subscribers observe. These differ from the wire frames
//! in one place: a delivered [`ChatEvent::Evidence`] carries a denormalized
//! copy of the [`Answer`] it supports, attached by the engine because the
//! peer transmits the two as separate frames.

use crate::protocol::{AnswerFrame, Article, FailureCode};

/// Free-text agent response with optional citation identifiers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub text: String,
    pub citations: Vec<String>,
    pub id: String,
}

impl From<AnswerFrame> for Answer {
    fn from(frame: AnswerFrame) -> Self {
        Self {
            text: frame.text,
            citations: frame.citations,
            id: frame.id,
        }
    }
}

/// Supporting sources for the most recent answer, with that answer attached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evidence {
    pub articles: Vec<Article>,
    /// The answer these articles support
    pub answer: Answer,
    pub id: String,
}

/// A coded failure, remote or locally synthesized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub code: FailureCode,
    pub id: String,
}

/// Event delivered on the subscription surfaces
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    Answer(Answer),
    Evidence(Evidence),
    Failure(Failure),
}

/// Discriminator for filtered subscriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Answer,
    Evidence,
    Failure,
}

impl ChatEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ChatEvent::Answer(_) => EventKind::Answer,
            ChatEvent::Evidence(_) => EventKind::Evidence,
            ChatEvent::Failure(_) => EventKind::Failure,
        }
    }

    /// The conversation this event belongs to
    pub fn conversation_id(&self) -> &str {
        match self {
            ChatEvent::Answer(answer) => &answer.id,
            ChatEvent::Evidence(evidence) => &evidence.id,
            ChatEvent::Failure(failure) => &failure.id,
        }
    }
}
