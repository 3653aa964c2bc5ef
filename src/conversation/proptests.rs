//! Property-based tests for the reconciliation fold
//!
//! These verify the history-parity invariant over arbitrary interleavings
//! of caller asks and inbound frames:
//! - history length is even exactly when no turn is outstanding
//! - the generation lock is cleared only by terminal events
//! - a failed turn rolls history back to exactly its pre-ask contents

use super::reconcile::{reconcile, ReconcileState};
use crate::protocol::{AnswerFrame, EvidenceFrame, FailureCode, FailureFrame, InboundFrame};
use proptest::prelude::*;

const CONV_ID: &str = "conv-prop";

/// One step a conversation can take
#[derive(Debug, Clone)]
enum Op {
    Ask(String),
    Answer(String),
    Evidence,
    Failure,
    Unrecognized,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        "[a-zA-Z0-9 ?]{1,30}".prop_map(Op::Ask),
        "[a-zA-Z0-9 .]{1,30}".prop_map(Op::Answer),
        Just(Op::Evidence),
        Just(Op::Failure),
        Just(Op::Unrecognized),
    ]
}

/// Even-length seed history
fn arb_seed() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec("[a-z ]{1,10}", 0..4)
        .prop_map(|mut turns| {
            if turns.len() % 2 == 1 {
                turns.pop();
            }
            turns
        })
}

/// Apply one op the way the engine does: asks only go through when the
/// lock is free (reject policy), inbound frames always fold.
fn apply(state: &ReconcileState, op: &Op) -> ReconcileState {
    match op {
        Op::Ask(question) => {
            if state.generating {
                return state.clone();
            }
            let mut next = state.clone();
            next.history.push(question.clone());
            next.generating = true;
            next
        }
        Op::Answer(text) => {
            reconcile(
                state,
                CONV_ID,
                InboundFrame::Answer(AnswerFrame {
                    text: text.clone(),
                    citations: vec![],
                    id: CONV_ID.to_string(),
                }),
            )
            .new_state
        }
        Op::Evidence => {
            reconcile(
                state,
                CONV_ID,
                InboundFrame::Evidence(EvidenceFrame {
                    articles: vec![],
                    id: CONV_ID.to_string(),
                }),
            )
            .new_state
        }
        Op::Failure => {
            reconcile(
                state,
                CONV_ID,
                InboundFrame::Failure(FailureFrame {
                    error_code: FailureCode::Llm,
                    id: CONV_ID.to_string(),
                }),
            )
            .new_state
        }
        Op::Unrecognized => {
            reconcile(
                state,
                CONV_ID,
                InboundFrame::Unrecognized {
                    kind: "other".to_string(),
                },
            )
            .new_state
        }
    }
}

proptest! {
    /// Even length <=> no outstanding turn, at every step
    #[test]
    fn parity_matches_lock_at_every_step(
        seed in arb_seed(),
        ops in proptest::collection::vec(arb_op(), 0..40),
    ) {
        let mut state = ReconcileState::with_seed(seed);
        for op in &ops {
            state = apply(&state, op);
            if state.generating {
                prop_assert_eq!(state.history.len() % 2, 1,
                    "outstanding turn must leave history odd");
            } else {
                prop_assert_eq!(state.history.len() % 2, 0,
                    "quiescent history must end on an agent turn");
            }
        }
    }

    /// Only Evidence, Failure and Unrecognized clear the lock
    #[test]
    fn only_terminal_events_clear_the_lock(
        question in "[a-z ]{1,20}",
        answers in proptest::collection::vec("[a-z ]{1,20}", 1..5),
    ) {
        let mut state = ReconcileState::default();
        state = apply(&state, &Op::Ask(question));
        prop_assert!(state.generating);

        for answer in &answers {
            state = apply(&state, &Op::Answer(answer.clone()));
            prop_assert!(state.generating, "bare answers never resolve the turn");
        }

        state = apply(&state, &Op::Evidence);
        prop_assert!(!state.generating);
    }

    /// A failed turn restores history to exactly its pre-ask contents
    #[test]
    fn failure_rolls_back_to_pre_ask_history(
        seed in arb_seed(),
        question in "[a-z ?]{1,20}",
        terminal_is_unrecognized in any::<bool>(),
    ) {
        let before = ReconcileState::with_seed(seed);
        let asked = apply(&before, &Op::Ask(question));
        let resolved = apply(
            &asked,
            if terminal_is_unrecognized { &Op::Unrecognized } else { &Op::Failure },
        );

        prop_assert_eq!(resolved.history, before.history);
        prop_assert!(!resolved.generating);
    }

    /// The draft always holds the text of the most recent answer
    #[test]
    fn last_answer_tracks_most_recent_answer(
        texts in proptest::collection::vec("[a-z ]{1,20}", 1..6),
    ) {
        let mut state = ReconcileState::default();
        state = apply(&state, &Op::Ask("q".to_string()));
        for text in &texts {
            state = apply(&state, &Op::Answer(text.clone()));
        }
        prop_assert_eq!(
            state.last_answer.map(|answer| answer.text),
            texts.last().cloned()
        );
    }
}
