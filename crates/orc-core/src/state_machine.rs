// src/state_machine.rs
// ============================================================================
// Module: Event State Machine
// Description: Per-event state transitions and audit trail (C11).
// Purpose: Transitions are the only way an event's state changes; each one
// appends a record to the event's audit list. Terminal states are final.
// Dependencies: orc-core::decision
// ============================================================================

//! ## Overview
//! `pending -> {processed, deferred, escalated, discarded}`. All four
//! non-pending states are terminal: once reached, no further transition is
//! accepted.

use thiserror::Error;

use crate::decision::EventState;
use crate::decision::StateTransition;

/// Error raised when a transition is attempted out of a terminal state.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("cannot transition out of terminal state {from:?}")]
pub struct TerminalStateError {
    /// The terminal state the event was already in.
    pub from: EventState,
}

/// Append-only audit trail for one event's state transitions.
#[derive(Debug, Clone, Default)]
pub struct EventAudit {
    current: Option<EventState>,
    transitions: Vec<StateTransition>,
}

impl EventAudit {
    /// Creates a fresh audit trail, starting implicitly at `pending`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current state, or `pending` if no transition has
    /// occurred yet.
    #[must_use]
    pub fn current_state(&self) -> EventState {
        self.current.unwrap_or(EventState::Pending)
    }

    /// Returns the recorded transitions in order.
    #[must_use]
    pub fn transitions(&self) -> &[StateTransition] {
        &self.transitions
    }

    /// Applies a transition to `to`, appending a record.
    ///
    /// # Errors
    ///
    /// Returns [`TerminalStateError`] if the event is already in a terminal
    /// state.
    pub fn transition(
        &mut self,
        to: EventState,
        ts_ms: i64,
        reason: impl Into<String>,
    ) -> Result<(), TerminalStateError> {
        let from = self.current_state();
        if is_terminal(from) {
            return Err(TerminalStateError {
                from,
            });
        }
        self.transitions.push(StateTransition {
            from,
            to,
            ts_ms,
            reason: reason.into(),
        });
        self.current = Some(to);
        Ok(())
    }
}

/// Returns true when `state` is terminal (no further transition is valid).
#[must_use]
pub const fn is_terminal(state: EventState) -> bool {
    !matches!(state, EventState::Pending)
}

#[cfg(test)]
mod tests {
    use super::EventAudit;
    use crate::decision::EventState;

    #[test]
    fn validation_failure_discards() {
        let mut audit = EventAudit::new();
        audit.transition(EventState::Discarded, 1, "validation_failed").expect("transition");
        assert_eq!(audit.current_state(), EventState::Discarded);
        assert_eq!(audit.transitions().len(), 1);
    }

    #[test]
    fn terminal_states_reject_further_transitions() {
        let mut audit = EventAudit::new();
        audit.transition(EventState::Discarded, 1, "duplicate").expect("transition");
        let err = audit.transition(EventState::Processed, 2, "late").expect_err("should fail");
        assert_eq!(err.from, EventState::Discarded);
    }

    #[test]
    fn processed_is_reachable_directly_from_pending() {
        let mut audit = EventAudit::new();
        audit.transition(EventState::Processed, 5, "persisted").expect("transition");
        assert_eq!(audit.current_state(), EventState::Processed);
    }
}
