// src/ir/state_machine.rs

//! State machine fragments produced by generator lowering.
//!
//! A fragment is a small graph of states with a start id and a fallthrough
//! id. The composition driver stitches fragments into one machine per
//! function body; this crate only ever builds single-jump fragments.

use serde::{Deserialize, Serialize};

/// 状态 ID，由 `StateAllocator` 分配。
pub type StateId = usize;

/// One pause/resume point of a generator body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum State {
    /// Unwinds to the construct named by `label`, or to the nearest
    /// enclosing loop or switch when unlabeled.
    Break { id: StateId, label: Option<String> },
    /// Resumes the loop named by `label`, or the nearest enclosing loop.
    Continue { id: StateId, label: Option<String> },
}

impl State {
    pub fn id(&self) -> StateId {
        match self {
            State::Break { id, .. } | State::Continue { id, .. } => *id,
        }
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            State::Break { label, .. } | State::Continue { label, .. } => label.as_deref(),
        }
    }
}

/// An exception-handling region over a set of states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExceptionRegion {
    Catch {
        try_states: Vec<StateId>,
        catch_state: StateId,
        fallthrough_state: StateId,
        identifier: String,
    },
    Finally {
        try_states: Vec<StateId>,
        finally_state: StateId,
        fallthrough_state: StateId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateMachine {
    pub start_state: StateId,
    /// Reached on normal exit. Always allocated, even for a lone jump, so the
    /// driver can wire fallthrough edges uniformly.
    pub fallthrough_state: StateId,
    pub states: Vec<State>,
    pub exception_regions: Vec<ExceptionRegion>,
}

impl StateMachine {
    pub fn new(start_state: StateId, fallthrough_state: StateId, states: Vec<State>) -> Self {
        StateMachine {
            start_state,
            fallthrough_state,
            states,
            exception_regions: Vec::new(),
        }
    }

    pub fn state(&self, id: StateId) -> Option<&State> {
        self.states.iter().find(|s| s.id() == id)
    }

    /// Every id the fragment refers to, in allocation order of its fields.
    pub fn state_ids(&self) -> Vec<StateId> {
        let mut ids = vec![self.start_state];
        ids.extend(self.states.iter().map(State::id).filter(|id| *id != self.start_state));
        ids.push(self.fallthrough_state);
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_id() {
        let machine = StateMachine::new(
            3,
            4,
            vec![State::Continue {
                id: 3,
                label: Some("outer".to_string()),
            }],
        );
        let state = machine.state(3).expect("start state present");
        assert_eq!(state.label(), Some("outer"));
        assert!(machine.state(4).is_none());
        assert_eq!(machine.state_ids(), vec![3, 4]);
        assert!(machine.exception_regions.is_empty());
    }
}
