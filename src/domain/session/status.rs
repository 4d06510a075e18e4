//! Session lifecycle states.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::StateMachine;

/// `created → active ⇄ paused → {completed | cancelled}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Created,
    Active,
    Paused,
    Completed,
    Cancelled,
}

impl SessionStatus {
    /// Messages and uploads are accepted in these states.
    pub fn accepts_input(&self) -> bool {
        matches!(self, SessionStatus::Created | SessionStatus::Active)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionStatus::Created => "created",
            SessionStatus::Active => "active",
            SessionStatus::Paused => "paused",
            SessionStatus::Completed => "completed",
            SessionStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

impl StateMachine for SessionStatus {
    fn valid_transitions(&self) -> Vec<Self> {
        use SessionStatus::*;
        match self {
            Created => vec![Active],
            Active => vec![Paused, Completed, Cancelled],
            Paused => vec![Active, Cancelled],
            Completed | Cancelled => vec![],
        }
    }
}
