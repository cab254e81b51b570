use crate::CoreError;
use std::fmt;

/// Where one node-auth reconciliation stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileState {
    Waiting,
    Attempting,
    Succeeded,
    Aborted,
    TimedOut,
}

impl ReconcileState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Aborted | Self::TimedOut)
    }
}

impl fmt::Display for ReconcileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Waiting => "waiting",
            Self::Attempting => "attempting",
            Self::Succeeded => "succeeded",
            Self::Aborted => "aborted",
            Self::TimedOut => "timed-out",
        };
        f.write_str(s)
    }
}

pub fn validate_transition(from: ReconcileState, to: ReconcileState) -> Result<(), CoreError> {
    use ReconcileState::{Aborted, Attempting, Succeeded, TimedOut, Waiting};

    let valid = matches!(
        (from, to),
        (Waiting, Attempting | Aborted | TimedOut)
            | (Attempting, Waiting | Succeeded | Aborted | TimedOut)
    );

    if valid {
        Ok(())
    } else {
        Err(CoreError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}
