//! Errors raised while running a state machine.

use anyhow::anyhow;
use thiserror::Error;

/// An error during the execution of a state machine.
#[derive(Error, Debug)]
pub enum StateMachineError {
    /// The state machine already reached its final state.
    #[error("final state")]
    Finished,

    /// A transition was attempted on a state that is not completed.
    #[error("state is not completed")]
    StateIsNotCompleted,

    /// Any unexpected error raised by the state's own logic.
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl From<InvalidStateError> for StateMachineError {
    fn from(_: InvalidStateError) -> Self {
        StateMachineError::UnexpectedError(anyhow!("invalid state has been reached"))
    }
}

impl From<StateUnavailableError> for StateMachineError {
    fn from(error: StateUnavailableError) -> Self {
        StateMachineError::UnexpectedError(anyhow!("{error}"))
    }
}

/// An invalid state transition occurred.
#[derive(Debug, Error)]
#[error("invalid state")]
pub struct InvalidStateError;

/// The state machine's state is unavailable.
///
/// Either the machine reached a terminal state, or an earlier transition
/// failed and took the state with it.
#[derive(Debug, Error)]
#[error("state unavailable: {0}")]
pub struct StateUnavailableError(pub &'static str);
