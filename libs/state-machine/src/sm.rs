//! State machine driver.

use crate::{
    errors::{InvalidStateError, StateMachineError, StateUnavailableError},
    state::{RecipientMessage, StateMachineMessage, StateMachineState, StateMachineStateOutput},
};
use std::fmt::Formatter;

// Wraps the state so we can tell apart "gone because finished" from "gone
// because a transition died halfway" when producing errors.
enum StateMachineInner<S> {
    Taken,
    State(S),
    Finalized,
}

impl<S> StateMachineInner<S> {
    fn state(&self) -> Result<&S, StateUnavailableError> {
        if let Self::State(state) = self { Ok(state) } else { Err(self.as_error()) }
    }

    fn take_state(&mut self) -> Result<S, StateUnavailableError> {
        let state = std::mem::replace(self, StateMachineInner::Taken);
        if let Self::State(state) = state { Ok(state) } else { Err(state.as_error()) }
    }

    fn as_error(&self) -> StateUnavailableError {
        let detail = match self {
            Self::Taken => "state is taken",
            Self::Finalized => "state machine reached terminal state",
            Self::State(_) => "internal error",
        };
        StateUnavailableError(detail)
    }
}

/// Drives a [StateMachineState] without the caller having to deal with the
/// by-value trait functions.
///
/// Messages that arrive for a round the machine has not reached yet are kept
/// aside and replayed after every transition; this is what allows a caller to
/// interleave independent protocol batches.
pub struct StateMachine<S: StateMachineState> {
    inner: StateMachineInner<S>,
    out_of_order_messages: Vec<S::InputMessage>,
}

impl<S: StateMachineState> StateMachine<S> {
    /// Creates a new state machine.
    pub fn new(initial_state: S) -> Self {
        StateMachine { inner: StateMachineInner::State(initial_state), out_of_order_messages: Vec::new() }
    }

    /// A reference to the current state.
    ///
    /// Fails once the machine finished or a transition failed terminally.
    pub fn state(&self) -> Result<&S, StateUnavailableError> {
        self.inner.state()
    }

    /// Checks whether the current state is completed.
    pub fn is_state_completed(&self) -> bool {
        match self.inner.state() {
            Ok(state) => state.is_completed(),
            // A consumed state has nothing left to wait for.
            Err(_) => true,
        }
    }

    /// Checks whether the machine reached its final state.
    pub fn is_finished(&self) -> bool {
        matches!(&self.inner, StateMachineInner::Finalized)
    }

    /// Feeds one message into the underlying state and returns its output.
    pub fn handle_message(&mut self, message: S::InputMessage) -> Result<HandleOutput<S>, StateMachineError> {
        let state = self.inner.take_state()?;
        let output = state.handle_message(message)?;
        let output = self.apply_state_output(output);

        // A transition may unlock buffered messages for the state we just
        // moved into; replay them before handing control back.
        if let StateMachineOutput::Messages(output_messages) = output {
            self.apply_out_of_order_messages(output_messages)
        } else {
            Ok(output)
        }
    }

    fn apply_state_output(&mut self, output: StateMachineStateOutput<S>) -> HandleOutput<S> {
        match output {
            StateMachineStateOutput::Empty(state) => {
                self.inner = StateMachineInner::State(state);
                StateMachineOutput::Empty
            }
            StateMachineStateOutput::Messages(state, messages) => {
                tracing::trace!("state transitioned into {state}");
                self.inner = StateMachineInner::State(state);
                StateMachineOutput::Messages(messages)
            }
            StateMachineStateOutput::OutOfOrder(state, message) => {
                self.inner = StateMachineInner::State(state);
                self.out_of_order_messages.push(message);
                StateMachineOutput::Empty
            }
            StateMachineStateOutput::Final(output) => {
                tracing::trace!("state machine finalized");
                self.inner = StateMachineInner::Finalized;
                StateMachineOutput::Final(output)
            }
        }
    }

    // Replays buffered messages, accumulating any messages new transitions
    // produce. More than one transition can happen here: if every message
    // for round N arrived before the last one for round N - 1, that last
    // message pushes the machine through both rounds at once.
    fn apply_out_of_order_messages(
        &mut self,
        mut output_messages: Vec<StateMachineMessage<S>>,
    ) -> Result<HandleOutput<S>, StateMachineError> {
        let pending_messages = std::mem::take(&mut self.out_of_order_messages).into_iter();
        for message in pending_messages {
            match self.handle_message(message)? {
                StateMachineOutput::Messages(messages) => output_messages.extend(messages),
                StateMachineOutput::Final(output) => {
                    self.inner = StateMachineInner::Finalized;
                    return Ok(StateMachineOutput::Final(output));
                }
                StateMachineOutput::Empty => (),
            };
        }
        Ok(StateMachineOutput::Messages(output_messages))
    }
}

impl<S: StateMachineState> std::fmt::Display for StateMachine<S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "StateMachine(")?;
        match &self.inner {
            StateMachineInner::Taken => write!(f, "Taken")?,
            StateMachineInner::State(state) => write!(f, "{state}")?,
            StateMachineInner::Finalized => write!(f, "Finalized")?,
        }
        write!(f, ")")
    }
}

/// The output of driving a state machine: the same variants as
/// [StateMachineStateOutput] minus the state itself, which stays inside the
/// machine.
#[derive(Debug)]
pub enum StateMachineOutput<R, O, F> {
    /// Messages that must be forwarded to other participants.
    Messages(Vec<RecipientMessage<R, O>>),

    /// The machine's final output.
    Final(F),

    /// Nothing to do.
    Empty,
}

impl<R, O, F> StateMachineOutput<R, O, F> {
    /// Extracts the final output, failing on any other variant.
    pub fn into_final(self) -> Result<F, InvalidStateError> {
        match self {
            Self::Final(output) => Ok(output),
            _ => Err(InvalidStateError),
        }
    }

    /// Extracts the output messages, failing on any other variant.
    pub fn into_messages(self) -> Result<Vec<RecipientMessage<R, O>>, InvalidStateError> {
        match self {
            Self::Messages(messages) => Ok(messages),
            _ => Err(InvalidStateError),
        }
    }

    /// Asserts the output is empty.
    pub fn into_empty(self) -> Result<(), InvalidStateError> {
        match self {
            Self::Empty => Ok(()),
            _ => Err(InvalidStateError),
        }
    }
}

/// An alias deriving the driver output from a state type.
#[allow(type_alias_bounds)]
pub type HandleOutput<S: StateMachineState> = StateMachineOutput<S::RecipientId, S::OutputMessage, S::FinalResult>;
