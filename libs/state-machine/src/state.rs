//! A state machine's state.

use crate::{
    errors::{InvalidStateError, StateMachineError},
    sm::StateMachineOutput,
};
use serde::{de::DeserializeOwned, Serialize};

pub use crate::message::{Recipient, RecipientMessage};

/// The state of a message-driven protocol.
///
/// Implement this for an enum with one variant per protocol round. Each
/// variant accumulates peer messages until
/// [`is_completed`][StateMachineState::is_completed] holds, at which point
/// [`try_next`][StateMachineState::try_next] consumes the state and either
/// produces the next round (plus its outgoing messages) or the final result.
pub trait StateMachineState
where
    Self: Sized + std::fmt::Display,
{
    /// The type used to address the recipients of output messages.
    type RecipientId;

    /// The incoming message type.
    ///
    /// Typically an enum with one variant per state that consumes it.
    type InputMessage: Serialize + DeserializeOwned + Clone + Send;

    /// The outgoing message type.
    ///
    /// Handling one input message can produce any number of these, addressed
    /// to other parties running the same protocol.
    type OutputMessage: Serialize + DeserializeOwned + Clone + Send;

    /// Whatever comes out of the state machine once it finishes.
    ///
    /// Protocols that can abort (a failed consistency check, for instance)
    /// make this an enum covering both outcomes.
    type FinalResult: Send;

    /// Checks whether the current state has everything it needs to advance.
    fn is_completed(&self) -> bool;

    /// Advances to the next state, consuming the current one.
    fn try_next(self) -> StateMachineStateResult<Self>;

    /// Handles an incoming message.
    ///
    /// This is where the protocol logic lives: store the message's
    /// contribution, advance if the round is complete, and emit whatever
    /// messages the transition produces.
    fn handle_message(self, message: Self::InputMessage) -> StateMachineStateResult<Self>;
}

/// The output of handling one message.
///
/// `handle_message` takes the state by value, so every non-final variant
/// hands the (possibly advanced) state back.
pub enum StateMachineStateOutput<S: StateMachineState> {
    /// The message was absorbed without completing the current round.
    Empty(S),

    /// A transition happened and produced messages for other parties.
    Messages(S, Vec<StateMachineMessage<S>>),

    /// The message belongs to a later round; the caller should buffer it.
    OutOfOrder(S, S::InputMessage),

    /// The state machine finished with this result.
    Final(S::FinalResult),
}

/// What `handle_message` returns.
pub type StateMachineStateResult<S> = Result<StateMachineStateOutput<S>, StateMachineError>;

/// The message type produced by a state machine state.
#[allow(type_alias_bounds)]
pub type StateMachineMessage<S: StateMachineState> = RecipientMessage<S::RecipientId, S::OutputMessage>;

/// Helpers available on every state machine state.
pub trait StateMachineStateExt: StateMachineState {
    /// Advances the state if it is completed, otherwise returns it as-is.
    fn advance_if_completed(self) -> StateMachineStateResult<Self>;

    /// Wraps the messages of an inner machine's output into our own message
    /// type. Final or empty inner outputs carry no messages to wrap.
    fn wrap_message<O, F, W>(
        self,
        output: StateMachineOutput<Self::RecipientId, O, F>,
        wrapper: W,
    ) -> StateMachineStateResult<Self>
    where
        W: Fn(O) -> Self::OutputMessage;
}

impl<T: StateMachineState> StateMachineStateExt for T {
    fn advance_if_completed(self) -> StateMachineStateResult<Self> {
        if self.is_completed() { self.try_next() } else { Ok(StateMachineStateOutput::Empty(self)) }
    }

    fn wrap_message<O, F, W>(
        self,
        output: StateMachineOutput<Self::RecipientId, O, F>,
        wrapper: W,
    ) -> StateMachineStateResult<Self>
    where
        W: Fn(O) -> Self::OutputMessage,
    {
        match output {
            StateMachineOutput::Messages(messages) => {
                let messages = messages.into_iter().map(|message| message.wrap(&wrapper)).collect();
                Ok(StateMachineStateOutput::Messages(self, messages))
            }
            StateMachineOutput::Final(_) => Err(InvalidStateError.into()),
            StateMachineOutput::Empty => Ok(StateMachineStateOutput::Empty(self)),
        }
    }
}
