//! Authenticated multiplication: the underlying protocol driven twice in
//! lock-step.

use crate::{
    multiplication::mult_shares::{MultCreateError, MultState, MultStateMessage, OperandShares},
    spdz_wise::share::MacShare,
};
use anyhow::anyhow;
use basic_types::PartyMessage;
use math_lib::modular::Prime;
use serde::{Deserialize, Serialize};
use shamir_sharing::{party::PartyId, secret_sharer::ShamirSecretSharer};
use state_machine::{
    errors::StateMachineError,
    state::StateMachineMessage,
    StateMachine, StateMachineOutput, StateMachineState, StateMachineStateExt, StateMachineStateOutput,
    StateMachineStateResult,
};
use std::{fmt, sync::Arc};

/// The operands of one authenticated multiplication.
///
/// Like [`OperandShares`] both sides are vectors, expressing a dot-product.
#[derive(Clone, Debug)]
pub struct AuthenticatedOperands<T: Prime> {
    /// The authenticated shares of the left operands.
    pub left: Vec<MacShare<T>>,

    /// The authenticated shares of the right operands.
    pub right: Vec<MacShare<T>>,
}

impl<T: Prime> AuthenticatedOperands<T> {
    /// Constructs a new operands value.
    pub fn new(left: Vec<MacShare<T>>, right: Vec<MacShare<T>>) -> Self {
        Self { left, right }
    }

    /// Constructs the operands for a single multiplication.
    pub fn single(left: MacShare<T>, right: MacShare<T>) -> Self {
        Self { left: vec![left], right: vec![right] }
    }
}

/// The SPDZ-wise multiplication state definitions.
pub mod states {
    use crate::multiplication::mult_shares::MultState;
    use math_lib::modular::{ModularNumber, Prime};
    use state_machine::StateMachine;

    /// Both underlying multiplications are in flight.
    pub struct WaitingMults<T: Prime> {
        /// The multiplication of the values.
        pub(crate) value_machine: StateMachine<MultState<T>>,

        /// The multiplication producing the output MACs.
        pub(crate) mac_machine: StateMachine<MultState<T>>,

        /// The value products, once the value machine finishes.
        pub(crate) values: Option<Vec<ModularNumber<T>>>,

        /// The MAC products, once the MAC machine finishes.
        pub(crate) macs: Option<Vec<ModularNumber<T>>>,
    }
}

/// The state machine for authenticated multiplication.
///
/// For `z = x * y` the output MAC must be `alpha * x * y`; multiplying the
/// left operand's MAC share (`alpha * x`) with the right operand's value
/// share produces exactly that. Both multiplications run in the same
/// rounds, so authentication adds bandwidth but no latency.
pub enum SpdzWiseMultState<T: Prime> {
    /// We are waiting for both underlying multiplications.
    WaitingMults(states::WaitingMults<T>),
}

use SpdzWiseMultState::*;

impl<T: Prime> SpdzWiseMultState<T> {
    /// Constructs a new authenticated multiplication state for a batch of
    /// operands.
    pub fn new(
        operands: Vec<AuthenticatedOperands<T>>,
        secret_sharer: Arc<ShamirSecretSharer<T>>,
    ) -> Result<(Self, Vec<StateMachineMessage<Self>>), MultCreateError> {
        let mut value_operands = Vec::with_capacity(operands.len());
        let mut mac_operands = Vec::with_capacity(operands.len());
        for entry in &operands {
            let left_values: Vec<_> = entry.left.iter().map(|share| share.value).collect();
            let left_macs: Vec<_> = entry.left.iter().map(|share| share.mac).collect();
            let right_values: Vec<_> = entry.right.iter().map(|share| share.value).collect();
            value_operands.push(OperandShares::new(left_values, right_values.clone()));
            mac_operands.push(OperandShares::new(left_macs, right_values));
        }
        let (value_state, value_messages) = MultState::new(value_operands, secret_sharer.clone())?;
        let (mac_state, mac_messages) = MultState::new(mac_operands, secret_sharer)?;

        let mut messages: Vec<StateMachineMessage<Self>> = Vec::new();
        messages.extend(value_messages.into_iter().map(|message| message.wrap(SpdzWiseMultStateMessage::Value)));
        messages.extend(mac_messages.into_iter().map(|message| message.wrap(SpdzWiseMultStateMessage::Mac)));

        let state = WaitingMults(states::WaitingMults {
            value_machine: StateMachine::new(value_state),
            mac_machine: StateMachine::new(mac_state),
            values: None,
            macs: None,
        });
        Ok((state, messages))
    }

    fn handle_message(
        mut state: Self,
        message: PartyMessage<SpdzWiseMultStateMessage>,
    ) -> StateMachineStateResult<Self> {
        use SpdzWiseMultStateMessage::*;
        let (party_id, message) = message.into_parts();
        match message {
            Value(message) => {
                let WaitingMults(inner) = &mut state;
                match inner.value_machine.handle_message(PartyMessage::new(party_id, message))? {
                    StateMachineOutput::Final(values) => {
                        inner.values = Some(values);
                        state.advance_if_completed()
                    }
                    output => state.wrap_message(output, Value),
                }
            }
            Mac(message) => {
                let WaitingMults(inner) = &mut state;
                match inner.mac_machine.handle_message(PartyMessage::new(party_id, message))? {
                    StateMachineOutput::Final(macs) => {
                        inner.macs = Some(macs);
                        state.advance_if_completed()
                    }
                    output => state.wrap_message(output, Mac),
                }
            }
        }
    }
}

impl<T: Prime> StateMachineState for SpdzWiseMultState<T> {
    type RecipientId = PartyId;
    type InputMessage = PartyMessage<SpdzWiseMultStateMessage>;
    type OutputMessage = SpdzWiseMultStateMessage;
    type FinalResult = Vec<MacShare<T>>;

    fn is_completed(&self) -> bool {
        let WaitingMults(inner) = self;
        inner.values.is_some() && inner.macs.is_some()
    }

    fn try_next(self) -> StateMachineStateResult<Self> {
        let WaitingMults(inner) = self;
        match (inner.values, inner.macs) {
            (Some(values), Some(macs)) => {
                if values.len() != macs.len() {
                    return Err(StateMachineError::UnexpectedError(anyhow!(
                        "value/mac product counts differ: {} vs {}",
                        values.len(),
                        macs.len()
                    )));
                }
                let results =
                    values.into_iter().zip(macs.into_iter()).map(|(value, mac)| MacShare::new(value, mac)).collect();
                Ok(StateMachineStateOutput::Final(results))
            }
            _ => Err(StateMachineError::StateIsNotCompleted),
        }
    }

    fn handle_message(self, message: Self::InputMessage) -> StateMachineStateResult<Self> {
        Self::handle_message(self, message)
    }
}

impl<T: Prime> fmt::Display for SpdzWiseMultState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SpdzWiseMultState::WaitingMults")
    }
}

/// A message for the SPDZ-wise multiplication state machine.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum SpdzWiseMultStateMessage {
    /// A message for the value multiplication.
    Value(MultStateMessage),

    /// A message for the MAC multiplication.
    Mac(MultStateMessage),
}
