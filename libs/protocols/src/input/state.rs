//! Input protocol implementation.

use anyhow::Context;
use basic_types::{jar::PartyJar, PartyMessage};
use math_lib::{
    fields::{Field, PrimeField},
    modular::{EncodedModularNumber, ModularNumber, Prime},
};
use serde::{Deserialize, Serialize};
use shamir_sharing::{
    party::PartyId,
    protocol::PolyDegree,
    secret_sharer::{GenerateSharesError, PartyShares, SecretSharer, SecretSharerProperties, ShamirSecretSharer},
};
use state_machine::{
    state::{Recipient, StateMachineMessage},
    StateMachineState, StateMachineStateExt, StateMachineStateOutput, StateMachineStateResult,
};
use std::{fmt, sync::Arc};

/// The input protocol state definitions.
pub mod states {
    use basic_types::jar::PartyJar;
    use math_lib::modular::{ModularNumber, Prime};

    /// We are waiting for each party's share of its own contributed values.
    pub struct WaitingShares<T: Prime> {
        /// The shares each party dealt us, indexed by contributor.
        pub(crate) contributions: PartyJar<Vec<ModularNumber<T>>>,
    }
}

/// The state machine for the input protocol.
///
/// Every party contributes zero or more private values. Each value is masked
/// with a fresh random degree-`t` polynomial and one evaluation is dealt to
/// every party; after the single all-to-all round, every party holds one
/// share of every contributed value, in contribution order per contributor.
///
/// A coalition of up to `t` parties learns nothing about the contributed
/// values: `t` points of a fresh degree-`t` polynomial are independent of
/// its constant term.
pub enum InputState<T: Prime> {
    /// We are waiting for the dealt shares.
    WaitingShares(states::WaitingShares<T>),
}

use InputState::*;

impl<T: Prime> InputState<T> {
    /// Constructs a new input protocol state.
    ///
    /// # Arguments
    /// - `my_values` - The private values this party contributes; may be
    ///   empty for parties that only receive.
    /// - `secret_sharer` - The secret sharer bound to the session.
    pub fn new(
        my_values: Vec<ModularNumber<T>>,
        secret_sharer: Arc<ShamirSecretSharer<T>>,
    ) -> Result<(Self, Vec<StateMachineMessage<Self>>), InputCreateError> {
        let messages = Self::make_messages(my_values, &secret_sharer)?;
        let contributions = PartyJar::new(secret_sharer.party_count());
        let state = WaitingShares(states::WaitingShares { contributions });
        Ok((state, messages))
    }

    fn make_messages(
        my_values: Vec<ModularNumber<T>>,
        secret_sharer: &ShamirSecretSharer<T>,
    ) -> Result<Vec<StateMachineMessage<Self>>, InputCreateError> {
        let mut party_shares: PartyShares<Vec<ModularNumber<T>>> =
            secret_sharer.generate_shares(&my_values, PolyDegree::T)?;
        let mut messages = Vec::new();
        // Parties with no contribution still announce themselves so peers
        // know not to wait for them.
        for party_id in secret_sharer.parties() {
            let shares = party_shares.remove(&party_id).unwrap_or_default();
            let contents = InputStateMessage(PrimeField::encode(&shares));
            messages.push(StateMachineMessage::<Self>::new(Recipient::Single(party_id), contents));
        }
        Ok(messages)
    }

    fn handle_message(mut state: Self, message: PartyMessage<InputStateMessage>) -> StateMachineStateResult<Self> {
        let (party_id, message) = message.into_parts();
        let shares = PrimeField::try_decode(&message.0).context("share decoding")?;
        let WaitingShares(inner) = &mut state;
        inner.contributions.add_element(party_id, shares).context("adding shares")?;
        state.advance_if_completed()
    }
}

impl<T: Prime> StateMachineState for InputState<T> {
    type RecipientId = PartyId;
    type InputMessage = PartyMessage<InputStateMessage>;
    type OutputMessage = InputStateMessage;
    type FinalResult = Vec<(PartyId, Vec<ModularNumber<T>>)>;

    fn is_completed(&self) -> bool {
        let WaitingShares(inner) = self;
        inner.contributions.is_full()
    }

    fn try_next(self) -> StateMachineStateResult<Self> {
        let WaitingShares(inner) = self;
        Ok(StateMachineStateOutput::Final(inner.contributions.into_elements().collect()))
    }

    fn handle_message(self, message: Self::InputMessage) -> StateMachineStateResult<Self> {
        Self::handle_message(self, message)
    }
}

impl<T: Prime> fmt::Display for InputState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InputState::WaitingShares")
    }
}

/// A message for the input state machine carrying the shares a contributor
/// dealt to one party.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct InputStateMessage(pub Vec<EncodedModularNumber>);

/// An error during the input state construction.
#[derive(thiserror::Error, Debug)]
pub enum InputCreateError {
    /// Share generation failed.
    #[error(transparent)]
    GenerateShares(#[from] GenerateSharesError),
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use math_lib::modular::M61Prime;
    use state_machine::StateMachine;

    type Prime = M61Prime;
    type State = InputState<Prime>;
    use math_lib::fields::Field as _;
    type Field = PrimeField<Prime>;

    fn make_secret_sharer() -> Arc<ShamirSecretSharer<Prime>> {
        let parties = vec![PartyId::from(1usize), PartyId::from(2usize), PartyId::from(3usize)];
        Arc::new(ShamirSecretSharer::new(parties[0].clone(), 1, parties).unwrap())
    }

    #[test]
    fn one_message_per_party() {
        let sharer = make_secret_sharer();
        let values = vec![ModularNumber::from_u32(42), ModularNumber::from_u32(7)];
        let (_, messages) = State::new(values, sharer.clone()).unwrap();
        assert_eq!(messages.len(), 3);
        for message in &messages {
            assert_eq!(message.contents().0.len(), 2);
        }
    }

    #[test]
    fn empty_contribution_still_announced() {
        let sharer = make_secret_sharer();
        let (_, messages) = State::new(Vec::new(), sharer).unwrap();
        assert_eq!(messages.len(), 3);
        assert!(messages.iter().all(|message| message.contents().0.is_empty()));
    }

    #[test]
    fn contributions_collected_in_party_order() {
        let sharer = make_secret_sharer();
        let mut sm = StateMachine::new(State::new(Vec::new(), sharer).unwrap().0);
        assert!(!sm.is_state_completed());

        sm.handle_message(PartyMessage::new(
            PartyId::from(2usize),
            InputStateMessage(Field::encode(&[ModularNumber::from_u32(20)])),
        ))
        .unwrap();
        sm.handle_message(PartyMessage::new(PartyId::from(3usize), InputStateMessage(Vec::new()))).unwrap();
        let result = sm
            .handle_message(PartyMessage::new(
                PartyId::from(1usize),
                InputStateMessage(Field::encode(&[ModularNumber::from_u32(10)])),
            ))
            .unwrap()
            .into_final()
            .unwrap();

        assert_eq!(result.len(), 3);
        assert_eq!(result[0], (PartyId::from(1usize), vec![ModularNumber::from_u32(10)]));
        assert_eq!(result[1], (PartyId::from(2usize), vec![ModularNumber::from_u32(20)]));
        assert_eq!(result[2], (PartyId::from(3usize), Vec::new()));
    }
}
