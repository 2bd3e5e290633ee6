//! RAN protocol implementation.

use anyhow::{anyhow, Context};
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
    errors::StateMachineError,
    state::{Recipient, StateMachineMessage},
    StateMachineState, StateMachineStateExt, StateMachineStateOutput, StateMachineStateResult,
};
use std::{collections::HashMap, fmt, sync::Arc};

/// The RAN protocol state definitions.
pub mod states {
    use basic_types::jar::PartyJar;
    use math_lib::modular::{ModularNumber, Prime};
    use shamir_sharing::secret_sharer::ShamirSecretSharer;
    use std::sync::Arc;

    /// We are waiting for every party's shares of its random contributions.
    pub struct WaitingShares<T: Prime> {
        /// The number of random shares requested.
        pub(crate) element_count: usize,

        /// The number of contribution runs backing the request.
        pub(crate) run_count: usize,

        /// Each party's contribution shares, one per run.
        pub(crate) party_shares: PartyJar<Vec<ModularNumber<T>>>,

        /// The secret sharer to be used.
        pub(crate) secret_sharer: Arc<ShamirSecretSharer<T>>,
    }
}

/// The state machine for the RAN protocol.
///
/// Each run has every party deal a degree-`t` sharing of a fresh random
/// value; applying the hyper-invertible map to the dealt shares extracts
/// `n - t` shares of values that stay uniformly random as long as `n - t`
/// parties sampled honestly, at the price of one all-to-all round per batch.
pub enum RandomSharesState<T: Prime> {
    /// We are waiting for the dealt shares.
    WaitingShares(states::WaitingShares<T>),
}

use RandomSharesState::*;

impl<T: Prime> RandomSharesState<T> {
    /// Constructs a new RAN state producing `element_count` random shares.
    pub fn new(
        element_count: usize,
        secret_sharer: Arc<ShamirSecretSharer<T>>,
    ) -> Result<(Self, Vec<StateMachineMessage<Self>>), RandomSharesError> {
        // Each run extracts m = n - t elements; a request for c elements
        // needs ceil(c / m) runs.
        let extracted = secret_sharer
            .party_count()
            .checked_sub(secret_sharer.polynomial_degree() as usize)
            .ok_or(RandomSharesError::IntegerOverflow)?;
        let run_count = element_count
            .checked_add(extracted)
            .and_then(|c| c.checked_sub(1))
            .and_then(|c| c.checked_div(extracted))
            .ok_or(RandomSharesError::IntegerOverflow)?;
        let contributions: Vec<_> = (0..run_count).map(|_| ModularNumber::<T>::gen_random()).collect();
        let messages = Self::make_messages(contributions, &secret_sharer)?;
        let party_shares = PartyJar::new(secret_sharer.party_count());
        let state = WaitingShares(states::WaitingShares { element_count, run_count, party_shares, secret_sharer });
        Ok((state, messages))
    }

    fn make_messages(
        contributions: Vec<ModularNumber<T>>,
        secret_sharer: &ShamirSecretSharer<T>,
    ) -> Result<Vec<StateMachineMessage<Self>>, RandomSharesError> {
        let party_shares: PartyShares<Vec<ModularNumber<T>>> =
            secret_sharer.generate_shares(&contributions, PolyDegree::T)?;
        let mut messages = Vec::new();
        for (party_id, shares) in party_shares {
            let contents = RandomSharesStateMessage(PrimeField::encode(&shares));
            messages.push(StateMachineMessage::<Self>::new(Recipient::Single(party_id), contents));
        }
        Ok(messages)
    }

    fn handle_message(
        mut state: Self,
        message: PartyMessage<RandomSharesStateMessage>,
    ) -> StateMachineStateResult<Self> {
        let (party_id, message) = message.into_parts();
        let shares = PrimeField::try_decode(&message.0).context("share decoding")?;
        let WaitingShares(inner) = &mut state;
        inner.party_shares.add_element(party_id, shares).context("adding shares")?;
        state.advance_if_completed()
    }

    fn transition_waiting_shares(state: states::WaitingShares<T>) -> StateMachineStateResult<Self> {
        let mut run_shares = vec![HashMap::new(); state.run_count];
        for (party_id, party_shares) in state.party_shares.into_elements() {
            if party_shares.len() != state.run_count {
                return Err(StateMachineError::UnexpectedError(anyhow!(
                    "expected {} shares, got {}",
                    state.run_count,
                    party_shares.len()
                )));
            }
            for (run, share) in party_shares.into_iter().enumerate() {
                if let Some(bucket) = run_shares.get_mut(run) {
                    bucket.insert(party_id.clone(), share);
                }
            }
        }
        let mut output_shares = Vec::new();
        for shares in run_shares {
            let extracted =
                state.secret_sharer.hyper_map(shares).map_err(|e| anyhow!("failed to map shares: {e}"))?;
            output_shares.extend(extracted);
        }
        output_shares.truncate(state.element_count);
        Ok(StateMachineStateOutput::Final(output_shares))
    }
}

impl<T: Prime> StateMachineState for RandomSharesState<T> {
    type RecipientId = PartyId;
    type InputMessage = PartyMessage<RandomSharesStateMessage>;
    type OutputMessage = RandomSharesStateMessage;
    type FinalResult = Vec<ModularNumber<T>>;

    fn is_completed(&self) -> bool {
        let WaitingShares(inner) = self;
        inner.party_shares.is_full()
    }

    fn try_next(self) -> StateMachineStateResult<Self> {
        let WaitingShares(inner) = self;
        Self::transition_waiting_shares(inner)
    }

    fn handle_message(self, message: Self::InputMessage) -> StateMachineStateResult<Self> {
        Self::handle_message(self, message)
    }
}

impl<T: Prime> fmt::Display for RandomSharesState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RandomSharesState::WaitingShares")
    }
}

/// A message for the RAN state machine carrying one party's contribution
/// shares.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RandomSharesStateMessage(pub Vec<EncodedModularNumber>);

/// An error during the RAN state construction.
#[derive(thiserror::Error, Debug)]
pub enum RandomSharesError {
    /// Share generation failed.
    #[error(transparent)]
    GenerateShares(#[from] GenerateSharesError),

    /// Integer arithmetic overflow.
    #[error("integer overflow")]
    IntegerOverflow,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use math_lib::modular::M61Prime;
    use state_machine::StateMachine;

    type Prime = M61Prime;
    type State = RandomSharesState<Prime>;
    use math_lib::fields::Field as _;
    type Field = PrimeField<Prime>;

    fn make_secret_sharer() -> Arc<ShamirSecretSharer<Prime>> {
        let parties = vec![PartyId::from(10usize), PartyId::from(20usize), PartyId::from(30usize)];
        Arc::new(ShamirSecretSharer::new(parties[0].clone(), 1, parties).unwrap())
    }

    #[test]
    fn run_count_covers_request() {
        // n = 3, t = 1 extracts 2 elements per run; 3 elements need 2 runs.
        let sharer = make_secret_sharer();
        let (state, messages) = State::new(3, sharer).unwrap();
        assert_eq!(messages.len(), 3);
        let WaitingShares(inner) = &state;
        assert_eq!(inner.run_count, 2);
    }

    #[test]
    fn extraction_is_linear_in_contributions() {
        let sharer = make_secret_sharer();
        let mut sm = StateMachine::new(State::new(2, sharer).unwrap().0);

        sm.handle_message(PartyMessage::new(
            PartyId::from(10usize),
            RandomSharesStateMessage(Field::encode(&[ModularNumber::from_u32(10)])),
        ))
        .unwrap();
        sm.handle_message(PartyMessage::new(
            PartyId::from(20usize),
            RandomSharesStateMessage(Field::encode(&[ModularNumber::from_u32(20)])),
        ))
        .unwrap();
        let shares = sm
            .handle_message(PartyMessage::new(
                PartyId::from(30usize),
                RandomSharesStateMessage(Field::encode(&[ModularNumber::from_u32(30)])),
            ))
            .unwrap()
            .into_final()
            .unwrap();

        // One run extracts n - t = 2 elements; the first Vandermonde column
        // is all ones so the first output is the plain sum.
        assert_eq!(shares.len(), 2);
        assert_eq!(shares[0], ModularNumber::from_u32(60));
    }

    #[test]
    fn mismatched_share_count_detected() {
        let sharer = make_secret_sharer();
        let mut sm = StateMachine::new(State::new(2, sharer).unwrap().0);
        // One run expected, two shares provided.
        sm.handle_message(PartyMessage::new(
            PartyId::from(10usize),
            RandomSharesStateMessage(Field::encode(&[ModularNumber::from_u32(1), ModularNumber::from_u32(2)])),
        ))
        .unwrap();
        sm.handle_message(PartyMessage::new(
            PartyId::from(20usize),
            RandomSharesStateMessage(Field::encode(&[ModularNumber::from_u32(1), ModularNumber::from_u32(2)])),
        ))
        .unwrap();
        let result = sm.handle_message(PartyMessage::new(
            PartyId::from(30usize),
            RandomSharesStateMessage(Field::encode(&[ModularNumber::from_u32(1), ModularNumber::from_u32(2)])),
        ));
        assert!(result.is_err());
    }
}
