//! Aggregated reveal protocol implementation.

use anyhow::Context;
use basic_types::{jar::PartyJar, PartyMessage};
use math_lib::{
    fields::{Field, PrimeField},
    modular::{EncodedModularNumber, ModularNumber, Prime},
};
use serde::{Deserialize, Serialize};
use shamir_sharing::{
    party::PartyId,
    protocol::RecVectorError,
    secret_sharer::{SecretSharerProperties, ShamirSecretSharer},
};
use state_machine::{
    errors::StateMachineError,
    state::{Recipient, StateMachineMessage},
    StateMachineState, StateMachineStateExt, StateMachineStateOutput, StateMachineStateResult,
};
use std::{fmt, sync::Arc};

/// The indirect reveal protocol state definitions.
pub mod states {
    use basic_types::jar::PartyJar;
    use math_lib::modular::{ModularNumber, Prime};
    use shamir_sharing::{party::PartyId, secret_sharer::ShamirSecretSharer};
    use std::sync::Arc;

    /// The aggregator is waiting for the weighed shares of the first `t+1`
    /// parties.
    pub struct WaitingWeighed<T: Prime> {
        /// The number of secrets being reconstructed.
        pub(crate) secret_count: usize,

        /// The weighed shares, one vector per contributor.
        pub(crate) weighed: PartyJar<Vec<ModularNumber<T>>>,

        /// The secret sharer to be used.
        pub(crate) secret_sharer: Arc<ShamirSecretSharer<T>>,
    }

    /// We are waiting for the aggregator's broadcast of the clear values.
    pub struct WaitingResult<T: Prime> {
        /// The number of secrets being reconstructed.
        pub(crate) secret_count: usize,

        /// The aggregator party.
        pub(crate) aggregator: PartyId,

        /// Holds the broadcast result once it arrives.
        pub(crate) result: PartyJar<Vec<ModularNumber<T>>>,
    }
}

/// The state machine for the indirect reveal protocol.
///
/// The first `t+1` parties send their Lagrange-weighed shares to the first
/// party, which sums them into the clear values and broadcasts those to
/// everyone. Total messages stay linear in the party count, at the price of
/// trusting the aggregator for liveness.
pub enum IndirectRevealState<T: Prime> {
    /// The aggregator is collecting weighed shares.
    WaitingWeighed(states::WaitingWeighed<T>),

    /// We are waiting for the aggregator's broadcast.
    WaitingResult(states::WaitingResult<T>),
}

use IndirectRevealState::*;

impl<T: Prime> IndirectRevealState<T> {
    /// Constructs a new indirect reveal state.
    pub fn new(
        shares: Vec<ModularNumber<T>>,
        secret_sharer: Arc<ShamirSecretSharer<T>>,
    ) -> Result<(Self, Vec<StateMachineMessage<Self>>), IndirectRevealCreateError> {
        let secret_count = shares.len();
        let contributor_count = secret_sharer.polynomial_degree() as usize + 1;
        let aggregator = secret_sharer
            .party_mapper()
            .party_at(0)
            .cloned()
            .ok_or(IndirectRevealCreateError::PartyNotFound)?;
        let local_index = secret_sharer.local_party_index().ok_or(IndirectRevealCreateError::PartyNotFound)?;

        let mut messages = Vec::new();
        if local_index < contributor_count {
            // Weigh with the coefficients of the t+1 window, not the full
            // set: the aggregator sums exactly these contributions.
            let coefficients = secret_sharer.rec_vector(0, contributor_count)?;
            let coefficient =
                coefficients.get(local_index).ok_or(IndirectRevealCreateError::PartyNotFound)?;
            let weighed: Vec<_> = shares.iter().map(|share| *share * coefficient).collect();
            let contents = IndirectRevealStateMessage::Weighed(PrimeField::encode(&weighed));
            messages.push(StateMachineMessage::<Self>::new(Recipient::Single(aggregator.clone()), contents));
        }

        let state = if *secret_sharer.local_party_id() == aggregator {
            WaitingWeighed(states::WaitingWeighed {
                secret_count,
                weighed: PartyJar::new(contributor_count),
                secret_sharer,
            })
        } else {
            WaitingResult(states::WaitingResult { secret_count, aggregator, result: PartyJar::new(1) })
        };
        Ok((state, messages))
    }

    fn handle_message(
        mut state: Self,
        message: PartyMessage<IndirectRevealStateMessage>,
    ) -> StateMachineStateResult<Self> {
        let (party_id, message) = message.into_parts();
        match (message, &mut state) {
            (IndirectRevealStateMessage::Weighed(values), WaitingWeighed(inner)) => {
                let shares = PrimeField::try_decode(&values).context("weighed share decoding")?;
                inner.weighed.add_element(party_id, shares).context("adding weighed shares")?;
                state.advance_if_completed()
            }
            (IndirectRevealStateMessage::Result(values), WaitingResult(inner)) => {
                if party_id != inner.aggregator {
                    return Err(StateMachineError::UnexpectedError(anyhow::anyhow!(
                        "reveal result from non-aggregator {party_id}"
                    )));
                }
                let secrets = PrimeField::try_decode(&values).context("result decoding")?;
                inner.result.add_element(party_id, secrets).context("adding result")?;
                state.advance_if_completed()
            }
            (message, _) => Ok(StateMachineStateOutput::OutOfOrder(state, PartyMessage::new(party_id, message))),
        }
    }

    fn transition_waiting_weighed(state: states::WaitingWeighed<T>) -> StateMachineStateResult<Self> {
        let mut secrets = vec![ModularNumber::ZERO; state.secret_count];
        for (_, weighed) in state.weighed.into_elements() {
            if weighed.len() != state.secret_count {
                return Err(StateMachineError::UnexpectedError(anyhow::anyhow!(
                    "expected {} weighed shares, got {}",
                    state.secret_count,
                    weighed.len()
                )));
            }
            for (secret, share) in secrets.iter_mut().zip(weighed.into_iter()) {
                *secret = *secret + &share;
            }
        }
        let contents = IndirectRevealStateMessage::Result(PrimeField::encode(&secrets));
        let messages = vec![StateMachineMessage::<Self>::new(
            Recipient::Multiple(state.secret_sharer.parties()),
            contents,
        )];
        let aggregator = state.secret_sharer.local_party_id().clone();
        let next_state = WaitingResult(states::WaitingResult {
            secret_count: state.secret_count,
            aggregator,
            result: PartyJar::new(1),
        });
        Ok(StateMachineStateOutput::Messages(next_state, messages))
    }

    fn transition_waiting_result(state: states::WaitingResult<T>) -> StateMachineStateResult<Self> {
        let mut elements = state.result.into_elements();
        match elements.next() {
            Some((_, secrets)) if secrets.len() == state.secret_count => {
                Ok(StateMachineStateOutput::Final(secrets))
            }
            Some((_, secrets)) => Err(StateMachineError::UnexpectedError(anyhow::anyhow!(
                "expected {} secrets, got {}",
                state.secret_count,
                secrets.len()
            ))),
            None => Err(StateMachineError::UnexpectedError(anyhow::anyhow!("result jar empty"))),
        }
    }
}

impl<T: Prime> StateMachineState for IndirectRevealState<T> {
    type RecipientId = PartyId;
    type InputMessage = PartyMessage<IndirectRevealStateMessage>;
    type OutputMessage = IndirectRevealStateMessage;
    type FinalResult = Vec<ModularNumber<T>>;

    fn is_completed(&self) -> bool {
        match self {
            WaitingWeighed(inner) => inner.weighed.is_full(),
            WaitingResult(inner) => inner.result.is_full(),
        }
    }

    fn try_next(self) -> StateMachineStateResult<Self> {
        match self {
            WaitingWeighed(inner) => Self::transition_waiting_weighed(inner),
            WaitingResult(inner) => Self::transition_waiting_result(inner),
        }
    }

    fn handle_message(self, message: Self::InputMessage) -> StateMachineStateResult<Self> {
        Self::handle_message(self, message)
    }
}

impl<T: Prime> fmt::Display for IndirectRevealState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitingWeighed(_) => write!(f, "IndirectRevealState::WaitingWeighed"),
            WaitingResult(_) => write!(f, "IndirectRevealState::WaitingResult"),
        }
    }
}

/// A message for the indirect reveal state machine.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum IndirectRevealStateMessage {
    /// A contributor's Lagrange-weighed shares, addressed to the
    /// aggregator.
    Weighed(Vec<EncodedModularNumber>),

    /// The aggregator's broadcast of the clear values.
    Result(Vec<EncodedModularNumber>),
}

/// An error during the indirect reveal state construction.
#[derive(thiserror::Error, Debug)]
pub enum IndirectRevealCreateError {
    /// A party id was not found.
    #[error("party id not found")]
    PartyNotFound,

    /// The reconstruction vector could not be produced.
    #[error(transparent)]
    RecVector(#[from] RecVectorError),
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects, clippy::panic)]
mod tests {
    use super::*;

    type Prime = math_lib::modular::M61Prime;
    type State = IndirectRevealState<Prime>;

    fn make_secret_sharer(local: usize) -> Arc<ShamirSecretSharer<Prime>> {
        let parties = vec![PartyId::from(1usize), PartyId::from(2usize), PartyId::from(3usize)];
        Arc::new(ShamirSecretSharer::new(PartyId::from(local), 1, parties).unwrap())
    }

    #[test]
    fn contributors_send_to_aggregator() {
        // Party 2 is within the t+1 = 2 window: one message to party 1.
        let sharer = make_secret_sharer(2);
        let (state, messages) = State::new(vec![ModularNumber::from_u32(5)], sharer).unwrap();
        assert!(matches!(state, WaitingResult(_)));
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].recipient(), &Recipient::Single(PartyId::from(1usize)));
    }

    #[test]
    fn outsiders_only_listen() {
        // Party 3 is outside the window: no messages at all.
        let sharer = make_secret_sharer(3);
        let (state, messages) = State::new(vec![ModularNumber::from_u32(5)], sharer).unwrap();
        assert!(matches!(state, WaitingResult(_)));
        assert!(messages.is_empty());
    }

    #[test]
    fn aggregator_collects() {
        let sharer = make_secret_sharer(1);
        let (state, messages) = State::new(vec![ModularNumber::from_u32(5)], sharer).unwrap();
        assert!(matches!(state, WaitingWeighed(_)));
        // The aggregator contributes too, via a message to itself.
        assert_eq!(messages.len(), 1);
    }

    #[test]
    fn result_from_non_aggregator_rejected() {
        let sharer = make_secret_sharer(3);
        let (state, _) = State::new(vec![ModularNumber::from_u32(5)], sharer).unwrap();
        let message = PartyMessage::new(
            PartyId::from(2usize),
            IndirectRevealStateMessage::Result(vec![ModularNumber::<Prime>::from_u32(1).encode()]),
        );
        assert!(state.handle_message(message).is_err());
    }
}
