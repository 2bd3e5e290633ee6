//! Double sharing generation.

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
use std::{collections::HashMap, collections::VecDeque, fmt, sync::Arc};

/// A pair of shares of one random value at two polynomial degrees.
///
/// The degree-`2t` part masks a product share; the degree-`t` part unmasks
/// the reshared result. Both must come from the same underlying value or the
/// multiplication silently corrupts, which is why pairs are generated
/// together and consumed exactly once.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DoubleSharing<T: Prime> {
    /// The degree-`t` share.
    pub degree_t: ModularNumber<T>,

    /// The degree-`2t` share of the same value.
    pub degree_2t: ModularNumber<T>,
}

/// A pool of unconsumed double sharings.
#[derive(Default)]
pub struct DoubleSharingPool<T: Prime> {
    sharings: VecDeque<DoubleSharing<T>>,
}

impl<T: Prime> DoubleSharingPool<T> {
    /// Adds freshly generated sharings to the pool.
    pub fn extend<I: IntoIterator<Item = DoubleSharing<T>>>(&mut self, sharings: I) {
        self.sharings.extend(sharings);
    }

    /// The number of unconsumed sharings.
    pub fn len(&self) -> usize {
        self.sharings.len()
    }

    /// Checks whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.sharings.is_empty()
    }

    /// Takes one sharing out of the pool.
    pub fn pop(&mut self) -> Result<DoubleSharing<T>, PoolExhausted> {
        self.sharings.pop_front().ok_or(PoolExhausted)
    }

    /// Takes `count` sharings out of the pool, or none if not enough are
    /// left.
    pub fn pop_many(&mut self, count: usize) -> Result<Vec<DoubleSharing<T>>, PoolExhausted> {
        if self.sharings.len() < count {
            return Err(PoolExhausted);
        }
        Ok(self.sharings.drain(..count).collect())
    }
}

/// The double sharing pool ran out.
///
/// Consuming more sharings than were generated is a driver bug, not a
/// data-dependent condition.
#[derive(thiserror::Error, Debug)]
#[error("double sharing pool exhausted")]
pub struct PoolExhausted;

/// The double sharing protocol state definitions.
pub mod states {
    use basic_types::jar::PartyJar;
    use math_lib::modular::{ModularNumber, Prime};
    use shamir_sharing::secret_sharer::ShamirSecretSharer;
    use std::sync::Arc;

    /// We are waiting for both-degree shares of every party's random
    /// contribution.
    pub struct WaitingShares<T: Prime> {
        /// The number of double sharings requested.
        pub(crate) element_count: usize,

        /// The number of contribution runs backing the request.
        pub(crate) run_count: usize,

        /// Each party's `(degree-t, degree-2t)` contribution shares.
        pub(crate) party_shares: PartyJar<(Vec<ModularNumber<T>>, Vec<ModularNumber<T>>)>,

        /// The secret sharer to be used.
        pub(crate) secret_sharer: Arc<ShamirSecretSharer<T>>,
    }
}

/// The state machine for double sharing generation.
///
/// Per run, every party samples one random value and deals it twice: once at
/// degree `t` and once at degree `2t`. Applying the same hyper-invertible
/// map to both dealt vectors yields `n - t` output pairs whose halves share
/// an underlying value, because the map is linear and the inputs pair up.
pub enum DoubleSharingState<T: Prime> {
    /// We are waiting for the dealt shares.
    WaitingShares(states::WaitingShares<T>),
}

use DoubleSharingState::*;

impl<T: Prime> DoubleSharingState<T> {
    /// Constructs a new state producing `element_count` double sharings.
    pub fn new(
        element_count: usize,
        secret_sharer: Arc<ShamirSecretSharer<T>>,
    ) -> Result<(Self, Vec<StateMachineMessage<Self>>), DoubleSharingError> {
        let extracted = secret_sharer
            .party_count()
            .checked_sub(secret_sharer.polynomial_degree() as usize)
            .ok_or(DoubleSharingError::IntegerOverflow)?;
        let run_count = element_count
            .checked_add(extracted)
            .and_then(|c| c.checked_sub(1))
            .and_then(|c| c.checked_div(extracted))
            .ok_or(DoubleSharingError::IntegerOverflow)?;
        let contributions: Vec<_> = (0..run_count).map(|_| ModularNumber::<T>::gen_random()).collect();
        let messages = Self::make_messages(contributions, &secret_sharer)?;
        let party_shares = PartyJar::new(secret_sharer.party_count());
        let state = WaitingShares(states::WaitingShares { element_count, run_count, party_shares, secret_sharer });
        Ok((state, messages))
    }

    fn make_messages(
        contributions: Vec<ModularNumber<T>>,
        secret_sharer: &ShamirSecretSharer<T>,
    ) -> Result<Vec<StateMachineMessage<Self>>, DoubleSharingError> {
        // The same values get dealt at both degrees; that is the entire
        // point of a double sharing.
        let mut degree_t: PartyShares<Vec<ModularNumber<T>>> =
            secret_sharer.generate_shares(&contributions, PolyDegree::T)?;
        let mut degree_2t: PartyShares<Vec<ModularNumber<T>>> =
            secret_sharer.generate_shares(&contributions, PolyDegree::TwoT)?;
        let mut messages = Vec::new();
        for party_id in secret_sharer.parties() {
            let t_shares = degree_t.remove(&party_id).unwrap_or_default();
            let two_t_shares = degree_2t.remove(&party_id).unwrap_or_default();
            let contents = DoubleSharingStateMessage {
                degree_t: PrimeField::encode(&t_shares),
                degree_2t: PrimeField::encode(&two_t_shares),
            };
            messages.push(StateMachineMessage::<Self>::new(Recipient::Single(party_id), contents));
        }
        Ok(messages)
    }

    fn handle_message(
        mut state: Self,
        message: PartyMessage<DoubleSharingStateMessage>,
    ) -> StateMachineStateResult<Self> {
        let (party_id, message) = message.into_parts();
        let degree_t = PrimeField::try_decode(&message.degree_t).context("degree-t share decoding")?;
        let degree_2t = PrimeField::try_decode(&message.degree_2t).context("degree-2t share decoding")?;
        let WaitingShares(inner) = &mut state;
        inner.party_shares.add_element(party_id, (degree_t, degree_2t)).context("adding shares")?;
        state.advance_if_completed()
    }

    fn transition_waiting_shares(state: states::WaitingShares<T>) -> StateMachineStateResult<Self> {
        let mut t_runs = vec![HashMap::new(); state.run_count];
        let mut two_t_runs = vec![HashMap::new(); state.run_count];
        for (party_id, (degree_t, degree_2t)) in state.party_shares.into_elements() {
            if degree_t.len() != state.run_count || degree_2t.len() != state.run_count {
                return Err(StateMachineError::UnexpectedError(anyhow!(
                    "expected {} shares per degree, got {}/{}",
                    state.run_count,
                    degree_t.len(),
                    degree_2t.len()
                )));
            }
            for (run, share) in degree_t.into_iter().enumerate() {
                if let Some(bucket) = t_runs.get_mut(run) {
                    bucket.insert(party_id.clone(), share);
                }
            }
            for (run, share) in degree_2t.into_iter().enumerate() {
                if let Some(bucket) = two_t_runs.get_mut(run) {
                    bucket.insert(party_id.clone(), share);
                }
            }
        }
        let mut sharings = Vec::new();
        for (t_shares, two_t_shares) in t_runs.into_iter().zip(two_t_runs.into_iter()) {
            let t_out = state.secret_sharer.hyper_map(t_shares).map_err(|e| anyhow!("degree-t map: {e}"))?;
            let two_t_out =
                state.secret_sharer.hyper_map(two_t_shares).map_err(|e| anyhow!("degree-2t map: {e}"))?;
            for (degree_t, degree_2t) in t_out.into_iter().zip(two_t_out.into_iter()) {
                sharings.push(DoubleSharing { degree_t, degree_2t });
            }
        }
        sharings.truncate(state.element_count);
        Ok(StateMachineStateOutput::Final(sharings))
    }
}

impl<T: Prime> StateMachineState for DoubleSharingState<T> {
    type RecipientId = PartyId;
    type InputMessage = PartyMessage<DoubleSharingStateMessage>;
    type OutputMessage = DoubleSharingStateMessage;
    type FinalResult = Vec<DoubleSharing<T>>;

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

impl<T: Prime> fmt::Display for DoubleSharingState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DoubleSharingState::WaitingShares")
    }
}

/// A message for the double sharing state machine carrying one party's
/// contribution shares at both degrees.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DoubleSharingStateMessage {
    /// The degree-`t` shares, one per run.
    pub degree_t: Vec<EncodedModularNumber>,

    /// The degree-`2t` shares, one per run.
    pub degree_2t: Vec<EncodedModularNumber>,
}

/// An error during the double sharing state construction.
#[derive(thiserror::Error, Debug)]
pub enum DoubleSharingError {
    /// Share generation failed.
    #[error(transparent)]
    GenerateShares(#[from] GenerateSharesError),

    /// Integer arithmetic overflow.
    #[error("integer overflow")]
    IntegerOverflow,
}
