//! Broadcast reveal protocol implementation.

use anyhow::Context;
use basic_types::{jar::PartyJar, PartyMessage};
use math_lib::{
    fields::{Field, PrimeField},
    modular::{EncodedModularNumber, ModularNumber, Prime},
};
use serde::{Deserialize, Serialize};
use shamir_sharing::{
    party::PartyId,
    protocol::RecoverSecretError,
    secret_sharer::{SecretSharer, SecretSharerProperties, ShamirSecretSharer},
};
use state_machine::{
    errors::StateMachineError,
    state::{Recipient, StateMachineMessage},
    StateMachineState, StateMachineStateExt, StateMachineStateOutput, StateMachineStateResult,
};
use std::{collections::HashMap, fmt, sync::Arc};

/// How the shares are reconstructed once everyone has broadcast.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RevealMode {
    /// Plain reconstruction from the full share set. Right for semi-honest
    /// runs; a wrong share silently shifts the result.
    Direct,

    /// Consistency-checked reconstruction: the value is interpolated from
    /// the first `t+1` shares and every further share must lie on the same
    /// polynomial. An altered share aborts the open instead of corrupting
    /// it; with more than `t` corruptions detection is no longer
    /// guaranteed.
    Robust,
}

/// The outcome of a reveal.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RevealOutput<T: Prime> {
    /// The reconstructed values.
    Secrets(Vec<ModularNumber<T>>),

    /// The sharing was inconsistent: some party broadcast an altered share.
    ///
    /// The computation cannot proceed; no value is returned because the
    /// correct one cannot be told apart from the corrupted one.
    InconsistentSharing,
}

impl<T: Prime> RevealOutput<T> {
    /// Extracts the secrets, turning a detected inconsistency into an
    /// error.
    pub fn into_secrets(self) -> Result<Vec<ModularNumber<T>>, InconsistentSharing> {
        match self {
            Self::Secrets(secrets) => Ok(secrets),
            Self::InconsistentSharing => Err(InconsistentSharing),
        }
    }
}

/// A reveal detected an inconsistent sharing.
#[derive(Debug, thiserror::Error)]
#[error("inconsistent sharing detected during reveal")]
pub struct InconsistentSharing;

/// The reveal protocol state definitions.
pub mod states {
    use super::RevealMode;
    use basic_types::jar::PartyJar;
    use math_lib::modular::{ModularNumber, Prime};
    use shamir_sharing::secret_sharer::ShamirSecretSharer;
    use std::sync::Arc;

    /// We are waiting for every party's broadcast shares.
    pub struct WaitingShares<T: Prime> {
        /// The reconstruction mode.
        pub(crate) mode: RevealMode,

        /// The number of secrets being reconstructed.
        pub(crate) secret_count: usize,

        /// The shares of each party.
        pub(crate) party_shares: PartyJar<Vec<ModularNumber<T>>>,

        /// The secret sharer used for reconstruction.
        pub(crate) secret_sharer: Arc<ShamirSecretSharer<T>>,
    }
}

/// The state machine for the broadcast reveal protocol.
///
/// Every party broadcasts its shares to every other party and reconstructs
/// locally; there is no aggregator to trust or to lose.
pub enum RevealState<T: Prime> {
    /// We are waiting for the broadcast shares.
    WaitingShares(states::WaitingShares<T>),
}

use RevealState::*;

impl<T: Prime> RevealState<T> {
    /// Constructs a new reveal state.
    pub fn new(
        mode: RevealMode,
        shares: Vec<ModularNumber<T>>,
        secret_sharer: Arc<ShamirSecretSharer<T>>,
    ) -> (Self, Vec<StateMachineMessage<Self>>) {
        let secret_count = shares.len();
        let message = RevealStateMessage(PrimeField::encode(&shares));
        let messages =
            vec![StateMachineMessage::<Self>::new(Recipient::Multiple(secret_sharer.parties()), message)];
        let party_shares = PartyJar::new(secret_sharer.party_count());
        let state = WaitingShares(states::WaitingShares { mode, secret_count, party_shares, secret_sharer });
        (state, messages)
    }

    fn handle_message(mut state: Self, message: PartyMessage<RevealStateMessage>) -> StateMachineStateResult<Self> {
        let (party_id, message) = message.into_parts();
        let shares = PrimeField::try_decode(&message.0).context("share decoding")?;
        let WaitingShares(inner) = &mut state;
        inner.party_shares.add_element(party_id, shares).context("adding shares")?;
        state.advance_if_completed()
    }

    fn transition_waiting_shares(state: states::WaitingShares<T>) -> StateMachineStateResult<Self> {
        let mut secret_shares = vec![HashMap::new(); state.secret_count];
        for (party_id, shares) in state.party_shares.into_elements() {
            if shares.len() != state.secret_count {
                return Err(StateMachineError::UnexpectedError(anyhow::anyhow!(
                    "expected {} shares, got {}",
                    state.secret_count,
                    shares.len()
                )));
            }
            for (index, share) in shares.into_iter().enumerate() {
                if let Some(bucket) = secret_shares.get_mut(index) {
                    bucket.insert(party_id.clone(), share);
                }
            }
        }
        let mut secrets = Vec::new();
        for shares in secret_shares {
            let recovered = match state.mode {
                RevealMode::Direct => state.secret_sharer.recover(shares),
                RevealMode::Robust => state.secret_sharer.recover_robust(shares),
            };
            match recovered {
                Ok(secret) => secrets.push(secret),
                Err(RecoverSecretError::Inconsistent) => {
                    return Ok(StateMachineStateOutput::Final(RevealOutput::InconsistentSharing));
                }
                Err(e) => {
                    return Err(StateMachineError::UnexpectedError(anyhow::anyhow!(
                        "failed to reconstruct: {e}"
                    )));
                }
            }
        }
        Ok(StateMachineStateOutput::Final(RevealOutput::Secrets(secrets)))
    }
}

impl<T: Prime> StateMachineState for RevealState<T> {
    type RecipientId = PartyId;
    type InputMessage = PartyMessage<RevealStateMessage>;
    type OutputMessage = RevealStateMessage;
    type FinalResult = RevealOutput<T>;

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

impl<T: Prime> fmt::Display for RevealState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RevealState::WaitingShares")
    }
}

/// A message for the reveal state machine carrying one party's broadcast
/// shares.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RevealStateMessage(pub Vec<EncodedModularNumber>);

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use shamir_sharing::protocol::PolyDegree;
    use shamir_sharing::secret_sharer::PartyShares;
    use state_machine::StateMachine;

    type Prime = math_lib::modular::M61Prime;
    type State = RevealState<Prime>;
    use math_lib::fields::Field as _;
    type Field = PrimeField<Prime>;

    fn make_secret_sharer() -> Arc<ShamirSecretSharer<Prime>> {
        let parties = vec![PartyId::from(10usize), PartyId::from(20usize), PartyId::from(30usize)];
        Arc::new(ShamirSecretSharer::new(parties[0].clone(), 1, parties).unwrap())
    }

    #[test]
    fn broadcast_to_everyone() {
        let sharer = make_secret_sharer();
        let shares = vec![ModularNumber::ONE, ModularNumber::two()];
        let (_, messages) = State::new(RevealMode::Direct, shares, sharer.clone());
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].recipient(), &Recipient::Multiple(sharer.parties()));
    }

    #[test]
    fn direct_reconstruction() {
        let sharer = make_secret_sharer();
        let secrets = vec![ModularNumber::from_u32(1337), ModularNumber::from_u32(42)];
        let dealt: PartyShares<Vec<ModularNumber<Prime>>> =
            sharer.generate_shares(&secrets, PolyDegree::T).unwrap();

        let own = dealt[sharer.local_party_id()].clone();
        let mut sm = StateMachine::new(State::new(RevealMode::Direct, own, sharer.clone()).0);
        let mut result = None;
        for (party, shares) in &dealt {
            let output = sm
                .handle_message(PartyMessage::new(party.clone(), RevealStateMessage(Field::encode(shares))))
                .unwrap();
            if let state_machine::StateMachineOutput::Final(output) = output {
                result = Some(output);
            }
        }
        assert_eq!(result.unwrap(), RevealOutput::Secrets(secrets));
    }

    #[test]
    fn robust_detects_altered_share() {
        let sharer = make_secret_sharer();
        let secrets = vec![ModularNumber::from_u32(99)];
        let mut dealt: PartyShares<Vec<ModularNumber<Prime>>> =
            sharer.generate_shares(&secrets, PolyDegree::T).unwrap();

        // Corrupt the last party's share.
        let victim = PartyId::from(30usize);
        let altered = dealt[&victim][0] + &ModularNumber::ONE;
        dealt.insert(victim, vec![altered]);

        let own = dealt[sharer.local_party_id()].clone();
        let mut sm = StateMachine::new(State::new(RevealMode::Robust, own, sharer).0);
        let mut result = None;
        for (party, shares) in &dealt {
            let output = sm
                .handle_message(PartyMessage::new(party.clone(), RevealStateMessage(Field::encode(shares))))
                .unwrap();
            if let state_machine::StateMachineOutput::Final(output) = output {
                result = Some(output);
            }
        }
        assert_eq!(result.unwrap(), RevealOutput::InconsistentSharing);
    }

    #[test]
    fn inconsistency_is_an_error_to_consumers() {
        let output = RevealOutput::<Prime>::InconsistentSharing;
        assert!(output.into_secrets().is_err());
    }
}
