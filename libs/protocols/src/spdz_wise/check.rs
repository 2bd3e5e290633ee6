//! The batched MAC check.

use crate::{
    multiplication::mult_shares::{MultCreateError, MultState, MultStateMessage, OperandShares},
    reveal::state::{RevealMode, RevealOutput, RevealState, RevealStateMessage},
    spdz_wise::share::MacShare,
};
use anyhow::anyhow;
use basic_types::PartyMessage;
use math_lib::modular::{ModularNumber, Prime};
use rand_chacha::{rand_core::SeedableRng, ChaCha20Rng};
use serde::{Deserialize, Serialize};
use shamir_sharing::{party::PartyId, secret_sharer::ShamirSecretSharer};
use state_machine::{
    errors::StateMachineError,
    state::StateMachineMessage,
    StateMachine, StateMachineOutput, StateMachineState, StateMachineStateExt, StateMachineStateOutput,
    StateMachineStateResult,
};
use std::{fmt, sync::Arc};
use subtle::ConstantTimeEq;

/// The outcome of a MAC check.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MacCheckOutput {
    /// Every pending share/MAC pair was consistent.
    Valid,

    /// Some share or MAC was tampered with since the last check.
    ///
    /// The computation must terminate: with the redundancy at hand the
    /// corrupted value cannot be located, let alone corrected.
    MacMismatch,
}

impl MacCheckOutput {
    /// Checks whether the batch verified.
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// The MAC check state definitions.
pub mod states {
    use crate::{multiplication::mult_shares::MultState, reveal::state::RevealState, spdz_wise::share::MacShare};
    use math_lib::modular::{ModularNumber, Prime};
    use shamir_sharing::secret_sharer::ShamirSecretSharer;
    use state_machine::StateMachine;
    use std::sync::Arc;

    /// The coefficient seed is being opened.
    pub struct WaitingSeed<T: Prime> {
        /// The reveal of the seed share.
        pub(crate) reveal_machine: StateMachine<RevealState<T>>,

        /// The opened seed, once the reveal finishes.
        pub(crate) seed: Option<ModularNumber<T>>,

        /// The share/MAC pairs under check.
        pub(crate) pending: Vec<MacShare<T>>,

        /// The MAC key share.
        pub(crate) mac_key: ModularNumber<T>,

        /// The random mask share for the zero check.
        pub(crate) mask: ModularNumber<T>,

        /// The secret sharer to be used.
        pub(crate) secret_sharer: Arc<ShamirSecretSharer<T>>,
    }

    /// The two random linear combinations are being opened.
    pub struct WaitingCombination<T: Prime> {
        /// The reveal of the combined value and combined MAC.
        pub(crate) reveal_machine: StateMachine<RevealState<T>>,

        /// The opened combinations, once the reveal finishes.
        pub(crate) opened: Option<(ModularNumber<T>, ModularNumber<T>)>,

        /// The MAC key share.
        pub(crate) mac_key: ModularNumber<T>,

        /// The random mask share for the zero check.
        pub(crate) mask: ModularNumber<T>,

        /// The secret sharer to be used.
        pub(crate) secret_sharer: Arc<ShamirSecretSharer<T>>,
    }

    /// The masked difference is being multiplied.
    pub struct WaitingProduct<T: Prime> {
        /// The multiplication of mask and difference.
        pub(crate) mult_machine: StateMachine<MultState<T>>,

        /// The product share, once the multiplication finishes.
        pub(crate) product: Option<ModularNumber<T>>,

        /// The secret sharer to be used.
        pub(crate) secret_sharer: Arc<ShamirSecretSharer<T>>,
    }

    /// The masked difference is being opened for the zero check.
    pub struct WaitingZero<T: Prime> {
        /// The reveal of the masked difference.
        pub(crate) reveal_machine: StateMachine<RevealState<T>>,

        /// The opened masked difference, once the reveal finishes.
        pub(crate) opened: Option<ModularNumber<T>>,
    }
}

/// The state machine for the batched MAC check.
///
/// One coefficient per pending pair is expanded from a jointly opened seed;
/// the randomized linear combinations of shares (`w`) and MACs (`u`) are
/// opened, and `u - w * alpha` is verified to be zero without ever opening
/// `alpha`: the difference is computed on shares, blinded by a fresh random
/// mask, multiplied, opened, and compared against zero. A single tampered
/// pair survives only if the random coefficient or the mask hits zero, so
/// cheating is caught except with probability about `2 / |field|`.
pub enum MacCheckState<T: Prime> {
    /// The coefficient seed is being opened.
    WaitingSeed(states::WaitingSeed<T>),

    /// The linear combinations are being opened.
    WaitingCombination(states::WaitingCombination<T>),

    /// The masked difference is being multiplied.
    WaitingProduct(states::WaitingProduct<T>),

    /// The zero check value is being opened.
    WaitingZero(states::WaitingZero<T>),
}

use MacCheckState::*;

impl<T: Prime> MacCheckState<T> {
    /// Constructs a new MAC check over the given pending pairs.
    ///
    /// # Arguments
    /// - `pending` - The share/MAC pairs accumulated since the last check.
    /// - `mac_key` - The share of the MAC key.
    /// - `seed` - A fresh random share to open as the coefficient seed.
    /// - `mask` - A fresh random share blinding the zero check.
    /// - `secret_sharer` - The secret sharer bound to the session.
    pub fn new(
        pending: Vec<MacShare<T>>,
        mac_key: ModularNumber<T>,
        seed: ModularNumber<T>,
        mask: ModularNumber<T>,
        secret_sharer: Arc<ShamirSecretSharer<T>>,
    ) -> Result<(Self, Vec<StateMachineMessage<Self>>), MacCheckCreateError> {
        if pending.is_empty() {
            return Err(MacCheckCreateError::EmptyBatch);
        }
        let (reveal_state, messages) = RevealState::new(RevealMode::Direct, vec![seed], secret_sharer.clone());
        let messages = messages.into_iter().map(|message| message.wrap(MacCheckStateMessage::Seed)).collect();
        let state = WaitingSeed(states::WaitingSeed {
            reveal_machine: StateMachine::new(reveal_state),
            seed: None,
            pending,
            mac_key,
            mask,
            secret_sharer,
        });
        Ok((state, messages))
    }

    fn handle_message(mut state: Self, message: PartyMessage<MacCheckStateMessage>) -> StateMachineStateResult<Self> {
        use MacCheckStateMessage::*;
        let (party_id, message) = message.into_parts();
        match (message, &mut state) {
            (Seed(message), WaitingSeed(inner)) => {
                match inner.reveal_machine.handle_message(PartyMessage::new(party_id, message))? {
                    StateMachineOutput::Final(output) => {
                        inner.seed = Some(Self::single_secret(output)?);
                        state.try_next()
                    }
                    output => state.wrap_message(output, Seed),
                }
            }
            (Combination(message), WaitingCombination(inner)) => {
                match inner.reveal_machine.handle_message(PartyMessage::new(party_id, message))? {
                    StateMachineOutput::Final(output) => {
                        let mut secrets = Self::secrets(output)?.into_iter();
                        let opened = secrets
                            .next()
                            .zip(secrets.next())
                            .ok_or_else(|| anyhow!("expected two opened combinations"))?;
                        inner.opened = Some(opened);
                        state.try_next()
                    }
                    output => state.wrap_message(output, Combination),
                }
            }
            (Product(message), WaitingProduct(inner)) => {
                match inner.mult_machine.handle_message(PartyMessage::new(party_id, message))? {
                    StateMachineOutput::Final(mut products) => {
                        inner.product =
                            Some(products.pop().ok_or_else(|| anyhow!("empty product batch"))?);
                        state.try_next()
                    }
                    output => state.wrap_message(output, Product),
                }
            }
            (Zero(message), WaitingZero(inner)) => {
                match inner.reveal_machine.handle_message(PartyMessage::new(party_id, message))? {
                    StateMachineOutput::Final(output) => {
                        inner.opened = Some(Self::single_secret(output)?);
                        state.try_next()
                    }
                    output => state.wrap_message(output, Zero),
                }
            }
            (message, _) => Ok(StateMachineStateOutput::OutOfOrder(state, PartyMessage::new(party_id, message))),
        }
    }

    fn secrets(output: RevealOutput<T>) -> Result<Vec<ModularNumber<T>>, StateMachineError> {
        output.into_secrets().map_err(|e| StateMachineError::UnexpectedError(anyhow!("{e}")))
    }

    fn single_secret(output: RevealOutput<T>) -> Result<ModularNumber<T>, StateMachineError> {
        let mut secrets = Self::secrets(output)?.into_iter();
        secrets.next().ok_or_else(|| StateMachineError::UnexpectedError(anyhow!("empty reveal output")))
    }

    fn transition_waiting_seed(state: states::WaitingSeed<T>) -> StateMachineStateResult<Self> {
        let seed = state.seed.ok_or_else(|| anyhow!("seed not opened"))?;

        // All parties expand the same coefficients from the opened seed.
        let mut seed_bytes = [0u8; 32];
        for (dst, src) in seed_bytes.iter_mut().zip(seed.into_value().to_le_bytes()) {
            *dst = src;
        }
        let mut rng = ChaCha20Rng::from_seed(seed_bytes);

        let mut combined_value = ModularNumber::ZERO;
        let mut combined_mac = ModularNumber::ZERO;
        for share in &state.pending {
            let coefficient = ModularNumber::<T>::gen_random_with_rng(&mut rng);
            combined_value = combined_value + &(share.value * &coefficient);
            combined_mac = combined_mac + &(share.mac * &coefficient);
        }

        let (reveal_state, messages) =
            RevealState::new(RevealMode::Direct, vec![combined_value, combined_mac], state.secret_sharer.clone());
        let messages =
            messages.into_iter().map(|message| message.wrap(MacCheckStateMessage::Combination)).collect();
        let next_state = WaitingCombination(states::WaitingCombination {
            reveal_machine: StateMachine::new(reveal_state),
            opened: None,
            mac_key: state.mac_key,
            mask: state.mask,
            secret_sharer: state.secret_sharer,
        });
        Ok(StateMachineStateOutput::Messages(next_state, messages))
    }

    fn transition_waiting_combination(state: states::WaitingCombination<T>) -> StateMachineStateResult<Self> {
        let (combined_value, combined_mac) = state.opened.ok_or_else(|| anyhow!("combinations not opened"))?;

        // The difference u - w * alpha is zero exactly when the batch is
        // clean; computing it on shares keeps alpha hidden.
        let difference = combined_mac - &(combined_value * &state.mac_key);
        let operands = vec![OperandShares::single(state.mask, difference)];
        let (mult_state, messages) = MultState::new(operands, state.secret_sharer.clone())
            .map_err(|e| anyhow!("building zero check multiplication: {e}"))?;
        let messages = messages.into_iter().map(|message| message.wrap(MacCheckStateMessage::Product)).collect();
        let next_state = WaitingProduct(states::WaitingProduct {
            mult_machine: StateMachine::new(mult_state),
            product: None,
            secret_sharer: state.secret_sharer,
        });
        Ok(StateMachineStateOutput::Messages(next_state, messages))
    }

    fn transition_waiting_product(state: states::WaitingProduct<T>) -> StateMachineStateResult<Self> {
        let product = state.product.ok_or_else(|| anyhow!("product not ready"))?;
        let (reveal_state, messages) = RevealState::new(RevealMode::Direct, vec![product], state.secret_sharer);
        let messages = messages.into_iter().map(|message| message.wrap(MacCheckStateMessage::Zero)).collect();
        let next_state =
            WaitingZero(states::WaitingZero { reveal_machine: StateMachine::new(reveal_state), opened: None });
        Ok(StateMachineStateOutput::Messages(next_state, messages))
    }

    fn transition_waiting_zero(state: states::WaitingZero<T>) -> StateMachineStateResult<Self> {
        let opened = state.opened.ok_or_else(|| anyhow!("zero check value not opened"))?;
        let valid = bool::from(opened.ct_eq(&ModularNumber::ZERO));
        let output = if valid { MacCheckOutput::Valid } else { MacCheckOutput::MacMismatch };
        Ok(StateMachineStateOutput::Final(output))
    }
}

impl<T: Prime> StateMachineState for MacCheckState<T> {
    type RecipientId = PartyId;
    type InputMessage = PartyMessage<MacCheckStateMessage>;
    type OutputMessage = MacCheckStateMessage;
    type FinalResult = MacCheckOutput;

    fn is_completed(&self) -> bool {
        match self {
            WaitingSeed(inner) => inner.seed.is_some(),
            WaitingCombination(inner) => inner.opened.is_some(),
            WaitingProduct(inner) => inner.product.is_some(),
            WaitingZero(inner) => inner.opened.is_some(),
        }
    }

    fn try_next(self) -> StateMachineStateResult<Self> {
        match self {
            WaitingSeed(inner) => Self::transition_waiting_seed(inner),
            WaitingCombination(inner) => Self::transition_waiting_combination(inner),
            WaitingProduct(inner) => Self::transition_waiting_product(inner),
            WaitingZero(inner) => Self::transition_waiting_zero(inner),
        }
    }

    fn handle_message(self, message: Self::InputMessage) -> StateMachineStateResult<Self> {
        Self::handle_message(self, message)
    }
}

impl<T: Prime> fmt::Display for MacCheckState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitingSeed(_) => write!(f, "MacCheckState::WaitingSeed"),
            WaitingCombination(_) => write!(f, "MacCheckState::WaitingCombination"),
            WaitingProduct(_) => write!(f, "MacCheckState::WaitingProduct"),
            WaitingZero(_) => write!(f, "MacCheckState::WaitingZero"),
        }
    }
}

/// A message for the MAC check state machine.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum MacCheckStateMessage {
    /// A message for the seed reveal.
    Seed(RevealStateMessage),

    /// A message for the combinations reveal.
    Combination(RevealStateMessage),

    /// A message for the zero check multiplication.
    Product(MultStateMessage),

    /// A message for the zero check reveal.
    Zero(RevealStateMessage),
}

/// An error during the MAC check state construction.
#[derive(thiserror::Error, Debug)]
pub enum MacCheckCreateError {
    /// There is nothing to check.
    #[error("no pending results to check")]
    EmptyBatch,

    /// The zero check multiplication could not be built.
    #[error(transparent)]
    Mult(#[from] MultCreateError),
}
