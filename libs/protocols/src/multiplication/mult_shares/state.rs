//! Shamir multiplication protocol implementation.

use anyhow::{anyhow, Context};
use basic_types::{jar::PartyJar, PartyMessage};
use math_lib::{
    fields::{Field, PrimeField},
    modular::{EncodedModularNumber, ModularNumber, Prime},
};
use serde::{Deserialize, Serialize};
use shamir_sharing::{
    party::PartyId,
    protocol::{PolyDegree, RecVectorError},
    secret_sharer::{GenerateSharesError, PartyShares, SecretSharer, SecretSharerProperties, ShamirSecretSharer},
};
use state_machine::{
    errors::StateMachineError,
    state::{Recipient, StateMachineMessage},
    StateMachineState, StateMachineStateExt, StateMachineStateOutput, StateMachineStateResult,
};
use std::{fmt, sync::Arc};

/// The shares of the operands involved in one multiplication.
///
/// Both sides are vectors so a single entry expresses a dot-product: the
/// local products are summed before the resharing round, costing the same
/// communication as one plain multiplication.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OperandShares<T: Prime> {
    /// The shares of the left operands.
    pub left: Vec<ModularNumber<T>>,

    /// The shares of the right operands.
    pub right: Vec<ModularNumber<T>>,
}

impl<T: Prime> OperandShares<T> {
    /// Constructs a new operand shares.
    pub fn new(left: Vec<ModularNumber<T>>, right: Vec<ModularNumber<T>>) -> Self {
        Self { left, right }
    }

    /// Constructs an operand for a single multiplication.
    pub fn single(left: ModularNumber<T>, right: ModularNumber<T>) -> Self {
        Self { left: vec![left], right: vec![right] }
    }
}

/// The multiplication protocol state definitions.
pub mod states {
    use basic_types::jar::PartyJar;
    use math_lib::modular::{ModularNumber, Prime};

    /// We are waiting for the reshared product contributions.
    pub struct WaitingShares<T: Prime> {
        /// The number of products in this batch.
        pub(crate) share_count: usize,

        /// The contributions from the first `2t+1` parties.
        pub(crate) party_shares: PartyJar<Vec<ModularNumber<T>>>,
    }
}

/// The state machine for the Shamir multiplication protocol.
///
/// Multiplying two degree-`t` shares locally yields a share on a degree-`2t`
/// polynomial, which cannot be multiplied again. The first `2t+1` parties
/// fix that by rescaling their local product by their Lagrange coefficient
/// for that window and dealing a fresh degree-`t` sharing of the rescaled
/// value; summing the dealt sub-shares gives every party a degree-`t` share
/// of the product after a single round.
pub enum MultState<T: Prime> {
    /// We are waiting for the contributions.
    WaitingShares(states::WaitingShares<T>),
}

use MultState::*;

impl<T: Prime> MultState<T> {
    /// Constructs a new multiplication protocol state for a batch of
    /// operands.
    pub fn new(
        operand_shares: Vec<OperandShares<T>>,
        secret_sharer: Arc<ShamirSecretSharer<T>>,
    ) -> Result<(Self, Vec<StateMachineMessage<Self>>), MultCreateError> {
        let contributor_count = Self::contributor_count(&secret_sharer)?;
        let share_count = operand_shares.len();
        let messages = Self::make_messages(operand_shares, &secret_sharer, contributor_count)?;
        let party_shares = PartyJar::new(contributor_count);
        let state = WaitingShares(states::WaitingShares { share_count, party_shares });
        Ok((state, messages))
    }

    fn contributor_count(secret_sharer: &ShamirSecretSharer<T>) -> Result<usize, MultCreateError> {
        let degree = secret_sharer.polynomial_degree() as usize;
        let contributor_count = degree * 2 + 1;
        if secret_sharer.party_count() < contributor_count {
            return Err(MultCreateError::InsufficientParties {
                parties: secret_sharer.party_count(),
                degree: secret_sharer.polynomial_degree(),
            });
        }
        Ok(contributor_count)
    }

    fn make_messages(
        operand_shares: Vec<OperandShares<T>>,
        secret_sharer: &ShamirSecretSharer<T>,
        contributor_count: usize,
    ) -> Result<Vec<StateMachineMessage<Self>>, MultCreateError> {
        let local_index = secret_sharer.local_party_index().ok_or(MultCreateError::PartyNotFound)?;
        if local_index >= contributor_count {
            // Parties outside the contributor window only receive.
            return Ok(Vec::new());
        }
        let coefficients = secret_sharer.rec_vector(0, contributor_count)?;
        let coefficient = coefficients.get(local_index).ok_or(MultCreateError::PartyNotFound)?;

        let mut scaled_products = Vec::new();
        for shares in operand_shares {
            if shares.left.len() != shares.right.len() {
                return Err(MultCreateError::UnequalLengthOperands(shares.left.len(), shares.right.len()));
            }
            let mut product = ModularNumber::ZERO;
            for (left, right) in shares.left.iter().zip(shares.right.iter()) {
                product = product + &(*left * right);
            }
            scaled_products.push(product * coefficient);
        }
        let party_shares: PartyShares<Vec<ModularNumber<T>>> =
            secret_sharer.generate_shares(&scaled_products, PolyDegree::T)?;
        let mut messages = Vec::new();
        for (party_id, shares) in party_shares {
            let contents = MultStateMessage(PrimeField::encode(&shares));
            messages.push(StateMachineMessage::<Self>::new(Recipient::Single(party_id), contents));
        }
        Ok(messages)
    }

    fn handle_message(mut state: Self, message: PartyMessage<MultStateMessage>) -> StateMachineStateResult<Self> {
        let (party_id, message) = message.into_parts();
        let shares = PrimeField::try_decode(&message.0).context("share decoding")?;
        let WaitingShares(inner) = &mut state;
        inner.party_shares.add_element(party_id, shares).context("adding shares")?;
        state.advance_if_completed()
    }

    fn transition_waiting_shares(state: states::WaitingShares<T>) -> StateMachineStateResult<Self> {
        let mut results = vec![ModularNumber::ZERO; state.share_count];
        for (_, shares) in state.party_shares.into_elements() {
            if shares.len() != state.share_count {
                return Err(StateMachineError::UnexpectedError(anyhow!(
                    "expected {} shares, got {}",
                    state.share_count,
                    shares.len()
                )));
            }
            for (result, share) in results.iter_mut().zip(shares.into_iter()) {
                *result = *result + &share;
            }
        }
        Ok(StateMachineStateOutput::Final(results))
    }
}

impl<T: Prime> StateMachineState for MultState<T> {
    type RecipientId = PartyId;
    type InputMessage = PartyMessage<MultStateMessage>;
    type OutputMessage = MultStateMessage;
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

impl<T: Prime> fmt::Display for MultState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MultState::WaitingShares")
    }
}

/// A message for the multiplication state machine carrying one contributor's
/// reshared products.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MultStateMessage(pub Vec<EncodedModularNumber>);

/// An error during the multiplication state construction.
#[derive(thiserror::Error, Debug)]
pub enum MultCreateError {
    /// Multiplication needs more than twice the threshold many parties.
    #[error("{parties} parties cannot multiply at threshold {degree}")]
    InsufficientParties {
        /// The configured party count.
        parties: usize,
        /// The configured threshold degree.
        degree: u64,
    },

    /// Share generation failed.
    #[error(transparent)]
    GenerateShares(#[from] GenerateSharesError),

    /// The reconstruction vector could not be produced.
    #[error(transparent)]
    RecVector(#[from] RecVectorError),

    /// The local party id was not found.
    #[error("party id not found")]
    PartyNotFound,

    /// Length of the operands do not match.
    #[error("left.len()={0} is not equal to right.len()={1}")]
    UnequalLengthOperands(usize, usize),
}
