//! ATLAS multiplication protocol implementation.

use crate::{
    multiplication::mult_shares::OperandShares,
    random::double_sharing::{DoubleSharing, PoolExhausted},
};
use anyhow::{anyhow, Context};
use basic_types::{jar::PartyJar, PartyMessage};
use itertools::izip;
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
use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    sync::Arc,
};

/// The ATLAS protocol state definitions.
pub mod states {
    use basic_types::{jar::PartyJar, PartyId};
    use math_lib::modular::{ModularNumber, Prime};
    use shamir_sharing::secret_sharer::ShamirSecretSharer;
    use std::sync::Arc;

    /// This party is king for at least one multiplication and is waiting
    /// for the masked product shares assigned to it.
    pub struct WaitingMasked<T: Prime> {
        /// The multiplication indices this party reconstructs, ascending.
        pub(crate) assigned: Vec<usize>,

        /// The number of parties that contribute masked shares.
        pub(crate) contributor_count: usize,

        /// The masked shares from the contributor window.
        pub(crate) masked_shares: PartyJar<Vec<ModularNumber<T>>>,

        /// The secret sharer to be used.
        pub(crate) secret_sharer: Arc<ShamirSecretSharer<T>>,

        /// The king of every multiplication in the batch.
        pub(crate) kings: Vec<PartyId>,

        /// The retained degree-`t` masks, one per multiplication.
        pub(crate) masks: Vec<ModularNumber<T>>,

        /// The jar the next state collects reshared products in.
        pub(crate) reshared: PartyJar<Vec<ModularNumber<T>>>,
    }

    /// We are waiting for every king's resharing of its reconstructed
    /// masked products.
    pub struct WaitingReshared<T: Prime> {
        /// The king of every multiplication in the batch.
        pub(crate) kings: Vec<PartyId>,

        /// The retained degree-`t` masks, one per multiplication.
        pub(crate) masks: Vec<ModularNumber<T>>,

        /// The reshared products, one vector per distinct king.
        pub(crate) reshared: PartyJar<Vec<ModularNumber<T>>>,
    }
}

/// The state machine for the ATLAS multiplication protocol.
///
/// Each multiplication consumes one precomputed [`DoubleSharing`]. The first
/// `2t+1` parties send `product + r_2t` to the multiplication's king, the
/// king reconstructs that masked value in the clear and deals a fresh
/// degree-`t` sharing of it, and everyone unmasks locally by subtracting
/// `r_t`. Two rounds per batch however large it is, and the king duty
/// rotates per multiplication so no single party carries the load.
pub enum AtlasMultState<T: Prime> {
    /// Waiting for the masked shares assigned to us as king.
    WaitingMasked(states::WaitingMasked<T>),

    /// Waiting for the kings' reshared products.
    WaitingReshared(states::WaitingReshared<T>),
}

use AtlasMultState::*;

impl<T: Prime> AtlasMultState<T> {
    /// Constructs a new ATLAS multiplication state for a batch of operands.
    ///
    /// # Arguments
    /// - `operand_shares` - The operand batch.
    /// - `double_sharings` - One double sharing per multiplication; consumed
    ///   by this batch.
    /// - `king_base` - The rotation offset: multiplication `j` is assigned
    ///   to the party at position `(king_base + j) mod n`.
    /// - `secret_sharer` - The secret sharer bound to the session.
    pub fn new(
        operand_shares: Vec<OperandShares<T>>,
        double_sharings: Vec<DoubleSharing<T>>,
        king_base: usize,
        secret_sharer: Arc<ShamirSecretSharer<T>>,
    ) -> Result<(Self, Vec<StateMachineMessage<Self>>), AtlasCreateError> {
        if operand_shares.is_empty() {
            return Err(AtlasCreateError::EmptyBatch);
        }
        if operand_shares.len() != double_sharings.len() {
            return Err(AtlasCreateError::DoubleSharingMismatch {
                operands: operand_shares.len(),
                sharings: double_sharings.len(),
            });
        }
        let degree = secret_sharer.polynomial_degree() as usize;
        let contributor_count = degree * 2 + 1;
        let party_count = secret_sharer.party_count();
        if party_count < contributor_count {
            return Err(AtlasCreateError::InsufficientParties {
                parties: party_count,
                degree: secret_sharer.polynomial_degree(),
            });
        }

        let mut kings = Vec::with_capacity(operand_shares.len());
        for index in 0..operand_shares.len() {
            let position = (king_base.wrapping_add(index)) % party_count;
            let king = secret_sharer
                .party_mapper()
                .party_at(position)
                .cloned()
                .ok_or(AtlasCreateError::PartyNotFound)?;
            kings.push(king);
        }

        let local_index = secret_sharer.local_party_index().ok_or(AtlasCreateError::PartyNotFound)?;
        let mut messages = Vec::new();
        if local_index < contributor_count {
            let mut per_king: BTreeMap<PartyId, Vec<EncodedModularNumber>> = BTreeMap::new();
            for (operands, double, king) in izip!(operand_shares.iter(), double_sharings.iter(), kings.iter()) {
                if operands.left.len() != operands.right.len() {
                    return Err(AtlasCreateError::UnequalLengthOperands(
                        operands.left.len(),
                        operands.right.len(),
                    ));
                }
                let mut product = ModularNumber::ZERO;
                for (left, right) in operands.left.iter().zip(operands.right.iter()) {
                    product = product + &(*left * right);
                }
                let masked = product + &double.degree_2t;
                per_king.entry(king.clone()).or_default().push(masked.encode());
            }
            for (king, values) in per_king {
                messages.push(StateMachineMessage::<Self>::new(
                    Recipient::Single(king),
                    AtlasMultStateMessage::Masked(values),
                ));
            }
        }

        let masks: Vec<_> = double_sharings.iter().map(|double| double.degree_t).collect();
        let local_party_id = secret_sharer.local_party_id().clone();
        let assigned: Vec<usize> =
            kings.iter().enumerate().filter(|(_, king)| **king == local_party_id).map(|(index, _)| index).collect();
        let distinct_kings = kings.iter().collect::<std::collections::HashSet<_>>().len();
        let reshared = PartyJar::new(distinct_kings);

        let state = if assigned.is_empty() {
            WaitingReshared(states::WaitingReshared { kings, masks, reshared })
        } else {
            let masked_shares = PartyJar::new(contributor_count);
            WaitingMasked(states::WaitingMasked {
                assigned,
                contributor_count,
                masked_shares,
                secret_sharer,
                kings,
                masks,
                reshared,
            })
        };
        Ok((state, messages))
    }

    fn handle_message(mut state: Self, message: PartyMessage<AtlasMultStateMessage>) -> StateMachineStateResult<Self> {
        use AtlasMultStateMessage::*;
        let (party_id, message) = message.into_parts();
        match (message, &mut state) {
            (Masked(values), WaitingMasked(inner)) => {
                let shares = PrimeField::try_decode(&values).context("masked share decoding")?;
                inner.masked_shares.add_element(party_id, shares).context("adding masked shares")?;
                state.advance_if_completed()
            }
            (Reshared(values), WaitingReshared(inner)) => {
                let shares = PrimeField::try_decode(&values).context("reshared product decoding")?;
                inner.reshared.add_element(party_id, shares).context("adding reshared products")?;
                state.advance_if_completed()
            }
            (message, _) => Ok(StateMachineStateOutput::OutOfOrder(state, PartyMessage::new(party_id, message))),
        }
    }

    fn transition_waiting_masked(state: states::WaitingMasked<T>) -> StateMachineStateResult<Self> {
        let coefficients = state
            .secret_sharer
            .rec_vector(0, state.contributor_count)
            .map_err(|e| anyhow!("reconstruction vector: {e}"))?;

        // The jar iterates contributors in ascending party order, which is
        // exactly the window order the coefficients were computed for.
        let mut reconstructed = vec![ModularNumber::ZERO; state.assigned.len()];
        for ((_, shares), coefficient) in state.masked_shares.into_elements().zip(coefficients.iter()) {
            if shares.len() != reconstructed.len() {
                return Err(StateMachineError::UnexpectedError(anyhow!(
                    "expected {} masked shares, got {}",
                    reconstructed.len(),
                    shares.len()
                )));
            }
            for (total, share) in reconstructed.iter_mut().zip(shares.into_iter()) {
                *total = *total + &(*coefficient * &share);
            }
        }

        let party_shares: PartyShares<Vec<ModularNumber<T>>> = state
            .secret_sharer
            .generate_shares(&reconstructed, PolyDegree::T)
            .map_err(|e| anyhow!("resharing masked products: {e}"))?;
        let mut messages = Vec::new();
        for (party_id, shares) in party_shares {
            let contents = AtlasMultStateMessage::Reshared(PrimeField::encode(&shares));
            messages.push(StateMachineMessage::<Self>::new(Recipient::Single(party_id), contents));
        }
        let next_state =
            WaitingReshared(states::WaitingReshared { kings: state.kings, masks: state.masks, reshared: state.reshared });
        Ok(StateMachineStateOutput::Messages(next_state, messages))
    }

    fn transition_waiting_reshared(state: states::WaitingReshared<T>) -> StateMachineStateResult<Self> {
        // Which multiplications each king carried, in the ascending order
        // its resharing vector uses.
        let mut king_slots: HashMap<PartyId, Vec<usize>> = HashMap::new();
        for (index, king) in state.kings.iter().enumerate() {
            king_slots.entry(king.clone()).or_default().push(index);
        }
        let reshared: HashMap<PartyId, Vec<ModularNumber<T>>> = state.reshared.into_elements().collect();

        let mut results = vec![ModularNumber::ZERO; state.kings.len()];
        for (king, slots) in &king_slots {
            let shares = reshared.get(king).ok_or_else(|| anyhow!("no resharing from king {king}"))?;
            if shares.len() != slots.len() {
                return Err(StateMachineError::UnexpectedError(anyhow!(
                    "king {king} reshared {} products, expected {}",
                    shares.len(),
                    slots.len()
                )));
            }
            for (slot, share) in slots.iter().zip(shares.iter()) {
                let mask = state.masks.get(*slot).ok_or_else(|| anyhow!("mask for product {slot} missing"))?;
                if let Some(result) = results.get_mut(*slot) {
                    *result = *share - mask;
                }
            }
        }
        Ok(StateMachineStateOutput::Final(results))
    }
}

impl<T: Prime> StateMachineState for AtlasMultState<T> {
    type RecipientId = PartyId;
    type InputMessage = PartyMessage<AtlasMultStateMessage>;
    type OutputMessage = AtlasMultStateMessage;
    type FinalResult = Vec<ModularNumber<T>>;

    fn is_completed(&self) -> bool {
        match self {
            WaitingMasked(inner) => inner.masked_shares.is_full(),
            WaitingReshared(inner) => inner.reshared.is_full(),
        }
    }

    fn try_next(self) -> StateMachineStateResult<Self> {
        match self {
            WaitingMasked(inner) => Self::transition_waiting_masked(inner),
            WaitingReshared(inner) => Self::transition_waiting_reshared(inner),
        }
    }

    fn handle_message(self, message: Self::InputMessage) -> StateMachineStateResult<Self> {
        Self::handle_message(self, message)
    }
}

impl<T: Prime> fmt::Display for AtlasMultState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitingMasked(_) => write!(f, "AtlasMultState::WaitingMasked"),
            WaitingReshared(_) => write!(f, "AtlasMultState::WaitingReshared"),
        }
    }
}

/// A message for the ATLAS multiplication state machine.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum AtlasMultStateMessage {
    /// A contributor's masked product shares for the multiplications
    /// assigned to the receiving king, in ascending multiplication order.
    Masked(Vec<EncodedModularNumber>),

    /// A king's degree-`t` resharing of its reconstructed masked products,
    /// in ascending multiplication order.
    Reshared(Vec<EncodedModularNumber>),
}

/// An error during the ATLAS multiplication state construction.
#[derive(thiserror::Error, Debug)]
pub enum AtlasCreateError {
    /// The batch contains no multiplications.
    #[error("empty multiplication batch")]
    EmptyBatch,

    /// The batch needs one double sharing per multiplication.
    #[error("{operands} multiplications but {sharings} double sharings")]
    DoubleSharingMismatch {
        /// The number of multiplications.
        operands: usize,
        /// The number of double sharings supplied.
        sharings: usize,
    },

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

    /// The double sharing pool ran out.
    #[error(transparent)]
    PoolExhausted(#[from] PoolExhausted),

    /// A party id was not found.
    #[error("party id not found")]
    PartyNotFound,

    /// Length of the operands do not match.
    #[error("left.len()={0} is not equal to right.len()={1}")]
    UnequalLengthOperands(usize, usize),
}
