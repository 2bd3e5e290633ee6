//! Party identifiers and their evaluation points.

pub use basic_types::PartyId;
use bimap::BiBTreeMap;
use math_lib::fields::Field;

/// A deterministic bijection between party ids and polynomial abscissas.
///
/// Parties are sorted by id and assigned the abscissas `1..=n` in order.
/// Every protocol notion of "the first k parties" or "the party k positions
/// away" refers to this ordering, so all participants derive the same
/// assignment from the same party list.
#[derive(Clone)]
pub struct PartyMapper<F: Field> {
    party_abscissa: BiBTreeMap<PartyId, F::Inner>,
    ordered_parties: Vec<PartyId>,
}

impl<F: Field> PartyMapper<F> {
    /// Constructs a mapper for the given parties.
    pub fn new(parties: Vec<PartyId>) -> Result<Self, TooManyParties> {
        let mut parties = parties;
        parties.sort();
        parties.dedup();

        let inner_count = u32::try_from(parties.len()).ok().and_then(|c| c.checked_add(1)).ok_or(TooManyParties)?;
        let inner_values = F::inner_elements(inner_count).map_err(|_| TooManyParties)?;
        let mut party_abscissa = BiBTreeMap::new();
        // Abscissa 0 holds the secret, so parties start at 1.
        for (party, inner) in parties.iter().zip(inner_values.into_iter().skip(1)) {
            party_abscissa.insert(party.clone(), inner);
        }
        Ok(PartyMapper { party_abscissa, ordered_parties: parties })
    }

    /// The abscissa assigned to a party.
    pub fn abscissa(&self, party_id: &PartyId) -> Option<&F::Inner> {
        self.party_abscissa.get_by_left(party_id)
    }

    /// The party assigned to an abscissa.
    pub fn party(&self, abscissa: &F::Inner) -> Option<&PartyId> {
        self.party_abscissa.get_by_right(abscissa)
    }

    /// All party ids, in ascending order.
    pub fn parties(&self) -> impl Iterator<Item = &PartyId> {
        self.ordered_parties.iter()
    }

    /// All abscissas, in ascending order.
    pub fn abscissas(&self) -> impl Iterator<Item = &F::Inner> {
        self.party_abscissa.right_values()
    }

    /// The position of a party in the sorted ordering.
    pub fn index_of(&self, party_id: &PartyId) -> Option<usize> {
        self.ordered_parties.binary_search(party_id).ok()
    }

    /// The party at the given position in the sorted ordering.
    pub fn party_at(&self, index: usize) -> Option<&PartyId> {
        self.ordered_parties.get(index)
    }

    /// The total number of parties.
    pub fn party_count(&self) -> usize {
        self.ordered_parties.len()
    }
}

/// Too many parties were provided during the mapper initialization.
#[derive(Debug, thiserror::Error)]
#[error("too many parties")]
pub struct TooManyParties;
