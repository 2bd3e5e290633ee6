//! A collection buffer that expects exactly one element per party.

use crate::PartyId;
use std::collections::BTreeMap;

/// A jar where every participating party deposits exactly one element.
///
/// The jar is full once as many distinct parties as announced at
/// construction time have deposited an element. Protocol states use
/// [`is_full`][PartyJar::is_full] to gate their transitions.
#[derive(Default, Debug, Clone)]
pub struct PartyJar<T> {
    elements: BTreeMap<PartyId, T>,
    party_count: usize,
}

impl<T> PartyJar<T> {
    /// Constructs a jar expecting the given number of parties.
    pub fn new(party_count: usize) -> Self {
        Self { elements: BTreeMap::new(), party_count }
    }

    /// Constructs a jar that is pre-filled with the given elements.
    pub fn new_with_elements<I>(elements: I) -> Result<Self, DuplicatePartyShare>
    where
        I: IntoIterator<Item = (PartyId, T)>,
    {
        let mut jar = Self::new(0);
        for (party_id, element) in elements {
            jar.add_element(party_id, element)?;
        }
        jar.party_count = jar.elements.len();
        Ok(jar)
    }

    /// Checks whether every expected party has deposited its element.
    pub fn is_full(&self) -> bool {
        self.elements.len() == self.party_count
    }

    /// Checks whether the jar holds no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// The number of parties that have deposited an element so far.
    pub fn stored_party_count(&self) -> usize {
        self.elements.len()
    }

    /// Deposits an element for a party, rejecting double deposits.
    pub fn add_element(&mut self, party: PartyId, element: T) -> Result<(), DuplicatePartyShare> {
        if self.elements.contains_key(&party) {
            return Err(DuplicatePartyShare(party));
        }
        self.elements.insert(party, element);
        Ok(())
    }

    /// Consumes the jar, yielding its elements sorted by party id.
    pub fn into_elements(self) -> impl Iterator<Item = (PartyId, T)> {
        self.elements.into_iter()
    }

    /// Iterates the deposited elements, sorted by party id.
    pub fn elements(&self) -> impl Iterator<Item = (&PartyId, &T)> {
        self.elements.iter()
    }
}

/// A party attempted to deposit more than one element.
#[derive(thiserror::Error, Debug)]
#[error("party {0} already provided element")]
pub struct DuplicatePartyShare(PartyId);
