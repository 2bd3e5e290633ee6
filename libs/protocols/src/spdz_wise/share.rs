//! MAC-carrying shares.

use math_lib::modular::{ModularNumber, Prime};

/// A share together with its MAC share.
///
/// Globally the MAC shares reconstruct to `alpha * value` for the session's
/// secret MAC key `alpha`. Linear operations preserve the relation, so they
/// stay local; multiplication drives the underlying protocol twice (see
/// [`SpdzWiseMultState`][crate::spdz_wise::SpdzWiseMultState]).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MacShare<T: Prime> {
    /// The share of the value.
    pub value: ModularNumber<T>,

    /// The share of `alpha * value`.
    pub mac: ModularNumber<T>,
}

impl<T: Prime> MacShare<T> {
    /// Constructs a new MAC-carrying share.
    pub fn new(value: ModularNumber<T>, mac: ModularNumber<T>) -> Self {
        Self { value, mac }
    }

    /// Adds two authenticated shares; the MAC relation is linear.
    pub fn add(&self, other: &Self) -> Self {
        Self { value: self.value + &other.value, mac: self.mac + &other.mac }
    }

    /// Scales an authenticated share by a public constant.
    pub fn scale(&self, factor: &ModularNumber<T>) -> Self {
        Self { value: self.value * factor, mac: self.mac * factor }
    }
}
