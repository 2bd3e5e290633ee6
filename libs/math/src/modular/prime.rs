//! Prime moduli markers.

use std::{fmt::Debug, hash::Hash};

/// A marker type that fixes the prime modulus for a [`ModularNumber`].
///
/// The modulus must be prime: inversion relies on Fermat's little theorem.
/// Use the [`prime!`][crate::prime] macro to declare new moduli.
///
/// [`ModularNumber`]: crate::modular::ModularNumber
pub trait Prime:
    Copy + Clone + Debug + Default + Eq + PartialEq + Ord + PartialOrd + Hash + Send + Sync + 'static
{
    /// The prime modulus.
    const MODULO: u64;
}

/// Declares a marker type for a prime modulus.
#[macro_export]
macro_rules! prime {
    ($(#[$meta:meta])* $name:ident, $modulo:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name;

        impl $crate::modular::Prime for $name {
            const MODULO: u64 = $modulo;
        }
    };
}

prime!(
    /// The Mersenne prime `2^61 - 1`.
    M61Prime,
    2305843009213693951
);

prime!(
    /// The Fermat prime `2^16 + 1`.
    F4Prime,
    65537
);
