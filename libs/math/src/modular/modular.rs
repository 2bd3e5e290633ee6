//! Modular numbers.

use super::{encoding::DecodeError, EncodedModularNumber, Prime};
use rand::{CryptoRng, Rng};
use std::{
    fmt::{Debug, Display, Formatter},
    marker::PhantomData,
};
use subtle::{Choice, ConstantTimeEq};

/// A number that performs modular arithmetic in every operation.
///
/// `ModularNumber<T>` operates modulo the prime provided by its marker type
/// `T`. Values are kept reduced; intermediate products widen to 128 bits so
/// any 64-bit modulus is supported.
///
/// # Examples
///
/// ```
/// use math_lib::modular::{ModularNumber, M61Prime};
///
/// let two = ModularNumber::<M61Prime>::from_u32(2);
/// let one = ModularNumber::ONE;
/// let three = two + &one;
/// let six = three * &two;
///
/// assert_eq!(six, ModularNumber::from_u32(6));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModularNumber<T: Prime> {
    pub(crate) value: u64,
    _prime: PhantomData<T>,
}

impl<T: Prime> ModularNumber<T> {
    /// The modulus being used.
    pub const MODULO: u64 = T::MODULO;

    /// The zero value.
    pub const ZERO: Self = Self { value: 0, _prime: PhantomData };

    /// The value one.
    pub const ONE: Self = Self { value: 1, _prime: PhantomData };

    /// Two.
    pub fn two() -> Self {
        Self::ONE + &Self::ONE
    }

    /// Constructs a new modular number, reducing the value if necessary.
    pub fn new(value: u64) -> Self {
        Self { value: value % T::MODULO, _prime: PhantomData }
    }

    /// Constructs a modular number from a u32.
    pub fn from_u32(value: u32) -> Self {
        Self::new(u64::from(value))
    }

    /// Constructs a modular number from a u64.
    pub fn from_u64(value: u64) -> Self {
        Self::new(value)
    }

    /// Generates a random modular number.
    pub fn gen_random() -> Self {
        let mut rng = rand::thread_rng();
        Self::gen_random_with_rng(&mut rng)
    }

    /// Generates a random modular number using the provided generator.
    pub fn gen_random_with_rng<R: Rng + CryptoRng>(rng: &mut R) -> Self {
        Self { value: rng.gen_range(0..T::MODULO), _prime: PhantomData }
    }

    /// Checks whether this number is zero.
    pub fn is_zero(&self) -> bool {
        self.value == 0
    }

    /// Checks whether this number is one.
    pub fn is_one(&self) -> bool {
        self.value == 1
    }

    /// The value in the range `[0, MODULO)`.
    pub fn into_value(self) -> u64 {
        self.value
    }

    /// Raises this number to the given exponent.
    pub fn exp(&self, mut exponent: u64) -> Self {
        let mut result = Self::ONE;
        let mut base = *self;
        while exponent > 0 {
            if exponent & 1 == 1 {
                result = result * &base;
            }
            base = base * &base;
            exponent >>= 1;
        }
        result
    }

    /// The multiplicative inverse via Fermat's little theorem.
    ///
    /// The inverse of zero is zero; callers that care go through
    /// [`Inv`][crate::fields::Inv] which rejects zero first.
    pub(crate) fn inverse(&self) -> Self {
        self.exp(T::MODULO.wrapping_sub(2))
    }

    /// Encodes this number for transport.
    pub fn encode(&self) -> EncodedModularNumber {
        EncodedModularNumber::from(self)
    }

    /// Attempts to decode a modular number.
    pub fn try_from_encoded(encoded: &EncodedModularNumber) -> Result<Self, DecodeError> {
        Self::try_from(encoded)
    }
}

impl<T: Prime> Default for ModularNumber<T> {
    fn default() -> Self {
        Self::ZERO
    }
}

impl<T: Prime> Display for ModularNumber<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl<T: Prime> Debug for ModularNumber<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} mod {}", self.value, T::MODULO)
    }
}

impl<T: Prime> ConstantTimeEq for ModularNumber<T> {
    fn ct_eq(&self, other: &Self) -> Choice {
        self.value.ct_eq(&other.value)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use crate::{modular::M61Prime, prime};

    prime!(P13, 13u64);

    #[test]
    fn construction_reduces() {
        assert_eq!(ModularNumber::<P13>::new(15).into_value(), 2);
        assert_eq!(ModularNumber::<P13>::new(13).into_value(), 0);
        assert_eq!(ModularNumber::<P13>::new(12).into_value(), 12);
    }

    #[test]
    fn exponentiation() {
        let three = ModularNumber::<P13>::from_u32(3);
        assert_eq!(three.exp(0), ModularNumber::ONE);
        assert_eq!(three.exp(1), three);
        assert_eq!(three.exp(3), ModularNumber::ONE);
    }

    #[test]
    fn fermat_inverse() {
        let value = ModularNumber::<M61Prime>::from_u64(123456789);
        assert_eq!(value * &value.inverse(), ModularNumber::ONE);
    }

    #[test]
    fn random_is_reduced() {
        for _ in 0..100 {
            assert!(ModularNumber::<P13>::gen_random().into_value() < 13);
        }
    }
}
