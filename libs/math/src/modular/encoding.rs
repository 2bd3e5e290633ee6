//! Encoding for modular numbers.

use super::{ModularNumber, Prime};

/// An encoded modular number.
///
/// This is the non-generic transport form of a [`ModularNumber`]: the value
/// in little-endian bytes. Decoding validates the value against the target
/// modulus, so a number can only be decoded into the field it was encoded
/// from.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EncodedModularNumber {
    value: [u8; 8],
}

impl EncodedModularNumber {
    /// Constructs an encoded number directly from its bytes.
    ///
    /// No validation is performed until decoding.
    pub fn new_unchecked(value: [u8; 8]) -> Self {
        Self { value }
    }

    /// The underlying little-endian bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.value
    }

    /// Attempts to decode this number under the given modulus.
    pub fn try_decode<T: Prime>(&self) -> Result<ModularNumber<T>, DecodeError> {
        ModularNumber::try_from(self)
    }
}

impl<T: Prime> From<&ModularNumber<T>> for EncodedModularNumber {
    fn from(number: &ModularNumber<T>) -> Self {
        Self { value: number.value.to_le_bytes() }
    }
}

impl<T: Prime> TryFrom<&EncodedModularNumber> for ModularNumber<T> {
    type Error = DecodeError;

    fn try_from(encoded: &EncodedModularNumber) -> Result<Self, Self::Error> {
        let value = u64::from_le_bytes(encoded.value);
        if value >= T::MODULO {
            return Err(DecodeError::ValueOutOfRange);
        }
        Ok(ModularNumber::new(value))
    }
}

/// An encoded modular number could not be decoded.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The encoded value is not reduced modulo the target prime.
    #[error("encoded value out of range")]
    ValueOutOfRange,
}
