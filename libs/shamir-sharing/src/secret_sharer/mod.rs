//! Secret sharer abstractions and the Shamir implementation.

pub mod secret_sharer;
pub mod shamir_secret_sharer;

pub use secret_sharer::{
    GenerateSharesError, MultiMapError, MultiRecoverError, PartyShares, SecretSharer, SecretSharerProperties,
};
pub use shamir_secret_sharer::ShamirSecretSharer;

#[cfg(any(test, feature = "testing"))]
pub use shamir_secret_sharer::test_secret_sharer;
