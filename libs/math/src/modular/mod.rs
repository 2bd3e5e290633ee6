//! Modular arithmetic over fixed primes.

pub mod encoding;
pub mod modular;
pub mod ops;
pub mod prime;

pub use encoding::{DecodeError, EncodedModularNumber};
pub use modular::ModularNumber;
pub use prime::{F4Prime, M61Prime, Prime};
