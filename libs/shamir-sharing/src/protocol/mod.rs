//! The Shamir secret sharing protocol core.

pub mod errors;
pub mod matrix_cache;
pub mod protocol;

pub use errors::{HyperMapError, RecVectorError, RecoverSecretError, ShamirError};
pub use protocol::{PolyDegree, Shamir};
