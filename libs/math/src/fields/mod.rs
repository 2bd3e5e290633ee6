//! Field definitions.

pub mod field;

pub use field::{Field, Inv, PrimeField, TooManyElements};
