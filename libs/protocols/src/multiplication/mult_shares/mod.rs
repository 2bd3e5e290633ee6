//! Semi-honest Shamir multiplication: rescale-and-reshare in one round.

pub mod state;

pub use state::{MultCreateError, MultState, MultStateMessage, OperandShares};
