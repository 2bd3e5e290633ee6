//! Threshold secret-sharing MPC protocols.
//!
//! Every protocol here is a message-driven state machine over one
//! [session][crate::session::Session]: construction plays the role of the
//! *prepare* step and emits the round's outgoing messages, feeding peer
//! messages plays the role of *exchange*, and the final transition is the
//! *finalize* step yielding the protocol's result.

#![deny(missing_docs)]
#![forbid(unsafe_code)]
#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::iterator_step_by_zero,
    clippy::invalid_regex,
    clippy::string_slice,
    clippy::unimplemented,
    clippy::todo
)]

pub mod input;
pub mod multiplication;
pub mod random;
pub mod reveal;
pub mod session;
pub mod spdz_wise;

#[cfg(any(test, feature = "validation"))]
pub mod simulator;
