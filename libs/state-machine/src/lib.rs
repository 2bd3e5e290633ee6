//! Message-driven state machine abstractions for round-based protocols.
//!
//! Implement [StateMachineState][crate::StateMachineState] to **define** a
//! protocol's states; wrap it in a [StateMachine][crate::StateMachine] to
//! **drive** it with incoming messages.

#![deny(missing_docs)]
#![forbid(unsafe_code)]
#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects,
    clippy::iterator_step_by_zero,
    clippy::invalid_regex,
    clippy::string_slice,
    clippy::unimplemented,
    clippy::todo
)]

pub mod errors;
pub mod message;
pub mod sm;
pub mod state;
#[cfg(test)]
mod test;

pub use sm::{StateMachine, StateMachineOutput};
pub use state::{StateMachineState, StateMachineStateExt, StateMachineStateOutput, StateMachineStateResult};
