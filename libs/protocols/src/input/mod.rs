//! The private-input protocol: each party turns its own secrets into shares
//! held by everyone.

pub mod state;
#[cfg(test)]
mod test;

pub use state::{InputCreateError, InputState, InputStateMessage};
