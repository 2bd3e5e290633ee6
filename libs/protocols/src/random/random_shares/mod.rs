//! The RAN protocol: degree-`t` shares of random values nobody knows.

pub mod state;
#[cfg(test)]
mod test;

pub use state::{RandomSharesError, RandomSharesState, RandomSharesStateMessage};
