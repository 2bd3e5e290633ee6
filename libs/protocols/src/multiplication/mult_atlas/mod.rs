//! ATLAS multiplication: precomputed double sharings and rotating kings cut
//! the round count to two per batch, independent of batch size.

pub mod state;
#[cfg(test)]
mod test;

pub use state::{AtlasCreateError, AtlasMultState, AtlasMultStateMessage};
