//! In-process protocol simulators for tests and validation runs.

pub mod symmetric;

pub use symmetric::{InitializedProtocol, PartyOutput, Protocol, SymmetricProtocolSimulator};
