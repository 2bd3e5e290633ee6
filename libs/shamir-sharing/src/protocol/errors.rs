//! Protocol errors.

use crate::party::TooManyParties;
use math_lib::{errors::InterpolationError, matrix::MatrixError};
use thiserror::Error;

/// The Shamir protocol could not be constructed.
#[derive(Error, Debug)]
pub enum ShamirError {
    /// The polynomial degree is too high for the number of parties.
    #[error("polynomial degree too high for party count")]
    TooHighDegree,

    /// An integer conversion overflowed.
    #[error("arithmetic error")]
    Arithmetic,

    /// The party list could not be mapped to abscissas.
    #[error(transparent)]
    PartyMapping(#[from] TooManyParties),

    /// The interpolator could not be built.
    #[error("interpolation setup: {0}")]
    Interpolation(#[from] InterpolationError),

    /// The hyper-invertible matrix could not be built.
    #[error("matrix setup: {0}")]
    Matrix(#[from] MatrixError),

    /// The cached hyper-invertible matrix could not be read or written.
    #[error("matrix cache: {0}")]
    MatrixCache(String),
}

/// A secret could not be recovered from a set of shares.
#[derive(Error, Debug)]
pub enum RecoverSecretError {
    /// A share was submitted by an unknown party.
    #[error("party not found")]
    PartyNotFound,

    /// Not enough shares were provided for the requested recovery.
    #[error("not enough shares")]
    NotEnoughShares,

    /// The shares do not lie on a single degree-bounded polynomial.
    ///
    /// This is the detection signal for a maliciously altered sharing; the
    /// recovered value cannot be trusted and is not returned.
    #[error("inconsistent sharing")]
    Inconsistent,

    /// Interpolation failed.
    #[error(transparent)]
    Interpolation(#[from] InterpolationError),
}

/// The hyper-invertible mapping failed.
#[derive(Error, Debug)]
pub enum HyperMapError {
    /// An integer conversion overflowed.
    #[error("arithmetic error")]
    Arithmetic,

    /// The underlying matrix operation failed.
    #[error(transparent)]
    Matrix(#[from] MatrixError),
}

/// A reconstruction vector could not be produced.
#[derive(Error, Debug)]
pub enum RecVectorError {
    /// The requested window is larger than the party count.
    #[error("window larger than party count")]
    WindowTooLarge,

    /// The requested window is empty.
    #[error("empty window")]
    EmptyWindow,

    /// The coefficients could not be computed.
    #[error(transparent)]
    Interpolation(#[from] InterpolationError),
}
