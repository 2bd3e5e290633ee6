//! Crate errors.

use thiserror::Error;

/// Division by zero.
#[derive(Error, Debug, Eq, PartialEq)]
#[error("division by zero")]
pub struct DivByZero;

/// A point sequence did not contain enough points.
#[derive(Error, Debug, Eq, PartialEq)]
#[error("not enough points")]
pub struct NotEnoughPoints;

/// Interpolation failed.
#[derive(Error, Debug, Eq, PartialEq)]
pub enum InterpolationError {
    /// Division by zero.
    #[error("division by zero")]
    DivByZero,

    /// The point sequence is empty.
    #[error("empty point sequence")]
    EmptySequence,

    /// A precomputed coefficient was not found for an abscissa.
    #[error("lagrange coefficient not found")]
    CoefficientNotFound,

    /// Two evaluation points share the same abscissa.
    #[error("duplicate abscissas")]
    DuplicateAbscissas,

    /// The point sequence abscissas do not match the interpolator's.
    #[error("mismatched abscissas")]
    MismatchedAbscissas,
}

impl From<DivByZero> for InterpolationError {
    fn from(_: DivByZero) -> Self {
        Self::DivByZero
    }
}
