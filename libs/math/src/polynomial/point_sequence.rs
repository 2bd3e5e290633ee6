//! Sequences of evaluation points.

use crate::{
    decoders::lagrange::rec_coefficients,
    errors::{InterpolationError, NotEnoughPoints},
    fields::Field,
    polynomial::point::Point,
};
use std::collections::HashSet;

/// An ordered sequence of evaluation points on one polynomial.
#[derive(Clone, Debug)]
pub struct PointSequence<F>
where
    F: Field,
{
    points: Vec<Point<F>>,
}

impl<F: Field> Default for PointSequence<F> {
    fn default() -> Self {
        Self { points: Vec::new() }
    }
}

impl<F: Field> PointSequence<F> {
    /// The points in the sequence.
    pub fn points(&self) -> &[Point<F>] {
        &self.points
    }

    /// Consumes the sequence and returns its points.
    pub fn into_points(self) -> Vec<Point<F>> {
        self.points
    }

    /// Checks whether the sequence holds no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Checks whether any two points share an abscissa.
    pub fn has_duplicates(&self) -> bool {
        let mut seen = HashSet::new();
        self.points.iter().any(|point| !seen.insert(point.x))
    }

    /// Adds a point to the sequence.
    pub fn push(&mut self, point: Point<F>) {
        self.points.push(point)
    }

    /// Takes the first `count` points as a new sequence.
    pub fn take(&self, count: usize) -> Result<PointSequence<F>, NotEnoughPoints> {
        if self.points.len() < count {
            return Err(NotEnoughPoints);
        }
        Ok(Self { points: self.points.iter().take(count).cloned().collect() })
    }

    /// Interpolates the polynomial behind these points at zero.
    ///
    /// This works for any abscissa set; for repeated interpolation over a
    /// fixed set use [`Lagrange`][crate::decoders::Lagrange].
    pub fn lagrange_interpolate(&self) -> Result<F::Element, InterpolationError> {
        if self.points.is_empty() {
            return Err(InterpolationError::EmptySequence);
        }
        let abscissas: Vec<_> = self.points.iter().map(|point| F::as_element(point.x)).collect();
        let coefficients = rec_coefficients::<F>(&abscissas)?;
        let mut secret = F::ZERO;
        for (point, coefficient) in self.points.iter().zip(coefficients.iter()) {
            secret = secret + &(*coefficient * &point.y);
        }
        Ok(secret)
    }
}
