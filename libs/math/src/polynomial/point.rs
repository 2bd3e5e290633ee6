//! Evaluation points.

use crate::fields::Field;
use std::fmt::Debug;

/// A single polynomial evaluation point.
#[derive(Clone)]
pub struct Point<F>
where
    F: Field,
{
    /// The abscissa (x coordinate) of the point.
    pub x: F::Inner,
    /// The ordinate (y coordinate) of the point.
    pub y: F::Element,
}

impl<F> Point<F>
where
    F: Field,
{
    /// Creates a new point.
    pub fn new(x: F::Inner, y: F::Element) -> Point<F> {
        Point { x, y }
    }

    /// Consumes the point and returns its coordinates.
    pub fn into_coordinates(self) -> (F::Inner, F::Element) {
        (self.x, self.y)
    }
}

impl<F: Field> Debug for Point<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Point").field("x", &self.x).field("y", &self.y).finish()
    }
}
