//! Polynomials in a finite field.

use crate::fields::Field;

/// A polynomial, represented by its coefficients in ascending degree order.
#[derive(Debug, Clone, PartialEq)]
pub struct Polynomial<F>
where
    F: Field,
{
    coefficients: Vec<F::Element>,
}

impl<F: Field> Polynomial<F> {
    /// Creates a new polynomial from its coefficients.
    pub fn new(coefficients: Vec<F::Element>) -> Polynomial<F> {
        Polynomial { coefficients }
    }

    /// Appends the next-higher-degree coefficient.
    pub fn add_coefficient(&mut self, coefficient: F::Element) {
        self.coefficients.push(coefficient);
    }

    /// The coefficients in ascending degree order.
    pub fn coefficients(&self) -> &[F::Element] {
        &self.coefficients
    }

    /// The degree of the polynomial.
    pub fn degree(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }

    /// Evaluates the polynomial at an abscissa using Horner's method.
    pub fn eval_at(&self, x: &F::Inner) -> F::Element {
        self.eval(&F::as_element(*x))
    }

    /// Evaluates the polynomial at a field element using Horner's method.
    pub fn eval(&self, x: &F::Element) -> F::Element {
        let mut result = F::ZERO;
        for coefficient in self.coefficients.iter().rev() {
            result = result * x + coefficient;
        }
        result
    }
}
