//! Lagrange interpolation in a finite field.

use crate::{
    errors::InterpolationError,
    fields::{Field, Inv},
    polynomial::point_sequence::PointSequence,
};
use std::collections::{HashMap, HashSet};

/// A Lagrange interpolator over a fixed abscissa set.
///
/// Construction is O(n^2); every interpolation afterwards is O(n). The
/// precomputed coefficients target evaluation at zero, which is where the
/// secret of a sharing polynomial lives.
#[derive(Debug, Clone)]
pub struct Lagrange<F>
where
    F: Field,
{
    abscissas: Vec<F::Element>,

    /// Barycentric weights, for evaluation at arbitrary points.
    weights: HashMap<F::Inner, F::Element>,

    /// Lagrange coefficients for evaluation at zero.
    coefficients: HashMap<F::Inner, F::Element>,
}

impl<F: Field> Lagrange<F> {
    /// Creates a new interpolator for the given abscissas.
    pub fn new(abscissas: Vec<F::Element>) -> Result<Lagrange<F>, InterpolationError> {
        if abscissas.is_empty() {
            return Err(InterpolationError::EmptySequence);
        }
        let mut seen = HashSet::new();
        if abscissas.iter().any(|x| !seen.insert(F::as_inner(*x))) {
            return Err(InterpolationError::DuplicateAbscissas);
        }
        let mut weights = HashMap::new();
        let mut scaled = Vec::new();
        let mut total = F::ZERO;
        for (i, xi) in abscissas.iter().enumerate() {
            let mut weight = F::ONE;
            for (j, xj) in abscissas.iter().enumerate() {
                if j != i {
                    weight = weight * &(*xi - xj);
                }
            }
            let weight = weight.inv()?;
            let term = -(weight / xi)?;
            total = total + &term;
            scaled.push(term);
            weights.insert(F::as_inner(*xi), weight);
        }
        let normalizer = total.inv()?;
        let mut coefficients = HashMap::new();
        for (term, x) in scaled.into_iter().zip(abscissas.iter()) {
            coefficients.insert(F::as_inner(*x), term * &normalizer);
        }
        Ok(Lagrange { abscissas, weights, coefficients })
    }

    /// The abscissas this interpolator operates on.
    pub fn abscissas(&self) -> &[F::Element] {
        &self.abscissas
    }

    /// Interpolates at zero, O(n).
    pub fn interpolate(&self, sequence: &PointSequence<F>) -> Result<F::Element, InterpolationError> {
        if sequence.points().len() != self.abscissas.len() {
            return Err(InterpolationError::MismatchedAbscissas);
        }
        let mut result = F::ZERO;
        for point in sequence.points() {
            let coefficient = self.coefficients.get(&point.x).ok_or(InterpolationError::MismatchedAbscissas)?;
            result = result + &(*coefficient * &point.y);
        }
        Ok(result)
    }

    /// Produces a single weighted term of the interpolation at zero.
    ///
    /// Summing the partial terms for every abscissa equals
    /// [`interpolate`][Lagrange::interpolate].
    pub fn partial(&self, x: &F::Inner, y: &F::Element) -> Result<F::Element, InterpolationError> {
        let coefficient = self.coefficients.get(x).ok_or(InterpolationError::MismatchedAbscissas)?;
        Ok(*coefficient * y)
    }

    /// Evaluates the interpolated polynomial at an arbitrary point, O(n).
    pub fn eval(&self, sequence: &PointSequence<F>, x: &F::Element) -> Result<F::Element, InterpolationError> {
        if sequence.points().len() != self.abscissas.len() {
            return Err(InterpolationError::MismatchedAbscissas);
        }
        let mut numerator = F::ZERO;
        let mut denominator = F::ZERO;
        for point in sequence.points() {
            let delta = F::as_element(point.x) - x;
            if delta == F::ZERO {
                return Ok(point.y);
            }
            let weight = self.weights.get(&point.x).ok_or(InterpolationError::CoefficientNotFound)?;
            let term = (-*weight / &delta)?;
            denominator = denominator + &term;
            numerator = numerator + &(term * &point.y);
        }
        Ok((numerator / &denominator)?)
    }
}

/// Computes the Lagrange coefficients at zero for an arbitrary abscissa set.
///
/// Coefficient `i` is `∏_{j≠i} x_j / (x_j - x_i)`; multiplying each supplied
/// ordinate by its coefficient and summing reconstructs the polynomial's
/// value at zero. Fails on duplicate abscissas.
pub fn rec_coefficients<F: Field>(abscissas: &[F::Element]) -> Result<Vec<F::Element>, InterpolationError> {
    let mut seen = HashSet::new();
    if abscissas.iter().any(|x| !seen.insert(F::as_inner(*x))) {
        return Err(InterpolationError::DuplicateAbscissas);
    }
    let mut coefficients = Vec::with_capacity(abscissas.len());
    for (i, xi) in abscissas.iter().enumerate() {
        let mut coefficient = F::ONE;
        for (j, xj) in abscissas.iter().enumerate() {
            if j != i {
                coefficient = coefficient * &(*xj / &(*xj - xi))?;
            }
        }
        coefficients.push(coefficient);
    }
    Ok(coefficients)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use crate::{fields::PrimeField, modular::ModularNumber, polynomial::point::Point, prime};

    prime!(P13, 13u64);

    type Field = PrimeField<P13>;

    fn make_parts(coordinates: &[(u64, u32)]) -> (Vec<ModularNumber<P13>>, PointSequence<Field>) {
        let mut sequence = PointSequence::default();
        let mut abscissas = Vec::new();
        for (x, y) in coordinates {
            abscissas.push(ModularNumber::from_u64(*x));
            sequence.push(Point::new(*x, ModularNumber::from_u32(*y)));
        }
        (abscissas, sequence)
    }

    #[test]
    fn interpolate_at_zero() {
        let (abscissas, sequence) = make_parts(&[(2, 10), (8, 5), (3, 10)]);
        let lagrange = Lagrange::<Field>::new(abscissas).unwrap();
        assert_eq!(lagrange.interpolate(&sequence).unwrap(), ModularNumber::from_u32(9));
    }

    #[test]
    fn partial_terms_sum_to_interpolation() {
        let (abscissas, sequence) = make_parts(&[(2, 10), (8, 5), (3, 10)]);
        let lagrange = Lagrange::<Field>::new(abscissas).unwrap();
        let mut total = ModularNumber::ZERO;
        for point in sequence.points() {
            let (x, y) = point.clone().into_coordinates();
            total = total + &lagrange.partial(&x, &y).unwrap();
        }
        assert_eq!(total, lagrange.interpolate(&sequence).unwrap());
    }

    #[test]
    fn eval_at_arbitrary_point() {
        let (abscissas, sequence) = make_parts(&[(2, 10), (8, 5), (3, 10)]);
        let lagrange = Lagrange::<Field>::new(abscissas).unwrap();
        let result = lagrange.eval(&sequence, &ModularNumber::from_u32(4)).unwrap();
        assert_eq!(result, ModularNumber::ONE);
    }

    #[test]
    fn eval_at_known_abscissa_short_circuits() {
        let (abscissas, sequence) = make_parts(&[(2, 10), (8, 5), (3, 10)]);
        let lagrange = Lagrange::<Field>::new(abscissas).unwrap();
        let result = lagrange.eval(&sequence, &ModularNumber::from_u32(8)).unwrap();
        assert_eq!(result, ModularNumber::from_u32(5));
    }

    #[test]
    fn duplicate_abscissas_rejected() {
        let duplicated = vec![ModularNumber::<P13>::from_u32(2), ModularNumber::from_u32(2)];
        assert_eq!(Lagrange::<Field>::new(duplicated.clone()).unwrap_err(), InterpolationError::DuplicateAbscissas);
        assert_eq!(rec_coefficients::<Field>(&duplicated).unwrap_err(), InterpolationError::DuplicateAbscissas);
    }

    #[test]
    fn rec_coefficients_match_interpolator() {
        let (abscissas, sequence) = make_parts(&[(1, 7), (5, 2), (9, 12)]);
        let lagrange = Lagrange::<Field>::new(abscissas.clone()).unwrap();
        let coefficients = rec_coefficients::<Field>(&abscissas).unwrap();
        let mut total = ModularNumber::ZERO;
        for (point, coefficient) in sequence.points().iter().zip(coefficients.iter()) {
            total = total + &(*coefficient * &point.y);
        }
        assert_eq!(total, lagrange.interpolate(&sequence).unwrap());
    }
}
