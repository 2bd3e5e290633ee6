//! Matrix type.

use crate::fields::Field;
use thiserror::Error;

/// A row-major matrix of field elements.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Matrix<F: Field> {
    data: Vec<F::Element>,
    nrows: u16,
    ncols: u16,
}

impl<F: Field> Matrix<F> {
    /// Constructs a matrix from row-major data.
    pub fn new(data: Vec<F::Element>, nrows: u16, ncols: u16) -> Result<Matrix<F>, MatrixError> {
        let expected = usize::from(nrows) * usize::from(ncols);
        if expected != data.len() {
            return Err(MatrixError::Build(data.len(), expected));
        }
        Ok(Matrix { data, nrows, ncols })
    }

    /// The row-major data.
    pub fn data(&self) -> &[F::Element] {
        &self.data
    }

    /// Consumes the matrix and returns its row-major data.
    pub fn into_vec(self) -> Vec<F::Element> {
        self.data
    }

    /// Number of rows.
    pub fn nrows(&self) -> u16 {
        self.nrows
    }

    /// Number of columns.
    pub fn ncols(&self) -> u16 {
        self.ncols
    }

    /// The entry `M[row, col]`.
    pub fn entry(&self, row: u16, col: u16) -> Result<&F::Element, MatrixError> {
        let index = usize::from(row) * usize::from(self.ncols) + usize::from(col);
        self.data.get(index).ok_or(MatrixError::IndexNotFound)
    }

    /// A mutable reference to the entry `M[row, col]`.
    pub fn entry_mut(&mut self, row: u16, col: u16) -> Result<&mut F::Element, MatrixError> {
        let index = usize::from(row) * usize::from(self.ncols) + usize::from(col);
        self.data.get_mut(index).ok_or(MatrixError::IndexNotFound)
    }

    /// The zero matrix.
    pub fn zero(nrows: u16, ncols: u16) -> Matrix<F> {
        let data = vec![F::ZERO; usize::from(nrows) * usize::from(ncols)];
        Matrix { data, nrows, ncols }
    }

    /// The Vandermonde matrix over the given abscissas.
    ///
    /// Row `i` is `[1, x_i, x_i^2, ..., x_i^(ncols-1)]`. Any `ncols` rows of
    /// this matrix form an invertible submatrix as long as the abscissas are
    /// distinct, which is what makes it usable for randomness extraction.
    pub fn vandermonde(abscissas: &[F::Element], ncols: u16) -> Result<Matrix<F>, MatrixError> {
        if abscissas.len() < usize::from(ncols) {
            return Err(MatrixError::Vandermonde(usize::from(ncols), abscissas.len()));
        }
        let nrows = u16::try_from(abscissas.len()).map_err(|_| MatrixError::Arithmetic)?;
        let mut data = Vec::with_capacity(usize::from(nrows) * usize::from(ncols));
        for x in abscissas {
            let mut power = F::ONE;
            for _ in 0..ncols {
                data.push(power);
                power = power * x;
            }
        }
        Matrix::new(data, nrows, ncols)
    }
}

/// A matrix operation failed.
#[derive(Error, Debug, Eq, PartialEq)]
pub enum MatrixError {
    /// The data length does not match the dimensions.
    #[error("matrix build needs {1} elements, got {0}")]
    Build(usize, usize),

    /// An entry index is out of bounds.
    #[error("matrix index out of bounds")]
    IndexNotFound,

    /// The dimensions of the operands do not line up.
    #[error("matrix dimensions mismatch")]
    Arithmetic,

    /// Not enough abscissas for the requested Vandermonde matrix.
    #[error("vandermonde matrix needs {0} abscissas, got {1}")]
    Vandermonde(usize, usize),
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use crate::{fields::PrimeField, modular::ModularNumber, prime};

    prime!(P13, 13u64);

    type Field = PrimeField<P13>;

    fn numbers(values: &[u32]) -> Vec<ModularNumber<P13>> {
        values.iter().map(|v| ModularNumber::from_u32(*v)).collect()
    }

    #[test]
    fn build_validates_dimensions() {
        assert!(Matrix::<Field>::new(numbers(&[1, 2, 3]), 2, 2).is_err());
        assert!(Matrix::<Field>::new(numbers(&[1, 2, 3, 4]), 2, 2).is_ok());
    }

    #[test]
    fn vandermonde_rows() {
        let matrix = Matrix::<Field>::vandermonde(&numbers(&[2, 3]), 2).unwrap();
        assert_eq!(matrix.data(), numbers(&[1, 2, 1, 3]).as_slice());
    }

    #[test]
    fn vandermonde_needs_enough_abscissas() {
        assert!(Matrix::<Field>::vandermonde(&numbers(&[2]), 2).is_err());
    }
}
