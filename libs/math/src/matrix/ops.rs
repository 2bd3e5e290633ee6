//! Matrix operations.

use crate::{
    fields::Field,
    matrix::{Matrix, MatrixError},
};
use std::ops::Mul;

impl<F: Field> Mul<&Matrix<F>> for Matrix<F> {
    type Output = Result<Matrix<F>, MatrixError>;

    /// Naive matrix multiplication, `A: MxK * B: KxN -> C: MxN`, O(MKN).
    fn mul(self, other: &Matrix<F>) -> Result<Matrix<F>, MatrixError> {
        if self.ncols() != other.nrows() {
            return Err(MatrixError::Arithmetic);
        }
        let mut output = Matrix::<F>::zero(self.nrows(), other.ncols());
        for row in 0..self.nrows() {
            for col in 0..other.ncols() {
                let mut total = F::ZERO;
                for i in 0..self.ncols() {
                    let left = self.entry(row, i)?;
                    let right = other.entry(i, col)?;
                    total = total + &(*left * right);
                }
                *output.entry_mut(row, col)? = total;
            }
        }
        Ok(output)
    }
}
