//! Disk cache for the hyper-invertible matrix.
//!
//! The matrix is a pure function of the modulus, the party count and the
//! polynomial degree, and computing it is the expensive part of protocol
//! setup for large party sets. It is therefore persisted under a file name
//! derived from those three parameters and reloaded on later runs.

use crate::protocol::errors::ShamirError;
use math_lib::{
    fields::{Field, PrimeField},
    matrix::Matrix,
    modular::{EncodedModularNumber, ModularNumber, Prime},
};
use std::path::{Path, PathBuf};

#[derive(serde::Serialize, serde::Deserialize)]
struct CachedMatrix {
    nrows: u16,
    ncols: u16,
    data: Vec<EncodedModularNumber>,
}

/// The cache file path for a `(modulus, party count, degree)` triple.
pub fn cache_path<T: Prime>(dir: &Path, party_count: usize, degree: u64) -> PathBuf {
    dir.join(format!("hyper_matrix_{}_{}_{}.bin", T::MODULO, party_count, degree))
}

/// Loads the matrix for the given parameters, generating and persisting it
/// on a miss.
///
/// An unreadable or mismatching artifact is treated as a miss and
/// overwritten; only a failure to write the fresh artifact is an error.
pub fn load_or_generate<T: Prime>(
    dir: &Path,
    abscissas: &[ModularNumber<T>],
    ncols: u16,
    degree: u64,
) -> Result<Matrix<PrimeField<T>>, ShamirError> {
    let path = cache_path::<T>(dir, abscissas.len(), degree);
    if let Some(matrix) = try_load::<T>(&path, abscissas.len(), ncols) {
        return Ok(matrix);
    }
    let matrix = Matrix::vandermonde(abscissas, ncols)?;
    store(&path, &matrix).map_err(|e| ShamirError::MatrixCache(e.to_string()))?;
    Ok(matrix)
}

fn try_load<T: Prime>(path: &Path, nrows: usize, ncols: u16) -> Option<Matrix<PrimeField<T>>> {
    let cached: CachedMatrix = serde_files_utils::binary::read_binary(path).ok()?;
    if usize::from(cached.nrows) != nrows || cached.ncols != ncols {
        return None;
    }
    let data = PrimeField::<T>::try_decode(&cached.data).ok()?;
    Matrix::new(data, cached.nrows, cached.ncols).ok()
}

fn store<T: Prime>(path: &Path, matrix: &Matrix<PrimeField<T>>) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let cached = CachedMatrix {
        nrows: matrix.nrows(),
        ncols: matrix.ncols(),
        data: PrimeField::<T>::encode(matrix.data()),
    };
    serde_files_utils::binary::write_binary(path, &cached)
}
