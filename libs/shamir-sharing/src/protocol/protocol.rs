//! Shamir secret sharing protocol.

use crate::{
    party::PartyMapper,
    protocol::{
        errors::{HyperMapError, RecVectorError, RecoverSecretError, ShamirError},
        matrix_cache,
    },
};
use basic_types::PartyId;
use math_lib::{
    decoders::{rec_coefficients, Lagrange},
    errors::InterpolationError,
    fields::{Field, PrimeField},
    matrix::Matrix,
    modular::Prime,
    polynomial::{Point, PointSequence, Polynomial},
};
use rustc_hash::FxHashMap;
use std::{path::Path, sync::Arc, sync::Mutex};

/// The degree of a sharing polynomial.
#[derive(Clone, Copy, Debug)]
pub enum PolyDegree {
    /// The configured threshold degree.
    T,

    /// Double the configured threshold degree, as produced by share
    /// multiplication.
    TwoT,
}

/// The Shamir secret sharing protocol over one field and one party set.
pub struct Shamir<F>
where
    F: Field,
{
    /// The degree of generated polynomials.
    pub(crate) polynomial_degree: u64,

    /// Maps parties to abscissas and back.
    pub(crate) mapper: PartyMapper<F>,

    /// Interpolator over the full abscissa set.
    pub(crate) lagrange: Lagrange<F>,

    /// The hyper-invertible matrix for randomness extraction.
    pub(crate) matrix: Matrix<F>,

    /// Reconstruction vectors for abscissa windows, memoized per
    /// `(start, count)`. Computing one is quadratic in the window size so
    /// sessions reuse them across every multiplication and opening.
    rec_vectors: Mutex<FxHashMap<(usize, usize), Arc<Vec<F::Element>>>>,

    /// Our own party id.
    pub(crate) local_party_id: PartyId,
}

impl<F: Field> Shamir<F> {
    /// Creates a new Shamir protocol instance.
    pub fn new(local_party_id: PartyId, polynomial_degree: u64, parties: Vec<PartyId>) -> Result<Self, ShamirError> {
        let (mapper, abscissas, extract_count) = Self::prepare(polynomial_degree, parties)?;
        let matrix = Matrix::vandermonde(&abscissas, extract_count)?;
        Self::assemble(local_party_id, polynomial_degree, mapper, abscissas, matrix)
    }

    fn prepare(
        polynomial_degree: u64,
        parties: Vec<PartyId>,
    ) -> Result<(PartyMapper<F>, Vec<F::Element>, u16), ShamirError> {
        let mapper = PartyMapper::<F>::new(parties)?;
        let len = u64::try_from(mapper.party_count()).map_err(|_| ShamirError::Arithmetic)?;
        if len <= polynomial_degree {
            return Err(ShamirError::TooHighDegree);
        }
        let abscissas: Vec<_> = mapper.abscissas().map(|x| F::as_element(*x)).collect();
        let extract_count = u16::try_from(len - polynomial_degree).map_err(|_| ShamirError::Arithmetic)?;
        Ok((mapper, abscissas, extract_count))
    }

    fn assemble(
        local_party_id: PartyId,
        polynomial_degree: u64,
        mapper: PartyMapper<F>,
        abscissas: Vec<F::Element>,
        matrix: Matrix<F>,
    ) -> Result<Self, ShamirError> {
        let lagrange = Lagrange::new(abscissas)?;
        Ok(Self {
            polynomial_degree,
            mapper,
            lagrange,
            matrix,
            rec_vectors: Mutex::new(FxHashMap::default()),
            local_party_id,
        })
    }

    /// The number of parties in this configuration.
    pub fn party_count(&self) -> usize {
        self.mapper.party_count()
    }

    /// The generated polynomial degree.
    pub fn polynomial_degree(&self) -> u64 {
        self.polynomial_degree
    }

    /// The party mapper.
    pub fn party_mapper(&self) -> &PartyMapper<F> {
        &self.mapper
    }

    /// Our party id.
    pub fn local_party_id(&self) -> &PartyId {
        &self.local_party_id
    }

    /// The parties involved in this protocol.
    pub fn parties(&self) -> Vec<PartyId> {
        self.mapper.parties().cloned().collect()
    }

    /// Generates the shares of a secret.
    ///
    /// The secret sits at the polynomial's constant term; the remaining
    /// coefficients are drawn fresh from the field, so with degree 0 the
    /// "shares" are plain copies of the secret.
    pub fn generate_shares(&self, secret: &F::Element, degree: PolyDegree) -> PointSequence<F> {
        let degree = match degree {
            PolyDegree::T => self.polynomial_degree,
            PolyDegree::TwoT => self.polynomial_degree.wrapping_mul(2),
        };
        let mut polynomial = Polynomial::<F>::new(vec![*secret]);
        let mut rng = rand::thread_rng();
        for _ in 0..degree {
            polynomial.add_coefficient(F::gen_random_element(&mut rng));
        }

        let mut point_sequence = PointSequence::<F>::default();
        for x in self.mapper.abscissas() {
            point_sequence.push(Point::new(*x, polynomial.eval_at(x)));
        }
        point_sequence
    }

    fn to_sequence<I>(&self, shares: I) -> Result<PointSequence<F>, RecoverSecretError>
    where
        I: Iterator<Item = (PartyId, F::Element)>,
    {
        let mut point_sequence = PointSequence::<F>::default();
        for (party_id, share) in shares {
            let x = self.mapper.abscissa(&party_id).ok_or(RecoverSecretError::PartyNotFound)?;
            point_sequence.push(Point::new(*x, share));
        }
        Ok(point_sequence)
    }

    /// Recovers the secret behind the given shares.
    ///
    /// Uses the precomputed full-set interpolator when the shares cover all
    /// parties and falls back to generic interpolation for partial sets.
    pub fn recover_secret<I>(&self, shares: I) -> Result<F::Element, RecoverSecretError>
    where
        I: Iterator<Item = (PartyId, F::Element)>,
    {
        let point_sequence = self.to_sequence(shares)?;
        match self.lagrange.interpolate(&point_sequence) {
            Err(InterpolationError::MismatchedAbscissas) => Ok(point_sequence.lagrange_interpolate()?),
            other => Ok(other?),
        }
    }

    /// Recovers the secret and verifies the sharing is consistent.
    ///
    /// Requires at least `2t + 1` shares. The secret is interpolated from
    /// the first `t + 1` shares; every further share is then checked to lie
    /// on the same degree-`t` polynomial. A mismatch means some share was
    /// altered and fails the recovery with
    /// [`Inconsistent`][RecoverSecretError::Inconsistent]. With at most `t`
    /// corrupted parties this detects tampering; it does not correct it.
    pub fn robust_recover_secret<I>(&self, shares: I) -> Result<F::Element, RecoverSecretError>
    where
        I: Iterator<Item = (PartyId, F::Element)>,
    {
        let point_sequence = self.to_sequence(shares)?;
        let degree = usize::try_from(self.polynomial_degree).map_err(|_| RecoverSecretError::NotEnoughShares)?;
        let needed = degree
            .checked_mul(2)
            .and_then(|d| d.checked_add(1))
            .ok_or(RecoverSecretError::NotEnoughShares)?;
        if point_sequence.points().len() < needed {
            return Err(RecoverSecretError::NotEnoughShares);
        }
        let base = point_sequence.take(degree.checked_add(1).ok_or(RecoverSecretError::NotEnoughShares)?)
            .map_err(|_| RecoverSecretError::NotEnoughShares)?;
        let abscissas: Vec<_> = base.points().iter().map(|point| F::as_element(point.x)).collect();
        let interpolator = Lagrange::<F>::new(abscissas)?;
        let secret = interpolator.interpolate(&base)?;
        for point in point_sequence.points().iter().skip(degree + 1) {
            let expected = interpolator.eval(&base, &F::as_element(point.x))?;
            if expected != point.y {
                return Err(RecoverSecretError::Inconsistent);
            }
        }
        Ok(secret)
    }

    /// Weighs a local share by its full-set Lagrange coefficient.
    pub fn weigh(&self, share: &F::Element) -> Result<F::Element, RecoverSecretError> {
        let x = self.mapper.abscissa(&self.local_party_id).ok_or(RecoverSecretError::PartyNotFound)?;
        Ok(self.lagrange.partial(x, share)?)
    }

    /// The reconstruction vector for a window of consecutive parties.
    ///
    /// The window covers `count` parties starting at position `start` in the
    /// sorted ordering, wrapping modulo the party count. Coefficients
    /// interpolate at zero, so `count` must exceed the degree of whatever
    /// polynomial the weighted shares lie on.
    pub fn rec_vector(&self, start: usize, count: usize) -> Result<Arc<Vec<F::Element>>, RecVectorError> {
        if count == 0 {
            return Err(RecVectorError::EmptyWindow);
        }
        if count > self.party_count() {
            return Err(RecVectorError::WindowTooLarge);
        }
        let mut cache = match self.rec_vectors.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(vector) = cache.get(&(start, count)) {
            return Ok(vector.clone());
        }
        let abscissas: Vec<_> = self
            .window_indices(start, count)
            .into_iter()
            .filter_map(|index| self.mapper.party_at(index))
            .filter_map(|party| self.mapper.abscissa(party))
            .map(|x| F::as_element(*x))
            .collect();
        let vector = Arc::new(rec_coefficients::<F>(&abscissas)?);
        cache.insert((start, count), vector.clone());
        Ok(vector)
    }

    /// The parties in a window of consecutive positions, wrapping modulo the
    /// party count.
    pub fn window_parties(&self, start: usize, count: usize) -> Vec<PartyId> {
        self.window_indices(start, count)
            .into_iter()
            .filter_map(|index| self.mapper.party_at(index))
            .cloned()
            .collect()
    }

    fn window_indices(&self, start: usize, count: usize) -> Vec<usize> {
        let total = self.party_count();
        (0..count).map(|offset| (start.wrapping_add(offset)) % total).collect()
    }

    /// Applies the hyper-invertible mapping to one share per party.
    ///
    /// With `n` input shares this extracts `n - t` output shares whose
    /// underlying values are uniformly random as long as at least `n - t`
    /// of the inputs were.
    pub fn hyper_map<I>(&self, shares: I) -> Result<Vec<F::Element>, HyperMapError>
    where
        I: Iterator<Item = (PartyId, F::Element)>,
    {
        let mut shares: Vec<_> = shares.collect();
        shares.sort_by(|left, right| left.0.cmp(&right.0));
        let vector: Vec<_> = shares.into_iter().map(|(_, share)| share).collect();
        let ncols = u16::try_from(vector.len()).map_err(|_| HyperMapError::Arithmetic)?;
        let vector = Matrix::new(vector, 1, ncols)?;
        let output = (vector * &self.matrix)?;
        Ok(output.into_vec())
    }
}

impl<T: Prime> Shamir<PrimeField<T>> {
    /// Creates a new instance, loading the hyper-invertible matrix from the
    /// given cache directory.
    ///
    /// The matrix is a pure function of the modulus, party count and degree;
    /// a missing or unreadable artifact is regenerated and written back.
    pub fn new_with_matrix_cache(
        local_party_id: PartyId,
        polynomial_degree: u64,
        parties: Vec<PartyId>,
        cache_dir: &Path,
    ) -> Result<Self, ShamirError> {
        let (mapper, abscissas, extract_count) = Self::prepare(polynomial_degree, parties)?;
        let matrix = matrix_cache::load_or_generate::<T>(cache_dir, &abscissas, extract_count, polynomial_degree)?;
        Self::assemble(local_party_id, polynomial_degree, mapper, abscissas, matrix)
    }
}
