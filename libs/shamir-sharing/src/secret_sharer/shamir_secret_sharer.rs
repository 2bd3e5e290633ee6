//! Shamir secret sharer.

use crate::{
    party::{PartyId, PartyMapper},
    protocol::{PolyDegree, RecVectorError, RecoverSecretError, Shamir, ShamirError},
    secret_sharer::{
        GenerateSharesError, MultiMapError, MultiRecoverError, PartyShares, SecretSharer, SecretSharerProperties,
    },
};
use math_lib::{
    fields::PrimeField,
    modular::{ModularNumber, Prime},
};
use std::{path::Path, sync::Arc};

/// A secret sharer backed by the Shamir protocol over one prime field.
#[derive(Clone)]
pub struct ShamirSecretSharer<T: Prime> {
    local_party_id: PartyId,
    shamir: Arc<Shamir<PrimeField<T>>>,
}

impl<T: Prime> ShamirSecretSharer<T> {
    /// Constructs a new secret sharer.
    ///
    /// # Arguments
    /// * `local_party_id` - Our party id.
    /// * `polynomial_degree` - The threshold degree of generated polynomials.
    /// * `parties` - The parties shares are generated for; this fixes both
    ///   the share count and the abscissa assignment.
    pub fn new(local_party_id: PartyId, polynomial_degree: u64, parties: Vec<PartyId>) -> Result<Self, ShamirError> {
        let shamir = Arc::new(Shamir::new(local_party_id.clone(), polynomial_degree, parties)?);
        Ok(Self { local_party_id, shamir })
    }

    /// Constructs a new secret sharer, loading the hyper-invertible matrix
    /// from the given cache directory.
    pub fn new_with_matrix_cache(
        local_party_id: PartyId,
        polynomial_degree: u64,
        parties: Vec<PartyId>,
        cache_dir: &Path,
    ) -> Result<Self, ShamirError> {
        let shamir =
            Arc::new(Shamir::new_with_matrix_cache(local_party_id.clone(), polynomial_degree, parties, cache_dir)?);
        Ok(Self { local_party_id, shamir })
    }

    /// The reconstruction vector for a window of consecutive parties,
    /// wrapping modulo the party count. Memoized per `(start, count)`.
    pub fn rec_vector(&self, start: usize, count: usize) -> Result<Arc<Vec<ModularNumber<T>>>, RecVectorError> {
        self.shamir.rec_vector(start, count)
    }

    /// The parties in a window of consecutive positions.
    pub fn window_parties(&self, start: usize, count: usize) -> Vec<PartyId> {
        self.shamir.window_parties(start, count)
    }

    /// The position of the local party in the sorted ordering.
    pub fn local_party_index(&self) -> Option<usize> {
        self.shamir.party_mapper().index_of(&self.local_party_id)
    }
}

impl<T: Prime> SecretSharerProperties for ShamirSecretSharer<T> {
    type Prime = T;

    fn local_party_id(&self) -> &PartyId {
        &self.local_party_id
    }

    fn parties(&self) -> Vec<PartyId> {
        self.shamir.parties()
    }

    fn party_count(&self) -> usize {
        self.shamir.party_count()
    }

    fn party_mapper(&self) -> &PartyMapper<PrimeField<T>> {
        self.shamir.party_mapper()
    }

    fn polynomial_degree(&self) -> u64 {
        self.shamir.polynomial_degree()
    }
}

impl<T: Prime> SecretSharer<ModularNumber<T>> for ShamirSecretSharer<T> {
    type Secret = ModularNumber<T>;
    type RecoverError = RecoverSecretError;
    type HyperMapError = crate::protocol::HyperMapError;

    fn generate_shares(
        &self,
        secret: &Self::Secret,
        degree: PolyDegree,
    ) -> Result<PartyShares<ModularNumber<T>>, GenerateSharesError> {
        let points = self.shamir.generate_shares(secret, degree).into_points();
        let mut party_shares = PartyShares::with_capacity_and_hasher(points.len(), Default::default());
        for point in points {
            let (x, share) = point.into_coordinates();
            let party_id = self.shamir.party_mapper().party(&x).ok_or(GenerateSharesError::AbscissaMapping)?;
            party_shares.insert(party_id.clone(), share);
        }
        Ok(party_shares)
    }

    fn recover<I>(&self, shares: I) -> Result<Self::Secret, Self::RecoverError>
    where
        I: IntoIterator<Item = (PartyId, ModularNumber<T>)>,
    {
        self.shamir.recover_secret(shares.into_iter())
    }

    fn recover_robust<I>(&self, shares: I) -> Result<Self::Secret, Self::RecoverError>
    where
        I: IntoIterator<Item = (PartyId, ModularNumber<T>)>,
    {
        self.shamir.robust_recover_secret(shares.into_iter())
    }

    fn weigh(&self, share: ModularNumber<T>) -> Result<Self::Secret, Self::RecoverError> {
        self.shamir.weigh(&share)
    }

    fn hyper_map<I>(&self, shares: I) -> Result<Vec<Self::Secret>, Self::HyperMapError>
    where
        I: IntoIterator<Item = (PartyId, ModularNumber<T>)>,
    {
        self.shamir.hyper_map(shares.into_iter())
    }
}

impl<S, T> SecretSharer<Vec<S>> for ShamirSecretSharer<T>
where
    Self: SecretSharer<S>,
    S: Clone,
    T: Prime,
{
    type Secret = Vec<<Self as SecretSharer<S>>::Secret>;
    type RecoverError = MultiRecoverError<<Self as SecretSharer<S>>::RecoverError>;
    type HyperMapError = MultiMapError<<Self as SecretSharer<S>>::HyperMapError>;

    fn generate_shares(
        &self,
        secrets: &Self::Secret,
        degree: PolyDegree,
    ) -> Result<PartyShares<Vec<S>>, GenerateSharesError> {
        let mut party_shares: PartyShares<Vec<S>> = PartyShares::default();
        for secret in secrets {
            let shares = self.generate_shares(secret, degree)?;
            for (party_id, share) in shares {
                party_shares.entry(party_id).or_insert_with(|| Vec::with_capacity(secrets.len())).push(share);
            }
        }
        Ok(party_shares)
    }

    fn recover<I>(&self, shares: I) -> Result<Self::Secret, Self::RecoverError>
    where
        I: IntoIterator<Item = (PartyId, Vec<S>)>,
    {
        let secret_shares = Self::transpose(shares)?;
        let mut secrets = Vec::new();
        for shares in secret_shares {
            secrets.push(self.recover(shares)?);
        }
        Ok(secrets)
    }

    fn recover_robust<I>(&self, shares: I) -> Result<Self::Secret, Self::RecoverError>
    where
        I: IntoIterator<Item = (PartyId, Vec<S>)>,
    {
        let secret_shares = Self::transpose(shares)?;
        let mut secrets = Vec::new();
        for shares in secret_shares {
            secrets.push(self.recover_robust(shares)?);
        }
        Ok(secrets)
    }

    fn weigh(&self, shares: Vec<S>) -> Result<Self::Secret, Self::RecoverError> {
        let mut weighed = Vec::new();
        for share in shares {
            weighed.push(self.weigh(share)?);
        }
        Ok(weighed)
    }

    fn hyper_map<I>(&self, shares: I) -> Result<Vec<Self::Secret>, Self::HyperMapError>
    where
        I: IntoIterator<Item = (PartyId, Vec<S>)>,
    {
        let mut batches = Vec::new();
        let mut shares = shares.into_iter();
        let first = shares.next().ok_or(MultiMapError::NoShares)?;
        let mut secret_shares = vec![PartyShares::<S>::default(); first.1.len()];
        for (party_id, party_shares) in std::iter::once(first).chain(shares) {
            if party_shares.len() != secret_shares.len() {
                return Err(MultiMapError::ShareCountMismatch);
            }
            for (share, bucket) in party_shares.into_iter().zip(secret_shares.iter_mut()) {
                bucket.insert(party_id.clone(), share);
            }
        }
        for shares in secret_shares {
            batches.push(self.hyper_map(shares)?);
        }
        Ok(batches)
    }
}

impl<T: Prime> ShamirSecretSharer<T> {
    // Regroups "one vector per party" into "one party-share map per secret".
    fn transpose<S, I, E>(shares: I) -> Result<Vec<PartyShares<S>>, MultiRecoverError<E>>
    where
        I: IntoIterator<Item = (PartyId, Vec<S>)>,
        S: Clone,
        E: std::error::Error,
    {
        let mut shares = shares.into_iter();
        let first = shares.next().ok_or(MultiRecoverError::NoShares)?;
        let mut secret_shares = vec![PartyShares::<S>::default(); first.1.len()];
        for (party_id, party_shares) in std::iter::once(first).chain(shares) {
            if party_shares.len() != secret_shares.len() {
                return Err(MultiRecoverError::ShareCountMismatch);
            }
            for (share, bucket) in party_shares.into_iter().zip(secret_shares.iter_mut()) {
                bucket.insert(party_id.clone(), share);
            }
        }
        Ok(secret_shares)
    }
}

/// Creates a three-party secret sharer for testing purposes.
#[cfg(any(test, feature = "testing"))]
#[allow(clippy::panic)]
pub fn test_secret_sharer<T: Prime>() -> ShamirSecretSharer<T> {
    let local_party_id = PartyId::from(10usize);
    let parties = vec![local_party_id.clone(), PartyId::from(20usize), PartyId::from(30usize)];
    match ShamirSecretSharer::<T>::new(local_party_id, 1, parties) {
        Ok(sharer) => sharer,
        Err(e) => panic!("building test secret sharer: {e}"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use math_lib::modular::M61Prime;
    use rstest::rstest;

    type Prime = M61Prime;
    type Sharer = ShamirSecretSharer<Prime>;

    fn make_sharer() -> Sharer {
        let parties = vec![PartyId::from(1usize), PartyId::from(2usize), PartyId::from(3usize)];
        Sharer::new(parties[0].clone(), 1, parties).unwrap()
    }

    #[rstest]
    #[case(1)]
    #[case(42)]
    #[case(15000)]
    #[case(22321)]
    fn share_and_recover(#[case] secret: u32) {
        let sharer = make_sharer();
        let secret = ModularNumber::from_u32(secret);
        let shares: PartyShares<ModularNumber<Prime>> = sharer.generate_shares(&secret, PolyDegree::T).unwrap();
        assert_eq!(shares.len(), 3);
        assert_eq!(sharer.recover(shares).unwrap(), secret);
    }

    #[test]
    fn bulk_share_and_recover() {
        let sharer = make_sharer();
        let secrets = vec![ModularNumber::from_u32(42), ModularNumber::from_u32(1337)];
        let shares: PartyShares<Vec<ModularNumber<Prime>>> = sharer.generate_shares(&secrets, PolyDegree::T).unwrap();
        assert_eq!(shares.len(), 3);
        assert_eq!(sharer.recover(shares).unwrap(), secrets);
    }

    #[test]
    fn robust_recovery_through_sharer() {
        let sharer = make_sharer();
        let secret = ModularNumber::from_u32(99);
        let shares: PartyShares<ModularNumber<Prime>> = sharer.generate_shares(&secret, PolyDegree::T).unwrap();
        assert_eq!(sharer.recover_robust(shares.clone()).unwrap(), secret);

        let mut corrupted = shares;
        let key = PartyId::from(2usize);
        let share = corrupted[&key];
        corrupted.insert(key, share + &ModularNumber::ONE);
        assert!(matches!(sharer.recover_robust(corrupted), Err(RecoverSecretError::Inconsistent)));
    }

    #[test]
    fn weighed_shares_sum_to_secret() {
        let parties = vec![PartyId::from(1usize), PartyId::from(2usize), PartyId::from(3usize)];
        let secret = ModularNumber::<Prime>::from_u32(777);
        let sharers: Vec<_> =
            parties.iter().map(|party| Sharer::new(party.clone(), 1, parties.clone()).unwrap()).collect();

        let shares: PartyShares<ModularNumber<Prime>> =
            sharers[0].generate_shares(&secret, PolyDegree::T).unwrap();
        let mut total = ModularNumber::ZERO;
        for sharer in &sharers {
            let share = shares[sharer.local_party_id()];
            total = total + &sharer.weigh(share).unwrap();
        }
        assert_eq!(total, secret);
    }

    #[test]
    fn threshold_secrecy_every_completion_is_consistent() {
        // A single share of a degree-1 sharing admits a consistent
        // completion for *any* candidate secret: the line through the share
        // and the candidate constant term is unique and valid. Holding t
        // shares therefore narrows nothing down.
        let sharer = make_sharer();
        let secret = ModularNumber::<Prime>::from_u32(5);
        let shares: PartyShares<ModularNumber<Prime>> = sharer.generate_shares(&secret, PolyDegree::T).unwrap();
        let observer = PartyId::from(1usize);
        let observed = shares[&observer];
        let x1 = ModularNumber::new(*sharer.party_mapper().abscissa(&observer).unwrap());

        for candidate in [0u32, 1, 5, 123, 65535] {
            let candidate = ModularNumber::from_u32(candidate);
            // p(z) = candidate + slope * z with p(x1) = observed.
            let slope = ((observed - &candidate) / &x1).unwrap();
            assert_eq!(candidate + &(slope * &x1), observed);
        }
    }
}
