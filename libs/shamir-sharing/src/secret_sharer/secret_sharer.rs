//! Secret sharer traits.

use crate::{
    party::{PartyId, PartyMapper},
    protocol::PolyDegree,
};
use math_lib::{fields::PrimeField, modular::Prime};
use rustc_hash::FxHashMap;

/// Each party's shares.
pub type PartyShares<T> = FxHashMap<PartyId, T>;

/// The configuration properties of a secret sharer.
pub trait SecretSharerProperties {
    /// The prime number being used.
    type Prime: Prime;

    /// The local party id.
    fn local_party_id(&self) -> &PartyId;

    /// The ids of every party shares are generated for.
    fn parties(&self) -> Vec<PartyId>;

    /// The number of parties shares are generated for.
    fn party_count(&self) -> usize;

    /// The party mapper in use.
    fn party_mapper(&self) -> &PartyMapper<PrimeField<Self::Prime>>;

    /// The degree of generated polynomials.
    fn polynomial_degree(&self) -> u64;
}

/// A type that turns secrets into shares and shares into secrets.
///
/// The generic type `S` is the share representation.
pub trait SecretSharer<S>: SecretSharerProperties {
    /// The type of the secrets this sharer operates on.
    type Secret;

    /// The error returned during secret recovery.
    type RecoverError: std::error::Error + Send + Sync + 'static;

    /// The error returned during the hyper-invertible mapping.
    type HyperMapError: std::error::Error;

    /// Generates one share of the given secret per party.
    fn generate_shares(&self, secret: &Self::Secret, degree: PolyDegree)
        -> Result<PartyShares<S>, GenerateSharesError>;

    /// Recovers the secret behind the provided shares.
    fn recover<I>(&self, shares: I) -> Result<Self::Secret, Self::RecoverError>
    where
        I: IntoIterator<Item = (PartyId, S)>;

    /// Recovers the secret, verifying the sharing is consistent.
    ///
    /// Fails with a distinguished error when any share does not lie on the
    /// polynomial determined by the first threshold-plus-one shares.
    fn recover_robust<I>(&self, shares: I) -> Result<Self::Secret, Self::RecoverError>
    where
        I: IntoIterator<Item = (PartyId, S)>;

    /// Weighs the local share by its Lagrange coefficient.
    fn weigh(&self, share: S) -> Result<Self::Secret, Self::RecoverError>;

    /// Maps one share per party through the hyper-invertible matrix.
    fn hyper_map<I>(&self, shares: I) -> Result<Vec<Self::Secret>, Self::HyperMapError>
    where
        I: IntoIterator<Item = (PartyId, S)>;
}

/// Share generation failed.
#[derive(thiserror::Error, Debug)]
pub enum GenerateSharesError {
    /// An abscissa could not be mapped back to a party.
    #[error("abscissa to party mapping failed")]
    AbscissaMapping,
}

/// An error during the recovery of a batch of secrets.
#[derive(thiserror::Error, Debug)]
pub enum MultiRecoverError<E: std::error::Error> {
    /// No shares were provided.
    #[error("no shares provided")]
    NoShares,

    /// Parties provided different numbers of shares.
    #[error("share count mismatch")]
    ShareCountMismatch,

    /// Recovering one of the secrets failed.
    #[error(transparent)]
    Single(#[from] E),
}

/// An error during the hyper-invertible mapping of a batch.
#[derive(thiserror::Error, Debug)]
pub enum MultiMapError<E: std::error::Error> {
    /// No shares were provided.
    #[error("no shares provided")]
    NoShares,

    /// Parties provided different numbers of shares.
    #[error("share count mismatch")]
    ShareCountMismatch,

    /// Mapping one of the batches failed.
    #[error(transparent)]
    Single(#[from] E),
}
