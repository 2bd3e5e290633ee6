//! Protocol sessions.
//!
//! A session binds one party's protocol state to one network configuration:
//! the party set, the threshold, the secret sharer with its memoized
//! reconstruction vectors, and the pool of precomputed double sharings. All
//! configuration is an explicit value; two sessions never share state.

use crate::{
    multiplication::mult_atlas::{AtlasCreateError, AtlasMultState, AtlasMultStateMessage},
    multiplication::mult_shares::OperandShares,
    random::double_sharing::DoubleSharingPool,
};
use basic_types::PartyId;
use math_lib::modular::Prime;
use shamir_sharing::{
    protocol::ShamirError,
    secret_sharer::{SecretSharerProperties, ShamirSecretSharer},
};
use state_machine::state::RecipientMessage;
use std::{path::PathBuf, sync::Arc};

/// The security the external transport provides.
///
/// The engine does not implement transport; it refuses to run over a channel
/// the deployment declares as plaintext, since share secrecy assumes a
/// non-eavesdropping network.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TransportSecurity {
    /// The transport authenticates and encrypts party-to-party channels.
    EncryptedAuthenticated,

    /// The transport moves plaintext.
    Plaintext,
}

/// The configuration of a protocol session.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// The ids of every participating party.
    pub parties: Vec<PartyId>,

    /// Our own party id.
    pub local_party_id: PartyId,

    /// The threshold degree `t` of sharing polynomials.
    pub polynomial_degree: u64,

    /// The security the transport declares.
    pub transport: TransportSecurity,

    /// Permits a zero threshold, which replicates values in the clear.
    ///
    /// Degree zero has no secrecy whatsoever and must be opted into
    /// explicitly.
    pub allow_plaintext_replication: bool,

    /// How many authenticated results a SPDZ-wise session accumulates
    /// before a MAC check is due.
    pub mac_batch_size: usize,

    /// Where to cache the hyper-invertible matrix, if anywhere.
    pub matrix_cache_dir: Option<PathBuf>,
}

impl SessionConfig {
    /// Constructs a configuration with the default knobs.
    pub fn new(
        parties: Vec<PartyId>,
        local_party_id: PartyId,
        polynomial_degree: u64,
        transport: TransportSecurity,
    ) -> Self {
        Self {
            parties,
            local_party_id,
            polynomial_degree,
            transport,
            allow_plaintext_replication: false,
            mac_batch_size: 128,
            matrix_cache_dir: None,
        }
    }
}

/// The session configuration is unusable.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The threshold does not leave an honest majority: multiplication
    /// requires `2t < n`.
    #[error("{parties} parties cannot run threshold {degree}: need more than twice the threshold")]
    InsufficientParties {
        /// The configured party count.
        parties: usize,
        /// The configured threshold degree.
        degree: u64,
    },

    /// Degree zero replication without the explicit opt-in flag.
    #[error("zero threshold replicates plaintext; enable allow_plaintext_replication to accept that")]
    PlaintextReplication,

    /// The local party is not part of the configured party set.
    #[error("local party is not in the party set")]
    LocalPartyNotIncluded,

    /// The transport does not protect the shares in transit.
    #[error("refusing to run over a plaintext transport")]
    InsecureTransport,

    /// The underlying sharer could not be built.
    #[error(transparent)]
    Shamir(#[from] ShamirError),
}

/// One party's protocol session.
pub struct Session<T: Prime> {
    config: SessionConfig,
    secret_sharer: Arc<ShamirSecretSharer<T>>,
    double_sharings: DoubleSharingPool<T>,
    king_cursor: usize,
}

impl<T: Prime> Session<T> {
    /// Constructs a session, validating the configuration.
    pub fn new(config: SessionConfig) -> Result<Self, ConfigError> {
        if config.transport != TransportSecurity::EncryptedAuthenticated {
            return Err(ConfigError::InsecureTransport);
        }
        if !config.parties.contains(&config.local_party_id) {
            return Err(ConfigError::LocalPartyNotIncluded);
        }
        if config.polynomial_degree == 0 && !config.allow_plaintext_replication {
            return Err(ConfigError::PlaintextReplication);
        }
        let party_count = config.parties.len() as u64;
        if party_count <= config.polynomial_degree.saturating_mul(2) {
            return Err(ConfigError::InsufficientParties {
                parties: config.parties.len(),
                degree: config.polynomial_degree,
            });
        }
        let secret_sharer = match &config.matrix_cache_dir {
            Some(dir) => ShamirSecretSharer::new_with_matrix_cache(
                config.local_party_id.clone(),
                config.polynomial_degree,
                config.parties.clone(),
                dir,
            )?,
            None => ShamirSecretSharer::new(
                config.local_party_id.clone(),
                config.polynomial_degree,
                config.parties.clone(),
            )?,
        };
        Ok(Self {
            config,
            secret_sharer: Arc::new(secret_sharer),
            double_sharings: DoubleSharingPool::default(),
            king_cursor: 0,
        })
    }

    /// The session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The secret sharer bound to this session.
    pub fn secret_sharer(&self) -> Arc<ShamirSecretSharer<T>> {
        self.secret_sharer.clone()
    }

    /// The double sharing pool.
    pub fn double_sharings(&self) -> &DoubleSharingPool<T> {
        &self.double_sharings
    }

    /// A mutable handle on the double sharing pool, for refilling it from a
    /// generation run.
    pub fn double_sharings_mut(&mut self) -> &mut DoubleSharingPool<T> {
        &mut self.double_sharings
    }

    /// Starts an ATLAS multiplication batch.
    ///
    /// Consumes one double sharing per multiplication from the pool and
    /// advances the king rotation by the batch size, so masking load spreads
    /// round-robin across batches.
    pub fn atlas_mult(
        &mut self,
        operands: Vec<OperandShares<T>>,
    ) -> Result<(AtlasMultState<T>, Vec<RecipientMessage<PartyId, AtlasMultStateMessage>>), AtlasCreateError> {
        let doubles = self.double_sharings.pop_many(operands.len())?;
        let king_base = self.king_cursor;
        self.king_cursor = (self.king_cursor + operands.len()) % self.secret_sharer.party_count();
        AtlasMultState::new(operands, doubles, king_base, self.secret_sharer.clone())
    }
}
