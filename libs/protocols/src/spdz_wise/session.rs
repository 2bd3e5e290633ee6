//! SPDZ-wise session lifecycle.

use crate::{
    multiplication::mult_shares::{MultCreateError, MultState, MultStateMessage, OperandShares},
    spdz_wise::{
        check::{MacCheckCreateError, MacCheckOutput, MacCheckState, MacCheckStateMessage},
        share::MacShare,
        state::{AuthenticatedOperands, SpdzWiseMultState, SpdzWiseMultStateMessage},
    },
};
use math_lib::modular::{ModularNumber, Prime};
use shamir_sharing::{party::PartyId, secret_sharer::ShamirSecretSharer};
use state_machine::state::RecipientMessage;
use std::sync::Arc;

/// A MAC check failed: some share or MAC was tampered with.
///
/// This outcome terminates the computation. It is never corrected silently;
/// with an honest majority the engine can detect cheating but has no
/// redundancy to undo it.
#[derive(Debug, thiserror::Error)]
#[error("mac check failed")]
pub struct MacCheckFailed;

/// The SPDZ-wise session could not be constructed.
#[derive(Debug, thiserror::Error)]
pub enum SpdzWiseSessionError {
    /// The batch size must be at least one.
    #[error("mac batch size must be at least 1")]
    ZeroBatchSize,
}

/// A check could not be started.
#[derive(Debug, thiserror::Error)]
pub enum BeginCheckError {
    /// A previous check has not been completed yet.
    #[error("a mac check is already in flight")]
    CheckInFlight,

    /// There are no pending results to check.
    #[error("no pending results")]
    NothingPending,

    /// The check state machine could not be built.
    #[error(transparent)]
    Create(#[from] MacCheckCreateError),
}

/// The session could not be finished cleanly.
#[derive(Debug, thiserror::Error)]
pub enum FinishError {
    /// Authenticated results were produced but never checked.
    ///
    /// Cheating that is never checked is never detected; run one final
    /// check before finishing.
    #[error("{0} authenticated results were never checked")]
    UncheckedResults(usize),

    /// A check was started but its outcome was never recorded.
    #[error("a mac check is still in flight")]
    CheckInFlight,
}

/// One party's SPDZ-wise session: the MAC key share and the queue of
/// authenticated results awaiting their batched check.
///
/// Every produced [`MacShare`] must eventually pass through a check;
/// [`finish`][SpdzWiseSession::finish] is the required terminal step and
/// refuses to succeed while unchecked results remain. Dropping an unfinished
/// session only logs the violation, since a drop cannot run network rounds.
pub struct SpdzWiseSession<T: Prime> {
    secret_sharer: Arc<ShamirSecretSharer<T>>,
    mac_key: ModularNumber<T>,
    batch_size: usize,
    pending: Vec<MacShare<T>>,
    check_in_flight: bool,
    finished: bool,
}

impl<T: Prime> SpdzWiseSession<T> {
    /// Constructs a new session.
    ///
    /// # Arguments
    /// - `secret_sharer` - The secret sharer bound to the session.
    /// - `mac_key` - This party's share of the MAC key, typically one
    ///   output of a RAN run at session start.
    /// - `batch_size` - How many results accumulate before a check is due.
    pub fn new(
        secret_sharer: Arc<ShamirSecretSharer<T>>,
        mac_key: ModularNumber<T>,
        batch_size: usize,
    ) -> Result<Self, SpdzWiseSessionError> {
        if batch_size == 0 {
            return Err(SpdzWiseSessionError::ZeroBatchSize);
        }
        Ok(Self { secret_sharer, mac_key, batch_size, pending: Vec::new(), check_in_flight: false, finished: false })
    }

    /// This party's share of the MAC key.
    pub fn mac_key_share(&self) -> ModularNumber<T> {
        self.mac_key
    }

    /// Starts an authenticated multiplication batch.
    pub fn mult(
        &self,
        operands: Vec<AuthenticatedOperands<T>>,
    ) -> Result<(SpdzWiseMultState<T>, Vec<RecipientMessage<PartyId, SpdzWiseMultStateMessage>>), MultCreateError>
    {
        SpdzWiseMultState::new(operands, self.secret_sharer.clone())
    }

    /// Starts the multiplication that attaches MACs to freshly input
    /// values: `mac_i = alpha * value_i`.
    pub fn authenticate(
        &self,
        values: Vec<ModularNumber<T>>,
    ) -> Result<(MultState<T>, Vec<RecipientMessage<PartyId, MultStateMessage>>), MultCreateError> {
        let operands = values.into_iter().map(|value| OperandShares::single(self.mac_key, value)).collect();
        MultState::new(operands, self.secret_sharer.clone())
    }

    /// Queues authenticated results for the next batched check.
    pub fn push_results<I: IntoIterator<Item = MacShare<T>>>(&mut self, results: I) {
        self.pending.extend(results);
    }

    /// The number of results awaiting a check.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Checks whether enough results accumulated for a check to be due.
    pub fn check_due(&self) -> bool {
        self.pending.len() >= self.batch_size
    }

    /// Starts a batched check over everything pending, draining the queue.
    ///
    /// # Arguments
    /// - `seed` - A fresh random share, opened as the coefficient seed.
    /// - `mask` - A fresh random share blinding the zero check.
    pub fn begin_check(
        &mut self,
        seed: ModularNumber<T>,
        mask: ModularNumber<T>,
    ) -> Result<(MacCheckState<T>, Vec<RecipientMessage<PartyId, MacCheckStateMessage>>), BeginCheckError> {
        if self.check_in_flight {
            return Err(BeginCheckError::CheckInFlight);
        }
        if self.pending.is_empty() {
            return Err(BeginCheckError::NothingPending);
        }
        let pending = std::mem::take(&mut self.pending);
        let result = MacCheckState::new(pending, self.mac_key, seed, mask, self.secret_sharer.clone())?;
        self.check_in_flight = true;
        Ok(result)
    }

    /// Records the outcome of the check started by
    /// [`begin_check`][SpdzWiseSession::begin_check].
    pub fn complete_check(&mut self, output: MacCheckOutput) -> Result<(), MacCheckFailed> {
        self.check_in_flight = false;
        match output {
            MacCheckOutput::Valid => Ok(()),
            MacCheckOutput::MacMismatch => Err(MacCheckFailed),
        }
    }

    /// Finishes the session.
    ///
    /// Succeeds only once every authenticated result went through a check;
    /// otherwise the caller must run one final check first. Skipping this is
    /// a correctness violation, not a performance one: unchecked cheating
    /// goes undetected forever.
    pub fn finish(mut self) -> Result<(), FinishError> {
        if self.check_in_flight {
            return Err(FinishError::CheckInFlight);
        }
        if !self.pending.is_empty() {
            return Err(FinishError::UncheckedResults(self.pending.len()));
        }
        self.finished = true;
        Ok(())
    }
}

impl<T: Prime> Drop for SpdzWiseSession<T> {
    fn drop(&mut self) {
        if !self.finished && (!self.pending.is_empty() || self.check_in_flight) {
            tracing::error!(
                pending = self.pending.len(),
                "spdz-wise session dropped without its final mac check"
            );
        }
    }
}
