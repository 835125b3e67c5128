//! Per-scan quota state machine.
//!
//! `Idle -> Checked -> Submitted -> Committed | Discarded`, or
//! `Idle -> Checked -> Rejected`. Each state is its own type so the sequence is
//! enforced by ownership: a ticket is only obtained by a passing check, only a
//! submitted ticket can be committed, and committing consumes it.
//! An eligibility check is not a reservation; nothing is held between check
//! and commit.

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{EntitlementStore, QuotaStoreError};

#[derive(Clone)]
pub struct QuotaGate {
    store: Arc<dyn EntitlementStore>,
}

pub enum Eligibility {
    Granted(QuotaTicket),
    Rejected,
}

/// `Checked`: the user may submit a scan.
#[must_use]
pub struct QuotaTicket {
    user_id: Uuid,
    store: Arc<dyn EntitlementStore>,
}

/// `Submitted`: the model has been called on behalf of this ticket.
#[must_use]
pub struct Submission {
    user_id: Uuid,
    store: Arc<dyn EntitlementStore>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitResult {
    Committed,
    /// A concurrent scan spent the last free scan first.
    Exhausted,
}

impl QuotaGate {
    pub fn new(store: Arc<dyn EntitlementStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn EntitlementStore> {
        &self.store
    }

    pub async fn check_eligibility(&self, user_id: Uuid) -> Result<Eligibility, QuotaStoreError> {
        let state = self.store.state(user_id).await?;
        if state.can_consume() {
            debug!(%user_id, premium = state.is_premium, remaining = state.remaining_free_scans, "quota checked");
            Ok(Eligibility::Granted(QuotaTicket {
                user_id,
                store: self.store.clone(),
            }))
        } else {
            info!(%user_id, "quota rejected: no free scans left");
            Ok(Eligibility::Rejected)
        }
    }
}

impl QuotaTicket {
    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn submit(self) -> Submission {
        debug!(user_id = %self.user_id, "quota submitted");
        Submission {
            user_id: self.user_id,
            store: self.store,
        }
    }
}

impl Submission {
    /// Spends one free scan. Only call after a successful analysis.
    pub async fn commit(self) -> Result<CommitResult, QuotaStoreError> {
        if self.store.consume(self.user_id).await? {
            info!(user_id = %self.user_id, "quota committed");
            Ok(CommitResult::Committed)
        } else {
            warn!(user_id = %self.user_id, "quota exhausted at commit");
            Ok(CommitResult::Exhausted)
        }
    }

    /// Failed or food-less scans leave the quota untouched.
    pub fn discard(self) {
        debug!(user_id = %self.user_id, "quota discarded");
    }
}
