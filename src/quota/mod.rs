pub mod gate;
pub mod handlers;
pub mod memory;
pub mod repo;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

pub use gate::{QuotaGate, QuotaTicket};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaState {
    pub is_premium: bool,
    pub remaining_free_scans: i32,
}

impl QuotaState {
    pub fn can_consume(&self) -> bool {
        self.is_premium || self.remaining_free_scans > 0
    }
}

#[derive(Debug, Error)]
#[error("entitlement store unavailable: {0}")]
pub struct QuotaStoreError(pub String);

impl From<sqlx::Error> for QuotaStoreError {
    fn from(e: sqlx::Error) -> Self {
        Self(e.to_string())
    }
}

/// External record of who may scan for free. Implementations must make
/// `consume` an atomic decrement-if-positive so two concurrent scans cannot
/// both spend the last free scan.
#[async_trait]
pub trait EntitlementStore: Send + Sync {
    async fn state(&self, user_id: Uuid) -> Result<QuotaState, QuotaStoreError>;

    async fn can_consume(&self, user_id: Uuid) -> Result<bool, QuotaStoreError> {
        Ok(self.state(user_id).await?.can_consume())
    }

    /// Returns `false` when nothing was left to consume. Premium users always
    /// succeed without a decrement.
    async fn consume(&self, user_id: Uuid) -> Result<bool, QuotaStoreError>;
}
