use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{EntitlementStore, QuotaState, QuotaStoreError};

/// Process-local store; every unknown user starts with `free_scan_limit`.
pub struct InMemoryEntitlementStore {
    free_scan_limit: i32,
    users: Mutex<HashMap<Uuid, QuotaState>>,
}

impl InMemoryEntitlementStore {
    pub fn new(free_scan_limit: i32) -> Self {
        Self {
            free_scan_limit,
            users: Mutex::new(HashMap::new()),
        }
    }

    pub async fn set(&self, user_id: Uuid, state: QuotaState) {
        self.users.lock().await.insert(user_id, state);
    }

    fn fresh(&self) -> QuotaState {
        QuotaState {
            is_premium: false,
            remaining_free_scans: self.free_scan_limit,
        }
    }
}

#[async_trait]
impl EntitlementStore for InMemoryEntitlementStore {
    async fn state(&self, user_id: Uuid) -> Result<QuotaState, QuotaStoreError> {
        let users = self.users.lock().await;
        Ok(users.get(&user_id).copied().unwrap_or_else(|| self.fresh()))
    }

    async fn consume(&self, user_id: Uuid) -> Result<bool, QuotaStoreError> {
        let fresh = self.fresh();
        let mut users = self.users.lock().await;
        let entry = users.entry(user_id).or_insert(fresh);
        if entry.is_premium {
            return Ok(true);
        }
        if entry.remaining_free_scans <= 0 {
            return Ok(false);
        }
        entry.remaining_free_scans -= 1;
        Ok(true)
    }
}
