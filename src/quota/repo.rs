use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use tracing::debug;
use uuid::Uuid;

use super::{EntitlementStore, QuotaState, QuotaStoreError};

#[derive(Debug, Clone, FromRow)]
struct QuotaRow {
    is_premium: bool,
    remaining_free_scans: i32,
}

impl From<QuotaRow> for QuotaState {
    fn from(r: QuotaRow) -> Self {
        Self {
            is_premium: r.is_premium,
            remaining_free_scans: r.remaining_free_scans,
        }
    }
}

/// `scan_quotas` table. Rows are created on the first consume; until then a user
/// has the configured free allowance.
#[derive(Clone)]
pub struct PgEntitlementStore {
    db: PgPool,
    free_scan_limit: i32,
}

impl PgEntitlementStore {
    pub fn new(db: PgPool, free_scan_limit: i32) -> Self {
        Self {
            db,
            free_scan_limit,
        }
    }

    async fn ensure_row(&self, user_id: Uuid) -> Result<(), QuotaStoreError> {
        sqlx::query(
            r#"
            INSERT INTO scan_quotas (user_id, remaining_free_scans)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(self.free_scan_limit)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    fn or_default(&self, row: Option<QuotaRow>) -> QuotaState {
        row.map(QuotaState::from).unwrap_or(QuotaState {
            is_premium: false,
            remaining_free_scans: self.free_scan_limit,
        })
    }
}

#[async_trait]
impl EntitlementStore for PgEntitlementStore {
    async fn state(&self, user_id: Uuid) -> Result<QuotaState, QuotaStoreError> {
        let row = sqlx::query_as::<_, QuotaRow>(
            r#"
            SELECT is_premium, remaining_free_scans
              FROM scan_quotas
             WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(self.or_default(row))
    }

    async fn consume(&self, user_id: Uuid) -> Result<bool, QuotaStoreError> {
        self.ensure_row(user_id).await?;
        // Single conditional UPDATE: the row lock serializes concurrent scans.
        let row = sqlx::query_as::<_, QuotaRow>(
            r#"
            UPDATE scan_quotas
               SET remaining_free_scans = CASE
                       WHEN is_premium THEN remaining_free_scans
                       ELSE remaining_free_scans - 1
                   END,
                   updated_at = now()
             WHERE user_id = $1
               AND (is_premium OR remaining_free_scans > 0)
            RETURNING is_premium, remaining_free_scans
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        debug!(%user_id, consumed = row.is_some(), "quota consume");
        Ok(row.is_some())
    }
}
