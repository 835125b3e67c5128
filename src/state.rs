use crate::catalog::StaticCatalog;
use crate::config::AppConfig;
use crate::quota::repo::PgEntitlementStore;
use crate::quota::{EntitlementStore, QuotaGate};
use crate::scan::ScanOrchestrator;
use crate::storage::{Storage, StorageClient};
use crate::vision::gemini::GeminiVisionClient;
use crate::vision::VisionClient;
use anyhow::Context;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<AppConfig>,
    pub quota: Arc<dyn EntitlementStore>,
    pub scanner: ScanOrchestrator,
    pub catalog: Arc<StaticCatalog>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let db = sqlx::postgres::PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        let storage = Arc::new(
            Storage::new(
                &config.minio_endpoint,
                &config.minio_bucket,
                &config.minio_access_key,
                &config.minio_secret_key,
                "us-east-1",
            )
            .await?,
        ) as Arc<dyn StorageClient>;

        if config.vision.api_key.is_none() {
            tracing::error!("VISION_API_KEY is not set; every scan will fail with a config error");
        }
        let vision = Arc::new(GeminiVisionClient::new(&config.vision)?) as Arc<dyn VisionClient>;

        let quota = Arc::new(PgEntitlementStore::new(db.clone(), config.free_scan_limit))
            as Arc<dyn EntitlementStore>;

        let catalog = Arc::new(
            StaticCatalog::from_json_file(&config.catalog_path)
                .with_context(|| format!("load food catalog {}", config.catalog_path))?,
        );

        Ok(Self::from_parts(db, config, storage, vision, quota, catalog))
    }

    pub fn from_parts(
        db: PgPool,
        config: Arc<AppConfig>,
        storage: Arc<dyn StorageClient>,
        vision: Arc<dyn VisionClient>,
        quota: Arc<dyn EntitlementStore>,
        catalog: Arc<StaticCatalog>,
    ) -> Self {
        let scanner = ScanOrchestrator::new(QuotaGate::new(quota.clone()), vision, storage);
        Self {
            db,
            config,
            quota,
            scanner,
            catalog,
        }
    }
}

#[cfg(test)]
pub(crate) use fakes::FakeStorage;
