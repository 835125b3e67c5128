use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::interpret::{interpret, Interpretation};
use super::model::{AnalyzedDish, FoodAnalysis, ScanError};
use crate::images::services::{link_for, store_upload, ImageLink};
use crate::images::{ImageEncoder, ImageRef};
use crate::quota::gate::{CommitResult, Eligibility, Submission};
use crate::quota::QuotaGate;
use crate::storage::StorageClient;
use crate::vision::{PromptSpec, VisionClient, VisionError};

/// Single entry point for photo scans: quota check, encode, analyze,
/// interpret/aggregate, quota commit. Every failure ends up as an outcome on
/// the returned `FoodAnalysis`.
#[derive(Clone)]
pub struct ScanOrchestrator {
    gate: QuotaGate,
    encoder: ImageEncoder,
    vision: Arc<dyn VisionClient>,
    storage: Arc<dyn StorageClient>,
    prompt: Arc<PromptSpec>,
}

/// Photo bytes received by an endpoint. They are written to storage only after
/// the quota check passes, and removed again unless the scan succeeds.
#[derive(Debug, Clone)]
pub struct Upload {
    pub body: Bytes,
    pub content_type: Option<String>,
}

enum Source<'a> {
    Existing(&'a ImageRef),
    Upload(Upload),
}

enum Analyzed {
    NoFood,
    Dish(AnalyzedDish),
}

impl ScanOrchestrator {
    pub fn new(
        gate: QuotaGate,
        vision: Arc<dyn VisionClient>,
        storage: Arc<dyn StorageClient>,
    ) -> Self {
        Self {
            gate,
            encoder: ImageEncoder::new(storage.clone()),
            vision,
            storage,
            prompt: Arc::new(PromptSpec::default()),
        }
    }

    pub async fn scan(&self, image: &ImageRef, user_id: Uuid) -> FoodAnalysis {
        let span = info_span!("scan", %user_id, image = %image);
        self.run(Source::Existing(image), user_id)
            .instrument(span)
            .await
    }

    pub async fn scan_upload(&self, upload: Upload, user_id: Uuid) -> FoodAnalysis {
        let span = info_span!("scan", %user_id, image = "upload", bytes = upload.body.len());
        self.run(Source::Upload(upload), user_id)
            .instrument(span)
            .await
    }

    /// Like `scan`, but gives up when `cancel` resolves first. A cancelled scan
    /// returns `None` and never commits quota.
    pub async fn scan_until<C>(
        &self,
        image: &ImageRef,
        user_id: Uuid,
        cancel: C,
    ) -> Option<FoodAnalysis>
    where
        C: Future<Output = ()>,
    {
        tokio::select! {
            analysis = self.scan(image, user_id) => Some(analysis),
            _ = cancel => {
                info!(%user_id, "scan cancelled, result discarded");
                None
            }
        }
    }

    async fn run(&self, source: Source<'_>, user_id: Uuid) -> FoodAnalysis {
        let ticket = match self.gate.check_eligibility(user_id).await {
            Ok(Eligibility::Granted(ticket)) => ticket,
            Ok(Eligibility::Rejected) => return FoodAnalysis::quota_exhausted(),
            Err(e) => return fail(e.into()),
        };

        let (image, uploaded) = match source {
            Source::Existing(image) => (Cow::Borrowed(image), false),
            Source::Upload(upload) => {
                let stored = store_upload(
                    self.storage.as_ref(),
                    user_id,
                    upload.body,
                    upload.content_type.as_deref(),
                )
                .await;
                match stored {
                    Ok(image) => (Cow::Owned(image), true),
                    Err(e) => return fail(ScanError::Upload(format!("{:#}", e))),
                }
            }
        };

        let submission = ticket.submit();
        let analysis = match self.analyze(&image).await {
            Ok(Analyzed::Dish(dish)) => self.commit(submission, dish, &image).await,
            Ok(Analyzed::NoFood) => {
                submission.discard();
                info!(outcome = "noFood", "scan finished");
                FoodAnalysis::no_food()
            }
            Err(e) => {
                submission.discard();
                fail(e)
            }
        };
        if uploaded && !analysis.is_success() {
            self.remove_upload(&image).await;
        }
        analysis
    }

    async fn analyze(&self, image: &ImageRef) -> Result<Analyzed, ScanError> {
        let encoded = self.encoder.encode(image).await?;
        let raw = self.vision.analyze(&encoded, &self.prompt).await?;
        match interpret(&raw)? {
            Interpretation::NoFood => Ok(Analyzed::NoFood),
            Interpretation::Dish(dish) => Ok(Analyzed::Dish(dish)),
        }
    }

    /// The link is built first so nothing awaits after the quota decrement.
    async fn commit(
        &self,
        submission: Submission,
        dish: AnalyzedDish,
        image: &ImageRef,
    ) -> FoodAnalysis {
        let link = self.image_link(image).await;
        match submission.commit().await {
            Ok(CommitResult::Committed) => {}
            Ok(CommitResult::Exhausted) => return FoodAnalysis::quota_exhausted(),
            Err(e) => return fail(e.into()),
        }
        let analysis = FoodAnalysis::success(dish, link);
        info!(
            outcome = "success",
            scan_id = %analysis.id(),
            ingredients = analysis.ingredients().len(),
            calories = analysis.total_nutrients().calories(),
            "scan finished"
        );
        analysis
    }

    async fn image_link(&self, image: &ImageRef) -> Option<ImageLink> {
        match link_for(self.storage.as_ref(), image).await {
            Ok(link) => Some(link),
            Err(e) => {
                warn!(error = %e, "could not build image link");
                None
            }
        }
    }

    async fn remove_upload(&self, image: &ImageRef) {
        let ImageRef::Stored(key) = image else {
            return;
        };
        if let Err(e) = self.storage.delete_object(key).await {
            warn!(error = %e, key = %key, "could not remove unused upload");
        }
    }
}

fn fail(e: ScanError) -> FoodAnalysis {
    let category = e.category();
    match &e {
        ScanError::Vision(VisionError::Config(_)) | ScanError::QuotaStore(_) => {
            error!(error = %e, ?category, "scan failed: service misconfigured")
        }
        ScanError::Upload(_) => error!(error = %e, ?category, "scan failed: storage unavailable"),
        _ => warn!(error = %e, ?category, "scan failed"),
    }
    FoodAnalysis::failed(category)
}
