use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::images::services::ImageLink;
use crate::images::EncodingError;
use crate::nutrition::aggregator::Aggregate;
use crate::nutrition::{Ingredient, NutrientProfile};
use crate::quota::QuotaStoreError;
use crate::vision::VisionError;

/// Why a scan failed, phrased as the thing the user should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Encoding,
    Transport,
    Config,
    Malformed,
}

impl ErrorCategory {
    pub fn user_action(&self) -> &'static str {
        match self {
            ErrorCategory::Encoding => "We couldn't read that photo. Please retake it.",
            ErrorCategory::Transport => "We couldn't reach the analysis service. Check your connection and try again.",
            ErrorCategory::Config => "Food analysis is temporarily unavailable. Please try again later.",
            ErrorCategory::Malformed => "We couldn't understand the analysis. Please retake the photo or try again.",
        }
    }
}

#[derive(Debug, Error)]
#[error("malformed model response: {0}")]
pub struct MalformedResponse(pub String);

#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error(transparent)]
    Vision(#[from] VisionError),
    #[error(transparent)]
    Malformed(#[from] MalformedResponse),
    #[error(transparent)]
    QuotaStore(#[from] QuotaStoreError),
    #[error("storing upload failed: {0}")]
    Upload(String),
}

impl ScanError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ScanError::Encoding(_) => ErrorCategory::Encoding,
            ScanError::Vision(VisionError::Transport { .. }) => ErrorCategory::Transport,
            ScanError::Vision(VisionError::Config(_)) => ErrorCategory::Config,
            ScanError::Malformed(_) => ErrorCategory::Malformed,
            // Store outages are an operator problem, same as a broken credential.
            ScanError::QuotaStore(_) => ErrorCategory::Config,
            ScanError::Upload(_) => ErrorCategory::Transport,
        }
    }
}

/// Closed set of terminal results of a scan attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum Outcome {
    Success,
    NoFood,
    QuotaExhausted,
    Error {
        category: ErrorCategory,
        message: String,
    },
}

/// Validated dish produced by the interpreter, totals already derived.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzedDish {
    pub name: String,
    pub description: String,
    pub nutrients: Aggregate,
}

/// Result of one scan attempt. Built once through the outcome constructors and
/// never mutated; `ingredients` is non-empty only for `Outcome::Success`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodAnalysis {
    id: Uuid,
    name: String,
    description: String,
    ingredients: Vec<Ingredient>,
    total_nutrients: NutrientProfile,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<ImageLink>,
    #[serde(flatten)]
    outcome: Outcome,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
}

impl FoodAnalysis {
    fn empty(outcome: Outcome) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: String::new(),
            description: String::new(),
            ingredients: Vec::new(),
            total_nutrients: NutrientProfile::ZERO,
            image: None,
            outcome,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    pub fn success(dish: AnalyzedDish, image: Option<ImageLink>) -> Self {
        debug_assert!(!dish.nutrients.ingredients.is_empty());
        Self {
            id: Uuid::new_v4(),
            name: dish.name,
            description: dish.description,
            ingredients: dish.nutrients.ingredients,
            total_nutrients: dish.nutrients.total,
            image,
            outcome: Outcome::Success,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    pub fn no_food() -> Self {
        Self::empty(Outcome::NoFood)
    }

    pub fn quota_exhausted() -> Self {
        Self::empty(Outcome::QuotaExhausted)
    }

    pub fn failed(category: ErrorCategory) -> Self {
        Self::empty(Outcome::Error {
            category,
            message: category.user_action().to_string(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn description(&self) -> &str {
        &self.description
    }
    pub fn ingredients(&self) -> &[Ingredient] {
        &self.ingredients
    }
    pub fn total_nutrients(&self) -> &NutrientProfile {
        &self.total_nutrients
    }
    pub fn image(&self) -> Option<&ImageLink> {
        self.image.as_ref()
    }
    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }
    pub fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }

    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Success
    }

    pub fn error_category(&self) -> Option<ErrorCategory> {
        match self.outcome {
            Outcome::Error { category, .. } => Some(category),
            _ => None,
        }
    }
}
