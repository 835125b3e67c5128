use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use tracing::{error, instrument};

use super::QuotaState;
use crate::{auth::AuthUser, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new().route("/quota", get(get_quota))
}

#[instrument(skip(state))]
pub async fn get_quota(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<QuotaState>, (StatusCode, String)> {
    match state.quota.state(user_id).await {
        Ok(s) => Ok(Json(s)),
        Err(e) => {
            error!(error = %e, %user_id, "get_quota failed");
            Err((
                StatusCode::SERVICE_UNAVAILABLE,
                "Quota service unavailable".into(),
            ))
        }
    }
}
