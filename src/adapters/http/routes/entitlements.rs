use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use chrono::Utc;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult},
    domain::entities::user_entitlement::UserEntitlement,
    use_cases::entitlement::AccessCheck,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{user_id}", get(get_entitlement))
        .route("/{user_id}/trial", post(start_trial))
        .route("/{user_id}/await-activation", get(await_activation))
}

/// GET /api/entitlements/{user_id}
async fn get_entitlement(
    State(app_state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<AccessCheck>> {
    let check = app_state
        .entitlement_use_cases
        .check_access(&user_id, Utc::now())
        .await?;
    if check.entitlement.is_none() {
        return Err(AppError::NotFound);
    }
    Ok(Json(check))
}

/// POST /api/entitlements/{user_id}/trial
async fn start_trial(
    State(app_state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<UserEntitlement>> {
    let started = app_state
        .entitlement_use_cases
        .start_trial(&user_id, Utc::now())
        .await?;
    Ok(Json(started))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ActivationResponse {
    activated: bool,
    entitlement: Option<UserEntitlement>,
}

/// GET /api/entitlements/{user_id}/await-activation
///
/// Long poll after the buyer returns from checkout. If the client disconnects
/// the handler future is dropped, the guard fires, and polling stops.
async fn await_activation(
    State(app_state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<ActivationResponse>> {
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let entitlement = app_state
        .entitlement_use_cases
        .await_activation(
            &user_id,
            app_state.config.checkout_poll_interval,
            app_state.config.checkout_poll_timeout,
            cancel,
        )
        .await?;

    Ok(Json(ActivationResponse {
        activated: entitlement.is_some(),
        entitlement,
    }))
}
