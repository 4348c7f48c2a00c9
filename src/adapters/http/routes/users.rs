use axum::{Json, Router, extract::State, routing::post};
use chrono::Utc;

use crate::{
    adapters::http::app_state::AppState,
    app_error::AppResult,
    domain::entities::user_entitlement::{NewUserEntitlement, UserEntitlement},
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(register))
}

/// POST /api/users
///
/// Signup. Repeating it returns the stored record unchanged.
async fn register(
    State(app_state): State<AppState>,
    Json(payload): Json<NewUserEntitlement>,
) -> AppResult<Json<UserEntitlement>> {
    let record = app_state
        .entitlement_use_cases
        .register(&payload, Utc::now())
        .await?;
    Ok(Json(record))
}
