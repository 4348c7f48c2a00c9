use axum::{Json, Router, extract::State, routing::post};
use chrono::Utc;
use serde::Deserialize;

use crate::{
    adapters::http::app_state::AppState, app_error::AppResult, use_cases::oracle::OracleAnswer,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/questions", post(ask))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuestionPayload {
    user_id: String,
    question: String,
}

/// POST /api/oracle/questions
async fn ask(
    State(app_state): State<AppState>,
    Json(payload): Json<QuestionPayload>,
) -> AppResult<Json<OracleAnswer>> {
    let answer = app_state
        .oracle_use_cases
        .ask(&payload.user_id, &payload.question, Utc::now())
        .await?;
    Ok(Json(answer))
}
