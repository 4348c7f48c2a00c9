use axum::{Json, Router, extract::State, routing::post};
use serde::{Deserialize, Serialize};

use crate::{
    adapters::http::app_state::AppState,
    app_error::AppResult,
    use_cases::checkout::CheckoutMode,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/payment", post(create_payment))
        .route("/subscription", post(create_subscription))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckoutPayload {
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    user_email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PaymentCheckoutResponse {
    payment_url: String,
    id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubscriptionCheckoutResponse {
    subscription_url: String,
    id: String,
}

/// POST /api/checkout/payment
async fn create_payment(
    State(app_state): State<AppState>,
    Json(payload): Json<CheckoutPayload>,
) -> AppResult<Json<PaymentCheckoutResponse>> {
    let session = app_state
        .checkout_use_cases
        .create(CheckoutMode::OneTime, &payload.user_id, &payload.user_email)
        .await?;

    Ok(Json(PaymentCheckoutResponse {
        payment_url: session.redirect_url,
        id: session.id,
    }))
}

/// POST /api/checkout/subscription
async fn create_subscription(
    State(app_state): State<AppState>,
    Json(payload): Json<CheckoutPayload>,
) -> AppResult<Json<SubscriptionCheckoutResponse>> {
    let session = app_state
        .checkout_use_cases
        .create(CheckoutMode::Recurring, &payload.user_id, &payload.user_email)
        .await?;

    Ok(Json(SubscriptionCheckoutResponse {
        subscription_url: session.redirect_url,
        id: session.id,
    }))
}
