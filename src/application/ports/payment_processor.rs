use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::app_error::AppResult;

/// What to sell and where to send the buyer afterwards.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub user_id: String,
    pub user_email: String,
    pub title: String,
    pub price_cents: i64,
    pub currency: String,
    pub back_url: String,
    /// Webhook endpoint the processor should notify for this object.
    pub notification_url: Option<String>,
}

/// A processor-hosted checkout: one-time preference or recurring preapproval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutSession {
    pub id: String,
    pub redirect_url: String,
}

/// Recurring-subscription authorization as reported by the processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreapprovalInfo {
    pub id: String,
    pub status: String,
    pub external_reference: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
}

/// One-time payment as reported by the processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentInfo {
    pub id: String,
    pub status: String,
    pub external_reference: Option<String>,
    /// `metadata.user_id`, set by our own checkout.
    pub metadata_user_id: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Payment processor port.
///
/// Creation calls are not idempotent: every call creates a new processor-side
/// object. Fetch calls return the authoritative state for a notification.
#[async_trait]
pub trait PaymentProcessorPort: Send + Sync {
    async fn create_payment_checkout(&self, request: &CheckoutRequest) -> AppResult<CheckoutSession>;

    async fn create_subscription_checkout(
        &self,
        request: &CheckoutRequest,
    ) -> AppResult<CheckoutSession>;

    async fn get_preapproval(&self, id: &str) -> AppResult<PreapprovalInfo>;

    async fn get_payment(&self, id: &str) -> AppResult<PaymentInfo>;
}
