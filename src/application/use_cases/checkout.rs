use std::sync::Arc;

use serde::Serialize;
use tracing::instrument;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::payment_processor::{CheckoutRequest, CheckoutSession, PaymentProcessorPort},
    application::validators::is_valid_email,
};

/// The single monthly plan on sale.
#[derive(Debug, Clone)]
pub struct CheckoutPlan {
    pub title: String,
    pub price_cents: i64,
    pub currency: String,
    /// Where the processor sends the buyer after paying.
    pub back_url: String,
    pub notification_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CheckoutMode {
    OneTime,
    Recurring,
}

#[derive(Clone)]
pub struct CheckoutUseCases {
    processor: Option<Arc<dyn PaymentProcessorPort>>,
    plan: CheckoutPlan,
}

impl CheckoutUseCases {
    /// `processor` is `None` when no processor credential is configured; every
    /// checkout then fails with a configuration error.
    pub fn new(processor: Option<Arc<dyn PaymentProcessorPort>>, plan: CheckoutPlan) -> Self {
        Self { processor, plan }
    }

    #[instrument(skip(self, user_email))]
    pub async fn create(&self, mode: CheckoutMode, user_id: &str, user_email: &str) -> AppResult<CheckoutSession> {
        let user_id = user_id.trim();
        let user_email = user_email.trim();
        if user_id.is_empty() || user_email.is_empty() {
            return Err(AppError::InvalidInput("userId and userEmail are required".into()));
        }
        if !is_valid_email(user_email) {
            return Err(AppError::InvalidInput("userEmail is invalid".into()));
        }

        let processor = self.processor.as_ref().ok_or_else(|| {
            tracing::error!("checkout requested but no processor credential is configured");
            AppError::ProviderNotConfigured
        })?;

        let request = CheckoutRequest {
            user_id: user_id.to_string(),
            user_email: user_email.to_string(),
            title: self.plan.title.clone(),
            price_cents: self.plan.price_cents,
            currency: self.plan.currency.clone(),
            back_url: self.plan.back_url.clone(),
            notification_url: self.plan.notification_url.clone(),
        };

        let session = match mode {
            CheckoutMode::OneTime => processor.create_payment_checkout(&request).await?,
            CheckoutMode::Recurring => processor.create_subscription_checkout(&request).await?,
        };

        tracing::info!(user_id, processor_id = %session.id, ?mode, "checkout created");
        Ok(session)
    }
}
