//! Payment event reconciliation.
//!
//! Turns processor notifications into entitlement writes. Each notification is
//! handled on its own: fetch the authoritative object, find the user it belongs
//! to, map the processor status, and write. Soft outcomes (unknown type, no
//! user reference, status we do not act on) are returned as `Ignored` so the
//! webhook can acknowledge them; only fetch and write failures are errors, which
//! makes the processor redeliver.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::instrument;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::payment_processor::{PaymentInfo, PaymentProcessorPort},
    domain::entities::{
        payment_event::{PaymentEvent, PaymentEventKind, PaymentNotification},
        subscription_status::SubscriptionStatus,
        user_entitlement::{AccessWindow, EntitlementUpdate, WriteOutcome},
    },
    use_cases::entitlement::EntitlementRepo,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    UnknownType(String),
    /// Known type without `data.id`.
    Malformed(String),
    MissingUserReference,
    UnmappedStatus(String),
    UnknownUser(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Applied {
        user_id: String,
        status: SubscriptionStatus,
    },
    /// A more recent processor event for this user was already applied.
    Stale { user_id: String },
    Ignored(IgnoreReason),
}

#[derive(Clone)]
pub struct PaymentEventReconciler {
    repo: Arc<dyn EntitlementRepo>,
    processor: Option<Arc<dyn PaymentProcessorPort>>,
    access_period: chrono::Duration,
}

impl PaymentEventReconciler {
    pub fn new(
        repo: Arc<dyn EntitlementRepo>,
        processor: Option<Arc<dyn PaymentProcessorPort>>,
        access_period: chrono::Duration,
    ) -> Self {
        Self { repo, processor, access_period }
    }

    #[instrument(skip(self), fields(event_type = notification.kind()))]
    pub async fn reconcile(
        &self,
        notification: &PaymentNotification,
        now: DateTime<Utc>,
    ) -> AppResult<ReconcileOutcome> {
        match notification {
            PaymentNotification::Preapproval { id } => self.reconcile_preapproval(id, now).await,
            PaymentNotification::Payment { id } => self.reconcile_payment(id, now).await,
            PaymentNotification::Malformed { kind } => {
                tracing::warn!(event_type = %kind, "notification without data.id, ignoring");
                Ok(ReconcileOutcome::Ignored(IgnoreReason::Malformed(kind.clone())))
            }
            PaymentNotification::Unknown { kind } => {
                tracing::debug!(event_type = %kind, "unhandled notification type");
                Ok(ReconcileOutcome::Ignored(IgnoreReason::UnknownType(kind.clone())))
            }
        }
    }

    async fn reconcile_preapproval(&self, id: &str, now: DateTime<Utc>) -> AppResult<ReconcileOutcome> {
        let preapproval = self
            .processor()?
            .get_preapproval(id)
            .await
            .map_err(|e| fetch_error("preapproval", id, e))?;

        let Some(user_id) = non_empty(preapproval.external_reference.as_deref()) else {
            tracing::warn!(processor_id = id, "preapproval without external_reference, ignoring");
            return Ok(ReconcileOutcome::Ignored(IgnoreReason::MissingUserReference));
        };

        let event = PaymentEvent {
            kind: PaymentEventKind::Recurring,
            processor_object_id: id.to_string(),
            raw_status: preapproval.status,
        };
        let Some(status) = event.target_status() else {
            tracing::info!(processor_id = id, raw_status = %event.raw_status, "preapproval status not acted on");
            return Ok(ReconcileOutcome::Ignored(IgnoreReason::UnmappedStatus(event.raw_status)));
        };

        let update = EntitlementUpdate {
            subscription_status: status,
            preapproval_id: Some(id.to_string()),
            payment_id: None,
            access_until: if status == SubscriptionStatus::Active {
                AccessWindow::Clear
            } else {
                AccessWindow::Keep
            },
            event_at: preapproval.last_modified.unwrap_or(now),
            updated_at: now,
        };
        self.write(user_id, &event, &update).await
    }

    async fn reconcile_payment(&self, id: &str, now: DateTime<Utc>) -> AppResult<ReconcileOutcome> {
        let payment = self
            .processor()?
            .get_payment(id)
            .await
            .map_err(|e| fetch_error("payment", id, e))?;

        let Some(user_id) = payment_user_reference(&payment) else {
            tracing::warn!(processor_id = id, "payment without user reference, ignoring");
            return Ok(ReconcileOutcome::Ignored(IgnoreReason::MissingUserReference));
        };
        let user_id = user_id.to_string();

        let event = PaymentEvent {
            kind: PaymentEventKind::OneTime,
            processor_object_id: id.to_string(),
            raw_status: payment.status,
        };
        let Some(status) = event.target_status() else {
            tracing::info!(processor_id = id, raw_status = %event.raw_status, "payment status not acted on");
            return Ok(ReconcileOutcome::Ignored(IgnoreReason::UnmappedStatus(event.raw_status)));
        };

        // fixed period from confirmation, independent of the processor's cycle
        let update = EntitlementUpdate {
            subscription_status: status,
            preapproval_id: None,
            payment_id: Some(id.to_string()),
            access_until: AccessWindow::Until(now + self.access_period),
            event_at: payment.last_updated.unwrap_or(now),
            updated_at: now,
        };
        self.write(&user_id, &event, &update).await
    }

    async fn write(
        &self,
        user_id: &str,
        event: &PaymentEvent,
        update: &EntitlementUpdate,
    ) -> AppResult<ReconcileOutcome> {
        let outcome = match self.repo.apply_update(user_id, update).await? {
            WriteOutcome::Applied => {
                tracing::info!(
                    user_id,
                    processor_id = %event.processor_object_id,
                    status = %update.subscription_status,
                    "entitlement updated"
                );
                ReconcileOutcome::Applied {
                    user_id: user_id.to_string(),
                    status: update.subscription_status,
                }
            }
            WriteOutcome::Stale => {
                tracing::info!(
                    user_id,
                    processor_id = %event.processor_object_id,
                    event_at = %update.event_at,
                    "newer event already applied, skipping"
                );
                ReconcileOutcome::Stale {
                    user_id: user_id.to_string(),
                }
            }
            WriteOutcome::UnknownUser => {
                tracing::warn!(user_id, processor_id = %event.processor_object_id, "no entitlement record for user");
                ReconcileOutcome::Ignored(IgnoreReason::UnknownUser(user_id.to_string()))
            }
        };
        Ok(outcome)
    }

    fn processor(&self) -> AppResult<&Arc<dyn PaymentProcessorPort>> {
        self.processor.as_ref().ok_or_else(|| {
            tracing::error!("notification received but no processor credential is configured");
            AppError::ProviderNotConfigured
        })
    }
}

/// The one place a one-time payment is linked to a user. Checkout writes the
/// user id to both `metadata.user_id` and `external_reference`; metadata wins.
pub fn payment_user_reference(payment: &PaymentInfo) -> Option<&str> {
    non_empty(payment.metadata_user_id.as_deref()).or_else(|| non_empty(payment.external_reference.as_deref()))
}

/// A notified id the processor answers 404 for is usually not readable yet.
/// Surfacing it as upstream trouble makes the webhook ask for redelivery.
fn fetch_error(object: &str, id: &str, err: AppError) -> AppError {
    match err {
        AppError::NotFound => {
            tracing::warn!(processor_id = id, object, "processor does not know the notified id yet");
            AppError::Upstream(format!("{object} {id} not found at processor"))
        }
        other => other,
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
