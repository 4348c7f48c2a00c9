use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::subscription_status::SubscriptionStatus;

/// One record per user. Field names on the wire follow the document the web
/// client already reads (`subscriptionStatus`, `trialEndsAt`, ...), timestamps
/// as epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEntitlement {
    pub user_id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub address: Option<String>,
    pub whatsapp: Option<String>,
    pub subscription_status: SubscriptionStatus,
    #[serde(with = "chrono::serde::ts_milliseconds_option")]
    pub trial_ends_at: Option<DateTime<Utc>>,
    #[serde(with = "chrono::serde::ts_milliseconds_option")]
    pub access_until: Option<DateTime<Utc>>,
    pub preapproval_id: Option<String>,
    pub payment_id: Option<String>,
    /// Processor-side modification time of the last applied payment event.
    #[serde(with = "chrono::serde::ts_milliseconds_option")]
    pub last_event_at: Option<DateTime<Utc>>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

impl UserEntitlement {
    /// A trial has been started at some point, expired or not.
    pub fn trial_used(&self) -> bool {
        self.trial_ends_at.is_some()
    }
}

/// Profile captured at signup. The record starts with `status = none`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUserEntitlement {
    pub user_id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub address: Option<String>,
    pub whatsapp: Option<String>,
}

/// What a processor event does to `accessUntil`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessWindow {
    Keep,
    Until(DateTime<Utc>),
    /// A recurring authorization governs access from now on.
    Clear,
}

/// Field-level write produced by the payment event reconciler. Fields left as
/// `None`/`Keep` are not touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitlementUpdate {
    pub subscription_status: SubscriptionStatus,
    pub preapproval_id: Option<String>,
    pub payment_id: Option<String>,
    pub access_until: AccessWindow,
    /// Ordering key: the write only lands if it is newer than the stored one.
    pub event_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EntitlementUpdate {
    /// Apply onto an in-memory copy. The Postgres adapter expresses the same
    /// rules in SQL.
    pub fn apply_to(&self, record: &mut UserEntitlement) {
        record.subscription_status = self.subscription_status;
        if let Some(id) = &self.preapproval_id {
            record.preapproval_id = Some(id.clone());
        }
        if let Some(id) = &self.payment_id {
            record.payment_id = Some(id.clone());
        }
        match self.access_until {
            AccessWindow::Keep => {}
            AccessWindow::Until(until) => record.access_until = Some(until),
            AccessWindow::Clear => record.access_until = None,
        }
        record.last_event_at = Some(self.event_at);
        record.updated_at = self.updated_at;
    }

    /// Not older than the last applied event. Ties go to the later arrival so
    /// redelivery rewrites the same values.
    pub fn supersedes(&self, record: &UserEntitlement) -> bool {
        record
            .last_event_at
            .is_none_or(|last| self.event_at >= last)
    }
}

/// Result of a conditional store write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Applied,
    /// A more recent event was already applied.
    Stale,
    /// No record for the user.
    UnknownUser,
}
