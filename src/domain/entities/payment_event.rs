use serde::Serialize;

use super::subscription_status::SubscriptionStatus;

/// Inbound processor notification after validation. The processor only sends
/// a pointer (`type` + `data.id`); details are fetched separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentNotification {
    /// Recurring subscription lifecycle.
    Preapproval { id: String },
    /// One-time payment.
    Payment { id: String },
    /// Known type without a usable `data.id`.
    Malformed { kind: String },
    Unknown { kind: String },
}

impl PaymentNotification {
    pub fn classify(kind: &str, id: Option<String>) -> Self {
        let id = id.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        match (kind, id) {
            ("preapproval", Some(id)) => PaymentNotification::Preapproval { id },
            ("payment", Some(id)) => PaymentNotification::Payment { id },
            ("preapproval" | "payment", None) => PaymentNotification::Malformed {
                kind: kind.to_string(),
            },
            (other, _) => PaymentNotification::Unknown {
                kind: other.to_string(),
            },
        }
    }

    pub fn kind(&self) -> &str {
        match self {
            PaymentNotification::Preapproval { .. } => "preapproval",
            PaymentNotification::Payment { .. } => "payment",
            PaymentNotification::Malformed { kind } | PaymentNotification::Unknown { kind } => kind,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentEventKind {
    Recurring,
    OneTime,
}

/// The authoritative state of a processor object, consumed once per
/// reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentEvent {
    pub kind: PaymentEventKind,
    pub processor_object_id: String,
    pub raw_status: String,
}

/// Processor status vocabulary to internal status. Anything not listed is a
/// no-op: pending or rejected payments, pending preapprovals.
const STATUS_TABLE: &[(PaymentEventKind, &str, SubscriptionStatus)] = &[
    (PaymentEventKind::Recurring, "authorized", SubscriptionStatus::Active),
    (PaymentEventKind::Recurring, "paused", SubscriptionStatus::Canceled),
    (PaymentEventKind::Recurring, "cancelled", SubscriptionStatus::Canceled),
    (PaymentEventKind::OneTime, "approved", SubscriptionStatus::Active),
];

impl PaymentEvent {
    pub fn target_status(&self) -> Option<SubscriptionStatus> {
        STATUS_TABLE
            .iter()
            .find(|(kind, raw, _)| *kind == self.kind && *raw == self.raw_status)
            .map(|(_, _, status)| *status)
    }
}
