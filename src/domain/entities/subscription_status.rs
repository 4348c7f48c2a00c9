use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Internal entitlement vocabulary. Processor statuses are mapped onto this in
/// `payment_event`, never stored raw.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    sqlx::Type,
    AsRefStr,
    Display,
    EnumString,
)]
#[sqlx(type_name = "subscription_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SubscriptionStatus {
    /// Signed up, never trialed or paid.
    #[default]
    None,
    Trial,
    Active,
    #[serde(alias = "cancelled")]
    #[strum(to_string = "canceled", serialize = "cancelled")]
    Canceled,
    Paused,
}

impl SubscriptionStatus {
    /// Canceled and paused both mean a charge was attempted and not authorized.
    pub fn is_payment_failure(&self) -> bool {
        matches!(self, SubscriptionStatus::Canceled | SubscriptionStatus::Paused)
    }
}
