//! Test data factories.
//!
//! Each factory returns a complete, valid object. Use the closure parameter to
//! override specific fields.

use chrono::{DateTime, TimeZone, Utc};

use crate::{
    domain::entities::{subscription_status::SubscriptionStatus, user_entitlement::UserEntitlement},
    use_cases::checkout::CheckoutPlan,
};

/// Fixed "now" shared by tests so expected timestamps are exact.
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
}

/// Create a `none` entitlement record with sensible defaults.
pub fn create_test_entitlement(overrides: impl FnOnce(&mut UserEntitlement)) -> UserEntitlement {
    let created = test_now() - chrono::Duration::days(1);
    let mut entitlement = UserEntitlement {
        user_id: "user_1".to_string(),
        email: "buscador@example.com".to_string(),
        full_name: Some("Buscador da Luz".to_string()),
        address: None,
        whatsapp: None,
        subscription_status: SubscriptionStatus::None,
        trial_ends_at: None,
        access_until: None,
        preapproval_id: None,
        payment_id: None,
        last_event_at: None,
        created_at: created,
        updated_at: created,
    };
    overrides(&mut entitlement);
    entitlement
}

pub fn test_plan() -> CheckoutPlan {
    CheckoutPlan {
        title: "Plano Cósmico Mensal".to_string(),
        price_cents: 2190,
        currency: "BRL".to_string(),
        back_url: "https://oraculo.test/?checkout=return".to_string(),
        notification_url: Some("https://oraculo.test/api/webhooks/mercadopago".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_overrides() {
        let e = create_test_entitlement(|e| {
            e.user_id = "custom".to_string();
            e.subscription_status = SubscriptionStatus::Trial;
        });
        assert_eq!(e.user_id, "custom");
        assert_eq!(e.subscription_status, SubscriptionStatus::Trial);
        assert!(e.created_at < test_now());
    }
}
