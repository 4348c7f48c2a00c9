pub mod payment_event;
pub mod subscription_status;
pub mod user_entitlement;
