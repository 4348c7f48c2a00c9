pub mod entitlement_policy;
pub mod entities;
