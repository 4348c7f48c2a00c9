pub mod checkout;
pub mod entitlement;
pub mod oracle;
pub mod reconciler;
