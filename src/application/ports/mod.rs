pub mod oracle;
pub mod payment_processor;
