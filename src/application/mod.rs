pub mod app_error;
pub mod ports;
pub mod session_mirror;
pub mod use_cases;
pub mod validators;
