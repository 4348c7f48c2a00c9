//! Test utilities.
//!
//! This module provides:
//! - Factories for valid entitlement records and fixed instants
//! - An in-memory entitlement store
//! - A scripted payment processor and a stub oracle provider
//! - `TestAppStateBuilder` for HTTP-level tests

mod app_state_builder;
mod entitlement_mocks;
mod factories;
mod provider_mocks;

pub use app_state_builder::*;
pub use entitlement_mocks::*;
pub use factories::*;
pub use provider_mocks::*;
