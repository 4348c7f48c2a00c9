use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    infra::config::AppConfig,
    use_cases::{
        checkout::CheckoutUseCases, entitlement::EntitlementUseCases, oracle::OracleUseCases,
        reconciler::PaymentEventReconciler,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub entitlement_use_cases: Arc<EntitlementUseCases>,
    pub checkout_use_cases: Arc<CheckoutUseCases>,
    pub reconciler: Arc<PaymentEventReconciler>,
    pub oracle_use_cases: Arc<OracleUseCases>,
}

impl FromRef<AppState> for Arc<EntitlementUseCases> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.entitlement_use_cases.clone()
    }
}
