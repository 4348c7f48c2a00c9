//! `TestAppStateBuilder` creates an `AppState` backed by in-memory mocks for
//! HTTP-level tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use secrecy::SecretString;
use url::Url;

use crate::{
    adapters::http::app_state::AppState,
    application::{
        ports::{oracle::OracleProvider, payment_processor::PaymentProcessorPort},
        session_mirror::SessionMirror,
    },
    domain::{entitlement_policy::EntitlementPolicy, entities::user_entitlement::UserEntitlement},
    infra::config::AppConfig,
    test_utils::{InMemoryEntitlementRepo, ScriptedPaymentProcessor, test_plan},
    use_cases::{
        checkout::CheckoutUseCases, entitlement::EntitlementUseCases, oracle::OracleUseCases,
        reconciler::PaymentEventReconciler,
    },
};

pub struct TestAppStateBuilder {
    entitlements: Vec<UserEntitlement>,
    processor: Option<Arc<dyn PaymentProcessorPort>>,
    oracle: Option<Arc<dyn OracleProvider>>,
    webhook_secret: Option<String>,
    poll_interval: Duration,
    poll_timeout: Duration,
}

impl Default for TestAppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestAppStateBuilder {
    /// Defaults: empty store, a scripted processor, no oracle provider.
    pub fn new() -> Self {
        Self {
            entitlements: vec![],
            processor: Some(Arc::new(ScriptedPaymentProcessor::new())),
            oracle: None,
            webhook_secret: None,
            poll_interval: Duration::from_millis(10),
            poll_timeout: Duration::from_millis(200),
        }
    }

    pub fn with_entitlement(mut self, entitlement: UserEntitlement) -> Self {
        self.entitlements.push(entitlement);
        self
    }

    pub fn with_processor(mut self, processor: Arc<ScriptedPaymentProcessor>) -> Self {
        self.processor = Some(processor);
        self
    }

    /// As if `MP_ACCESS_TOKEN` were unset.
    pub fn without_processor(mut self) -> Self {
        self.processor = None;
        self
    }

    pub fn with_oracle(mut self, oracle: Arc<dyn OracleProvider>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    pub fn with_webhook_secret(mut self, secret: &str) -> Self {
        self.webhook_secret = Some(secret.to_string());
        self
    }

    pub fn with_poll(mut self, interval: Duration, timeout: Duration) -> Self {
        self.poll_interval = interval;
        self.poll_timeout = timeout;
        self
    }

    pub fn build(self) -> AppState {
        self.build_with_repo().0
    }

    /// Also hands back the store for assertions.
    pub fn build_with_repo(self) -> (AppState, Arc<InMemoryEntitlementRepo>) {
        let repo = Arc::new(InMemoryEntitlementRepo::with_records(self.entitlements));
        let plan = test_plan();

        let config = AppConfig {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            database_url: "postgres://unused".to_string(),
            cors_origin: HeaderValue::from_static("http://localhost:3000"),
            app_origin: Url::parse("https://oraculo.test/").unwrap(),
            admin_email: "admin@jailson.com".to_string(),
            mercado_pago: None,
            webhook_secret: self.webhook_secret.map(|s| SecretString::new(s.into())),
            notification_url: None,
            plan_title: plan.title.clone(),
            plan_price_cents: plan.price_cents,
            plan_currency: plan.currency.clone(),
            trial_length: chrono::Duration::hours(24),
            access_period: chrono::Duration::days(30),
            checkout_poll_interval: self.poll_interval,
            checkout_poll_timeout: self.poll_timeout,
            mirror_max_entries: 100,
            mirror_max_age: chrono::Duration::minutes(15),
            gemini: None,
            log_file: None,
        };

        let entitlement_use_cases = Arc::new(EntitlementUseCases::new(
            repo.clone(),
            Arc::new(SessionMirror::with_limits(config.mirror_max_entries, config.mirror_max_age)),
            EntitlementPolicy::new(config.admin_email.clone()),
            config.trial_length,
        ));
        let checkout_use_cases = CheckoutUseCases::new(self.processor.clone(), plan);
        let reconciler = PaymentEventReconciler::new(repo.clone(), self.processor, config.access_period);
        let oracle_use_cases = OracleUseCases::new(entitlement_use_cases.clone(), self.oracle);

        let app_state = AppState {
            config: Arc::new(config),
            entitlement_use_cases,
            checkout_use_cases: Arc::new(checkout_use_cases),
            reconciler: Arc::new(reconciler),
            oracle_use_cases: Arc::new(oracle_use_cases),
        };
        (app_state, repo)
    }
}
