use std::fs::File;
use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    adapters::http::app_state::AppState,
    application::{
        ports::{oracle::OracleProvider, payment_processor::PaymentProcessorPort},
        session_mirror::SessionMirror,
    },
    domain::entitlement_policy::EntitlementPolicy,
    infra::{
        config::AppConfig,
        gemini_client::{GEMINI_API_BASE, GeminiClient},
        http_client::{GENERATIVE_REQUEST_TIMEOUT, build_client, build_client_with_timeout},
        mercado_pago_client::MercadoPagoClient,
        postgres_persistence,
    },
    use_cases::{
        checkout::{CheckoutPlan, CheckoutUseCases},
        entitlement::{EntitlementRepo, EntitlementUseCases},
        oracle::OracleUseCases,
        reconciler::PaymentEventReconciler,
    },
};

pub async fn init_app_state(config: AppConfig) -> anyhow::Result<AppState> {
    let postgres_arc = Arc::new(postgres_persistence(&config.database_url).await?);
    let entitlement_repo = postgres_arc.clone() as Arc<dyn EntitlementRepo>;

    let processor: Option<Arc<dyn PaymentProcessorPort>> = match &config.mercado_pago {
        Some(mp) => Some(Arc::new(MercadoPagoClient::new(
            build_client()?,
            mp.access_token.clone(),
            &mp.api_base,
        ))),
        None => {
            tracing::warn!("MP_ACCESS_TOKEN not set; checkout and webhook requests will fail");
            None
        }
    };

    let oracle_provider: Option<Arc<dyn OracleProvider>> = match &config.gemini {
        Some(gemini) => Some(Arc::new(GeminiClient::new(
            build_client_with_timeout(GENERATIVE_REQUEST_TIMEOUT)?,
            gemini.api_key.clone(),
            gemini.model.clone(),
            GEMINI_API_BASE,
        ))),
        None => {
            tracing::warn!("GEMINI_API_KEY not set; oracle questions will fail");
            None
        }
    };

    let entitlement_use_cases = Arc::new(EntitlementUseCases::new(
        entitlement_repo.clone(),
        Arc::new(SessionMirror::with_limits(config.mirror_max_entries, config.mirror_max_age)),
        EntitlementPolicy::new(config.admin_email.clone()),
        config.trial_length,
    ));

    let checkout_use_cases = CheckoutUseCases::new(
        processor.clone(),
        CheckoutPlan {
            title: config.plan_title.clone(),
            price_cents: config.plan_price_cents,
            currency: config.plan_currency.clone(),
            back_url: config.app_origin.to_string(),
            notification_url: config.notification_url.as_ref().map(|u| u.to_string()),
        },
    );

    let reconciler = PaymentEventReconciler::new(entitlement_repo, processor, config.access_period);
    let oracle_use_cases = OracleUseCases::new(entitlement_use_cases.clone(), oracle_provider);

    Ok(AppState {
        config: Arc::new(config),
        entitlement_use_cases,
        checkout_use_cases: Arc::new(checkout_use_cases),
        reconciler: Arc::new(reconciler),
        oracle_use_cases: Arc::new(oracle_use_cases),
    })
}

/// Console logs always; structured JSON to `log_file` when given.
pub fn init_tracing(log_file: Option<&str>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "oraculo=debug,tower_http=debug".into());

    let console_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .pretty();

    let json_layer = match log_file {
        Some(path) => {
            let file = File::create(path)?;
            Some(
                fmt::layer()
                    .json()
                    .with_writer(file)
                    .with_current_span(true)
                    .with_span_list(true),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .try_init()
        .ok();
    Ok(())
}
