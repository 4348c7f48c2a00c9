use std::net::SocketAddr;
use std::time::Duration;

use axum::http::HeaderValue;
use env_helpers::{get_env, get_env_default};
use secrecy::SecretString;
use url::Url;

use crate::{
    application::session_mirror::{DEFAULT_MIRROR_MAX_AGE_SECS, DEFAULT_MIRROR_MAX_ENTRIES},
    infra::error::InfraError,
};

/// Mercado Pago credentials. Absent when `MP_ACCESS_TOKEN` is not set; the
/// server still boots and payment requests fail with a configuration error.
pub struct MercadoPagoConfig {
    pub access_token: SecretString,
    pub api_base: Url,
}

pub struct GeminiConfig {
    pub api_key: SecretString,
    pub model: String,
}

pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub cors_origin: HeaderValue,
    /// Public web app; buyers are sent back here after checkout.
    pub app_origin: Url,
    /// Account that bypasses every entitlement check.
    pub admin_email: String,
    pub mercado_pago: Option<MercadoPagoConfig>,
    /// When set, webhook `x-signature` headers are verified.
    pub webhook_secret: Option<SecretString>,
    pub notification_url: Option<Url>,
    pub plan_title: String,
    pub plan_price_cents: i64,
    pub plan_currency: String,
    pub trial_length: chrono::Duration,
    pub access_period: chrono::Duration,
    pub checkout_poll_interval: Duration,
    pub checkout_poll_timeout: Duration,
    pub mirror_max_entries: usize,
    pub mirror_max_age: chrono::Duration,
    pub gemini: Option<GeminiConfig>,
    /// Optional JSON log file alongside console output.
    pub log_file: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, InfraError> {
        let bind_addr: SocketAddr = get_env_default("BIND_ADDR", SocketAddr::from(([127, 0, 0, 1], 3001)));
        let database_url: String = get_env("DATABASE_URL");

        let cors_origin: HeaderValue = get_env_default("CORS_ORIGIN", String::from("http://localhost:3000"))
            .parse()
            .map_err(|_| InfraError::ConfigInvalid { var: "CORS_ORIGIN" })?;
        let app_origin: Url = match optional_env("APP_ORIGIN") {
            Some(raw) => Url::parse(&raw).map_err(|_| InfraError::ConfigInvalid { var: "APP_ORIGIN" })?,
            None => Url::parse("http://localhost:3000/").map_err(|_| InfraError::ConfigInvalid { var: "APP_ORIGIN" })?,
        };
        let admin_email: String = get_env_default("ADMIN_EMAIL", "admin@jailson.com".to_string());

        let mercado_pago = match optional_env("MP_ACCESS_TOKEN") {
            Some(token) => {
                let api_base = match optional_env("MP_API_BASE") {
                    Some(raw) => Url::parse(&raw).map_err(|_| InfraError::ConfigInvalid { var: "MP_API_BASE" })?,
                    None => default_mp_base()?,
                };
                Some(MercadoPagoConfig {
                    access_token: SecretString::new(token.into()),
                    api_base,
                })
            }
            None => None,
        };
        let webhook_secret = optional_env("MP_WEBHOOK_SECRET").map(|s| SecretString::new(s.into()));
        let notification_url = optional_env("MP_NOTIFICATION_URL")
            .as_deref()
            .map(Url::parse)
            .transpose()
            .map_err(|_| InfraError::ConfigInvalid { var: "MP_NOTIFICATION_URL" })?;

        let plan_title: String = get_env_default(
            "PLAN_TITLE",
            "Acesso Mensal - Oráculo da Consciência".to_string(),
        );
        let plan_price: String = get_env_default("PLAN_PRICE", "21.90".to_string());
        let plan_price_cents =
            parse_price_cents(&plan_price).ok_or(InfraError::ConfigInvalid { var: "PLAN_PRICE" })?;
        let plan_currency: String = get_env_default("PLAN_CURRENCY", "BRL".to_string());

        let trial_hours: i64 = get_env_default("TRIAL_HOURS", 24);
        let access_period_days: i64 = get_env_default("ACCESS_PERIOD_DAYS", 30);
        let poll_interval_secs: u64 = get_env_default("CHECKOUT_POLL_INTERVAL_SECS", 3);
        let poll_timeout_secs: u64 = get_env_default("CHECKOUT_POLL_TIMEOUT_SECS", 120);
        let mirror_max_entries: usize = get_env_default("MIRROR_MAX_ENTRIES", DEFAULT_MIRROR_MAX_ENTRIES);
        let mirror_max_age_secs: i64 = get_env_default("MIRROR_MAX_AGE_SECS", DEFAULT_MIRROR_MAX_AGE_SECS);

        let gemini = optional_env("GEMINI_API_KEY").map(|key| GeminiConfig {
            api_key: SecretString::new(key.into()),
            model: get_env_default("GEMINI_MODEL", "gemini-2.5-flash".to_string()),
        });

        Ok(Self {
            bind_addr,
            database_url,
            cors_origin,
            app_origin,
            admin_email,
            mercado_pago,
            webhook_secret,
            notification_url,
            plan_title,
            plan_price_cents,
            plan_currency,
            trial_length: chrono::Duration::hours(trial_hours),
            access_period: chrono::Duration::days(access_period_days),
            checkout_poll_interval: Duration::from_secs(poll_interval_secs.max(1)),
            checkout_poll_timeout: Duration::from_secs(poll_timeout_secs),
            mirror_max_entries,
            mirror_max_age: chrono::Duration::seconds(mirror_max_age_secs),
            gemini,
            log_file: optional_env("LOG_FILE"),
        })
    }
}

fn default_mp_base() -> Result<Url, InfraError> {
    Url::parse("https://api.mercadopago.com").map_err(|_| InfraError::ConfigInvalid { var: "MP_API_BASE" })
}

/// Unset and blank are the same.
fn optional_env(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// "21.90" -> 2190. At most two decimals, no sign.
pub fn parse_price_cents(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    let (units, fraction) = match raw.split_once('.') {
        Some((units, fraction)) => (units, fraction),
        None => (raw, ""),
    };
    if units.is_empty() || fraction.len() > 2 {
        return None;
    }
    if !units.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let units: i64 = units.parse().ok()?;
    let cents: i64 = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<i64>().ok()? * 10,
        _ => fraction.parse().ok()?,
    };
    units.checked_mul(100)?.checked_add(cents)
}
