//! Mercado Pago REST client.
//!
//! One-time checkouts are Checkout Pro preferences, recurring checkouts are
//! preapprovals. Notifications carry only an id, so the reconciler fetches the
//! preapproval or payment through this client before acting.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use url::Url;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::payment_processor::{
        CheckoutRequest, CheckoutSession, PaymentInfo, PaymentProcessorPort, PreapprovalInfo,
    },
};

#[derive(Clone)]
pub struct MercadoPagoClient {
    client: Client,
    access_token: SecretString,
    api_base: String,
}

impl MercadoPagoClient {
    pub fn new(client: Client, access_token: SecretString, api_base: &Url) -> Self {
        Self {
            client,
            access_token,
            api_base: api_base.as_str().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path)
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> AppResult<T> {
        let response = self
            .client
            .post(self.url(path))
            .bearer_auth(self.access_token.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Mercado Pago request failed: {}", e)))?;

        self.handle_response(response).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> AppResult<T> {
        let response = self
            .client
            .get(self.url(path))
            .bearer_auth(self.access_token.expose_secret())
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Mercado Pago request failed: {}", e)))?;

        self.handle_response(response).await
    }

    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> AppResult<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            tracing::error!(status = %status, body = %body, "Mercado Pago API error");

            // an id that does not exist will not appear on redelivery either
            if status == StatusCode::NOT_FOUND {
                return Err(AppError::NotFound);
            }

            let message = serde_json::from_str::<MercadoPagoErrorResponse>(&body)
                .ok()
                .and_then(|e| e.message)
                .unwrap_or(body);
            return Err(AppError::Upstream(format!(
                "Mercado Pago API error: {} - {}",
                status, message
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(body = %body, error = %e, "Failed to parse Mercado Pago response");
            AppError::Upstream(format!("Failed to parse Mercado Pago response: {}", e))
        })
    }
}

#[async_trait]
impl PaymentProcessorPort for MercadoPagoClient {
    async fn create_payment_checkout(&self, request: &CheckoutRequest) -> AppResult<CheckoutSession> {
        let body = PreferenceRequest {
            items: vec![PreferenceItem {
                id: &request.user_id,
                title: &request.title,
                quantity: 1,
                unit_price: cents_to_amount(request.price_cents),
                currency_id: &request.currency,
            }],
            payer: Payer {
                email: &request.user_email,
            },
            metadata: PreferenceMetadata {
                user_id: &request.user_id,
                user_email: &request.user_email,
            },
            external_reference: &request.user_id,
            back_urls: BackUrls {
                success: &request.back_url,
            },
            auto_return: "approved",
            notification_url: request.notification_url.as_deref(),
        };

        let created: CreatedObject = self.post("checkout/preferences", &body).await?;
        Ok(CheckoutSession {
            id: created.id,
            redirect_url: created.init_point,
        })
    }

    async fn create_subscription_checkout(&self, request: &CheckoutRequest) -> AppResult<CheckoutSession> {
        let body = PreapprovalRequest {
            reason: &request.title,
            external_reference: &request.user_id,
            auto_recurring: AutoRecurring {
                frequency: 1,
                frequency_type: "months",
                transaction_amount: cents_to_amount(request.price_cents),
                currency_id: &request.currency,
            },
            back_url: &request.back_url,
            payer_email: &request.user_email,
        };

        let created: CreatedObject = self.post("preapproval", &body).await?;
        Ok(CheckoutSession {
            id: created.id,
            redirect_url: created.init_point,
        })
    }

    async fn get_preapproval(&self, id: &str) -> AppResult<PreapprovalInfo> {
        let preapproval: PreapprovalResponse = self.get(&format!("preapproval/{}", id)).await?;
        Ok(PreapprovalInfo {
            id: id.to_string(),
            status: preapproval.status,
            external_reference: preapproval.external_reference,
            last_modified: parse_timestamp(preapproval.last_modified.as_deref()),
        })
    }

    async fn get_payment(&self, id: &str) -> AppResult<PaymentInfo> {
        let payment: PaymentResponse = self.get(&format!("v1/payments/{}", id)).await?;
        Ok(PaymentInfo {
            id: id.to_string(),
            status: payment.status,
            external_reference: payment.external_reference,
            metadata_user_id: payment.metadata.and_then(|m| m.user_id),
            last_updated: parse_timestamp(payment.date_last_updated.as_deref()),
        })
    }
}

/// Processor amounts are decimals in the currency unit.
fn cents_to_amount(cents: i64) -> f64 {
    cents as f64 / 100.0
}

fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?;
    match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => Some(ts.with_timezone(&Utc)),
        Err(e) => {
            tracing::warn!(raw, error = %e, "Unparseable Mercado Pago timestamp, using arrival time");
            None
        }
    }
}

/// Verify the `x-signature` header Mercado Pago attaches to notifications.
///
/// The header looks like `ts=1704908010,v1=<hex>`; the signed manifest is
/// `id:{data.id};request-id:{x-request-id};ts:{ts};`, with parts whose value
/// is missing left out.
pub fn verify_webhook_signature(
    signature_header: &str,
    request_id: Option<&str>,
    data_id: Option<&str>,
    webhook_secret: &str,
) -> AppResult<()> {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    let mut timestamp: Option<&str> = None;
    let mut signature: Option<&str> = None;
    for part in signature_header.split(',') {
        let Some((key, value)) = part.split_once('=') else {
            continue;
        };
        match key.trim() {
            "ts" => timestamp = Some(value.trim()),
            "v1" => signature = Some(value.trim()),
            _ => {}
        }
    }

    let (Some(timestamp), Some(signature)) = (timestamp, signature) else {
        return Err(AppError::InvalidSignature);
    };

    let mut manifest = String::new();
    if let Some(id) = data_id.filter(|id| !id.is_empty()) {
        // alphanumeric ids are signed in lowercase
        manifest.push_str(&format!("id:{};", id.to_lowercase()));
    }
    if let Some(request_id) = request_id.filter(|r| !r.is_empty()) {
        manifest.push_str(&format!("request-id:{};", request_id));
    }
    manifest.push_str(&format!("ts:{};", timestamp));

    let mut mac = Hmac::<Sha256>::new_from_slice(webhook_secret.as_bytes())
        .map_err(|_| AppError::Internal("HMAC error".into()))?;
    mac.update(manifest.as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());

    if constant_time_compare(signature, &expected) {
        Ok(())
    } else {
        Err(AppError::InvalidSignature)
    }
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

// ============================================================================
// Mercado Pago Types
// ============================================================================

#[derive(Debug, Serialize)]
struct PreferenceRequest<'a> {
    items: Vec<PreferenceItem<'a>>,
    payer: Payer<'a>,
    metadata: PreferenceMetadata<'a>,
    external_reference: &'a str,
    back_urls: BackUrls<'a>,
    auto_return: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    notification_url: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct PreferenceItem<'a> {
    id: &'a str,
    title: &'a str,
    quantity: u32,
    unit_price: f64,
    currency_id: &'a str,
}

#[derive(Debug, Serialize)]
struct Payer<'a> {
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct PreferenceMetadata<'a> {
    user_id: &'a str,
    user_email: &'a str,
}

#[derive(Debug, Serialize)]
struct BackUrls<'a> {
    success: &'a str,
}

#[derive(Debug, Serialize)]
struct PreapprovalRequest<'a> {
    reason: &'a str,
    external_reference: &'a str,
    auto_recurring: AutoRecurring<'a>,
    back_url: &'a str,
    payer_email: &'a str,
}

#[derive(Debug, Serialize)]
struct AutoRecurring<'a> {
    frequency: u32,
    frequency_type: &'a str,
    transaction_amount: f64,
    currency_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreatedObject {
    id: String,
    init_point: String,
}

#[derive(Debug, Deserialize)]
struct PreapprovalResponse {
    status: String,
    external_reference: Option<String>,
    last_modified: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PaymentResponse {
    status: String,
    external_reference: Option<String>,
    metadata: Option<PaymentMetadata>,
    date_last_updated: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PaymentMetadata {
    user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MercadoPagoErrorResponse {
    message: Option<String>,
}
