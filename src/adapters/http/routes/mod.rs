pub mod checkout;
pub mod entitlements;
pub mod oracle;
pub mod users;
pub mod webhooks;

use axum::Router;

use crate::adapters::http::app_state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/webhooks", webhooks::router())
        .nest("/checkout", checkout::router())
        .nest("/users", users::router())
        .nest("/entitlements", entitlements::router())
        .nest("/oracle", oracle::router())
}
