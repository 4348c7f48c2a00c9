use crate::{adapters::persistence::PostgresPersistence, infra::db::init_db, infra::error::InfraError};

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod gemini_client;
pub mod http_client;
pub mod mercado_pago_client;
pub mod setup;

pub async fn postgres_persistence(database_url: &str) -> Result<PostgresPersistence, InfraError> {
    let pool = init_db(database_url).await?;
    Ok(PostgresPersistence::new(pool))
}
