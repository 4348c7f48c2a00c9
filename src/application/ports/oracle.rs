use async_trait::async_trait;

use crate::app_error::AppResult;

/// Generative text provider behind the oracle's answers.
#[async_trait]
pub trait OracleProvider: Send + Sync {
    /// Answer a question. An empty answer is an upstream error, not `Ok("")`.
    async fn ask(&self, question: &str) -> AppResult<String>;
}
