//! Dispatcher trait — the seam between the proofreading service and HTTP.
//!
//! `HttpDispatcher` in `dispatcher.rs` is the real implementation; tests and
//! embedders can substitute their own.

use async_trait::async_trait;
use proofly_core::{CorrectionRequest, ProofreadError};

/// Sends one correction to the configured provider.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Send `request.text` verbatim as the prompt and return the raw,
    /// unnormalized text the provider generated.
    ///
    /// Performs exactly one HTTP exchange at most and never retries.
    async fn invoke(&self, request: &CorrectionRequest) -> Result<String, ProofreadError>;
}
