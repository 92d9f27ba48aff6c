// Trust provider layer - everything that talks to the external
// fraud-detection API lives behind the TrustProvider trait so handlers
// never depend on the transport.

pub mod dodgeball;
pub mod types;

use async_trait::async_trait;
use thiserror::Error;

pub use dodgeball::{DodgeballClient, DodgeballConfig, DEFAULT_API_URL};
pub use types::{
    CheckpointCall, CheckpointEvent, CheckpointOptions, CheckpointVerdict, ProviderErrorDetail,
    TrackEvent, TrackRequest, Verification, VerificationOutcome, VerificationStatus,
};

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode provider response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid value for header {0}")]
    InvalidHeader(&'static str),

    #[error("Provider rejected request: {0}")]
    Rejected(String),
}

/// Client for the external trust provider.
///
/// Implementations are constructed once at startup and shared across
/// requests, so they must be stateless from the caller's point of view.
#[async_trait]
pub trait TrustProvider: Send + Sync {
    /// Record a tracking event. Callers treat this as fire-and-forget.
    async fn track(&self, request: TrackRequest) -> Result<(), ProviderError>;

    /// Submit a checkpoint and classify the provider's decision
    async fn checkpoint(&self, request: CheckpointCall) -> Result<CheckpointVerdict, ProviderError>;
}
