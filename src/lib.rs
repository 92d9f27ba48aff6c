pub mod api;
pub mod config;
pub mod models;
pub mod provider;
pub mod secrets;

// Re-export commonly used types
pub use models::{CheckpointRequest, CheckpointResponse, EventRequest, EventResponse};

pub use provider::{
    CheckpointCall, CheckpointVerdict, DodgeballClient, ProviderError, TrackRequest,
    TrustProvider, Verification,
};

pub use config::{Config, ConfigError};

pub use api::server::{build_router, create_app, AppState, MAX_BODY_BYTES};
