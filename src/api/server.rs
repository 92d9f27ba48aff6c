use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter, prelude::*};
use opentelemetry::KeyValue;
use opentelemetry::trace::TracerProvider as _;  // Import as _ since we only need the trait methods
use opentelemetry_sdk::{trace::{SdkTracerProvider, Sampler}, Resource};
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use tracing_opentelemetry::OpenTelemetryLayer;

use crate::api::handler::{checkpoint_handler, event_handler, preflight_handler};
use crate::config::{load_env_file, Config};
use crate::provider::{DodgeballClient, TrustProvider};

/// Shared, immutable per-process state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn TrustProvider>,
    pub checkpoint_timeout: Option<i64>,
}

impl AppState {
    pub fn new(provider: Arc<dyn TrustProvider>, checkpoint_timeout: Option<i64>) -> Self {
        Self {
            provider,
            checkpoint_timeout,
        }
    }
}

/// Default filter when RUST_LOG is unset. The provider client logs every
/// request through reqwest and hyper-util at debug level, which would
/// otherwise double each relay log line.
const DEFAULT_LOG_FILTER: &str = "info,hyper=warn,hyper_util=warn,reqwest=warn,tower=warn,h2=error";

/// Largest request body the relay will buffer. Checkpoint payloads are
/// forwarded verbatim, so this sits well above axum's 2 MB default.
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// How spans leave the process, decided once from the environment
#[derive(Debug, Clone, PartialEq)]
struct TelemetrySettings {
    otel_enabled: bool,
    otel_endpoint: String,
}

impl TelemetrySettings {
    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        // Check if we're in Lambda environment
        let is_lambda = lookup("AWS_LAMBDA_FUNCTION_NAME").is_some();

        // OTEL defaults on under Lambda, where the ADOT collector runs alongside
        let otel_enabled = lookup("OTEL_ENABLED")
            .map(|v| v == "true")
            .unwrap_or(is_lambda);

        // OTLP endpoint - try 127.0.0.1 in case localhost doesn't resolve in Lambda
        let otel_endpoint = if is_lambda {
            "http://127.0.0.1:4318/v1/traces".to_string()
        } else {
            "http://localhost:4318/v1/traces".to_string()
        };

        Self {
            otel_enabled,
            otel_endpoint,
        }
    }
}

pub fn init_tracing() {
    let settings = TelemetrySettings::from_lookup(|key| env::var(key).ok());

    // Base subscriber - the fmt layer logs span close with duration only
    // when OTEL is off; with OTEL the exporter already carries timings
    let subscriber = tracing_subscriber::registry()
        .with(
            if !settings.otel_enabled {
                Some(fmt::layer()
                    .json() // JSON format for CloudWatch
                    .with_target(false)
                    .with_span_events(fmt::format::FmtSpan::CLOSE))
            } else {
                Some(fmt::layer()
                    .json()
                    .with_target(false))
            }
        )
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
        );

    if !settings.otel_enabled {
        subscriber.init();
        return;
    }

    match init_opentelemetry(&settings.otel_endpoint) {
        Ok(provider) => {
            // Set as global provider for other uses
            opentelemetry::global::set_tracer_provider(provider.clone());

            // Get tracer directly from provider for OpenTelemetryLayer
            // (global::tracer returns BoxedTracer which doesn't implement PreSampledTracer)
            let tracer = provider.tracer("checkpoint-relay");

            subscriber
                .with(OpenTelemetryLayer::new(tracer))
                .init();

            info!("OpenTelemetry enabled: {}", settings.otel_endpoint);
        }
        Err(e) => {
            tracing::error!("Failed to initialize OpenTelemetry: {}. Continuing with logs only.", e);
            subscriber.init();
        }
    }
}

fn init_opentelemetry(endpoint: &str) -> Result<SdkTracerProvider, Box<dyn std::error::Error>> {
    let environment = env::var("ENVIRONMENT")
        .unwrap_or_else(|_| "development".to_string());

    // Service name can be overridden by environment variable
    let service_name = env::var("OTEL_SERVICE_NAME")
        .unwrap_or_else(|_| "checkpoint-relay".to_string());

    // Read sampling rate from environment (default 0.01 = 1%)
    let sampling_rate = env::var("OTEL_TRACE_SAMPLING_RATE")
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.01)
        .clamp(0.0, 1.0);  // Ensure between 0.0 and 1.0

    let resource = Resource::builder()
        .with_attribute(KeyValue::new("service.name", service_name))
        .with_attribute(KeyValue::new("service.version", env!("CARGO_PKG_VERSION")))
        .with_attribute(KeyValue::new("deployment.environment", environment))
        .build();

    // Check if endpoint is HTTP or gRPC based
    let exporter = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        // HTTP endpoint (AWS ADOT collector uses HTTP on port 4318)
        SpanExporter::builder()
            .with_http()
            .with_endpoint(endpoint)
            .build()?
    } else {
        // gRPC endpoint
        SpanExporter::builder()
            .with_tonic()
            .with_endpoint(endpoint)
            .build()?
    };

    let provider = SdkTracerProvider::builder()
        .with_resource(resource)
        .with_sampler(Sampler::TraceIdRatioBased(sampling_rate))
        .with_batch_exporter(exporter)
        .build();

    info!("OpenTelemetry sampling rate: {}%", sampling_rate * 100.0);

    Ok(provider)
}

/// Routes and middleware for a given state.
///
/// CORS is applied per POST route: tower-http answers every OPTIONS request
/// itself with 200, which would shadow the 202 preflight handler. Bodies
/// past `MAX_BODY_BYTES` reach the handlers as a rejection and are answered
/// with the usual 500 JSON body.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::permissive();

    Router::new()
        .route(
            "/checkpoint",
            post(checkpoint_handler)
                .layer(cors.clone())
                .options(preflight_handler),
        )
        .route(
            "/event",
            post(event_handler)
                .layer(cors)
                .options(preflight_handler),
        )
        .route("/health", get(health_check))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Load configuration, build the provider client once and assemble the app
pub async fn create_app() -> Result<Router, Box<dyn std::error::Error>> {
    let config = load_config().await?;
    Ok(build_router(state_from_config(&config)?))
}

async fn load_config() -> Result<Config, Box<dyn std::error::Error>> {
    load_env_file()?;

    // Secrets Manager values land in the environment before Config reads it
    crate::secrets::load_secrets_from_manager().await?;

    let config = Config::from_env()?;
    info!(
        api_url = %config.dodgeball_api_url,
        checkpoint_timeout = ?config.checkpoint_timeout,
        "Configuration loaded"
    );
    Ok(config)
}

fn state_from_config(config: &Config) -> Result<AppState, Box<dyn std::error::Error>> {
    let client = DodgeballClient::new(config.dodgeball())?;
    Ok(AppState::new(Arc::new(client), config.checkpoint_timeout))
}

async fn health_check() -> &'static str {
    "OK"
}

pub async fn run_server() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    info!("Starting checkpoint relay");

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install CTRL+C signal handler: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutting down gracefully...");
    };

    let config = load_config().await?;
    let app = build_router(state_from_config(&config)?);

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    info!("Server listening on {}", listener.local_addr()?);

    // Connect info feeds the client IP fallback when no proxy header is present
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
