// Relay handlers - thin HTTP orchestration over the trust provider
// 1. Parse the body
// 2. Build the provider request(s)
// 3. Call the provider
// 4. Map the verdict onto a status code and body

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use tracing::{error, info, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::api::server::AppState;
use crate::api::utils::ClientIp;
use crate::models::{CheckpointRequest, CheckpointResponse, EventRequest, EventResponse};
use crate::provider::{
    CheckpointCall, CheckpointEvent, CheckpointOptions, CheckpointVerdict, TrackEvent,
    TrackRequest,
};

/// POST /checkpoint
#[tracing::instrument(
    skip(state, body),
    fields(client_ip = %client_ip, checkpoint_name = tracing::field::Empty)
)]
pub async fn checkpoint_handler(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<(StatusCode, Json<CheckpointResponse>)> {
    let body = body.map_err(|e| {
        error!("Failed to read checkpoint request body: {}", e);
        ApiError::from(e)
    })?;

    let request: CheckpointRequest = serde_json::from_slice(&body).map_err(|e| {
        error!("Rejecting malformed checkpoint request: {}", e);
        ApiError::from(e)
    })?;

    tracing::Span::current().record("checkpoint_name", request.checkpoint_name.as_str());
    info!("Processing checkpoint request");

    let payload = request.payload_map();

    // Tracking must never fail the checkpoint flow
    let track = TrackRequest {
        event: TrackEvent {
            event_type: request.tracking_event_name(),
            data: payload.clone(),
            event_time: chrono::Utc::now().timestamp_millis(),
        },
        source_token: request.source_token.clone(),
        session_id: request.session_id.clone(),
        user_id: request.user_id.clone(),
    };
    if let Err(e) = state.provider.track(track).await {
        warn!("Error tracking checkpoint event: {}", e);
    }

    let call = CheckpointCall {
        checkpoint_name: request.checkpoint_name,
        event: CheckpointEvent {
            ip: client_ip,
            data: payload,
        },
        source_token: request.source_token,
        session_id: request.session_id,
        user_id: request.user_id,
        use_verification_id: request.verification_id.filter(|id| !id.is_empty()),
        options: CheckpointOptions {
            sync: None,
            timeout: state.checkpoint_timeout,
        },
    };

    let verdict = state.provider.checkpoint(call).await.map_err(|e| {
        error!("Checkpoint call failed: {}", e);
        ApiError::from(e)
    })?;

    info!(verdict = verdict.label(), "Checkpoint completed");

    Ok(render_verdict(verdict))
}

/// Map a provider verdict onto the relay's HTTP contract
pub fn render_verdict(verdict: CheckpointVerdict) -> (StatusCode, Json<CheckpointResponse>) {
    match verdict {
        CheckpointVerdict::Allowed(v) => (StatusCode::OK, Json(CheckpointResponse::completed(v))),
        CheckpointVerdict::Pending(v) => {
            (StatusCode::ACCEPTED, Json(CheckpointResponse::completed(v)))
        }
        CheckpointVerdict::Denied(v) => {
            if let Some(message) = v.step_message() {
                info!(step_message = %message, "Checkpoint denied");
            }
            (StatusCode::FORBIDDEN, Json(CheckpointResponse::completed(v)))
        }
        CheckpointVerdict::Errored {
            errors,
            verification,
        } => {
            warn!(error_count = errors.len(), "Provider reported checkpoint error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(CheckpointResponse::errored(errors, verification)),
            )
        }
    }
}

/// OPTIONS /checkpoint and /event
///
/// Answered here rather than by the CORS layer so the status stays 202.
pub async fn preflight_handler() -> impl IntoResponse {
    (
        StatusCode::ACCEPTED,
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (header::ACCESS_CONTROL_ALLOW_METHODS, "GET, POST, OPTIONS"),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, "*"),
        ],
        Json(json!({})),
    )
}

/// POST /event
#[tracing::instrument(skip(state, body))]
pub async fn event_handler(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> (StatusCode, Json<EventResponse>) {
    let parsed = body
        .map_err(ApiError::from)
        .and_then(|body| serde_json::from_slice::<EventRequest>(&body).map_err(ApiError::from));

    let request = match parsed {
        Ok(request) => request,
        Err(e) => {
            error!("Rejecting malformed event request: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(EventResponse::failed("Error processing event request")),
            );
        }
    };

    info!(event_name = %request.event_name, "Processing event request");

    let track = TrackRequest {
        event: TrackEvent {
            event_type: request.event_name,
            data: request.payload.unwrap_or_default(),
            event_time: chrono::Utc::now().timestamp_millis(),
        },
        source_token: request.source_token,
        session_id: request.session_id,
        user_id: request.user_id,
    };

    match state.provider.track(track).await {
        Ok(()) => (StatusCode::CREATED, Json(EventResponse::accepted())),
        Err(e) => {
            warn!("Error tracking event: {}", e);
            (StatusCode::CREATED, Json(EventResponse::failed(e.to_string())))
        }
    }
}
