use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, Response},
    Router,
};
use checkpoint_relay::provider::{
    CheckpointCall, CheckpointVerdict, ProviderError, TrackRequest, TrustProvider, Verification,
};
use checkpoint_relay::{build_router, AppState};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

/// What the stub answers to a checkpoint call
#[derive(Clone)]
pub enum CheckpointBehaviour {
    Verdict(CheckpointVerdict),
    Fail,
}

/// In-memory trust provider that records every call it receives
pub struct StubProvider {
    checkpoint: CheckpointBehaviour,
    fail_tracking: bool,
    pub tracked: Mutex<Vec<TrackRequest>>,
    pub checkpoints: Mutex<Vec<CheckpointCall>>,
    /// Provider methods in the order they were invoked
    pub calls: Mutex<Vec<&'static str>>,
}

impl StubProvider {
    pub fn new(checkpoint: CheckpointBehaviour) -> Self {
        Self {
            checkpoint,
            fail_tracking: false,
            tracked: Mutex::new(Vec::new()),
            checkpoints: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_failing_tracking(mut self) -> Self {
        self.fail_tracking = true;
        self
    }

    pub fn tracked(&self) -> Vec<TrackRequest> {
        self.tracked.lock().unwrap().clone()
    }

    pub fn checkpoints(&self) -> Vec<CheckpointCall> {
        self.checkpoints.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TrustProvider for StubProvider {
    async fn track(&self, request: TrackRequest) -> Result<(), ProviderError> {
        self.calls.lock().unwrap().push("track");
        self.tracked.lock().unwrap().push(request);
        if self.fail_tracking {
            return Err(ProviderError::Rejected("tracking unavailable".to_string()));
        }
        Ok(())
    }

    async fn checkpoint(&self, request: CheckpointCall) -> Result<CheckpointVerdict, ProviderError> {
        self.calls.lock().unwrap().push("checkpoint");
        self.checkpoints.lock().unwrap().push(request);
        match &self.checkpoint {
            CheckpointBehaviour::Verdict(verdict) => Ok(verdict.clone()),
            CheckpointBehaviour::Fail => Err(ProviderError::Status {
                status: 503,
                body: "upstream unavailable".to_string(),
            }),
        }
    }
}

pub fn verification(status: &str, outcome: &str) -> Verification {
    Verification::from(json!({
        "id": "ver-123",
        "status": status,
        "outcome": outcome,
        "nextSteps": []
    }))
}

pub fn app(provider: Arc<StubProvider>, checkpoint_timeout: Option<i64>) -> Router {
    build_router(AppState::new(provider, checkpoint_timeout))
}

pub fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-forwarded-for", "76.90.54.224, 10.0.0.1")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

pub const LOGIN_REQUEST: &str = r#"{
    "checkpointName": "LOGIN",
    "payload": {"ip": "1.2.3.4"},
    "sourceToken": "tok",
    "sessionId": "sess1",
    "userId": "u1"
}"#;
