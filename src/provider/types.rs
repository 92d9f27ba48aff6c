use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Verification lifecycle status as reported by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationStatus {
    Pending,
    Blocked,
    Complete,
    Failed,
    Unknown,
}

impl VerificationStatus {
    fn parse(raw: &str) -> Self {
        match raw {
            "PENDING" => Self::Pending,
            "BLOCKED" => Self::Blocked,
            "COMPLETE" => Self::Complete,
            "FAILED" => Self::Failed,
            _ => Self::Unknown,
        }
    }
}

/// Decision reached by the provider for a verification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationOutcome {
    Approved,
    Denied,
    Pending,
    Error,
    Unknown,
}

impl VerificationOutcome {
    fn parse(raw: &str) -> Self {
        match raw {
            "APPROVED" => Self::Approved,
            "DENIED" => Self::Denied,
            "PENDING" => Self::Pending,
            "ERROR" => Self::Error,
            _ => Self::Unknown,
        }
    }
}

/// Provider-owned verification details.
///
/// The relay never interprets this object beyond `status` and `outcome`;
/// it is passed back to the frontend exactly as received so the client SDK
/// can drive any follow-up steps (MFA, ID verification, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Verification(Value);

impl Verification {
    pub fn id(&self) -> Option<&str> {
        self.0.get("id").and_then(Value::as_str)
    }

    pub fn status(&self) -> VerificationStatus {
        self.0
            .get("status")
            .and_then(Value::as_str)
            .map(VerificationStatus::parse)
            .unwrap_or(VerificationStatus::Unknown)
    }

    pub fn outcome(&self) -> VerificationOutcome {
        self.0
            .get("outcome")
            .and_then(Value::as_str)
            .map(VerificationOutcome::parse)
            .unwrap_or(VerificationOutcome::Unknown)
    }

    /// Custom message configured on the current verification step, if any
    pub fn step_message(&self) -> Option<&str> {
        self.0
            .get("stepData")
            .and_then(|step| step.get("customMessage"))
            .and_then(Value::as_str)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl From<Value> for Verification {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Structured error entry returned by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderErrorDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Tri-state result of a checkpoint call (plus the provider-side failure case)
#[derive(Debug, Clone, PartialEq)]
pub enum CheckpointVerdict {
    Allowed(Verification),
    Pending(Verification),
    Denied(Verification),
    Errored {
        errors: Vec<ProviderErrorDetail>,
        verification: Option<Verification>,
    },
}

impl CheckpointVerdict {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Allowed(_) => "allowed",
            Self::Pending(_) => "pending",
            Self::Denied(_) => "denied",
            Self::Errored { .. } => "errored",
        }
    }
}

/// Body returned by `POST /v1/checkpoint`
#[derive(Debug, Clone, Deserialize)]
pub struct CheckpointResponseBody {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<ProviderErrorDetail>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub verification: Option<Verification>,
}

impl CheckpointResponseBody {
    /// Classify the response. Allowed is checked first, then pending
    /// (PENDING or BLOCKED), then denied; anything else is an error.
    pub fn into_verdict(self) -> CheckpointVerdict {
        let Self {
            success,
            errors,
            verification,
            ..
        } = self;

        match verification {
            Some(v) if success => {
                let status = v.status();
                let outcome = v.outcome();

                if status == VerificationStatus::Complete
                    && outcome == VerificationOutcome::Approved
                {
                    CheckpointVerdict::Allowed(v)
                } else if matches!(
                    status,
                    VerificationStatus::Pending | VerificationStatus::Blocked
                ) {
                    CheckpointVerdict::Pending(v)
                } else if outcome == VerificationOutcome::Denied {
                    CheckpointVerdict::Denied(v)
                } else {
                    CheckpointVerdict::Errored {
                        errors,
                        verification: Some(v),
                    }
                }
            }
            verification => CheckpointVerdict::Errored {
                errors,
                verification,
            },
        }
    }
}

/// Body returned by `POST /v1/track`
#[derive(Debug, Clone, Deserialize)]
pub struct TrackResponseBody {
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<ProviderErrorDetail>,
}

fn default_true() -> bool {
    true
}

/// Tracking event as sent on the wire
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: Map<String, Value>,
    #[serde(rename = "eventTime")]
    pub event_time: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackRequest {
    pub event: TrackEvent,
    pub source_token: Option<String>,
    pub session_id: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckpointEvent {
    pub ip: String,
    pub data: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CheckpointOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<i64>,
}

/// Everything needed to issue one checkpoint call
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointCall {
    pub checkpoint_name: String,
    pub event: CheckpointEvent,
    pub source_token: Option<String>,
    pub session_id: Option<String>,
    pub user_id: Option<String>,
    pub use_verification_id: Option<String>,
    pub options: CheckpointOptions,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn body(value: Value) -> CheckpointResponseBody {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_complete_approved_is_allowed() {
        let verdict = body(json!({
            "success": true,
            "errors": [],
            "version": "v1",
            "verification": {"id": "ver-1", "status": "COMPLETE", "outcome": "APPROVED"}
        }))
        .into_verdict();

        assert_eq!(verdict.label(), "allowed");
        if let CheckpointVerdict::Allowed(v) = verdict {
            assert_eq!(v.id(), Some("ver-1"));
        }
    }

    #[test]
    fn test_pending_and_blocked_are_pending() {
        for status in ["PENDING", "BLOCKED"] {
            let verdict = body(json!({
                "success": true,
                "verification": {"status": status, "outcome": "PENDING"}
            }))
            .into_verdict();
            assert_eq!(verdict.label(), "pending", "status {}", status);
        }
    }

    #[test]
    fn test_denied_outcome_is_denied() {
        let verdict = body(json!({
            "success": true,
            "verification": {
                "status": "COMPLETE",
                "outcome": "DENIED",
                "stepData": {"customMessage": "Blocked by rule"}
            }
        }))
        .into_verdict();

        match verdict {
            CheckpointVerdict::Denied(v) => assert_eq!(v.step_message(), Some("Blocked by rule")),
            other => panic!("expected denied, got {:?}", other),
        }
    }

    #[test]
    fn test_unsuccessful_call_is_errored_with_errors() {
        let verdict = body(json!({
            "success": false,
            "errors": [{"code": 401, "message": "Invalid secret key"}],
            "verification": {"status": "COMPLETE", "outcome": "APPROVED"}
        }))
        .into_verdict();

        match verdict {
            CheckpointVerdict::Errored { errors, verification } => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].code, Some(401));
                assert_eq!(errors[0].message.as_deref(), Some("Invalid secret key"));
                assert!(verification.is_some());
            }
            other => panic!("expected errored, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_state_is_errored() {
        let verdict = body(json!({
            "success": true,
            "verification": {"status": "FAILED", "outcome": "ERROR"}
        }))
        .into_verdict();
        assert_eq!(verdict.label(), "errored");

        let verdict = body(json!({"success": true})).into_verdict();
        assert_eq!(
            verdict,
            CheckpointVerdict::Errored {
                errors: vec![],
                verification: None
            }
        );
    }

    #[test]
    fn test_verification_round_trips_unknown_fields() {
        let raw = json!({
            "id": "ver-2",
            "status": "PENDING",
            "outcome": "PENDING",
            "nextSteps": [{"type": "MFA"}],
            "providerSpecific": {"nested": true}
        });
        let verification = Verification::from(raw.clone());

        assert_eq!(serde_json::to_value(&verification).unwrap(), raw);
        assert_eq!(verification.status(), VerificationStatus::Pending);
    }

    #[test]
    fn test_checkpoint_options_skip_unset_fields() {
        let options = CheckpointOptions::default();
        assert_eq!(serde_json::to_value(&options).unwrap(), json!({}));

        let options = CheckpointOptions {
            sync: None,
            timeout: Some(1400),
        };
        assert_eq!(serde_json::to_value(&options).unwrap(), json!({"timeout": 1400}));
    }
}
