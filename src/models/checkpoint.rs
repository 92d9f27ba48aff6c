use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::provider::{ProviderErrorDetail, Verification};

/// Inbound body of `POST /checkpoint`, field names match the frontend SDK
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointRequest {
    pub checkpoint_name: String,
    #[serde(default)]
    pub payload: Option<Map<String, Value>>,
    #[serde(default)]
    pub source_token: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub verification_id: Option<String>,
}

impl CheckpointRequest {
    /// Payload as an object, treating absent or null as empty
    pub fn payload_map(&self) -> Map<String, Value> {
        self.payload.clone().unwrap_or_default()
    }

    /// Name of the tracking event recorded alongside this checkpoint
    pub fn tracking_event_name(&self) -> String {
        format!("Event_{}", self.checkpoint_name)
    }
}

/// Outbound body of `POST /checkpoint`.
///
/// `success` reports whether the provider call succeeded, not whether the
/// checkpoint was allowed: a denied checkpoint still carries `success: true`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckpointResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub message: Vec<ProviderErrorDetail>,
    #[serde(
        rename = "SampleConfirmationCode",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub sample_confirmation_code: Option<String>,
    #[serde(
        rename = "RequiresResubmit",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub requires_resubmit: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification: Option<Verification>,
}

impl CheckpointResponse {
    /// Body for input and upstream failures: `{"success": false}` and nothing else
    pub fn failure() -> Self {
        Self::default()
    }

    pub fn completed(verification: Verification) -> Self {
        Self {
            success: true,
            verification: Some(verification),
            ..Self::default()
        }
    }

    pub fn errored(errors: Vec<ProviderErrorDetail>, verification: Option<Verification>) -> Self {
        Self {
            success: false,
            message: errors,
            verification,
            ..Self::default()
        }
    }
}
