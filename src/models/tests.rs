#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::provider::{ProviderErrorDetail, Verification};

    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_checkpoint_request_from_frontend_body() {
        let request: CheckpointRequest = serde_json::from_value(json!({
            "checkpointName": "LOGIN",
            "payload": {"ip": "1.2.3.4"},
            "sourceToken": "tok",
            "sessionId": "sess1",
            "userId": "u1"
        }))
        .unwrap();

        assert_eq!(request.checkpoint_name, "LOGIN");
        assert_eq!(request.source_token.as_deref(), Some("tok"));
        assert_eq!(request.session_id.as_deref(), Some("sess1"));
        assert_eq!(request.user_id.as_deref(), Some("u1"));
        assert_eq!(request.verification_id, None);
        assert_eq!(request.payload_map()["ip"], "1.2.3.4");
        assert_eq!(request.tracking_event_name(), "Event_LOGIN");
    }

    #[test]
    fn test_checkpoint_request_null_payload_is_empty() {
        let request: CheckpointRequest = serde_json::from_value(json!({
            "checkpointName": "PAYMENT",
            "payload": null
        }))
        .unwrap();

        assert!(request.payload_map().is_empty());
    }

    #[test]
    fn test_checkpoint_request_requires_name() {
        let result = serde_json::from_value::<CheckpointRequest>(json!({
            "payload": {},
            "sourceToken": "tok"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_checkpoint_request_rejects_non_object_payload() {
        let result = serde_json::from_value::<CheckpointRequest>(json!({
            "checkpointName": "LOGIN",
            "payload": [1, 2, 3]
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_failure_response_is_minimal() {
        let json = serde_json::to_value(CheckpointResponse::failure()).unwrap();
        assert_eq!(json, json!({"success": false}));
    }

    #[test]
    fn test_completed_response_format() {
        let verification = Verification::from(json!({
            "id": "ver-1",
            "status": "COMPLETE",
            "outcome": "APPROVED"
        }));

        let json = serde_json::to_value(CheckpointResponse::completed(verification)).unwrap();
        assert_eq!(
            json,
            json!({
                "success": true,
                "verification": {"id": "ver-1", "status": "COMPLETE", "outcome": "APPROVED"}
            })
        );
    }

    #[test]
    fn test_errored_response_carries_provider_errors() {
        let response = CheckpointResponse::errored(
            vec![ProviderErrorDetail {
                code: Some(500),
                message: Some("Checkpoint not found".to_string()),
            }],
            None,
        );

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["message"][0]["code"], 500);
        assert_eq!(json["message"][0]["message"], "Checkpoint not found");
        assert!(json.get("verification").is_none());
    }

    #[test]
    fn test_optional_fields_use_pascal_case_names() {
        let response = CheckpointResponse {
            success: true,
            sample_confirmation_code: Some("12345".to_string()),
            requires_resubmit: Some(false),
            ..CheckpointResponse::default()
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["SampleConfirmationCode"], "12345");
        assert_eq!(json["RequiresResubmit"], false);
    }

    #[test]
    fn test_event_response_format() {
        assert_eq!(
            serde_json::to_value(EventResponse::accepted()).unwrap(),
            json!({"success": true})
        );
        assert_eq!(
            serde_json::to_value(EventResponse::failed("Provider rejected request")).unwrap(),
            json!({"success": false, "errorMessage": "Provider rejected request"})
        );
    }

    #[test]
    fn test_event_request_from_frontend_body() {
        let request: EventRequest = serde_json::from_value(json!({
            "eventName": "PAGE_VIEW",
            "payload": {"page": "/checkout"},
            "userId": "u1"
        }))
        .unwrap();

        assert_eq!(request.event_name, "PAGE_VIEW");
        assert_eq!(request.user_id.as_deref(), Some("u1"));
        assert_eq!(request.session_id, None);
    }
}
