use std::collections::HashMap;
use std::env;
use tracing::info;

use crate::config::ConfigError;

/// Load secrets from AWS Secrets Manager and set them as environment variables
///
/// If RELAY_SECRETS_ARN is set, it:
/// 1. Fetches the secret from AWS Secrets Manager
/// 2. Parses the JSON secret string
/// 3. Sets all key-value pairs as environment variables
///
/// This runs once at startup (Lambda cold start or server init), before
/// `Config::from_env` reads DODGEBALL_PRIVATE_API_KEY and friends.
pub async fn load_secrets_from_manager() -> Result<(), ConfigError> {
    let secret_arn = match env::var("RELAY_SECRETS_ARN") {
        Ok(arn) => arn,
        Err(_) => {
            info!("RELAY_SECRETS_ARN not set, skipping secrets loading");
            return Ok(());
        }
    };

    info!("Loading secrets from AWS Secrets Manager: {}", secret_arn);

    let config = aws_config::load_from_env().await;
    let client = aws_sdk_secretsmanager::Client::new(&config);

    let response = client
        .get_secret_value()
        .secret_id(&secret_arn)
        .send()
        .await
        .map_err(|e| {
            ConfigError::Secrets(format!("Failed to fetch secret from Secrets Manager: {}", e))
        })?;

    let secret_string = response
        .secret_string()
        .ok_or_else(|| ConfigError::Secrets("Secret does not contain a string value".to_string()))?;

    let secrets = parse_secret_string(secret_string)?;

    info!("Loaded {} secrets from Secrets Manager", secrets.len());

    // Runs before the listener is bound, so no request handler can observe
    // a partially updated environment.
    for (key, value) in secrets {
        env::set_var(&key, &value);
        info!("Set environment variable: {}", key);
    }

    Ok(())
}

/// Parse a Secrets Manager secret string into key-value pairs
pub fn parse_secret_string(secret_string: &str) -> Result<HashMap<String, String>, ConfigError> {
    serde_json::from_str(secret_string)
        .map_err(|e| ConfigError::Secrets(format!("Failed to parse secret JSON: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_secret_string() {
        let secrets = parse_secret_string(
            r#"{"DODGEBALL_PRIVATE_API_KEY": "sk", "DODGEBALL_API_URL": "https://api.example.com"}"#,
        )
        .unwrap();

        assert_eq!(secrets.len(), 2);
        assert_eq!(secrets["DODGEBALL_PRIVATE_API_KEY"], "sk");
    }

    #[test]
    fn test_parse_secret_string_rejects_non_string_values() {
        let result = parse_secret_string(r#"{"CHECKPOINT_TIMEOUT": 1400}"#);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Failed to parse secret JSON"));
    }

    #[tokio::test]
    async fn test_skips_when_arn_not_set() {
        env::remove_var("RELAY_SECRETS_ARN");
        assert!(load_secrets_from_manager().await.is_ok());
    }
}
