use std::sync::Arc;
use std::time::Duration;

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

use crate::client::Credentials;
use crate::domain::{
    AccountSid, AuthToken, DEFAULT_MAX_BODY_CHARS, RecipientFormat, RequestValidator,
    SenderAddress, ValidationError, parse_region,
};
use crate::gateway::{DeliveryGateway, RetryPolicy, SmsProvider};

/// Environment variable prefix, e.g. `SMSGATE_TWILIO_ACCOUNT_SID`.
pub const ENV_PREFIX: &str = "SMSGATE";

const REQUIRED_KEYS: [&str; 3] = [
    AccountSid::FIELD,
    AuthToken::FIELD,
    SenderAddress::FIELD,
];

fn env_var(key: &str) -> String {
    format!("{ENV_PREFIX}_{}", key.to_ascii_uppercase())
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Masked view of the provider account used in startup logs.
pub struct ProviderSummary {
    pub account: String,
    pub from: String,
    pub api_base: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GatewayConfig {
    /// Address the HTTP server binds to
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    // Provider credentials
    pub twilio_account_sid: AccountSid,
    pub twilio_auth_token: AuthToken,
    pub twilio_from_number: SenderAddress,

    /// Twilio REST API base URL
    #[serde(default = "default_twilio_api_base")]
    pub twilio_api_base: String,

    /// Timeout for a single provider HTTP call
    #[serde(default = "default_provider_timeout_ms")]
    pub provider_timeout_ms: u64,

    /// Timeout for a whole delivery, retries included
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    // Retry policy
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    #[serde(default = "default_retry_factor")]
    pub retry_factor: f64,

    #[serde(default = "default_retry_jitter")]
    pub retry_jitter: f64,

    // Validation
    /// `e164` requires a parseable phone number, `any` accepts any non-empty recipient
    #[serde(default = "default_recipient_format")]
    pub recipient_format: String,

    /// ISO 3166-1 alpha-2 region for numbers given without a country prefix
    #[serde(default)]
    pub default_region: Option<String>,

    #[serde(default = "default_max_body_chars")]
    pub max_body_chars: usize,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            // Values stay strings until deserialized so `+1555...` keeps its plus sign.
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()?;
        Self::from_settings(&settings)
    }

    /// Deserialize and check already collected settings.
    pub fn from_settings(settings: &Config) -> Result<Self, ConfigError> {
        for key in REQUIRED_KEYS {
            if settings.get_string(key).is_err() {
                return Err(ConfigError::Message(format!(
                    "missing required environment variable {}",
                    env_var(key)
                )));
            }
        }

        let config: Self = settings.clone().try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would misbehave at request time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.retry_factor.is_finite() || self.retry_factor < 1.0 {
            return Err(ConfigError::Message(format!(
                "{} must be a finite number >= 1.0, got {}",
                env_var("retry_factor"),
                self.retry_factor
            )));
        }
        if !(0.0..=1.0).contains(&self.retry_jitter) {
            return Err(ConfigError::Message(format!(
                "{} must be between 0.0 and 1.0, got {}",
                env_var("retry_jitter"),
                self.retry_jitter
            )));
        }
        Ok(())
    }

    /// Provider settings safe to write to the log.
    pub fn provider_summary(&self) -> ProviderSummary {
        ProviderSummary {
            account: self.twilio_account_sid.masked(),
            from: self.twilio_from_number.masked(),
            api_base: self.twilio_api_base.clone(),
        }
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            account_sid: self.twilio_account_sid.clone(),
            auth_token: self.twilio_auth_token.clone(),
            from: self.twilio_from_number.clone(),
        }
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
            factor: self.retry_factor,
            jitter: self.retry_jitter,
        }
    }

    pub fn recipient_format(&self) -> Result<RecipientFormat, ConfigError> {
        match self.recipient_format.trim().to_ascii_lowercase().as_str() {
            "any" => Ok(RecipientFormat::Any),
            "e164" => {
                let default_region = self
                    .default_region
                    .as_deref()
                    .filter(|region| !region.trim().is_empty())
                    .map(parse_region)
                    .transpose()
                    .map_err(|err: ValidationError| ConfigError::Message(err.to_string()))?;
                Ok(RecipientFormat::E164 { default_region })
            }
            other => Err(ConfigError::Message(format!(
                "unknown recipient format: {other} (expected `e164` or `any`)"
            ))),
        }
    }

    pub fn validator(&self) -> Result<RequestValidator, ConfigError> {
        Ok(RequestValidator::new()
            .with_recipient_format(self.recipient_format()?)
            .with_max_body_chars(self.max_body_chars))
    }

    pub fn gateway(&self, provider: Arc<dyn SmsProvider>) -> DeliveryGateway {
        DeliveryGateway::new(provider)
            .with_retry_policy(self.retry_policy())
            .with_timeout(self.request_timeout())
    }
}

fn default_listen_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_twilio_api_base() -> String {
    "https://api.twilio.com".to_string()
}

fn default_provider_timeout_ms() -> u64 {
    10_000
}

fn default_request_timeout_ms() -> u64 {
    15_000
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_base_delay_ms() -> u64 {
    200
}

fn default_retry_factor() -> f64 {
    2.0
}

fn default_retry_jitter() -> f64 {
    0.2
}

fn default_recipient_format() -> String {
    "e164".to_string()
}

fn default_max_body_chars() -> usize {
    DEFAULT_MAX_BODY_CHARS
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn from_json(value: serde_json::Value) -> GatewayConfig {
        serde_json::from_value(value).unwrap()
    }

    fn minimal() -> serde_json::Value {
        json!({
            "twilio_account_sid": "AC0123",
            "twilio_auth_token": "secret-token",
            "twilio_from_number": "+15550001111",
        })
    }

    #[test]
    fn defaults_are_applied() {
        let config = from_json(minimal());
        assert_eq!(config.listen_address, "0.0.0.0:8080");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.twilio_api_base, "https://api.twilio.com");
        assert_eq!(config.provider_timeout(), Duration::from_secs(10));
        assert_eq!(config.request_timeout(), Duration::from_secs(15));
        assert_eq!(config.retry_policy(), RetryPolicy::default());
        assert_eq!(config.max_body_chars, 1600);
        assert_eq!(
            config.recipient_format().unwrap(),
            RecipientFormat::E164 {
                default_region: None
            }
        );
    }

    fn settings(pairs: &[(&str, &str)]) -> Config {
        pairs
            .iter()
            .fold(Config::builder(), |builder, (key, value)| {
                builder.set_override(*key, *value).unwrap()
            })
            .build()
            .unwrap()
    }

    #[test]
    fn missing_variable_is_named_in_error() {
        let err = GatewayConfig::from_settings(&settings(&[
            ("twilio_account_sid", "AC0123"),
            ("twilio_from_number", "+15550001111"),
        ]))
        .unwrap_err()
        .to_string();
        assert!(err.contains("SMSGATE_TWILIO_AUTH_TOKEN"), "{err}");
    }

    #[test]
    fn settings_keep_plus_sign_and_parse_numbers() {
        let config = GatewayConfig::from_settings(&settings(&[
            ("twilio_account_sid", "AC0123"),
            ("twilio_auth_token", "secret-token"),
            ("twilio_from_number", "+15550001111"),
            ("max_retries", "0"),
            ("retry_jitter", "0.5"),
        ]))
        .unwrap();
        assert_eq!(config.twilio_from_number.as_str(), "+15550001111");
        assert_eq!(config.max_retries, 0);
        assert!((config.retry_jitter - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn invalid_retry_settings_are_rejected() {
        for (factor, jitter) in [
            (2.0, f64::NAN),
            (2.0, 1.5),
            (2.0, -0.1),
            (f64::NAN, 0.2),
            (f64::INFINITY, 0.2),
            (0.5, 0.2),
        ] {
            let mut config = from_json(minimal());
            config.retry_factor = factor;
            config.retry_jitter = jitter;
            assert!(config.validate().is_err(), "factor={factor} jitter={jitter}");
        }

        let err = GatewayConfig::from_settings(&settings(&[
            ("twilio_account_sid", "AC0123"),
            ("twilio_auth_token", "secret-token"),
            ("twilio_from_number", "+15550001111"),
            ("retry_jitter", "NaN"),
        ]))
        .unwrap_err()
        .to_string();
        assert!(err.contains("SMSGATE_RETRY_JITTER"), "{err}");

        assert!(from_json(minimal()).validate().is_ok());
    }

    #[test]
    fn provider_summary_masks_account_and_sender() {
        let mut value = minimal();
        value["twilio_account_sid"] = json!("AC0123456789");
        let config = from_json(value);
        let summary = config.provider_summary();

        assert_eq!(summary.account, "***6789");
        assert_eq!(summary.from, "***1111");
        assert_eq!(summary.api_base, "https://api.twilio.com");
        let printed = format!("{summary:?} {config:?}");
        assert!(!printed.contains("AC0123456789"), "{printed}");
        assert!(!printed.contains("+15550001111"), "{printed}");
        assert!(!printed.contains("secret-token"), "{printed}");
    }

    #[test]
    fn missing_credentials_are_rejected() {
        let result = serde_json::from_value::<GatewayConfig>(json!({
            "twilio_account_sid": "AC0123",
            "twilio_from_number": "+15550001111",
        }));
        let err = result.unwrap_err().to_string();
        assert!(err.contains("twilio_auth_token"), "{err}");
    }

    #[test]
    fn blank_credentials_are_rejected() {
        let mut value = minimal();
        value["twilio_account_sid"] = json!("  ");
        assert!(serde_json::from_value::<GatewayConfig>(value).is_err());
    }

    #[test]
    fn debug_output_hides_auth_token() {
        let config = from_json(minimal());
        assert!(!format!("{config:?}").contains("secret-token"));
    }

    #[test]
    fn recipient_format_parses_region_and_any() {
        let mut value = minimal();
        value["default_region"] = json!("ca");
        let config = from_json(value);
        assert_eq!(
            config.recipient_format().unwrap(),
            RecipientFormat::E164 {
                default_region: Some(phonenumber::country::Id::CA)
            }
        );

        let mut value = minimal();
        value["recipient_format"] = json!("ANY");
        assert_eq!(
            from_json(value).recipient_format().unwrap(),
            RecipientFormat::Any
        );

        let mut value = minimal();
        value["recipient_format"] = json!("loose");
        assert!(from_json(value).recipient_format().is_err());

        let mut value = minimal();
        value["default_region"] = json!("atlantis");
        assert!(from_json(value).recipient_format().is_err());
    }

    #[test]
    fn gateway_uses_configured_policy() {
        let mut value = minimal();
        value["max_retries"] = json!(0);
        value["request_timeout_ms"] = json!(500);
        let config = from_json(value);

        let provider: Arc<dyn SmsProvider> = Arc::new(
            crate::client::TwilioClient::from_config(&config).unwrap(),
        );
        let gateway = config.gateway(provider);
        assert_eq!(gateway.retry_policy().max_retries, 0);
        assert_eq!(gateway.timeout(), Duration::from_millis(500));
    }
}
