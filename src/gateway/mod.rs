//! Delivery layer: calls the provider with bounded retries and maps every
//! outcome onto a [`DeliveryResult`].

mod retry;

use std::error::Error as StdError;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::domain::{DeliveryResult, MessageBody, ProviderMessageId, Recipient, SendCommand};

pub use retry::RetryPolicy;

/// Bound on a whole [`DeliveryGateway::send`] call, retries included.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Provider acknowledgement of an accepted message.
pub struct ProviderResponse {
    pub message_id: ProviderMessageId,
    /// Initial message status as reported by the provider (e.g. `queued`).
    pub status: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Likely to succeed on retry (network failure, 5xx, rate limit).
    Transient,
    /// Will recur on retry (bad recipient, account rejection, malformed reply).
    Permanent,
}

#[derive(Debug, thiserror::Error)]
/// Failure reported by an [`SmsProvider`].
pub enum ProviderError {
    /// HTTP client / transport failure (DNS, TLS, timeouts, etc).
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn StdError + Send + Sync>),

    /// Non-successful HTTP status code returned by the provider.
    #[error("unexpected HTTP status: {status}")]
    HttpStatus {
        status: u16,
        code: Option<i64>,
        message: Option<String>,
    },

    /// A successful response body could not be understood.
    #[error("parse error: {0}")]
    Parse(#[source] Box<dyn StdError + Send + Sync>),
}

impl ProviderError {
    pub fn class(&self) -> FailureClass {
        match self {
            Self::Transport(_) => FailureClass::Transient,
            Self::HttpStatus { status, .. } if *status == 429 || *status >= 500 => {
                FailureClass::Transient
            }
            Self::HttpStatus { .. } | Self::Parse(_) => FailureClass::Permanent,
        }
    }

    /// Human-readable reason that is safe to show to API callers.
    pub fn reason(&self) -> String {
        match self {
            Self::HttpStatus {
                message: Some(message),
                ..
            } => message.clone(),
            Self::HttpStatus { status, .. } => {
                format!("provider returned HTTP {status}")
            }
            Self::Transport(err) => format!("provider unreachable: {err}"),
            Self::Parse(_) => "unexpected response from provider".to_owned(),
        }
    }
}

/// External capability that actually transmits a message.
pub trait SmsProvider: Send + Sync {
    fn send<'a>(
        &'a self,
        recipient: &'a Recipient,
        body: &'a MessageBody,
    ) -> BoxFuture<'a, Result<ProviderResponse, ProviderError>>;
}

#[derive(Clone)]
/// Sends validated commands through an [`SmsProvider`].
///
/// Transient failures are retried according to the [`RetryPolicy`]; permanent
/// failures are reported after a single call. The whole call, backoff sleeps
/// included, is bounded by a timeout that yields
/// [`DeliveryResult::TransientFailure`] when it expires.
pub struct DeliveryGateway {
    provider: Arc<dyn SmsProvider>,
    policy: RetryPolicy,
    timeout: Duration,
}

impl DeliveryGateway {
    pub fn new(provider: Arc<dyn SmsProvider>) -> Self {
        Self {
            provider,
            policy: RetryPolicy::default(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn send(&self, cmd: SendCommand) -> DeliveryResult {
        match tokio::time::timeout(self.timeout, self.deliver(&cmd)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    recipient = %cmd.recipient().masked(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "delivery timed out"
                );
                DeliveryResult::TransientFailure {
                    error_detail: format!(
                        "delivery timed out after {} ms",
                        self.timeout.as_millis()
                    ),
                }
            }
        }
    }

    async fn deliver(&self, cmd: &SendCommand) -> DeliveryResult {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let err = match self.provider.send(cmd.recipient(), cmd.body()).await {
                Ok(response) => {
                    info!(
                        recipient = %cmd.recipient().masked(),
                        body_chars = cmd.body().char_len(),
                        sid = %response.message_id,
                        provider_status = response.status.as_deref().unwrap_or("unknown"),
                        attempts,
                        "message accepted by provider"
                    );
                    return DeliveryResult::Sent {
                        provider_message_id: response.message_id,
                    };
                }
                Err(err) => err,
            };

            match err.class() {
                FailureClass::Permanent => {
                    warn!(
                        recipient = %cmd.recipient().masked(),
                        error = %err,
                        attempts,
                        "provider rejected message"
                    );
                    return DeliveryResult::ProviderRejected {
                        error_detail: err.reason(),
                    };
                }
                FailureClass::Transient if self.policy.should_retry(attempts) => {
                    let delay = self.policy.delay_for(attempts);
                    warn!(
                        recipient = %cmd.recipient().masked(),
                        error = %err,
                        attempts,
                        delay_ms = delay.as_millis() as u64,
                        "transient provider failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                FailureClass::Transient => {
                    warn!(
                        recipient = %cmd.recipient().masked(),
                        error = %err,
                        attempts,
                        "transient provider failure, giving up"
                    );
                    return DeliveryResult::TransientFailure {
                        error_detail: format!("{} (after {attempts} attempts)", err.reason()),
                    };
                }
            }
        }
    }
}
