use phonenumber::country;
use serde_json::{Map, Value};

use crate::domain::validation::ValidationError;
use crate::domain::value::{MessageBody, PhoneNumber, Recipient};

/// Twilio rejects bodies longer than this many characters.
pub const DEFAULT_MAX_BODY_CHARS: usize = 1600;

#[derive(Debug, Clone, PartialEq)]
/// Untrusted inbound payload. `None` means the bytes were not JSON at all.
pub struct RawRequest(Option<Value>);

impl RawRequest {
    pub fn from_json(value: Value) -> Self {
        Self(Some(value))
    }

    /// Parse request bytes; anything that is not JSON becomes an unusable payload.
    pub fn from_slice(bytes: &[u8]) -> Self {
        Self(serde_json::from_slice(bytes).ok())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Validated, normalized intent to send one message.
pub struct SendCommand {
    recipient: Recipient,
    body: MessageBody,
}

impl SendCommand {
    pub fn new(recipient: Recipient, body: MessageBody) -> Self {
        Self { recipient, body }
    }

    pub fn recipient(&self) -> &Recipient {
        &self.recipient
    }

    pub fn body(&self) -> &MessageBody {
        &self.body
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Shape check applied to the recipient.
pub enum RecipientFormat {
    /// Accept any non-empty recipient as-is.
    #[default]
    Any,
    /// Require a parseable phone number and normalize it to E.164.
    E164 { default_region: Option<country::Id> },
}

#[derive(Debug, Clone)]
/// Turns a [`RawRequest`] into a [`SendCommand`] or names the field that failed.
pub struct RequestValidator {
    recipient_format: RecipientFormat,
    max_body_chars: usize,
}

impl Default for RequestValidator {
    fn default() -> Self {
        Self {
            recipient_format: RecipientFormat::Any,
            max_body_chars: DEFAULT_MAX_BODY_CHARS,
        }
    }
}

impl RequestValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_recipient_format(mut self, format: RecipientFormat) -> Self {
        self.recipient_format = format;
        self
    }

    pub fn with_max_body_chars(mut self, max: usize) -> Self {
        self.max_body_chars = max;
        self
    }

    /// Validate a payload.
    ///
    /// Checks run in order: object shape, `to`, `message`, recipient format,
    /// body length. The first failure is returned.
    pub fn validate(&self, raw: RawRequest) -> Result<SendCommand, ValidationError> {
        let Some(Value::Object(map)) = raw.0 else {
            return Err(ValidationError::MalformedPayload);
        };

        let to = required_string(&map, Recipient::FIELD)?;
        let message = required_string(&map, MessageBody::FIELD)?;

        let recipient = match self.recipient_format {
            RecipientFormat::Any => Recipient::new(to).map_err(|_| missing(Recipient::FIELD))?,
            RecipientFormat::E164 { default_region } => {
                PhoneNumber::parse(default_region, to)?.into()
            }
        };

        let body = MessageBody::new(message).map_err(|_| missing(MessageBody::FIELD))?;
        let actual = body.char_len();
        if actual > self.max_body_chars {
            return Err(ValidationError::BodyTooLong {
                max: self.max_body_chars,
                actual,
            });
        }

        Ok(SendCommand::new(recipient, body))
    }
}

fn required_string<'a>(
    map: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a str, ValidationError> {
    match map.get(field) {
        None | Some(Value::Null) => Err(missing(field)),
        Some(Value::String(value)) if value.trim().is_empty() => Err(missing(field)),
        Some(Value::String(value)) => Ok(value),
        Some(_) => Err(ValidationError::NotAString { field }),
    }
}

fn missing(field: &'static str) -> ValidationError {
    ValidationError::MissingField { field }
}
