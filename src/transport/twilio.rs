use serde::Deserialize;

use crate::domain::{AccountSid, MessageBody, ProviderMessageId, Recipient, SenderAddress};

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("invalid JSON response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("response is missing a message sid")]
    MissingSid,
}

#[derive(Debug, Clone, Deserialize)]
struct MessageJsonResponse {
    #[serde(default)]
    sid: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorJsonResponse {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedMessage {
    pub sid: ProviderMessageId,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DecodedError {
    pub code: Option<i64>,
    pub message: Option<String>,
}

/// Path of the `Messages` list resource for an account.
pub fn messages_path(account: &AccountSid) -> String {
    format!("2010-04-01/Accounts/{}/Messages.json", account.as_str())
}

pub fn encode_message_form(
    from: &SenderAddress,
    to: &Recipient,
    body: &MessageBody,
) -> Vec<(String, String)> {
    vec![
        ("To".to_owned(), to.as_str().to_owned()),
        ("From".to_owned(), from.as_str().to_owned()),
        ("Body".to_owned(), body.as_str().to_owned()),
    ]
}

pub fn decode_message_json_response(json: &str) -> Result<DecodedMessage, TransportError> {
    let parsed: MessageJsonResponse = serde_json::from_str(json)?;
    let sid = parsed
        .sid
        .and_then(|sid| ProviderMessageId::new(sid).ok())
        .ok_or(TransportError::MissingSid)?;
    Ok(DecodedMessage {
        sid,
        status: parsed.status,
    })
}

/// Decode a Twilio error body. Bodies that are not the documented shape decode to
/// an empty error so callers fall back to the HTTP status alone.
pub fn decode_error_json_response(json: &str) -> DecodedError {
    match serde_json::from_str::<ErrorJsonResponse>(json) {
        Ok(parsed) => DecodedError {
            code: parsed.code,
            message: parsed
                .message
                .map(|message| message.trim().to_owned())
                .filter(|message| !message.is_empty()),
        },
        Err(_) => DecodedError::default(),
    }
}
