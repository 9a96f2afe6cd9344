use serde::Serialize;

use crate::domain::value::ProviderMessageId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Sent,
    ProviderRejected,
    TransientFailure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Outcome of one delivery. Only `Sent` carries a provider id.
pub enum DeliveryResult {
    Sent {
        provider_message_id: ProviderMessageId,
    },
    ProviderRejected {
        error_detail: String,
    },
    TransientFailure {
        error_detail: String,
    },
}

impl DeliveryResult {
    pub fn status(&self) -> DeliveryStatus {
        match self {
            Self::Sent { .. } => DeliveryStatus::Sent,
            Self::ProviderRejected { .. } => DeliveryStatus::ProviderRejected,
            Self::TransientFailure { .. } => DeliveryStatus::TransientFailure,
        }
    }

    pub fn provider_message_id(&self) -> Option<&ProviderMessageId> {
        match self {
            Self::Sent {
                provider_message_id,
            } => Some(provider_message_id),
            _ => None,
        }
    }

    pub fn error_detail(&self) -> Option<&str> {
        match self {
            Self::Sent { .. } => None,
            Self::ProviderRejected { error_detail } | Self::TransientFailure { error_detail } => {
                Some(error_detail)
            }
        }
    }
}
