//! Domain layer: strong types with validation and invariants (no I/O).

mod request;
mod response;
mod validation;
mod value;

pub use request::{
    DEFAULT_MAX_BODY_CHARS, RawRequest, RecipientFormat, RequestValidator, SendCommand,
};
pub use response::{DeliveryResult, DeliveryStatus};
pub use validation::ValidationError;
pub use value::{
    AccountSid, AuthToken, MessageBody, PhoneNumber, ProviderMessageId, Recipient, SenderAddress,
    parse_region,
};
