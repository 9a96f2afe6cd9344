use std::fmt;

use phonenumber::country;
use serde::Deserialize;

use crate::domain::validation::ValidationError;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// Message recipient as handed to the provider.
///
/// Invariant: non-empty after trimming. This type does not normalize; parse into
/// [`PhoneNumber`] and convert it into [`Recipient`] for an E.164 value.
pub struct Recipient(String);

impl Recipient {
    /// Inbound JSON field carrying the recipient (`to`).
    pub const FIELD: &'static str = "to";

    /// Create a validated (non-empty) recipient.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: Self::FIELD });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Trimmed value as sent to the provider.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Log-safe form keeping only the last four characters.
    pub fn masked(&self) -> String {
        mask_tail(&self.0)
    }
}

fn mask_tail(value: &str) -> String {
    let count = value.chars().count();
    let tail: String = value.chars().skip(count.saturating_sub(4)).collect();
    format!("***{tail}")
}

impl From<PhoneNumber> for Recipient {
    /// Convert an already-parsed phone number to its E.164 form.
    fn from(value: PhoneNumber) -> Self {
        Self(value.e164)
    }
}

#[derive(Debug, Clone)]
/// Parsed phone number with an E.164 representation.
///
/// Equality is based on the E.164 form.
pub struct PhoneNumber {
    raw: String,
    e164: String,
}

impl PhoneNumber {
    /// Parse and normalize a phone number into E.164.
    ///
    /// `default_region` is used when the input does not contain an explicit country prefix.
    pub fn parse(
        default_region: Option<country::Id>,
        input: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let input = input.into();
        let raw = input.trim().to_owned();
        if raw.is_empty() {
            return Err(ValidationError::MissingField {
                field: Recipient::FIELD,
            });
        }

        let parsed = phonenumber::parse(default_region, &raw).map_err(|_| {
            ValidationError::InvalidRecipientFormat {
                field: Recipient::FIELD,
            }
        })?;

        let e164 = phonenumber::format(&parsed)
            .mode(phonenumber::Mode::E164)
            .to_string();

        Ok(Self { raw, e164 })
    }

    /// Raw input after trimming.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Normalized E.164 representation.
    pub fn e164(&self) -> &str {
        &self.e164
    }
}

impl PartialEq for PhoneNumber {
    fn eq(&self, other: &Self) -> bool {
        self.e164 == other.e164
    }
}

impl Eq for PhoneNumber {}

/// Parse an ISO 3166-1 alpha-2 code (`CA`, `us`) into a phone-number region.
pub fn parse_region(input: &str) -> Result<country::Id, ValidationError> {
    input
        .trim()
        .to_ascii_uppercase()
        .parse::<country::Id>()
        .map_err(|_| ValidationError::UnknownRegion {
            input: input.to_owned(),
        })
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// SMS message text.
///
/// Invariant: non-empty after trimming. Surrounding whitespace is removed.
pub struct MessageBody(String);

impl MessageBody {
    /// Inbound JSON field carrying the text (`message`).
    pub const FIELD: &'static str = "message";

    /// Create validated message text.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: Self::FIELD });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the trimmed text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length in characters, which is what provider limits count.
    pub fn char_len(&self) -> usize {
        self.0.chars().count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// Provider-assigned message identifier (Twilio `sid`).
///
/// Invariant: non-empty after trimming.
pub struct ProviderMessageId(String);

impl ProviderMessageId {
    /// Response field carrying the id (`sid`).
    pub const FIELD: &'static str = "sid";

    /// Create a validated [`ProviderMessageId`].
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: Self::FIELD });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the validated id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderMessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
/// Twilio account identifier (`AC...`).
///
/// `Debug` shows only the last four characters.
///
/// Invariant: non-empty after trimming.
pub struct AccountSid(String);

impl AccountSid {
    pub const FIELD: &'static str = "twilio_account_sid";

    /// Create a validated [`AccountSid`].
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: Self::FIELD });
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Log-safe form keeping only the last four characters.
    pub fn masked(&self) -> String {
        mask_tail(&self.0)
    }
}

impl fmt::Debug for AccountSid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountSid({})", self.masked())
    }
}

impl TryFrom<String> for AccountSid {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
/// Twilio auth token.
///
/// Invariant: must not be empty. `Debug` never prints the value.
pub struct AuthToken(String);

impl AuthToken {
    pub const FIELD: &'static str = "twilio_auth_token";

    /// Create a validated [`AuthToken`].
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(ValidationError::Empty { field: Self::FIELD });
        }
        Ok(Self(value))
    }

    /// Expose the secret for request signing.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}

impl TryFrom<String> for AuthToken {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

#[derive(Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
/// Sender address (`From`): a Twilio number or messaging service sid.
///
/// `Debug` shows only the last four characters.
///
/// Invariant: non-empty after trimming.
pub struct SenderAddress(String);

impl SenderAddress {
    pub const FIELD: &'static str = "twilio_from_number";

    /// Create a validated [`SenderAddress`].
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: Self::FIELD });
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Log-safe form keeping only the last four characters.
    pub fn masked(&self) -> String {
        mask_tail(&self.0)
    }
}

impl fmt::Debug for SenderAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SenderAddress({})", self.masked())
    }
}

impl TryFrom<String> for SenderAddress {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
