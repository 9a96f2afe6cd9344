use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    MalformedPayload,
    MissingField { field: &'static str },
    NotAString { field: &'static str },
    InvalidRecipientFormat { field: &'static str },
    BodyTooLong { max: usize, actual: usize },
    Empty { field: &'static str },
    UnknownRegion { input: String },
}

impl ValidationError {
    /// Name of the inbound field this error is about, when there is one.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::MissingField { field }
            | Self::NotAString { field }
            | Self::InvalidRecipientFormat { field }
            | Self::Empty { field } => Some(field),
            Self::BodyTooLong { .. } => Some("message"),
            Self::MalformedPayload | Self::UnknownRegion { .. } => None,
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedPayload => write!(f, "malformed payload: expected a JSON object"),
            Self::MissingField { field } => write!(f, "missing or empty field: {field}"),
            Self::NotAString { field } => write!(f, "field must be a string: {field}"),
            Self::InvalidRecipientFormat { field } => {
                write!(f, "invalid recipient format: {field}")
            }
            Self::BodyTooLong { max, .. } => write!(f, "message exceeds {max} characters"),
            Self::Empty { field } => write!(f, "{field} must not be empty"),
            Self::UnknownRegion { input } => write!(f, "unknown region code: {input}"),
        }
    }
}

impl std::error::Error for ValidationError {}
