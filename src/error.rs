use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Error {
    kind: ErrorKind,
    description: String,
}

impl Error {
    pub fn new(kind: ErrorKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
        }
    }

    pub(in crate) fn channel_closed() -> Self {
        Self::new(ErrorKind::ChannelClosed, "response channel closed")
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Whether the error comes from validating user input and should be reported back to the
    /// operator rather than escalated.
    pub fn is_usage(&self) -> bool {
        use ErrorKind::*;
        match self.kind {
            InvalidUuid | InvalidDebugArgument | InvalidValue | UnknownAttribute => true,
            AdapterUnavailable | ChannelClosed => false,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.description)
    }
}

impl std::error::Error for Error {}

impl From<crate::uuid::UuidParseError> for Error {
    fn from(e: crate::uuid::UuidParseError) -> Self {
        Self::new(ErrorKind::InvalidUuid, e.to_string())
    }
}

impl From<hex::FromHexError> for Error {
    fn from(e: hex::FromHexError) -> Self {
        Self::new(ErrorKind::InvalidValue, e.to_string())
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The native adapter refused to accept a request.
    AdapterUnavailable,

    /// The outbound response channel has no receiver left.
    ChannelClosed,

    /// A UUID argument is malformed.
    InvalidUuid,

    /// A `debug` argument is neither `True`, `False` nor empty.
    InvalidDebugArgument,

    /// A value argument (e.g. hex bytes to write) is malformed.
    InvalidValue,

    /// The referenced service or characteristic isn't part of the peripheral's profile.
    UnknownAttribute,
}
