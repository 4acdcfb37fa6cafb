/// The 16 status codes a handler result or a journal `Error` entry may carry.
///
/// Numeric values follow the wire protocol (`CANCELLED` = 1 .. `UNAUTHENTICATED` = 16)
/// and must not be renumbered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[repr(u16)]
pub enum StatusCode {
    Cancelled = 1,
    Unknown = 2,
    InvalidArgument = 3,
    DeadlineExceeded = 4,
    NotFound = 5,
    AlreadyExists = 6,
    PermissionDenied = 7,
    ResourceExhausted = 8,
    FailedPrecondition = 9,
    Aborted = 10,
    OutOfRange = 11,
    Unimplemented = 12,
    Internal = 13,
    Unavailable = 14,
    DataLoss = 15,
    Unauthenticated = 16,
}

impl StatusCode {
    pub fn from_u16(value: u16) -> Option<Self> {
        Some(match value {
            1 => Self::Cancelled,
            2 => Self::Unknown,
            3 => Self::InvalidArgument,
            4 => Self::DeadlineExceeded,
            5 => Self::NotFound,
            6 => Self::AlreadyExists,
            7 => Self::PermissionDenied,
            8 => Self::ResourceExhausted,
            9 => Self::FailedPrecondition,
            10 => Self::Aborted,
            11 => Self::OutOfRange,
            12 => Self::Unimplemented,
            13 => Self::Internal,
            14 => Self::Unavailable,
            15 => Self::DataLoss,
            16 => Self::Unauthenticated,
            _ => return None,
        })
    }

    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

impl Default for StatusCode {
    fn default() -> Self {
        Self::Unknown
    }
}

/// An error produced (or observed) by a handler.
///
/// Carries two orthogonal classifications: a [`StatusCode`] and whether the
/// error is terminal (completes the invocation with a failure) or non-terminal
/// (the orchestrator retries the whole invocation). Default is non-terminal.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{code:?}: {message}")]
pub struct HandlerError {
    pub code: StatusCode,
    pub message: String,
    pub terminal: bool,
    pub detail: Option<String>,
}

impl HandlerError {
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            terminal: false,
            detail: None,
        }
    }

    pub fn terminal(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            terminal: true,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl Default for HandlerError {
    fn default() -> Self {
        Self::new(StatusCode::Unknown, "unknown error")
    }
}
