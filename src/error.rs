use serde::{Deserialize, Serialize};

/// Failure classes surfaced by an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Identity,
    Session,
    Operation,
    Decode,
}

impl ErrorKind {
    pub fn description(&self) -> &'static str {
        match self {
            ErrorKind::Config => "configuration error",
            ErrorKind::Identity => "identity enrollment error",
            ErrorKind::Session => "gateway session error",
            ErrorKind::Operation => "chaincode operation error",
            ErrorKind::Decode => "response decoding error",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InvokerError {
    /// Missing or malformed configuration or connection profile.
    #[error("{0}")]
    Config(String),

    /// CA unreachable, rejected credentials, or wallet storage failure.
    #[error("{0}")]
    Identity(String),

    /// Gateway connect failure or unresolvable peer, channel or contract.
    #[error("{0}")]
    Session(String),

    /// Endorsement rejection, commit failure or evaluation error.
    #[error("{0}")]
    Operation(String),

    /// The ledger returned a payload that is not JSON.
    #[error("{0}")]
    Decode(#[from] serde_json::Error),
}

impl InvokerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            InvokerError::Config(_) => ErrorKind::Config,
            InvokerError::Identity(_) => ErrorKind::Identity,
            InvokerError::Session(_) => ErrorKind::Session,
            InvokerError::Operation(_) => ErrorKind::Operation,
            InvokerError::Decode(_) => ErrorKind::Decode,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn identity(message: impl Into<String>) -> Self {
        Self::Identity(message.into())
    }

    pub fn session(message: impl Into<String>) -> Self {
        Self::Session(message.into())
    }

    pub fn operation(message: impl Into<String>) -> Self {
        Self::Operation(message.into())
    }
}

pub type Result<T> = std::result::Result<T, InvokerError>;

pub const ERROR_STATUS: &str = "ERROR";

/// The `{status, message}` document printed for every surfaced failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub status: String,
    pub message: String,
}

impl ErrorEnvelope {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: ERROR_STATUS.to_string(),
            message: message.into(),
        }
    }

    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({ "status": self.status, "message": self.message })
    }
}

impl From<&InvokerError> for ErrorEnvelope {
    fn from(err: &InvokerError) -> Self {
        let message = err.to_string();
        if message.trim().is_empty() {
            Self::new(err.kind().description())
        } else {
            Self::new(message)
        }
    }
}

impl From<InvokerError> for ErrorEnvelope {
    fn from(err: InvokerError) -> Self {
        Self::from(&err)
    }
}
