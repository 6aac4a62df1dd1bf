//! Error types for the storage crate

use telemorph_core::SignalType;
use thiserror::Error;

/// Error codes for programmatic handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// S001: Backend unreachable or connection failed
    S001Connection,
    /// S002: Schema creation failed
    S002Schema,
    /// S003: Insert failed
    S003Write,
    /// S004: Read failed or a stored row could not be decoded
    S004Read,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::S001Connection => "S001",
            Self::S002Schema => "S002",
            Self::S003Write => "S003",
            Self::S004Read => "S004",
        }
    }
}

/// Errors reported by every `TelemetryStore` operation
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("[{code}] Storage backend unavailable: {reason}")]
    Connection { code: &'static str, reason: String },

    #[error("[{code}] Schema initialization failed: {reason}")]
    Schema { code: &'static str, reason: String },

    #[error("[{code}] Failed to insert {signal} record: {reason}")]
    Write {
        code: &'static str,
        signal: SignalType,
        reason: String,
    },

    #[error("[{code}] Failed to read {what}: {reason}")]
    Read {
        code: &'static str,
        what: String,
        reason: String,
    },
}

impl StorageError {
    pub fn connection(reason: impl ToString) -> Self {
        Self::Connection {
            code: ErrorCode::S001Connection.as_str(),
            reason: reason.to_string(),
        }
    }

    pub fn schema(reason: impl ToString) -> Self {
        Self::Schema {
            code: ErrorCode::S002Schema.as_str(),
            reason: reason.to_string(),
        }
    }

    pub fn write(signal: SignalType, reason: impl ToString) -> Self {
        Self::Write {
            code: ErrorCode::S003Write.as_str(),
            signal,
            reason: reason.to_string(),
        }
    }

    pub fn read(what: impl Into<String>, reason: impl ToString) -> Self {
        Self::Read {
            code: ErrorCode::S004Read.as_str(),
            what: what.into(),
            reason: reason.to_string(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Connection { code, .. }
            | Self::Schema { code, .. }
            | Self::Write { code, .. }
            | Self::Read { code, .. } => code,
        }
    }
}

/// Result type alias for StorageError
pub type Result<T> = std::result::Result<T, StorageError>;
