use secp256k1::Error as SecpError;
use std::io;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    MissingRequiredUtxo,
    TransactionBuildError,
    InsufficientFunds,
    InsufficientSignatures,
    ForeignSignature,
    TreasuryInsufficientBalance,
    StateAlreadyAdvanced,
    LedgerRejection,
    TransactionMismatch,
    InvalidWitness,
    InvalidStateTransition,
    SessionNotFound,
    SessionExpired,
    SigningFailed,
    InvalidDatum,
    EncodingError,
    SerializationError,
    CryptoError,
    StorageError,
    ConfigError,
    Message,
}

#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub code: ErrorCode,
    pub message: String,
}

/// How a caller is expected to react to an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Not an error yet: the session is waiting for more witnesses.
    AwaitSignatures,
    /// A witness is present but does not count (bad signature or outside the signer set).
    InvalidOrForeignSignature,
    /// The targeted state moved on; re-read current state before doing anything else.
    RefreshAndRestart,
    /// Informational only, never blocks building or finalizing.
    Advisory,
    /// Abort the workflow step.
    Fatal,
}

#[derive(Debug, Error)]
pub enum AmbassadorError {
    #[error("missing required utxo: {what} ({reference})")]
    MissingRequiredUtxo { what: String, reference: String },

    #[error("transaction build failed during {operation}: {details}")]
    TransactionBuildError { operation: String, details: String },

    #[error("insufficient funds for {purpose}: required {required}, available {available}")]
    InsufficientFunds { purpose: String, required: u64, available: u64 },

    #[error("insufficient signatures: collected {collected} of {required} required ({pending} pending)")]
    InsufficientSignatures { required: usize, collected: usize, pending: usize },

    #[error("foreign signature from {pkh} is not counted toward the threshold")]
    ForeignSignature { pkh: String },

    #[error("treasury insufficient balance: balance={balance} committed={committed} available={available}")]
    TreasuryInsufficientBalance { balance: u64, committed: u64, available: i128 },

    #[error("state already advanced: input {outref} is no longer spendable")]
    StateAlreadyAdvanced { outref: String },

    #[error("ledger rejected transaction: {reason}")]
    LedgerRejection { reason: String },

    #[error("transaction mismatch: expected {expected}, got {actual}")]
    TransactionMismatch { expected: String, actual: String },

    #[error("invalid witness signature from {pkh}")]
    InvalidWitness { pkh: String },

    #[error("invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("signing session not found: {0}")]
    SessionNotFound(String),

    #[error("signing session {session_id} expired at {expired_at}, current time {current_time}")]
    SessionExpired { session_id: String, expired_at: u64, current_time: u64 },

    #[error("signing failed: {0}")]
    SigningFailed(String),

    #[error("invalid datum at {reference}: expected {expected}")]
    InvalidDatum { reference: String, expected: String },

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("{format} serialization error: {details}")]
    SerializationError { format: String, details: String },

    #[error("crypto error during {operation}: {details}")]
    CryptoError { operation: String, details: String },

    #[error("storage error during {operation}: {details}")]
    StorageError { operation: String, details: String },

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("{0}")]
    Message(String),
}

pub type Result<T> = std::result::Result<T, AmbassadorError>;

impl AmbassadorError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AmbassadorError::MissingRequiredUtxo { .. } => ErrorCode::MissingRequiredUtxo,
            AmbassadorError::TransactionBuildError { .. } => ErrorCode::TransactionBuildError,
            AmbassadorError::InsufficientFunds { .. } => ErrorCode::InsufficientFunds,
            AmbassadorError::InsufficientSignatures { .. } => ErrorCode::InsufficientSignatures,
            AmbassadorError::ForeignSignature { .. } => ErrorCode::ForeignSignature,
            AmbassadorError::TreasuryInsufficientBalance { .. } => ErrorCode::TreasuryInsufficientBalance,
            AmbassadorError::StateAlreadyAdvanced { .. } => ErrorCode::StateAlreadyAdvanced,
            AmbassadorError::LedgerRejection { .. } => ErrorCode::LedgerRejection,
            AmbassadorError::TransactionMismatch { .. } => ErrorCode::TransactionMismatch,
            AmbassadorError::InvalidWitness { .. } => ErrorCode::InvalidWitness,
            AmbassadorError::InvalidStateTransition { .. } => ErrorCode::InvalidStateTransition,
            AmbassadorError::SessionNotFound(_) => ErrorCode::SessionNotFound,
            AmbassadorError::SessionExpired { .. } => ErrorCode::SessionExpired,
            AmbassadorError::SigningFailed(_) => ErrorCode::SigningFailed,
            AmbassadorError::InvalidDatum { .. } => ErrorCode::InvalidDatum,
            AmbassadorError::EncodingError(_) => ErrorCode::EncodingError,
            AmbassadorError::SerializationError { .. } => ErrorCode::SerializationError,
            AmbassadorError::CryptoError { .. } => ErrorCode::CryptoError,
            AmbassadorError::StorageError { .. } => ErrorCode::StorageError,
            AmbassadorError::ConfigError(_) => ErrorCode::ConfigError,
            AmbassadorError::Message(_) => ErrorCode::Message,
        }
    }

    pub fn context(&self) -> ErrorContext {
        ErrorContext { code: self.code(), message: self.to_string() }
    }

    pub fn disposition(&self) -> Disposition {
        match self {
            AmbassadorError::InsufficientSignatures { .. } => Disposition::AwaitSignatures,
            AmbassadorError::ForeignSignature { .. } | AmbassadorError::InvalidWitness { .. } => {
                Disposition::InvalidOrForeignSignature
            }
            AmbassadorError::StateAlreadyAdvanced { .. }
            | AmbassadorError::LedgerRejection { .. }
            | AmbassadorError::SessionExpired { .. } => Disposition::RefreshAndRestart,
            AmbassadorError::TreasuryInsufficientBalance { .. } => Disposition::Advisory,
            _ => Disposition::Fatal,
        }
    }

    /// Text suitable for showing to the person driving the workflow.
    pub fn user_message(&self) -> String {
        match self.disposition() {
            Disposition::AwaitSignatures => format!("More signatures are needed before this can be submitted: {self}"),
            Disposition::InvalidOrForeignSignature => {
                format!("A signature is present but is invalid or not from a designated signer: {self}")
            }
            Disposition::RefreshAndRestart => format!("Submission failed, please retry after refreshing the current state: {self}"),
            Disposition::Advisory => format!("Warning: {self}"),
            Disposition::Fatal => format!("Unable to continue: {self}"),
        }
    }

    /// Build failures originate in assembly, not in missing preconditions.
    pub fn is_build_failure(&self) -> bool {
        matches!(self.code(), ErrorCode::TransactionBuildError | ErrorCode::InsufficientFunds)
    }

    pub fn missing_utxo(what: impl Into<String>, reference: impl ToString) -> Self {
        AmbassadorError::MissingRequiredUtxo { what: what.into(), reference: reference.to_string() }
    }

    pub fn build_error(operation: impl Into<String>, details: impl Into<String>) -> Self {
        AmbassadorError::TransactionBuildError { operation: operation.into(), details: details.into() }
    }

    pub fn invalid_datum(reference: impl ToString, expected: impl Into<String>) -> Self {
        AmbassadorError::InvalidDatum { reference: reference.to_string(), expected: expected.into() }
    }
}

impl From<hex::FromHexError> for AmbassadorError {
    fn from(err: hex::FromHexError) -> Self {
        AmbassadorError::EncodingError(format!("hex decode error: {}", err))
    }
}

impl From<figment::Error> for AmbassadorError {
    fn from(err: figment::Error) -> Self {
        AmbassadorError::ConfigError(format!("config extraction failed: {}", err))
    }
}

#[macro_export]
macro_rules! storage_err {
    ($op:expr, $err:expr) => {
        $crate::foundation::AmbassadorError::StorageError { operation: $op.into(), details: $err.to_string() }
    };
}

#[macro_export]
macro_rules! serde_err {
    ($fmt:expr, $err:expr) => {
        $crate::foundation::AmbassadorError::SerializationError { format: $fmt.into(), details: $err.to_string() }
    };
}

impl From<io::Error> for AmbassadorError {
    fn from(err: io::Error) -> Self {
        AmbassadorError::StorageError { operation: "io".to_string(), details: err.to_string() }
    }
}

impl From<serde_json::Error> for AmbassadorError {
    fn from(err: serde_json::Error) -> Self {
        AmbassadorError::SerializationError { format: "json".to_string(), details: err.to_string() }
    }
}

impl From<SecpError> for AmbassadorError {
    fn from(err: SecpError) -> Self {
        AmbassadorError::CryptoError { operation: "secp256k1".to_string(), details: err.to_string() }
    }
}

// NOTE: Avoid adding generic "stringly" error conversions here.
// Use structured `AmbassadorError` variants at the call site to preserve context.
