//! Error types for StealthFlow.
//!
//! One error enum covers every crate in the workspace. Variants are grouped
//! by the layer that raises them, and the classification helpers at the
//! bottom decide how callers react (retry, report as bad input, or flag).

use thiserror::Error;

/// Result type alias using `StealthFlowError`.
pub type Result<T> = std::result::Result<T, StealthFlowError>;

/// Main error type for all StealthFlow operations.
#[derive(Debug, Error)]
pub enum StealthFlowError {
    // ═══════════════════════════════════════════════════════════════════════════
    // CRYPTOGRAPHIC ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Key generation failed (entropy source unavailable).
    #[error("Key generation failed: {0}")]
    KeyGenerationError(String),

    /// Scalar is zero or not below the curve order.
    #[error("Invalid scalar: {0}")]
    InvalidScalar(String),

    /// Coordinates do not describe a point on secp256k1.
    #[error("Invalid curve point: {0}")]
    InvalidPoint(String),

    /// An operation produced the point at infinity.
    #[error("Point at infinity in {0}")]
    PointAtInfinity(&'static str),

    // ═══════════════════════════════════════════════════════════════════════════
    // STEALTH ADDRESS ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Invalid meta-address format or content.
    #[error("Invalid meta-address: {0}")]
    InvalidMetaAddress(String),

    /// Failed to derive stealth keys.
    #[error("Stealth key derivation failed: {0}")]
    StealthDerivationError(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // ANNOUNCEMENT ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Invalid announcement content.
    #[error("Invalid announcement: {0}")]
    InvalidAnnouncement(String),

    /// Announcement event could not be decoded.
    #[error("Malformed announcement event: {0}")]
    MalformedEvent(String),

    /// An announcement with the same transaction and block already exists.
    #[error("Duplicate announcement: {0}")]
    DuplicateAnnouncement(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // AMOUNT ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Token amount could not be parsed or does not fit in 256 bits.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // SERIALIZATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Invalid hex encoding.
    #[error("Invalid hex encoding: {0}")]
    HexError(#[from] hex::FromHexError),

    /// Persisted format version mismatch.
    #[error("Format version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: u8, actual: u8 },

    // ═══════════════════════════════════════════════════════════════════════════
    // EXTERNAL I/O ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// File I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Fetching announcements from the ledger failed.
    #[error("Announcement source error: {0}")]
    SourceError(String),

    /// Balance query failed.
    #[error("Balance lookup failed: {0}")]
    BalanceLookupError(String),

    /// Claim transaction could not be executed.
    #[error("Claim failed: {0}")]
    ClaimError(String),

    /// The stealth account holds less than the claimed amount.
    #[error("Insufficient balance: have {available}, need {required}")]
    InsufficientBalance { available: String, required: String },

    // ═══════════════════════════════════════════════════════════════════════════
    // VALIDATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Input validation failed.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // INTERNAL ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// A derived key does not match the key it must reproduce.
    ///
    /// Never reachable with honest inputs and a correct implementation.
    #[error("Soundness violation: {0}")]
    SoundnessViolation(String),

    /// Internal invariant violation (should never happen).
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl StealthFlowError {
    /// Returns true if this error is recoverable (can retry).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StealthFlowError::IoError(_)
                | StealthFlowError::SourceError(_)
                | StealthFlowError::BalanceLookupError(_)
        )
    }

    /// Returns true if this is a cryptographic error.
    pub fn is_crypto_error(&self) -> bool {
        matches!(
            self,
            StealthFlowError::KeyGenerationError(_)
                | StealthFlowError::InvalidScalar(_)
                | StealthFlowError::InvalidPoint(_)
                | StealthFlowError::PointAtInfinity(_)
                | StealthFlowError::StealthDerivationError(_)
        )
    }

    /// Returns true if this is a validation error.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            StealthFlowError::ValidationError(_)
                | StealthFlowError::InvalidMetaAddress(_)
                | StealthFlowError::InvalidAnnouncement(_)
                | StealthFlowError::MalformedEvent(_)
                | StealthFlowError::InvalidAmount(_)
                | StealthFlowError::HexError(_)
                | StealthFlowError::VersionMismatch { .. }
        )
    }

    /// Returns true if this error indicates a protocol or implementation bug.
    pub fn is_soundness_violation(&self) -> bool {
        matches!(
            self,
            StealthFlowError::SoundnessViolation(_) | StealthFlowError::InternalError(_)
        )
    }

    /// Message suitable for end users.
    pub fn user_message(&self) -> String {
        if self.is_soundness_violation() {
            format!("internal protocol error, please report it: {}", self)
        } else if self.is_recoverable() {
            format!("scan failed, will retry: {}", self)
        } else if self.is_validation_error() || self.is_crypto_error() {
            format!("invalid key/address format: {}", self)
        } else {
            self.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StealthFlowError::VersionMismatch {
            expected: 1,
            actual: 7,
        };
        assert!(err.to_string().contains('1'));
        assert!(err.to_string().contains('7'));
    }

    #[test]
    fn test_error_classification() {
        assert!(StealthFlowError::SourceError("rpc down".into()).is_recoverable());
        assert!(StealthFlowError::BalanceLookupError("timeout".into()).is_recoverable());
        assert!(!StealthFlowError::InvalidPoint("x".into()).is_recoverable());

        assert!(StealthFlowError::PointAtInfinity("point_add").is_crypto_error());
        assert!(StealthFlowError::InvalidScalar("zero".into()).is_crypto_error());
        assert!(!StealthFlowError::SourceError("x".into()).is_crypto_error());

        assert!(StealthFlowError::MalformedEvent("short".into()).is_validation_error());
        assert!(StealthFlowError::InvalidMetaAddress("x".into()).is_validation_error());

        assert!(StealthFlowError::SoundnessViolation("x".into()).is_soundness_violation());
        assert!(!StealthFlowError::SoundnessViolation("x".into()).is_recoverable());
    }

    #[test]
    fn test_user_messages() {
        let msg = StealthFlowError::SourceError("rpc".into()).user_message();
        assert!(msg.starts_with("scan failed, will retry"));

        let msg = StealthFlowError::InvalidMetaAddress("bad".into()).user_message();
        assert!(msg.starts_with("invalid key/address format"));

        let msg = StealthFlowError::SoundnessViolation("mismatch".into()).user_message();
        assert!(msg.starts_with("internal protocol error"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_result: std::result::Result<serde_json::Value, _> = serde_json::from_str("invalid");
        let result: Result<serde_json::Value> = json_result.map_err(StealthFlowError::from);
        assert!(matches!(result, Err(StealthFlowError::JsonError(_))));
    }
}
