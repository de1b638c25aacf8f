// Network Manager - Error Types
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Shared error types for the connection data model.
//!
//! Every error that refers to a concrete property carries a dotted
//! `setting.property` location so callers can point at the offending
//! field in diagnostics.

use thiserror::Error;

/// Result type alias for connection model operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for connection model operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    // ========================================
    // Property Errors
    // ========================================
    #[error("{location}: invalid property: {reason}")]
    InvalidProperty { location: String, reason: String },

    #[error("{location}: property is missing")]
    MissingProperty { location: String },

    // ========================================
    // Setting Errors
    // ========================================
    #[error("{setting}: invalid setting: {reason}")]
    InvalidSetting { setting: String, reason: String },

    #[error("{setting}: setting is required but missing")]
    MissingSetting { setting: String },

    #[error("setting not found: {0}")]
    SettingNotFound(String),

    #[error("{setting}: setting not compatible with connection type {connection_type}")]
    ConnectionTypeIncompatible {
        setting: String,
        connection_type: String,
    },

    // ========================================
    // Generic Errors
    // ========================================
    #[error("{0}")]
    Failed(String),
}

impl Error {
    /// Create an invalid-property error for `setting.property`.
    pub fn invalid_property(
        setting: impl AsRef<str>,
        property: impl AsRef<str>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidProperty {
            location: format!("{}.{}", setting.as_ref(), property.as_ref()),
            reason: reason.into(),
        }
    }

    /// Create a missing-property error for `setting.property`.
    pub fn missing_property(setting: impl AsRef<str>, property: impl AsRef<str>) -> Self {
        Self::MissingProperty {
            location: format!("{}.{}", setting.as_ref(), property.as_ref()),
        }
    }

    /// Create an invalid-setting error.
    pub fn invalid_setting(setting: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSetting {
            setting: setting.into(),
            reason: reason.into(),
        }
    }

    /// Create a missing-setting error.
    pub fn missing_setting(setting: impl Into<String>) -> Self {
        Self::MissingSetting {
            setting: setting.into(),
        }
    }

    /// Check if this error refers to a missing property or setting.
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::MissingProperty { .. } | Self::MissingSetting { .. })
    }
}

/// Outcome of verifying a connection or a single setting.
///
/// Verification starts at `Success` and only ever moves down in severity;
/// it never recovers. The two soft states mark connections that
/// [`normalize`](crate::Connection::normalize) can repair, `Failure` is a
/// hard rejection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyResult {
    /// The connection is valid as-is.
    Success,
    /// Valid after normalization; historically tolerated defect.
    Normalizable(Error),
    /// Invalid, but normalization knows the repair.
    NormalizableError(Error),
    /// Invalid beyond repair; the error is surfaced to the caller.
    Failure(Error),
}

impl VerifyResult {
    /// Numeric severity used for the "only moves down" ordering.
    fn severity(&self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Normalizable(_) => 1,
            Self::NormalizableError(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// True for the two soft states that `normalize` accepts.
    pub fn is_normalizable(&self) -> bool {
        matches!(self, Self::Normalizable(_) | Self::NormalizableError(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    /// The underlying error, if any.
    pub fn error(&self) -> Option<&Error> {
        match self {
            Self::Success => None,
            Self::Normalizable(e) | Self::NormalizableError(e) | Self::Failure(e) => Some(e),
        }
    }

    /// Fold another result in, keeping the most severe outcome.
    ///
    /// Among soft results of equal severity the first one encountered is
    /// kept, matching the accumulation rule of connection verification.
    pub fn merge(self, other: VerifyResult) -> VerifyResult {
        if other.severity() > self.severity() {
            other
        } else {
            self
        }
    }

    /// Convert to a plain `Result`, treating soft states as errors too.
    pub fn into_result(self) -> Result<()> {
        match self {
            Self::Success => Ok(()),
            Self::Normalizable(e) | Self::NormalizableError(e) | Self::Failure(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_location_format() {
        let err = Error::invalid_property("ipv4", "gateway", "not an address");
        assert_eq!(
            err.to_string(),
            "ipv4.gateway: invalid property: not an address"
        );
        let err = Error::missing_property("connection", "id");
        assert!(err.to_string().starts_with("connection.id"));
        assert!(err.is_missing());
    }

    #[test]
    fn test_verify_result_merge_keeps_most_severe() {
        let soft = VerifyResult::Normalizable(Error::missing_setting("ipv4"));
        let hard = VerifyResult::NormalizableError(Error::invalid_setting("ipv6", "bad"));
        let merged = soft.clone().merge(hard.clone());
        assert_eq!(merged, hard);
        // Same severity: the first one wins.
        let other = VerifyResult::Normalizable(Error::missing_setting("ipv6"));
        assert_eq!(soft.clone().merge(other), soft);
    }

    #[test]
    fn test_verify_result_never_recovers() {
        let failure = VerifyResult::Failure(Error::Failed("broken".into()));
        let merged = failure.clone().merge(VerifyResult::Success);
        assert_eq!(merged, failure);
    }
}
