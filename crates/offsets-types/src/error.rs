//! Decode failure taxonomy.

use std::fmt;
use thiserror::Error;

/// Why a consumer offsets record could not be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureReason {
    /// The key version is not one of the known record kinds
    UnknownKeyVersion,
    /// The key ended before a declared field
    TruncatedKey,
    /// The key is long enough but a field in it is invalid
    MalformedKey,
    /// The value ended before a declared field
    TruncatedValue,
    /// The value carries an invalid field or an unsupported value version
    MalformedValue,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::UnknownKeyVersion => "unknown-key-version",
            FailureReason::TruncatedKey => "truncated-key",
            FailureReason::MalformedKey => "malformed-key",
            FailureReason::TruncatedValue => "truncated-value",
            FailureReason::MalformedValue => "malformed-value",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified decode failure for a single record.
///
/// Failures are per record and never fatal: the record is skipped and the
/// failure is reported through the diagnostic sink.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason} (key version {}): {detail}", display_version(.key_version))]
pub struct DecodeFailure {
    pub reason: FailureReason,
    /// Key version read from the record, when at least two key bytes were present
    pub key_version: Option<i16>,
    pub detail: String,
}

fn display_version(version: &Option<i16>) -> String {
    match version {
        Some(v) => v.to_string(),
        None => "unknown".to_string(),
    }
}

impl DecodeFailure {
    pub fn new(reason: FailureReason, key_version: Option<i16>, detail: impl Into<String>) -> Self {
        Self {
            reason,
            key_version,
            detail: detail.into(),
        }
    }

    pub fn unknown_key_version(version: i16) -> Self {
        Self::new(
            FailureReason::UnknownKeyVersion,
            Some(version),
            format!("unsupported key version {version}"),
        )
    }
}
