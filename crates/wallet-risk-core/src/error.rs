//! Error types for the risk scoring core

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RiskError {
    /// Malformed or non-normalized configuration. Fatal at startup.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A data provider could not deliver part of the wallet snapshot.
    #[error("Data unavailable from {source_name}: {reason}")]
    DataUnavailable { source_name: String, reason: String },

    /// The snapshot is structurally invalid and was rejected before scoring.
    #[error("Validation error: {0}")]
    Validation(String),
}

impl RiskError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn data_unavailable(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DataUnavailable {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

pub type RiskResult<T> = Result<T, RiskError>;

/// Why the AI scorer produced no usable score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderFailureKind {
    Timeout,
    Unavailable,
    InvalidResponse,
}

impl ProviderFailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Unavailable => "unavailable",
            Self::InvalidResponse => "invalid_response",
        }
    }
}

/// Failure of the AI collaborator.
///
/// Recovered inside the hybrid combiner; it never escapes `assess()`.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("AI provider {}: {message}", kind.as_str())]
pub struct ProviderFailure {
    pub kind: ProviderFailureKind,
    pub message: String,
}

impl ProviderFailure {
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self {
            kind: ProviderFailureKind::Timeout,
            message: msg.into(),
        }
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self {
            kind: ProviderFailureKind::Unavailable,
            message: msg.into(),
        }
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self {
            kind: ProviderFailureKind::InvalidResponse,
            message: msg.into(),
        }
    }
}
