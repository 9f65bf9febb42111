//! Error types for the wallet risk MCP server

use thiserror::Error;
use wallet_risk_core::RiskError;

#[derive(Error, Debug)]
pub enum RiskMcpError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Assessment error: {0}")]
    Assessment(#[from] RiskError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, RiskMcpError>;

/// Validate an EVM wallet address (0x followed by 40 hex digits)
pub fn validate_wallet(address: &str) -> Result<()> {
    if address.is_empty() {
        return Err(RiskMcpError::InvalidParameter("Wallet address cannot be empty".into()));
    }
    let hex = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .ok_or_else(|| RiskMcpError::InvalidParameter("Wallet address must start with 0x".into()))?;
    if hex.len() != 40 {
        return Err(RiskMcpError::InvalidParameter(
            "Invalid wallet address length".into(),
        ));
    }
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(RiskMcpError::InvalidParameter(
            "Wallet address contains non-hex characters".into(),
        ));
    }
    Ok(())
}

/// Validate a raw score argument
pub fn validate_score(score: f64) -> Result<()> {
    if !score.is_finite() {
        return Err(RiskMcpError::InvalidParameter("Score must be a finite number".into()));
    }
    Ok(())
}
