//! # Wallet Risk Core
//!
//! Deterministic and hybrid risk scoring for cryptocurrency wallets.
//!
//! A normalized [`WalletSnapshot`] goes through four rule-driven component
//! analyzers, a weighted aggregator and an optional AI scorer, and comes out as
//! a [`RiskAssessment`] with a 0-100 score, one of five risk levels and
//! ordered recommendations.

pub mod aggregator;
pub mod ai;
pub mod analyzers;
pub mod config;
pub mod engine;
pub mod error;
pub mod hybrid;
pub mod levels;
pub mod models;
pub mod provider;
pub mod recommendations;
pub mod rules;

pub use ai::{AiProvider, AiScore, AiScorer};
pub use config::*;
pub use engine::RiskEngine;
pub use error::*;
pub use levels::{categorize_components, RiskLevel};
pub use models::*;
pub use provider::{build_snapshot, WalletDataProvider};
pub use recommendations::Recommendation;
