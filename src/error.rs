//! # Errors
//!
//! $$
//! \text{failure}\in\{\text{insufficiency},\ \text{degeneracy},\ \text{convergence},\ \text{configuration}\}
//! $$
//!
//! Whole-operation failures. Per-instrument GARCH failures are values, see
//! [`crate::quant::volatility::GarchFailureReason`].

use thiserror::Error;

/// Error raised by the analytical core.
#[derive(Debug, Error)]
pub enum RiskError {
  /// Too few observations for the requested computation.
  #[error("insufficient data for {context}: need at least {required} observations, got {actual}")]
  DataInsufficiency {
    context: String,
    required: usize,
    actual: usize,
  },
  /// Near-zero variance or an unusable covariance structure.
  #[error("numerical degeneracy: {0}")]
  NumericalDegeneracy(String),
  /// Solver stopped before converging.
  #[error("optimizer did not converge within {iterations} iterations")]
  ConvergenceFailure { iterations: u64 },
  /// Caller misuse (bad weight length, zero sample count, out-of-range horizon, ...).
  #[error("invalid configuration: {0}")]
  Configuration(String),
  /// The return panel carries no instruments or no observations.
  #[error("return panel is empty")]
  EmptyPanel,
  /// A price series violates the panel invariants.
  #[error("invalid price panel: {0}")]
  InvalidPanel(String),
  /// Failure reported by an injected data source.
  #[error(transparent)]
  Source(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, RiskError>;

impl RiskError {
  pub(crate) fn insufficient(context: impl Into<String>, required: usize, actual: usize) -> Self {
    Self::DataInsufficiency {
      context: context.into(),
      required,
      actual,
    }
  }

  pub(crate) fn config(msg: impl Into<String>) -> Self {
    Self::Configuration(msg.into())
  }
}
