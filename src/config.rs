//! # Config
//!
//! $$
//! \mu^{ann}=252\,\bar r,\qquad \Sigma^{ann}=252\,\hat\Sigma
//! $$
//!
//! Policy constants consumed by the analytical core.

use std::time::Duration;

use crate::error::Result;
use crate::error::RiskError;

/// Trading days per year.
pub const TRADING_DAYS: f64 = 252.0;

/// Number of random portfolios drawn by the Monte-Carlo sampler.
pub const DEFAULT_SAMPLE_COUNT: usize = 10_000;

/// Longest GARCH forecast horizon the pipeline accepts.
pub const MAX_FORECAST_HORIZON: usize = 30;

/// How random long-only weight vectors are drawn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SimplexSampling {
  /// Independent `U(0,1)` draws divided by their sum. Not uniform on the simplex: interior
  /// allocations are over-represented relative to the corners.
  #[default]
  NormalizedUniform,
  /// Dirichlet(1, ..., 1), i.e. uniform over the simplex.
  UniformSimplex,
}

/// How instruments with differing trading calendars are put on a common date index.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AlignmentPolicy {
  /// Keep only dates every instrument traded; returns are computed on the aligned closes.
  #[default]
  Intersection,
  /// Outer join on dates; an instrument without an observation on a date gets a missing return.
  Union,
}

/// GARCH(1,1) fitting policy.
#[derive(Clone, Debug)]
pub struct GarchConfig {
  /// Minimum number of non-missing returns.
  pub min_observations: usize,
  /// Return standard deviation below which the series is treated as constant.
  pub min_std: f64,
  /// Conditioning factor applied to returns before fitting.
  pub scale: f64,
  /// Nelder-Mead iteration budget.
  pub max_iters: u64,
  /// Simplex cost standard deviation that counts as converged.
  pub sd_tolerance: f64,
  /// Wall-clock budget per instrument.
  pub timeout: Option<Duration>,
}

impl Default for GarchConfig {
  fn default() -> Self {
    Self {
      min_observations: 100,
      min_std: 1e-6,
      scale: 100.0,
      max_iters: 1000,
      sd_tolerance: 1e-6,
      timeout: Some(Duration::from_secs(5)),
    }
  }
}

/// Correlation levels that flag a pair for diversification guidance.
#[derive(Clone, Copy, Debug)]
pub struct CorrelationThresholds {
  /// Pairs strictly above this are "strong positive" (risk concentration).
  pub strong_positive: f64,
  /// Pairs strictly below this are "strong negative" (diversifiers).
  pub strong_negative: f64,
}

impl Default for CorrelationThresholds {
  fn default() -> Self {
    Self {
      strong_positive: 0.7,
      strong_negative: -0.3,
    }
  }
}

/// Runtime configuration for [`crate::quant::portfolio::RiskEngine`].
#[derive(Clone, Debug)]
pub struct AnalysisConfig {
  /// Periods per year used to annualize means, covariances and volatilities.
  pub annualization_factor: f64,
  /// Random portfolios drawn per analysis.
  pub sample_count: usize,
  /// Risk-free rate subtracted in Sharpe ratios.
  pub risk_free: f64,
  /// Weight-vector distribution.
  pub sampling: SimplexSampling,
  /// Date alignment across instruments.
  pub alignment: AlignmentPolicy,
  /// Window of the fallback rolling volatility.
  pub rolling_window: usize,
  /// Days ahead forecast by fitted GARCH models.
  pub forecast_horizon: usize,
  /// Holdings listed per selected portfolio.
  pub top_holdings: usize,
  /// Max-Sharpe portfolio is recommended only above this Sharpe ratio.
  pub recommendation_sharpe_threshold: f64,
  pub garch: GarchConfig,
  pub correlation: CorrelationThresholds,
}

impl Default for AnalysisConfig {
  fn default() -> Self {
    Self {
      annualization_factor: TRADING_DAYS,
      sample_count: DEFAULT_SAMPLE_COUNT,
      risk_free: 0.0,
      sampling: SimplexSampling::default(),
      alignment: AlignmentPolicy::default(),
      rolling_window: 30,
      forecast_horizon: 10,
      top_holdings: 3,
      recommendation_sharpe_threshold: 0.5,
      garch: GarchConfig::default(),
      correlation: CorrelationThresholds::default(),
    }
  }
}

impl AnalysisConfig {
  /// Reject caller misuse before any computation starts.
  pub fn validate(&self) -> Result<()> {
    if !(self.annualization_factor.is_finite() && self.annualization_factor > 0.0) {
      return Err(RiskError::config(format!(
        "annualization factor must be positive, got {}",
        self.annualization_factor
      )));
    }
    if self.sample_count == 0 {
      return Err(RiskError::config("sample count must be positive"));
    }
    if !(1..=MAX_FORECAST_HORIZON).contains(&self.forecast_horizon) {
      return Err(RiskError::config(format!(
        "forecast horizon must be within 1..={MAX_FORECAST_HORIZON}, got {}",
        self.forecast_horizon
      )));
    }
    if self.rolling_window < 2 {
      return Err(RiskError::config(format!(
        "rolling window must span at least 2 observations, got {}",
        self.rolling_window
      )));
    }
    if self.correlation.strong_negative >= self.correlation.strong_positive {
      return Err(RiskError::config(format!(
        "strong negative threshold {} must lie below strong positive threshold {}",
        self.correlation.strong_negative, self.correlation.strong_positive
      )));
    }
    self.garch.validate()
  }
}

impl GarchConfig {
  pub fn validate(&self) -> Result<()> {
    if self.min_observations == 0 {
      return Err(RiskError::config("GARCH minimum observations must be positive"));
    }
    if !(self.min_std.is_finite() && self.min_std >= 0.0) {
      return Err(RiskError::config(format!(
        "GARCH minimum std must be finite and non-negative, got {}",
        self.min_std
      )));
    }
    if !(self.scale.is_finite() && self.scale > 0.0) {
      return Err(RiskError::config(format!(
        "GARCH scale must be positive, got {}",
        self.scale
      )));
    }
    if self.max_iters == 0 {
      return Err(RiskError::config("GARCH iteration budget must be positive"));
    }
    if !(self.sd_tolerance.is_finite() && self.sd_tolerance > 0.0) {
      return Err(RiskError::config(format!(
        "GARCH tolerance must be positive, got {}",
        self.sd_tolerance
      )));
    }
    Ok(())
  }
}
