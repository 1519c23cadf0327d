//! # Portfolio Statistics
//!
//! $$
//! \mu_p=\mathbf w^\top\mu,\qquad \sigma_p=\sqrt{\mathbf w^\top\Sigma\mathbf w}
//! $$
//!
//! Annualized mean vector and covariance of the return panel, and the two-moment evaluation of
//! an arbitrary weight vector.

use nalgebra::DMatrix;
use ndarray::Array1;
use ndarray::Array2;
use ndarray::Axis;
use tracing::warn;

use super::returns::ReturnPanel;
use crate::error::Result;
use crate::error::RiskError;

/// Sharpe ratio that never produces `NaN`: a zero-volatility portfolio scores `0`.
pub fn sharpe_ratio(expected_return: f64, volatility: f64, risk_free: f64) -> f64 {
  if volatility > 1e-15 {
    (expected_return - risk_free) / volatility
  } else {
    0.0
  }
}

/// Sample covariance (`T - 1` denominator) of the columns of `data`.
pub(crate) fn sample_covariance(data: &Array2<f64>) -> Option<Array2<f64>> {
  let n_obs = data.nrows();
  if n_obs < 2 {
    return None;
  }
  let mean = data.mean_axis(Axis(0))?;
  let centered = data - &mean;
  Some(centered.t().dot(&centered) / (n_obs - 1) as f64)
}

/// Annualized first and second moments of a return panel.
#[derive(Clone, Debug)]
pub struct PortfolioStatistics {
  symbols: Vec<String>,
  mean_returns: Array1<f64>,
  covariance: Array2<f64>,
  n_obs: usize,
  annualization_factor: f64,
}

impl PortfolioStatistics {
  /// Estimate moments from the complete rows of `panel`.
  ///
  /// Fails with [`RiskError::DataInsufficiency`] when fewer than two complete rows remain, since
  /// the covariance is undefined and `NaN` would corrupt every downstream ranking.
  pub fn from_panel(panel: &ReturnPanel, annualization_factor: f64) -> Result<Self> {
    if panel.n_assets() == 0 || panel.n_obs() == 0 {
      return Err(RiskError::EmptyPanel);
    }
    if !(annualization_factor.is_finite() && annualization_factor > 0.0) {
      return Err(RiskError::config(format!(
        "annualization factor must be positive, got {annualization_factor}"
      )));
    }

    let data = panel.complete_rows();
    let n_obs = data.nrows();
    let covariance = sample_covariance(&data)
      .ok_or_else(|| RiskError::insufficient("covariance (degenerate sample)", 2, n_obs))?
      * annualization_factor;
    let mean_returns = data
      .mean_axis(Axis(0))
      .ok_or_else(|| RiskError::insufficient("mean returns", 1, n_obs))?
      * annualization_factor;

    let stats = Self {
      symbols: panel.symbols().to_vec(),
      mean_returns,
      covariance,
      n_obs,
      annualization_factor,
    };

    if !stats.is_positive_definite() {
      warn!(
        "annualized covariance of {} instruments is not positive definite; frontier may be degenerate",
        stats.n_assets()
      );
    }

    Ok(stats)
  }

  /// Build directly from annualized moments.
  pub fn from_moments(
    symbols: Vec<String>,
    mean_returns: Array1<f64>,
    covariance: Array2<f64>,
  ) -> Result<Self> {
    let k = symbols.len();
    if k == 0 {
      return Err(RiskError::EmptyPanel);
    }
    if mean_returns.len() != k || covariance.dim() != (k, k) {
      return Err(RiskError::config(format!(
        "moments do not match {k} instruments"
      )));
    }
    Ok(Self {
      symbols,
      mean_returns,
      covariance,
      n_obs: 0,
      annualization_factor: 1.0,
    })
  }

  /// Per-instrument mean return times the annualization factor.
  pub fn annualized_mean_returns(&self) -> &Array1<f64> {
    &self.mean_returns
  }

  /// Sample covariance times the annualization factor.
  pub fn annualized_covariance(&self) -> &Array2<f64> {
    &self.covariance
  }

  pub fn symbols(&self) -> &[String] {
    &self.symbols
  }

  pub fn n_assets(&self) -> usize {
    self.symbols.len()
  }

  /// Complete rows the moments were estimated from.
  pub fn n_obs(&self) -> usize {
    self.n_obs
  }

  pub fn annualization_factor(&self) -> f64 {
    self.annualization_factor
  }

  /// `(portfolio_std, portfolio_return)` of `weights`.
  ///
  /// Only the length is checked. Sum-to-one and non-negativity are the caller's responsibility,
  /// so leveraged or short vectors evaluate without complaint.
  pub fn evaluate(&self, weights: &[f64]) -> Result<(f64, f64)> {
    if weights.len() != self.n_assets() {
      return Err(RiskError::config(format!(
        "weight vector has {} entries for {} instruments",
        weights.len(),
        self.n_assets()
      )));
    }

    let w = ndarray::ArrayView1::from(weights);
    let portfolio_return = w.dot(&self.mean_returns);
    let variance = w.dot(&self.covariance.dot(&w));
    Ok((variance.max(0.0).sqrt(), portfolio_return))
  }

  /// Cholesky succeeds on the annualized covariance.
  pub fn is_positive_definite(&self) -> bool {
    let k = self.n_assets();
    DMatrix::from_fn(k, k, |i, j| self.covariance[[i, j]])
      .cholesky()
      .is_some()
  }
}
