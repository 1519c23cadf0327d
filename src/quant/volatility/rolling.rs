//! # Rolling Volatility
//!
//! $$
//! \hat\sigma_t=\sqrt{A}\,\sqrt{\frac{1}{w-1}\sum_{s=t-w+1}^{t}(r_s-\bar r_{t,w})^2}
//! $$
//!
//! Trailing-window volatility used when no GARCH model could be fitted.

use chrono::NaiveDate;

use crate::error::Result;
use crate::error::RiskError;
use crate::quant::portfolio::ReturnPanel;

/// Annualized trailing sample standard deviation.
///
/// Position `t` is `None` until `window` observations are available, and whenever the window
/// holds a missing (non-finite) return.
pub fn rolling_volatility(returns: &[f64], window: usize, annualization_factor: f64) -> Vec<Option<f64>> {
  let mut out = vec![None; returns.len()];
  if window < 2 || returns.len() < window {
    return out;
  }

  let ann = annualization_factor.sqrt();
  for (t, slot) in out.iter_mut().enumerate().skip(window - 1) {
    let w = &returns[t + 1 - window..=t];
    if w.iter().any(|r| !r.is_finite()) {
      continue;
    }
    let mean = w.iter().sum::<f64>() / window as f64;
    let var = w.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (window - 1) as f64;
    *slot = Some(var.max(0.0).sqrt() * ann);
  }
  out
}

/// Rolling volatility of every instrument on the panel's date index.
#[derive(Clone, Debug)]
pub struct RollingVolatility {
  pub symbols: Vec<String>,
  pub dates: Vec<NaiveDate>,
  pub window: usize,
  /// One series per instrument, aligned with `dates`.
  pub values: Vec<Vec<Option<f64>>>,
}

impl RollingVolatility {
  pub fn from_panel(panel: &ReturnPanel, window: usize, annualization_factor: f64) -> Result<Self> {
    if window < 2 {
      return Err(RiskError::config(format!(
        "rolling window must span at least 2 observations, got {window}"
      )));
    }

    let values = (0..panel.n_assets())
      .map(|j| rolling_volatility(&panel.column(j).to_vec(), window, annualization_factor))
      .collect();

    Ok(Self {
      symbols: panel.symbols().to_vec(),
      dates: panel.dates().to_vec(),
      window,
      values,
    })
  }

  /// Most recent defined value of instrument `j`.
  pub fn latest(&self, j: usize) -> Option<(NaiveDate, f64)> {
    self.values.get(j)?.iter().zip(&self.dates).rev().find_map(|(v, d)| v.map(|v| (*d, v)))
  }
}
