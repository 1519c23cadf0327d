//! # Instrument Performance
//!
//! $$
//! R^{tot}=\prod_t(1+r_t)-1,\qquad \mu^{ann}=252\,\bar r,\qquad \sigma^{ann}=\sqrt{252}\,s_r
//! $$
//!
//! Stand-alone risk/return profile of each instrument.

use statrs::statistics::Statistics;

use super::returns::ReturnPanel;
use super::statistics::sharpe_ratio;

#[derive(Clone, Debug)]
pub struct InstrumentPerformance {
  pub symbol: String,
  /// Compounded return over the whole panel.
  pub total_return: f64,
  pub annual_return: f64,
  pub annual_volatility: f64,
  /// `0` when the volatility is zero.
  pub sharpe: f64,
}

/// Growth of one unit invested at the start; missing returns leave the value unchanged.
pub fn cumulative_returns(returns: &[f64]) -> Vec<f64> {
  let mut acc = 1.0;
  returns
    .iter()
    .map(|r| {
      if r.is_finite() {
        acc *= 1.0 + r;
      }
      acc
    })
    .collect()
}

/// Per-instrument metrics over the non-missing returns of each column.
pub fn instrument_performance(
  panel: &ReturnPanel,
  annualization_factor: f64,
  risk_free: f64,
) -> Vec<InstrumentPerformance> {
  panel
    .symbols()
    .iter()
    .enumerate()
    .map(|(j, symbol)| {
      let returns = panel.finite_column(j);
      let total_return = cumulative_returns(&returns).last().copied().unwrap_or(1.0) - 1.0;

      let (mean, std) = if returns.len() >= 2 {
        (returns.iter().mean(), returns.iter().std_dev())
      } else {
        (returns.first().copied().unwrap_or(0.0), 0.0)
      };
      let annual_return = mean * annualization_factor;
      let annual_volatility = std * annualization_factor.sqrt();

      InstrumentPerformance {
        symbol: symbol.clone(),
        total_return,
        annual_return,
        annual_volatility,
        sharpe: sharpe_ratio(annual_return, annual_volatility, risk_free),
      }
    })
    .collect()
}
