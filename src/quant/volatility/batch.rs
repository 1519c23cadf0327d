//! # Batch Volatility
//!
//! $$
//! \{\hat\theta_i\}_{i=1}^K,\qquad \hat\sigma_{i,T+h},\ h=1,\dots,H
//! $$
//!
//! Fits GARCH(1,1) to every instrument of a return panel in parallel. Per-instrument failures are
//! collected, never propagated; when nothing could be fitted a rolling volatility is attached.

use rayon::prelude::*;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::garch::GarchFailureReason;
use super::garch::GarchFit;
use super::garch::GarchFitter;
use super::rolling::RollingVolatility;
use crate::config::GarchConfig;
use crate::config::MAX_FORECAST_HORIZON;
use crate::error::Result;
use crate::error::RiskError;
use crate::quant::portfolio::ReturnPanel;

/// Terminal state of one instrument's fit.
#[derive(Clone, Debug)]
pub enum GarchOutcome {
  Fitted(GarchFit),
  Failed(GarchFailureReason),
}

impl GarchOutcome {
  pub fn fit(&self) -> Option<&GarchFit> {
    match self {
      Self::Fitted(fit) => Some(fit),
      Self::Failed(_) => None,
    }
  }

  pub fn failure(&self) -> Option<&GarchFailureReason> {
    match self {
      Self::Fitted(_) => None,
      Self::Failed(reason) => Some(reason),
    }
  }
}

#[derive(Clone, Debug)]
pub struct InstrumentVolatility {
  pub symbol: String,
  pub outcome: GarchOutcome,
  /// Daily forecast volatilities for `1..=horizon`; empty when the fit failed.
  pub forecast: Vec<f64>,
}

/// First and last forecast day of one instrument.
#[derive(Clone, Debug, PartialEq)]
pub struct ForecastSummary {
  pub symbol: String,
  pub first_day: f64,
  pub last_day: f64,
  /// `100 (last / first - 1)`.
  pub change_pct: f64,
}

#[derive(Clone, Debug)]
pub struct VolatilityReport {
  /// One entry per panel instrument, in panel order.
  pub instruments: Vec<InstrumentVolatility>,
  pub horizon: usize,
  /// Present only when no instrument could be fitted.
  pub fallback: Option<RollingVolatility>,
}

impl VolatilityReport {
  pub fn fitted(&self) -> impl Iterator<Item = (&str, &GarchFit)> {
    self
      .instruments
      .iter()
      .filter_map(|i| i.outcome.fit().map(|f| (i.symbol.as_str(), f)))
  }

  pub fn failures(&self) -> impl Iterator<Item = (&str, &GarchFailureReason)> {
    self
      .instruments
      .iter()
      .filter_map(|i| i.outcome.failure().map(|r| (i.symbol.as_str(), r)))
  }

  pub fn n_fitted(&self) -> usize {
    self.fitted().count()
  }

  pub fn forecast_summary(&self) -> Vec<ForecastSummary> {
    self
      .instruments
      .iter()
      .filter_map(|i| {
        let first_day = *i.forecast.first()?;
        let last_day = *i.forecast.last()?;
        let change_pct = if first_day > 0.0 {
          100.0 * (last_day / first_day - 1.0)
        } else {
          0.0
        };
        Some(ForecastSummary {
          symbol: i.symbol.clone(),
          first_day,
          last_day,
          change_pct,
        })
      })
      .collect()
  }
}

/// Parallel per-instrument GARCH fitting with a rolling fallback.
#[derive(Clone, Debug)]
pub struct GarchBatch {
  fitter: GarchFitter,
  horizon: usize,
  rolling_window: usize,
  annualization_factor: f64,
}

impl GarchBatch {
  pub fn new(
    config: GarchConfig,
    horizon: usize,
    rolling_window: usize,
    annualization_factor: f64,
  ) -> Result<Self> {
    config.validate()?;
    if !(1..=MAX_FORECAST_HORIZON).contains(&horizon) {
      return Err(RiskError::config(format!(
        "forecast horizon must be within 1..={MAX_FORECAST_HORIZON}, got {horizon}"
      )));
    }
    Ok(Self {
      fitter: GarchFitter::new(config),
      horizon,
      rolling_window,
      annualization_factor,
    })
  }

  pub fn horizon(&self) -> usize {
    self.horizon
  }

  pub fn fit_panel(&self, panel: &ReturnPanel) -> Result<VolatilityReport> {
    if panel.n_assets() == 0 {
      return Err(RiskError::EmptyPanel);
    }

    let columns: Vec<(String, Vec<f64>)> = panel
      .symbols()
      .iter()
      .enumerate()
      .map(|(j, s)| (s.clone(), panel.finite_column(j)))
      .collect();

    // Results come back in panel order regardless of scheduling.
    let instruments: Vec<InstrumentVolatility> = columns
      .into_par_iter()
      .map(|(symbol, returns)| {
        let outcome = match self.fitter.fit(&returns) {
          Ok(fit) => GarchOutcome::Fitted(fit),
          Err(reason) => GarchOutcome::Failed(reason),
        };
        let forecast = outcome
          .fit()
          .map(|f| f.forecast(self.horizon))
          .unwrap_or_default();
        InstrumentVolatility {
          symbol,
          outcome,
          forecast,
        }
      })
      .collect();

    for i in &instruments {
      match &i.outcome {
        GarchOutcome::Fitted(fit) => debug!(
          "{}: alpha={:.4} beta={:.4} persistence={:.4} ({} iterations)",
          i.symbol,
          fit.params.alpha,
          fit.params.beta,
          fit.persistence(),
          fit.iterations
        ),
        GarchOutcome::Failed(reason) => warn!("{}: GARCH fit failed: {}", i.symbol, reason),
      }
    }

    let n_fitted = instruments.iter().filter(|i| i.outcome.fit().is_some()).count();
    info!(
      "GARCH(1,1): {} of {} instruments fitted",
      n_fitted,
      instruments.len()
    );

    let fallback = if n_fitted == 0 {
      warn!(
        "no GARCH model fitted, falling back to {}-day rolling volatility",
        self.rolling_window
      );
      Some(RollingVolatility::from_panel(
        panel,
        self.rolling_window,
        self.annualization_factor,
      )?)
    } else {
      None
    };

    Ok(VolatilityReport {
      instruments,
      horizon: self.horizon,
      fallback,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;
  use rand::rngs::StdRng;
  use rand::SeedableRng;
  use tracing_test::traced_test;

  use super::*;
  use crate::quant::volatility::Garch11Params;

  fn garch_returns(n: usize, seed: u64) -> Vec<f64> {
    Garch11Params {
      mu: 0.0003,
      omega: 2e-6,
      alpha: 0.08,
      beta: 0.9,
    }
    .simulate(n, &mut StdRng::seed_from_u64(seed))
  }

  fn panel(symbols: &[&str], columns: &[Vec<f64>]) -> ReturnPanel {
    let start = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
    ReturnPanel::from_columns(symbols, start, columns).unwrap()
  }

  fn batch() -> GarchBatch {
    GarchBatch::new(GarchConfig::default(), 10, 30, 252.0).unwrap()
  }

  #[test]
  #[traced_test]
  fn constant_instrument_fails_others_fit() {
    let p = panel(
      &["VOL", "FLAT", "VOL2"],
      &[garch_returns(600, 1), vec![0.0; 600], garch_returns(600, 2)],
    );
    let report = batch().fit_panel(&p).unwrap();

    let symbols: Vec<&str> = report.instruments.iter().map(|i| i.symbol.as_str()).collect();
    assert_eq!(symbols, ["VOL", "FLAT", "VOL2"]);
    assert_eq!(report.n_fitted(), 2);
    assert!(report.fallback.is_none());

    let failures: Vec<_> = report.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, "FLAT");
    assert!(failures[0].1.to_string().starts_with("low variability"));
    assert!(logs_contain("FLAT: GARCH fit failed: low variability"));
  }

  #[test]
  fn short_panel_falls_back_to_rolling() {
    let short: Vec<f64> = garch_returns(60, 3);
    let p = panel(&["A", "B"], &[short.clone(), short.iter().map(|r| -r).collect()]);
    let report = batch().fit_panel(&p).unwrap();

    assert_eq!(report.n_fitted(), 0);
    for (_, reason) in report.failures() {
      assert!(reason.to_string().starts_with("insufficient data"));
    }
    let fallback = report.fallback.as_ref().expect("rolling fallback");
    assert_eq!(fallback.values.len(), 2);
    assert!(fallback.values[0][29].is_some());
    assert!(fallback.values[0][28].is_none());
    assert!(report.forecast_summary().is_empty());
  }

  #[test]
  fn forecasts_have_requested_horizon() {
    let p = panel(&["A"], &[garch_returns(800, 5)]);
    let report = GarchBatch::new(GarchConfig::default(), 30, 30, 252.0)
      .unwrap()
      .fit_panel(&p)
      .unwrap();

    assert_eq!(report.instruments[0].forecast.len(), 30);
    let summary = report.forecast_summary();
    assert_eq!(summary.len(), 1);
    let s = &summary[0];
    assert_eq!(s.first_day, report.instruments[0].forecast[0]);
    assert_eq!(s.last_day, report.instruments[0].forecast[29]);
    assert!((s.change_pct - 100.0 * (s.last_day / s.first_day - 1.0)).abs() < 1e-9);
  }

  #[test]
  fn horizon_out_of_range_is_rejected() {
    assert!(GarchBatch::new(GarchConfig::default(), 0, 30, 252.0).is_err());
    assert!(GarchBatch::new(GarchConfig::default(), 31, 30, 252.0).is_err());
  }
}
