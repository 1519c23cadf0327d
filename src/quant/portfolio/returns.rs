//! # Return Series
//!
//! $$
//! r_0=0,\qquad r_t=\frac{C_t-C_{t-1}}{C_{t-1}},\ t>0
//! $$
//!
//! Simple returns per instrument and the aligned `T x K` return panel every downstream
//! component reads.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use ndarray::Array2;
use ndarray::ArrayView1;
use ndarray::Axis;
use tracing::warn;

use crate::config::AlignmentPolicy;
use crate::data::PricePanel;
use crate::data::PriceSeries;
use crate::error::Result;
use crate::error::RiskError;

/// Simple returns of a close series, same length as the input.
///
/// The first return is `0`. A return whose previous close is zero, or where either close is
/// not finite, is undefined and reported as `NaN` (missing) rather than silently zeroed.
pub fn simple_returns(closes: &[f64]) -> Vec<f64> {
  let mut out = Vec::with_capacity(closes.len());
  if closes.is_empty() {
    return out;
  }

  out.push(0.0);
  for w in closes.windows(2) {
    let (prev, curr) = (w[0], w[1]);
    if prev == 0.0 || !prev.is_finite() || !curr.is_finite() {
      out.push(f64::NAN);
    } else {
      out.push((curr - prev) / prev);
    }
  }
  out
}

fn series_returns(series: &PriceSeries, closes: &[f64]) -> Vec<f64> {
  let returns = simple_returns(closes);
  let undefined = returns.iter().filter(|r| r.is_nan()).count();
  if undefined > 0 {
    warn!(
      "{}: {} undefined returns (zero or non-finite previous close) left missing",
      series.symbol(),
      undefined
    );
  }
  returns
}

/// Aligned return panel: rows are dates, columns are instruments. Missing values are `NaN`.
#[derive(Clone, Debug)]
pub struct ReturnPanel {
  symbols: Vec<String>,
  dates: Vec<NaiveDate>,
  values: Array2<f64>,
}

impl ReturnPanel {
  pub fn new(symbols: Vec<String>, dates: Vec<NaiveDate>, values: Array2<f64>) -> Result<Self> {
    if values.ncols() != symbols.len() {
      return Err(RiskError::InvalidPanel(format!(
        "{} columns for {} instruments",
        values.ncols(),
        symbols.len()
      )));
    }
    if values.nrows() != dates.len() {
      return Err(RiskError::InvalidPanel(format!(
        "{} rows for {} dates",
        values.nrows(),
        dates.len()
      )));
    }
    if dates.windows(2).any(|w| w[1] <= w[0]) {
      return Err(RiskError::InvalidPanel(
        "return panel dates must be strictly increasing".into(),
      ));
    }
    Ok(Self {
      symbols,
      dates,
      values,
    })
  }

  /// Assemble equal-length return columns on consecutive calendar days from `start`.
  pub fn from_columns(symbols: &[&str], start: NaiveDate, columns: &[Vec<f64>]) -> Result<Self> {
    let n_obs = columns.first().map(|c| c.len()).unwrap_or(0);
    if columns.iter().any(|c| c.len() != n_obs) {
      return Err(RiskError::InvalidPanel(
        "return columns must have equal length".into(),
      ));
    }

    let values = Array2::from_shape_fn((n_obs, columns.len()), |(t, j)| columns[j][t]);
    let dates = start.iter_days().take(n_obs).collect();
    Self::new(symbols.iter().map(|s| s.to_string()).collect(), dates, values)
  }

  /// Derive returns from a price panel under the given alignment policy.
  pub fn from_prices(panel: &PricePanel, policy: AlignmentPolicy) -> Result<Self> {
    if panel.is_empty() || panel.series().iter().any(|s| s.is_empty()) {
      return Err(RiskError::EmptyPanel);
    }

    let result = match policy {
      AlignmentPolicy::Intersection => Self::intersection(panel),
      AlignmentPolicy::Union => Self::union(panel),
    }?;

    if result.n_obs() == 0 {
      return Err(RiskError::EmptyPanel);
    }
    Ok(result)
  }

  fn intersection(panel: &PricePanel) -> Result<Self> {
    let series = panel.series();
    let dates: Vec<NaiveDate> = series[0]
      .dates()
      .into_iter()
      .filter(|d| {
        series[1..]
          .iter()
          .all(|s| s.bars().binary_search_by_key(d, |b| b.date).is_ok())
      })
      .collect();

    let mut values = Array2::<f64>::zeros((dates.len(), series.len()));
    for (j, s) in series.iter().enumerate() {
      let closes: Vec<f64> = dates
        .iter()
        .filter_map(|d| {
          s.bars()
            .binary_search_by_key(d, |b| b.date)
            .ok()
            .map(|i| s.bars()[i].close)
        })
        .collect();
      for (t, r) in series_returns(s, &closes).into_iter().enumerate() {
        values[[t, j]] = r;
      }
    }

    Self::new(panel.symbols(), dates, values)
  }

  fn union(panel: &PricePanel) -> Result<Self> {
    let all: BTreeSet<NaiveDate> = panel.series().iter().flat_map(|s| s.dates()).collect();
    let dates: Vec<NaiveDate> = all.into_iter().collect();

    let mut values = Array2::<f64>::from_elem((dates.len(), panel.len()), f64::NAN);
    for (j, s) in panel.series().iter().enumerate() {
      let returns = series_returns(s, &s.closes());
      for (bar, r) in s.bars().iter().zip(returns) {
        if let Ok(t) = dates.binary_search(&bar.date) {
          values[[t, j]] = r;
        }
      }
    }

    Self::new(panel.symbols(), dates, values)
  }

  pub fn symbols(&self) -> &[String] {
    &self.symbols
  }

  pub fn dates(&self) -> &[NaiveDate] {
    &self.dates
  }

  pub fn values(&self) -> &Array2<f64> {
    &self.values
  }

  /// Observations (rows).
  pub fn n_obs(&self) -> usize {
    self.values.nrows()
  }

  /// Instruments (columns).
  pub fn n_assets(&self) -> usize {
    self.values.ncols()
  }

  pub fn column(&self, j: usize) -> ArrayView1<'_, f64> {
    self.values.column(j)
  }

  /// Non-missing returns of instrument `j`, in date order.
  pub fn finite_column(&self, j: usize) -> Vec<f64> {
    self
      .values
      .column(j)
      .iter()
      .copied()
      .filter(|r| r.is_finite())
      .collect()
  }

  /// Rows where every instrument has a finite return (listwise deletion).
  pub fn complete_rows(&self) -> Array2<f64> {
    let keep: Vec<usize> = self
      .values
      .axis_iter(Axis(0))
      .enumerate()
      .filter(|(_, row)| row.iter().all(|r| r.is_finite()))
      .map(|(t, _)| t)
      .collect();
    self.values.select(Axis(0), &keep)
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;

  use super::*;
  use crate::data::PriceBar;

  fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
  }

  #[test]
  fn first_return_is_zero_and_rest_are_pct_changes() {
    let r = simple_returns(&[100.0, 110.0, 99.0]);
    assert_eq!(r.len(), 3);
    assert_eq!(r[0], 0.0);
    assert_abs_diff_eq!(r[1], 0.1, epsilon = 1e-12);
    assert_abs_diff_eq!(r[2], -0.1, epsilon = 1e-12);
  }

  #[test]
  fn zero_previous_close_yields_missing_return() {
    let r = simple_returns(&[1.0, 0.0, 2.0, 3.0]);
    assert_abs_diff_eq!(r[1], -1.0, epsilon = 1e-12);
    assert!(r[2].is_nan());
    assert_abs_diff_eq!(r[3], 0.5, epsilon = 1e-12);
  }

  #[test]
  fn empty_and_single_close() {
    assert!(simple_returns(&[]).is_empty());
    assert_eq!(simple_returns(&[5.0]), vec![0.0]);
  }

  fn gapped_panel() -> PricePanel {
    let a = PriceSeries::from_closes("A", day(1), &[10.0, 11.0, 12.0, 13.0]).unwrap();
    let b = PriceSeries::new(
      "B",
      vec![
        PriceBar::from_close(day(1), 20.0),
        PriceBar::from_close(day(3), 22.0),
        PriceBar::from_close(day(4), 11.0),
      ],
    )
    .unwrap();
    PricePanel::new(vec![a, b]).unwrap()
  }

  #[test]
  fn intersection_keeps_common_dates() {
    let panel = ReturnPanel::from_prices(&gapped_panel(), AlignmentPolicy::Intersection).unwrap();
    assert_eq!(panel.dates(), &[day(1), day(3), day(4)]);
    assert_eq!(panel.n_assets(), 2);
    // A is compared across the gap: 12 / 10 - 1.
    assert_abs_diff_eq!(panel.values()[[1, 0]], 0.2, epsilon = 1e-12);
    assert_abs_diff_eq!(panel.values()[[2, 1]], -0.5, epsilon = 1e-12);
  }

  #[test]
  fn union_leaves_gaps_missing() {
    let panel = ReturnPanel::from_prices(&gapped_panel(), AlignmentPolicy::Union).unwrap();
    assert_eq!(panel.n_obs(), 4);
    assert!(panel.values()[[1, 1]].is_nan());
    assert_eq!(panel.finite_column(1).len(), 3);
    assert_eq!(panel.complete_rows().nrows(), 3);
  }

  #[test]
  fn empty_panel_is_rejected() {
    let err = ReturnPanel::from_prices(&PricePanel::default(), AlignmentPolicy::Intersection)
      .unwrap_err();
    assert!(matches!(err, RiskError::EmptyPanel));
  }

  #[test]
  fn from_columns_checks_lengths() {
    let err = ReturnPanel::from_columns(&["A", "B"], day(1), &[vec![0.0, 0.1], vec![0.0]]);
    assert!(err.is_err());
  }
}
