//! # Price Panel
//!
//! $$
//! \mathcal P=\{(s,\ (d_t,O_t,H_t,L_t,C_t,V_t)_{t=1}^{n_s})\}_{s\in\mathcal S},\qquad d_1<d_2<\dots<d_{n_s}
//! $$
//!
//! Canonical OHLC(+volume) schema handed to the core by the ingestion layer.

use std::collections::HashSet;

use chrono::NaiveDate;

use crate::error::Result;
use crate::error::RiskError;

/// One trading day.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PriceBar {
  pub date: NaiveDate,
  pub open: f64,
  pub high: f64,
  pub low: f64,
  pub close: f64,
  pub volume: Option<f64>,
}

impl PriceBar {
  /// Bar carrying only a close; open/high/low are set to the close.
  pub fn from_close(date: NaiveDate, close: f64) -> Self {
    Self {
      date,
      open: close,
      high: close,
      low: close,
      close,
      volume: None,
    }
  }
}

/// Date-ordered history of a single instrument.
#[derive(Clone, Debug)]
pub struct PriceSeries {
  symbol: String,
  bars: Vec<PriceBar>,
}

impl PriceSeries {
  /// Build a series, rejecting out-of-order or duplicate dates.
  pub fn new(symbol: impl Into<String>, bars: Vec<PriceBar>) -> Result<Self> {
    let symbol = symbol.into();
    if let Some(w) = bars.windows(2).find(|w| w[1].date <= w[0].date) {
      return Err(RiskError::InvalidPanel(format!(
        "{symbol}: dates must be strictly increasing ({} followed by {})",
        w[0].date, w[1].date
      )));
    }
    Ok(Self { symbol, bars })
  }

  /// Close-only series on consecutive calendar days starting at `start`.
  pub fn from_closes(symbol: impl Into<String>, start: NaiveDate, closes: &[f64]) -> Result<Self> {
    let bars = start
      .iter_days()
      .zip(closes.iter())
      .map(|(date, &close)| PriceBar::from_close(date, close))
      .collect();
    Self::new(symbol, bars)
  }

  pub fn symbol(&self) -> &str {
    &self.symbol
  }

  pub fn bars(&self) -> &[PriceBar] {
    &self.bars
  }

  pub fn len(&self) -> usize {
    self.bars.len()
  }

  pub fn is_empty(&self) -> bool {
    self.bars.is_empty()
  }

  pub fn dates(&self) -> Vec<NaiveDate> {
    self.bars.iter().map(|b| b.date).collect()
  }

  pub fn closes(&self) -> Vec<f64> {
    self.bars.iter().map(|b| b.close).collect()
  }

  pub fn first_date(&self) -> Option<NaiveDate> {
    self.bars.first().map(|b| b.date)
  }

  pub fn last_date(&self) -> Option<NaiveDate> {
    self.bars.last().map(|b| b.date)
  }
}

/// Instrument histories in a fixed instrument order.
#[derive(Clone, Debug, Default)]
pub struct PricePanel {
  series: Vec<PriceSeries>,
}

impl PricePanel {
  pub fn new(series: Vec<PriceSeries>) -> Result<Self> {
    let mut seen = HashSet::with_capacity(series.len());
    for s in &series {
      if !seen.insert(s.symbol()) {
        return Err(RiskError::InvalidPanel(format!(
          "duplicate instrument {}",
          s.symbol()
        )));
      }
    }
    Ok(Self { series })
  }

  pub fn series(&self) -> &[PriceSeries] {
    &self.series
  }

  pub fn symbols(&self) -> Vec<String> {
    self.series.iter().map(|s| s.symbol().to_string()).collect()
  }

  pub fn get(&self, symbol: &str) -> Option<&PriceSeries> {
    self.series.iter().find(|s| s.symbol() == symbol)
  }

  pub fn len(&self) -> usize {
    self.series.len()
  }

  pub fn is_empty(&self) -> bool {
    self.series.is_empty()
  }
}
