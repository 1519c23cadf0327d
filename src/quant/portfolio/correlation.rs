//! # Correlation Analysis
//!
//! $$
//! \rho_{ij}=\frac{\sum_t (r_{ti}-\bar r_i)(r_{tj}-\bar r_j)}
//! {\sqrt{\sum_t (r_{ti}-\bar r_i)^2\sum_t (r_{tj}-\bar r_j)^2}}
//! $$
//!
//! Pearson correlation of the return panel and the pair signals used for diversification
//! guidance.

use ndarray::Array2;
use ndarray::ArrayView1;
use tracing::info;

use super::returns::ReturnPanel;
use crate::config::CorrelationThresholds;
use crate::error::Result;
use crate::error::RiskError;

fn pearson(x: ArrayView1<f64>, y: ArrayView1<f64>) -> f64 {
  let n = x.len().min(y.len());
  if n < 2 {
    return 0.0;
  }

  let mx = x.sum() / n as f64;
  let my = y.sum() / n as f64;

  let mut cov = 0.0;
  let mut sx = 0.0;
  let mut sy = 0.0;

  for i in 0..n {
    let dx = x[i] - mx;
    let dy = y[i] - my;
    cov += dx * dy;
    sx += dx * dx;
    sy += dy * dy;
  }

  let denom = (sx * sy).sqrt();
  if denom < 1e-15 {
    0.0
  } else {
    (cov / denom).clamp(-1.0, 1.0)
  }
}

/// Symmetric Pearson matrix of the columns of `data` with a unit diagonal.
///
/// A pair involving a constant column has no defined correlation and is reported as `0`.
pub fn correlation_matrix(data: &Array2<f64>) -> Array2<f64> {
  let n = data.ncols();
  let mut corr = Array2::<f64>::eye(n);

  for i in 0..n {
    for j in (i + 1)..n {
      let r = pearson(data.column(i), data.column(j));
      corr[[i, j]] = r;
      corr[[j, i]] = r;
    }
  }

  corr
}

/// Diversification signal of an instrument pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PairSignal {
  /// Risk concentration: avoid heavy allocation to both.
  StrongPositive,
  /// Natural hedge: the pair reduces portfolio risk.
  StrongNegative,
}

/// Classify one correlation against the thresholds; `None` means unremarkable.
pub fn classify(correlation: f64, thresholds: &CorrelationThresholds) -> Option<PairSignal> {
  if correlation > thresholds.strong_positive {
    Some(PairSignal::StrongPositive)
  } else if correlation < thresholds.strong_negative {
    Some(PairSignal::StrongNegative)
  } else {
    None
  }
}

/// Unordered pair `(i < j)` and its correlation.
#[derive(Clone, Debug, PartialEq)]
pub struct CorrelatedPair {
  pub first: String,
  pub second: String,
  pub correlation: f64,
  pub signal: Option<PairSignal>,
}

#[derive(Clone, Debug)]
pub struct CorrelationReport {
  pub symbols: Vec<String>,
  pub matrix: Array2<f64>,
  /// Every unordered pair in `(i, j)` lexicographic order.
  pub pairs: Vec<CorrelatedPair>,
  /// Mean correlation of each instrument with all the others.
  pub average: Vec<f64>,
}

impl CorrelationReport {
  pub fn strong_positive(&self) -> impl Iterator<Item = &CorrelatedPair> {
    self
      .pairs
      .iter()
      .filter(|p| p.signal == Some(PairSignal::StrongPositive))
  }

  pub fn strong_negative(&self) -> impl Iterator<Item = &CorrelatedPair> {
    self
      .pairs
      .iter()
      .filter(|p| p.signal == Some(PairSignal::StrongNegative))
  }

  /// Off-diagonal values, for distribution plots.
  pub fn pair_values(&self) -> Vec<f64> {
    self.pairs.iter().map(|p| p.correlation).collect()
  }
}

#[derive(Clone, Debug, Default)]
pub struct CorrelationAnalyzer {
  thresholds: CorrelationThresholds,
}

impl CorrelationAnalyzer {
  pub fn new(thresholds: CorrelationThresholds) -> Self {
    Self { thresholds }
  }

  /// Correlate the complete rows of `panel` and flag strong pairs.
  pub fn analyze(&self, panel: &ReturnPanel) -> Result<CorrelationReport> {
    if panel.n_assets() == 0 {
      return Err(RiskError::EmptyPanel);
    }
    let data = panel.complete_rows();
    if data.nrows() < 2 {
      return Err(RiskError::insufficient("correlation", 2, data.nrows()));
    }

    let matrix = correlation_matrix(&data);
    let symbols = panel.symbols().to_vec();
    let n = symbols.len();

    let mut pairs = Vec::with_capacity(n * n.saturating_sub(1) / 2);
    for i in 0..n {
      for j in (i + 1)..n {
        let correlation = matrix[[i, j]];
        pairs.push(CorrelatedPair {
          first: symbols[i].clone(),
          second: symbols[j].clone(),
          correlation,
          signal: classify(correlation, &self.thresholds),
        });
      }
    }

    let average = (0..n)
      .map(|i| {
        if n < 2 {
          return 0.0;
        }
        let others: f64 = (0..n).filter(|&j| j != i).map(|j| matrix[[i, j]]).sum();
        others / (n - 1) as f64
      })
      .collect();

    let report = CorrelationReport {
      symbols,
      matrix,
      pairs,
      average,
    };
    info!(
      "correlation: {} strong positive, {} strong negative pairs",
      report.strong_positive().count(),
      report.strong_negative().count()
    );
    Ok(report)
  }
}
