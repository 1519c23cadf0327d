//! # Portfolio Types
//!
//! $$
//! (\sigma_p,\ \mu_p,\ S_p=\tfrac{\mu_p-r_f}{\sigma_p},\ \mathbf w)
//! $$
//!
//! Records shared by the sampler, the selector and the pipeline report.

/// One scored random portfolio.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleRecord {
  /// Annualized portfolio volatility.
  pub volatility: f64,
  /// Annualized expected return.
  pub expected_return: f64,
  /// Sharpe ratio of the two above.
  pub sharpe: f64,
  /// Long-only, fully invested weights in instrument order.
  pub weights: Vec<f64>,
}

/// Instrument and its weight in a selected portfolio.
#[derive(Clone, Debug, PartialEq)]
pub struct Holding {
  pub symbol: String,
  pub weight: f64,
}

/// Which frontier portfolio a selection refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrontierPick {
  MaxSharpe,
  MinVolatility,
}

/// A selected frontier portfolio with its concentration diagnostics.
#[derive(Clone, Debug)]
pub struct PortfolioProfile {
  pub pick: FrontierPick,
  /// Position of the record in the sampled population.
  pub index: usize,
  pub record: SampleRecord,
  /// `1 - max(w)`.
  pub diversification: f64,
  /// Largest holdings, heaviest first.
  pub top_holdings: Vec<Holding>,
}

/// Allocation suggested from the two frontier picks.
#[derive(Clone, Debug)]
pub struct Recommendation {
  pub pick: FrontierPick,
  /// Max-Sharpe ratio compared against the threshold.
  pub sharpe: f64,
  pub threshold: f64,
}
