//! # Frontier Selection
//!
//! $$
//! n^\*_{S}=\arg\max_n S^{(n)},\qquad n^\*_{\sigma}=\arg\min_n \sigma^{(n)},\qquad D(\mathbf w)=1-\max_i w_i
//! $$
//!
//! Picks the max-Sharpe and min-volatility portfolios out of a sampled population.

use tracing::info;

use super::sampler::SamplePopulation;
use super::types::FrontierPick;
use super::types::Holding;
use super::types::PortfolioProfile;
use super::types::Recommendation;
use super::types::SampleRecord;
use crate::error::Result;
use crate::error::RiskError;

fn first_extreme(
  population: &SamplePopulation,
  key: impl Fn(&SampleRecord) -> f64,
  better: impl Fn(f64, f64) -> bool,
) -> Option<(usize, &SampleRecord)> {
  let mut best: Option<(usize, &SampleRecord)> = None;
  for (i, r) in population.records().iter().enumerate() {
    let v = key(r);
    if v.is_nan() {
      continue;
    }
    let replace = match best {
      Some((_, b)) => better(v, key(b)),
      None => true,
    };
    if replace {
      best = Some((i, r));
    }
  }
  best
}

/// Greatest Sharpe ratio; the earliest draw wins ties.
pub fn max_sharpe(population: &SamplePopulation) -> Option<(usize, &SampleRecord)> {
  first_extreme(population, |r| r.sharpe, |a, b| a > b)
}

/// Smallest volatility; the earliest draw wins ties.
pub fn min_volatility(population: &SamplePopulation) -> Option<(usize, &SampleRecord)> {
  first_extreme(population, |r| r.volatility, |a, b| a < b)
}

/// `1 - max(w)`.
///
/// Only a concentration-inverse proxy: it looks at the single largest position and ignores how
/// the rest is spread (unlike a Herfindahl index).
pub fn diversification(weights: &[f64]) -> f64 {
  let max = weights.iter().copied().fold(f64::NEG_INFINITY, f64::max);
  if max.is_finite() {
    1.0 - max
  } else {
    0.0
  }
}

/// The `k` heaviest holdings, heaviest first; equal weights keep instrument order.
pub fn top_k_holdings(symbols: &[String], weights: &[f64], k: usize) -> Vec<Holding> {
  let mut holdings: Vec<Holding> = symbols
    .iter()
    .zip(weights.iter())
    .map(|(s, &w)| Holding {
      symbol: s.clone(),
      weight: w,
    })
    .collect();
  holdings.sort_by(|a, b| b.weight.total_cmp(&a.weight));
  holdings.truncate(k);
  holdings
}

/// Builds profiles and the allocation recommendation.
#[derive(Clone, Debug)]
pub struct FrontierSelector {
  top_holdings: usize,
  sharpe_threshold: f64,
}

impl FrontierSelector {
  pub fn new(top_holdings: usize, sharpe_threshold: f64) -> Self {
    Self {
      top_holdings,
      sharpe_threshold,
    }
  }

  pub fn profile(&self, population: &SamplePopulation, pick: FrontierPick) -> Result<PortfolioProfile> {
    let selected = match pick {
      FrontierPick::MaxSharpe => max_sharpe(population),
      FrontierPick::MinVolatility => min_volatility(population),
    };
    let (index, record) =
      selected.ok_or_else(|| RiskError::insufficient("frontier selection", 1, population.len()))?;

    Ok(PortfolioProfile {
      pick,
      index,
      record: record.clone(),
      diversification: diversification(&record.weights),
      top_holdings: top_k_holdings(population.symbols(), &record.weights, self.top_holdings),
    })
  }

  /// Max-Sharpe when its ratio clears the threshold, otherwise min-volatility.
  pub fn recommend(&self, max_sharpe: &PortfolioProfile) -> Recommendation {
    let sharpe = max_sharpe.record.sharpe;
    let pick = if sharpe > self.sharpe_threshold {
      FrontierPick::MaxSharpe
    } else {
      FrontierPick::MinVolatility
    };
    info!(
      "recommending {:?} (max Sharpe {:.3} vs threshold {:.2})",
      pick, sharpe, self.sharpe_threshold
    );

    Recommendation {
      pick,
      sharpe,
      threshold: self.sharpe_threshold,
    }
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;

  use super::*;

  fn rec(volatility: f64, sharpe: f64, weights: Vec<f64>) -> SampleRecord {
    SampleRecord {
      volatility,
      expected_return: sharpe * volatility,
      sharpe,
      weights,
    }
  }

  fn population() -> SamplePopulation {
    SamplePopulation::new(
      vec!["A".into(), "B".into(), "C".into()],
      vec![
        rec(0.20, 0.8, vec![0.2, 0.3, 0.5]),
        rec(0.10, 1.2, vec![0.6, 0.2, 0.2]),
        rec(0.10, 1.2, vec![0.1, 0.8, 0.1]),
        rec(0.30, f64::NAN, vec![0.3, 0.3, 0.4]),
      ],
    )
  }

  #[test]
  fn extremes_break_ties_by_first_occurrence() {
    let pop = population();
    assert_eq!(max_sharpe(&pop).map(|(i, _)| i), Some(1));
    assert_eq!(min_volatility(&pop).map(|(i, _)| i), Some(1));
    assert!(max_sharpe(&SamplePopulation::default()).is_none());
  }

  #[test]
  fn diversification_is_one_minus_max_weight() {
    assert_abs_diff_eq!(diversification(&[0.2, 0.3, 0.5]), 0.5, epsilon = 1e-12);
    assert_abs_diff_eq!(diversification(&[1.0, 0.0]), 0.0, epsilon = 1e-12);
  }

  #[test]
  fn top_holdings_sorted_with_stable_ties() {
    let symbols: Vec<String> = ["A", "B", "C", "D"].iter().map(|s| s.to_string()).collect();
    let top = top_k_holdings(&symbols, &[0.3, 0.1, 0.3, 0.3], 3);
    let names: Vec<&str> = top.iter().map(|h| h.symbol.as_str()).collect();
    assert_eq!(names, vec!["A", "C", "D"]);
  }

  #[test]
  fn profiles_and_recommendation() {
    let pop = population();
    let selector = FrontierSelector::new(2, 0.5);

    let best = selector.profile(&pop, FrontierPick::MaxSharpe).unwrap();
    assert_eq!(best.index, 1);
    assert_eq!(best.top_holdings[0].symbol, "A");
    assert_abs_diff_eq!(best.diversification, 0.4, epsilon = 1e-12);
    assert_eq!(selector.recommend(&best).pick, FrontierPick::MaxSharpe);

    let cautious = FrontierSelector::new(2, 2.0);
    assert_eq!(cautious.recommend(&best).pick, FrontierPick::MinVolatility);
  }

  #[test]
  fn empty_population_cannot_be_profiled() {
    let selector = FrontierSelector::new(3, 0.5);
    let err = selector
      .profile(&SamplePopulation::default(), FrontierPick::MinVolatility)
      .unwrap_err();
    assert!(matches!(err, RiskError::DataInsufficiency { .. }));
  }
}
