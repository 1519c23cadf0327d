//! # Monte-Carlo Frontier Sampler
//!
//! $$
//! \mathbf w^{(n)}=\frac{\mathbf u^{(n)}}{\mathbf 1^\top\mathbf u^{(n)}},\quad u_i^{(n)}\sim U(0,1)
//! \qquad\text{or}\qquad \mathbf w^{(n)}\sim\operatorname{Dir}(\mathbf 1)
//! $$
//!
//! Random long-only, fully invested portfolios scored through [`PortfolioStatistics`].

use rand::Rng;
use rand_distr::Distribution;
use rand_distr::Exp1;
use tracing::info;

use super::statistics::sharpe_ratio;
use super::statistics::PortfolioStatistics;
use super::types::SampleRecord;
use crate::config::SimplexSampling;
use crate::error::Result;
use crate::error::RiskError;

/// Column of a [`SampleRecord`] the population can be ranked by.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleMetric {
  Volatility,
  Return,
  Sharpe,
}

impl SampleMetric {
  fn of(self, record: &SampleRecord) -> f64 {
    match self {
      Self::Volatility => record.volatility,
      Self::Return => record.expected_return,
      Self::Sharpe => record.sharpe,
    }
  }
}

/// Every sampled portfolio in draw order.
#[derive(Clone, Debug, Default)]
pub struct SamplePopulation {
  symbols: Vec<String>,
  records: Vec<SampleRecord>,
}

impl SamplePopulation {
  pub fn new(symbols: Vec<String>, records: Vec<SampleRecord>) -> Self {
    Self { symbols, records }
  }

  pub fn symbols(&self) -> &[String] {
    &self.symbols
  }

  pub fn records(&self) -> &[SampleRecord] {
    &self.records
  }

  pub fn get(&self, index: usize) -> Option<&SampleRecord> {
    self.records.get(index)
  }

  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }

  pub fn column(&self, metric: SampleMetric) -> Vec<f64> {
    self.records.iter().map(|r| metric.of(r)).collect()
  }

  /// Indices ordered by `metric`; equal values keep draw order.
  pub fn ranked_by(&self, metric: SampleMetric, descending: bool) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..self.records.len()).collect();
    idx.sort_by(|&a, &b| {
      let ord = metric.of(&self.records[a]).total_cmp(&metric.of(&self.records[b]));
      if descending {
        ord.reverse()
      } else {
        ord
      }
    });
    idx
  }
}

/// Draws and scores random weight vectors.
#[derive(Clone, Debug)]
pub struct FrontierSampler {
  sample_count: usize,
  sampling: SimplexSampling,
  risk_free: f64,
}

impl FrontierSampler {
  pub fn new(sample_count: usize, sampling: SimplexSampling, risk_free: f64) -> Result<Self> {
    if sample_count == 0 {
      return Err(RiskError::config("sample count must be positive"));
    }
    Ok(Self {
      sample_count,
      sampling,
      risk_free,
    })
  }

  pub fn sample_count(&self) -> usize {
    self.sample_count
  }

  /// One long-only weight vector of length `k` summing to one.
  ///
  /// [`SimplexSampling::NormalizedUniform`] over-weights interior allocations; use
  /// [`SimplexSampling::UniformSimplex`] for a uniform draw.
  pub fn draw_weights<R: Rng + ?Sized>(k: usize, sampling: SimplexSampling, rng: &mut R) -> Vec<f64> {
    let mut w: Vec<f64> = match sampling {
      SimplexSampling::NormalizedUniform => (0..k).map(|_| rng.gen::<f64>()).collect(),
      SimplexSampling::UniformSimplex => (0..k)
        .map(|_| Distribution::<f64>::sample(&Exp1, &mut *rng))
        .collect(),
    };

    let total: f64 = w.iter().sum();
    if total > 0.0 && total.is_finite() {
      w.iter_mut().for_each(|x| *x /= total);
    } else {
      w = vec![1.0 / k as f64; k];
    }
    w
  }

  /// Score `sample_count` random portfolios. The generator is injected so a seeded
  /// [`rand::rngs::StdRng`] reproduces the population exactly.
  pub fn sample<R: Rng + ?Sized>(
    &self,
    stats: &PortfolioStatistics,
    rng: &mut R,
  ) -> Result<SamplePopulation> {
    let k = stats.n_assets();
    if k == 0 {
      return Err(RiskError::EmptyPanel);
    }

    info!(
      "sampling {} random portfolios over {} instruments ({:?})",
      self.sample_count, k, self.sampling
    );

    let mut records = Vec::with_capacity(self.sample_count);
    for _ in 0..self.sample_count {
      let weights = Self::draw_weights(k, self.sampling, rng);
      let (volatility, expected_return) = stats.evaluate(&weights)?;
      records.push(SampleRecord {
        volatility,
        expected_return,
        sharpe: sharpe_ratio(expected_return, volatility, self.risk_free),
        weights,
      });
    }

    Ok(SamplePopulation::new(stats.symbols().to_vec(), records))
  }
}
