//! # Risk Engine
//!
//! $$
//! P_{t,i}\ \to\ r_{t,i}\ \to\ (\mu,\Sigma)\ \to\ \{\mathbf w^{(n)}\}\ \to\ (\mathbf w^{\max S},\mathbf w^{\min\sigma}),
//! \qquad r_{t,i}\ \to\ (\rho,\ \hat\sigma_{i,T+h})
//! $$
//!
//! Single entry point running the whole basket analysis over an immutable price panel.

use rand::Rng;
use tracing::info;

use super::correlation::CorrelationAnalyzer;
use super::correlation::CorrelationReport;
use super::frontier::FrontierSelector;
use super::performance::InstrumentPerformance;
use super::performance::instrument_performance;
use super::returns::ReturnPanel;
use super::sampler::FrontierSampler;
use super::sampler::SamplePopulation;
use super::statistics::PortfolioStatistics;
use super::types::FrontierPick;
use super::types::PortfolioProfile;
use super::types::Recommendation;
use crate::config::AnalysisConfig;
use crate::data::PricePanel;
use crate::data::PriceSource;
use crate::error::Result;
use crate::quant::volatility::GarchBatch;
use crate::quant::volatility::RollingVolatility;
use crate::quant::volatility::VolatilityReport;

/// Sampled frontier and the portfolios picked from it.
#[derive(Clone, Debug)]
pub struct FrontierAnalysis {
  pub statistics: PortfolioStatistics,
  pub population: SamplePopulation,
  pub max_sharpe: PortfolioProfile,
  pub min_volatility: PortfolioProfile,
  pub recommendation: Recommendation,
}

impl FrontierAnalysis {
  /// Profile named by the recommendation.
  pub fn recommended(&self) -> &PortfolioProfile {
    match self.recommendation.pick {
      FrontierPick::MaxSharpe => &self.max_sharpe,
      FrontierPick::MinVolatility => &self.min_volatility,
    }
  }
}

/// Everything produced by one [`RiskEngine::analyze`] run.
#[derive(Clone, Debug)]
pub struct AnalysisReport {
  pub returns: ReturnPanel,
  pub performance: Vec<InstrumentPerformance>,
  pub frontier: FrontierAnalysis,
  pub correlation: CorrelationReport,
  pub volatility: VolatilityReport,
}

#[derive(Clone, Debug)]
pub struct RiskEngine {
  config: AnalysisConfig,
  sampler: FrontierSampler,
  selector: FrontierSelector,
  correlation: CorrelationAnalyzer,
  volatility: GarchBatch,
}

impl RiskEngine {
  /// Construct an engine; the configuration is validated once here.
  pub fn new(config: AnalysisConfig) -> Result<Self> {
    config.validate()?;
    Ok(Self {
      sampler: FrontierSampler::new(config.sample_count, config.sampling, config.risk_free)?,
      selector: FrontierSelector::new(config.top_holdings, config.recommendation_sharpe_threshold),
      correlation: CorrelationAnalyzer::new(config.correlation),
      volatility: GarchBatch::new(
        config.garch.clone(),
        config.forecast_horizon,
        config.rolling_window,
        config.annualization_factor,
      )?,
      config,
    })
  }

  pub fn config(&self) -> &AnalysisConfig {
    &self.config
  }

  /// Load a panel from `source` and analyze it.
  pub fn analyze_source<R: Rng + ?Sized>(
    &self,
    source: &dyn PriceSource,
    rng: &mut R,
  ) -> Result<AnalysisReport> {
    let panel = source.load_panel()?;
    self.analyze(&panel, rng)
  }

  /// Run the full pipeline. `rng` drives the Monte-Carlo sampler only, so a seeded generator
  /// makes the whole report reproducible.
  pub fn analyze<R: Rng + ?Sized>(&self, panel: &PricePanel, rng: &mut R) -> Result<AnalysisReport> {
    let returns = ReturnPanel::from_prices(panel, self.config.alignment)?;
    info!(
      "analyzing {} instruments over {} observations",
      returns.n_assets(),
      returns.n_obs()
    );

    let performance = instrument_performance(
      &returns,
      self.config.annualization_factor,
      self.config.risk_free,
    );
    let frontier = self.frontier(&returns, rng)?;
    let correlation = self.correlation.analyze(&returns)?;
    let volatility = self.fit_volatility(&returns)?;

    Ok(AnalysisReport {
      returns,
      performance,
      frontier,
      correlation,
      volatility,
    })
  }

  /// Moments, sampled population, both frontier picks and the recommendation.
  pub fn frontier<R: Rng + ?Sized>(&self, returns: &ReturnPanel, rng: &mut R) -> Result<FrontierAnalysis> {
    let statistics = PortfolioStatistics::from_panel(returns, self.config.annualization_factor)?;
    let population = self.sampler.sample(&statistics, rng)?;
    let max_sharpe = self.selector.profile(&population, FrontierPick::MaxSharpe)?;
    let min_volatility = self.selector.profile(&population, FrontierPick::MinVolatility)?;
    let recommendation = self.selector.recommend(&max_sharpe);

    Ok(FrontierAnalysis {
      statistics,
      population,
      max_sharpe,
      min_volatility,
      recommendation,
    })
  }

  /// Per-instrument GARCH(1,1) fits and forecasts.
  pub fn fit_volatility(&self, returns: &ReturnPanel) -> Result<VolatilityReport> {
    self.volatility.fit_panel(returns)
  }

  /// Rolling volatility of every instrument, independent of any GARCH outcome.
  pub fn rolling_fallback(&self, returns: &ReturnPanel) -> Result<RollingVolatility> {
    RollingVolatility::from_panel(
      returns,
      self.config.rolling_window,
      self.config.annualization_factor,
    )
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use chrono::NaiveDate;
  use nalgebra::DMatrix;
  use nalgebra::DVector;
  use rand::SeedableRng;
  use rand::rngs::StdRng;
  use rand_distr::Distribution;
  use rand_distr::Normal;

  use super::*;
  use crate::config::SimplexSampling;
  use crate::data::CachedSource;
  use crate::data::PriceSeries;
  use crate::data::RandomWalkSource;
  use crate::error::RiskError;

  const SYMBOLS: [&str; 6] = ["AAA", "BBB", "CCC", "DDD", "EEE", "FFF"];

  fn walk_panel() -> PricePanel {
    let source = RandomWalkSource::new(&SYMBOLS, 500, 42);
    source.load_panel().unwrap().as_ref().clone()
  }

  #[test]
  fn same_seed_reproduces_report() {
    let engine = RiskEngine::new(AnalysisConfig::default()).unwrap();
    let panel = walk_panel();

    let a = engine.analyze(&panel, &mut StdRng::seed_from_u64(42)).unwrap();
    let b = engine.analyze(&panel, &mut StdRng::seed_from_u64(42)).unwrap();

    assert_eq!(a.frontier.population.len(), 10_000);
    assert_eq!(a.frontier.max_sharpe.index, b.frontier.max_sharpe.index);
    assert_eq!(a.frontier.max_sharpe.record.weights, b.frontier.max_sharpe.record.weights);
    assert_eq!(
      a.frontier.min_volatility.record.weights,
      b.frontier.min_volatility.record.weights
    );
    assert_eq!(a.volatility.n_fitted(), b.volatility.n_fitted());
  }

  #[test]
  fn picks_belong_to_population_and_are_extreme() {
    let engine = RiskEngine::new(AnalysisConfig {
      sample_count: 2_000,
      ..AnalysisConfig::default()
    })
    .unwrap();
    let report = engine
      .analyze(&walk_panel(), &mut StdRng::seed_from_u64(7))
      .unwrap();
    let f = &report.frontier;
    let records = f.population.records();

    assert_eq!(&records[f.max_sharpe.index], &f.max_sharpe.record);
    assert_eq!(&records[f.min_volatility.index], &f.min_volatility.record);
    assert!(records.iter().all(|r| r.sharpe <= f.max_sharpe.record.sharpe));
    assert!(records.iter().all(|r| r.volatility >= f.min_volatility.record.volatility));

    let w = &f.max_sharpe.record.weights;
    assert_eq!(w.len(), SYMBOLS.len());
    assert_abs_diff_eq!(w.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
    assert_eq!(f.max_sharpe.top_holdings.len(), 3);

    assert_eq!(report.performance.len(), SYMBOLS.len());
    assert_eq!(report.correlation.pairs.len(), 15);
    assert_eq!(report.volatility.instruments.len(), SYMBOLS.len());
    assert_eq!(report.returns.n_obs(), 500);
  }

  #[test]
  fn min_volatility_approaches_global_minimum_variance() {
    let sigmas = [0.010, 0.012, 0.015, 0.020, 0.025, 0.030];
    let mut rng = StdRng::seed_from_u64(2024);
    let columns: Vec<Vec<f64>> = sigmas
      .iter()
      .map(|&s| {
        let normal = Normal::new(0.0, s).unwrap();
        (0..2000).map(|_| normal.sample(&mut rng)).collect()
      })
      .collect();
    let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    let returns = ReturnPanel::from_columns(&SYMBOLS, start, &columns).unwrap();

    let engine = RiskEngine::new(AnalysisConfig {
      sampling: SimplexSampling::UniformSimplex,
      sample_count: 100_000,
      ..AnalysisConfig::default()
    })
    .unwrap();
    let frontier = engine.frontier(&returns, &mut StdRng::seed_from_u64(1)).unwrap();

    let k = sigmas.len();
    let cov = frontier.statistics.annualized_covariance();
    let sigma = DMatrix::from_fn(k, k, |i, j| cov[[i, j]]);
    let inv = sigma.clone().try_inverse().unwrap();
    let raw = &inv * DVector::from_element(k, 1.0);
    let gmv = &raw / raw.sum();
    let gmv_vol = (gmv.dot(&(&sigma * &gmv))).sqrt();

    let picked = &frontier.min_volatility.record;
    for i in 0..k {
      assert_abs_diff_eq!(picked.weights[i], gmv[i], epsilon = 0.1);
    }
    assert!(picked.volatility >= gmv_vol - 1e-12);
    assert!(picked.volatility <= gmv_vol * 1.03);
    // Independent assets: the least volatile outweighs the most volatile.
    assert!(picked.weights[0] > picked.weights[k - 1]);
  }

  #[test]
  fn short_history_still_produces_rolling_volatility() {
    let start = NaiveDate::from_ymd_opt(2021, 6, 1).unwrap();
    let mut rng = StdRng::seed_from_u64(3);
    let normal = Normal::new(0.0, 0.01).unwrap();
    let series = ["X", "Y"]
      .iter()
      .map(|s| {
        let mut p = 50.0;
        let closes: Vec<f64> = (0..80)
          .map(|_| {
            p *= 1.0 + normal.sample(&mut rng);
            p
          })
          .collect();
        PriceSeries::from_closes(*s, start, &closes).unwrap()
      })
      .collect();
    let panel = PricePanel::new(series).unwrap();

    let engine = RiskEngine::new(AnalysisConfig {
      sample_count: 500,
      ..AnalysisConfig::default()
    })
    .unwrap();
    let report = engine.analyze(&panel, &mut StdRng::seed_from_u64(0)).unwrap();

    assert_eq!(report.volatility.n_fitted(), 0);
    assert!(
      report
        .volatility
        .failures()
        .all(|(_, r)| r.to_string().starts_with("insufficient data"))
    );
    let fallback = report.volatility.fallback.as_ref().unwrap();
    assert!(fallback.latest(0).is_some());

    let explicit = engine.rolling_fallback(&report.returns).unwrap();
    assert_eq!(explicit.values, fallback.values);
  }

  #[test]
  fn analyzes_through_cached_source() {
    let engine = RiskEngine::new(AnalysisConfig {
      sample_count: 200,
      ..AnalysisConfig::default()
    })
    .unwrap();
    let source = CachedSource::new(RandomWalkSource::new(&SYMBOLS[..3], 150, 9));
    let report = engine
      .analyze_source(&source, &mut StdRng::seed_from_u64(1))
      .unwrap();
    assert_eq!(report.returns.symbols(), &SYMBOLS[..3]);
  }

  #[test]
  fn invalid_configuration_is_rejected_up_front() {
    let err = RiskEngine::new(AnalysisConfig {
      forecast_horizon: 0,
      ..AnalysisConfig::default()
    })
    .unwrap_err();
    assert!(matches!(err, RiskError::Configuration(_)));
  }

  #[test]
  fn empty_panel_is_an_error() {
    let engine = RiskEngine::new(AnalysisConfig::default()).unwrap();
    let err = engine
      .analyze(&PricePanel::default(), &mut StdRng::seed_from_u64(0))
      .unwrap_err();
    assert!(matches!(err, RiskError::EmptyPanel));
  }
}
