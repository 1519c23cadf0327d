//! # Portfolio
//!
//! $$
//! \sigma_p^2 = \mathbf{w}^\top \Sigma \mathbf{w}
//! $$
//!
//! Return construction, moment estimation, Monte-Carlo frontier sampling, selection and
//! correlation analysis.

pub mod correlation;
pub mod engine;
pub mod frontier;
pub mod performance;
pub mod returns;
pub mod sampler;
pub mod statistics;
pub mod types;

pub use correlation::CorrelatedPair;
pub use correlation::CorrelationAnalyzer;
pub use correlation::CorrelationReport;
pub use correlation::PairSignal;
pub use correlation::correlation_matrix;
pub use engine::AnalysisReport;
pub use engine::FrontierAnalysis;
pub use engine::RiskEngine;
pub use frontier::FrontierSelector;
pub use frontier::diversification;
pub use frontier::max_sharpe;
pub use frontier::min_volatility;
pub use frontier::top_k_holdings;
pub use performance::InstrumentPerformance;
pub use performance::cumulative_returns;
pub use performance::instrument_performance;
pub use returns::ReturnPanel;
pub use returns::simple_returns;
pub use sampler::FrontierSampler;
pub use sampler::SampleMetric;
pub use sampler::SamplePopulation;
pub use statistics::PortfolioStatistics;
pub use statistics::sharpe_ratio;
pub use types::FrontierPick;
pub use types::Holding;
pub use types::PortfolioProfile;
pub use types::Recommendation;
pub use types::SampleRecord;
