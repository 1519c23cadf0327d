//! # basket-risk
//!
//! $$
//! \max_{\mathbf w\in\Delta}\ \frac{\mathbf w^\top\mu-r_f}{\sqrt{\mathbf w^\top\Sigma\mathbf w}},\qquad
//! \sigma_t^2=\omega+\alpha\varepsilon_{t-1}^2+\beta\sigma_{t-1}^2
//! $$
//!
//! Risk analytics for a basket of instruments: simple returns, annualized moments, a Monte-Carlo
//! efficient frontier with max-Sharpe and min-volatility picks, Pearson correlation signals and
//! per-instrument GARCH(1,1) volatility forecasts with a rolling-window fallback.
//!
//! ```ignore
//! use basket_risk::config::AnalysisConfig;
//! use basket_risk::data::RandomWalkSource;
//! use basket_risk::quant::portfolio::RiskEngine;
//! use rand::SeedableRng;
//!
//! let engine = RiskEngine::new(AnalysisConfig::default())?;
//! let source = RandomWalkSource::new(&["AAA", "BBB", "CCC"], 500, 42);
//! let report = engine.analyze_source(&source, &mut rand::rngs::StdRng::seed_from_u64(42))?;
//! println!("{:?}", report.frontier.recommendation);
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod quant;

pub use config::AnalysisConfig;
pub use error::Result;
pub use error::RiskError;
pub use quant::portfolio::AnalysisReport;
pub use quant::portfolio::RiskEngine;
