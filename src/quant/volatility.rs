//! # Volatility
//!
//! $$
//! \sigma_t^2=\omega+\alpha\varepsilon_{t-1}^2+\beta\sigma_{t-1}^2
//! $$
//!
//! Conditional volatility models and their rolling-window fallback.

pub mod batch;
pub mod garch;
pub mod rolling;

pub use batch::ForecastSummary;
pub use batch::GarchBatch;
pub use batch::GarchOutcome;
pub use batch::InstrumentVolatility;
pub use batch::VolatilityReport;
pub use garch::Garch11Params;
pub use garch::GarchFailureReason;
pub use garch::GarchFit;
pub use garch::GarchFitter;
pub use rolling::RollingVolatility;
pub use rolling::rolling_volatility;
