//! # Data
//!
//! $$
//! \text{source}\ \to\ \mathcal P\ (\text{immutable, shared})
//! $$
//!
//! Canonical price panels and the injected sources that supply them.

pub mod panel;
pub mod source;

pub use panel::PriceBar;
pub use panel::PricePanel;
pub use panel::PriceSeries;
pub use source::CachedSource;
pub use source::InMemorySource;
pub use source::PriceSource;
pub use source::RandomWalkSource;
