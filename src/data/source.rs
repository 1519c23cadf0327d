//! # Price Sources
//!
//! $$
//! S_t=S_{t-1}\exp(\mu+\sigma Z_t),\qquad Z_t\sim\mathcal N(0,1)
//! $$
//!
//! Injected data-access seam. The core never loads files itself; callers hand it a
//! [`PriceSource`] and may wrap it in [`CachedSource`] to memoize the panel.

use std::sync::Arc;
use std::sync::Mutex;

use anyhow::anyhow;
use anyhow::Result;
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::Distribution;
use rand_distr::Normal;
use tracing::debug;

use super::panel::PricePanel;
use super::panel::PriceSeries;

/// Supplier of immutable price panels.
pub trait PriceSource {
  fn load_panel(&self) -> Result<Arc<PricePanel>>;
}

/// Serves a panel already held in memory.
#[derive(Clone, Debug)]
pub struct InMemorySource {
  panel: Arc<PricePanel>,
}

impl InMemorySource {
  pub fn new(panel: PricePanel) -> Self {
    Self {
      panel: Arc::new(panel),
    }
  }
}

impl PriceSource for InMemorySource {
  fn load_panel(&self) -> Result<Arc<PricePanel>> {
    Ok(Arc::clone(&self.panel))
  }
}

/// Seeded geometric random walks, one per symbol, on consecutive calendar days.
#[derive(Clone, Debug)]
pub struct RandomWalkSource {
  /// Instrument identifiers in panel order.
  pub symbols: Vec<String>,
  /// Observations per instrument.
  pub days: usize,
  /// First date of every series.
  pub start: NaiveDate,
  /// Initial price.
  pub s0: f64,
  /// Daily log drift.
  pub mu: f64,
  /// Daily log volatility.
  pub sigma: f64,
  /// Seed of the generator; the same seed always yields the same panel.
  pub seed: u64,
}

impl RandomWalkSource {
  pub fn new(symbols: &[&str], days: usize, seed: u64) -> Self {
    Self {
      symbols: symbols.iter().map(|s| s.to_string()).collect(),
      days,
      start: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default(),
      s0: 100.0,
      mu: 0.0003,
      sigma: 0.02,
      seed,
    }
  }

  fn path(&self, rng: &mut StdRng, normal: &Normal<f64>) -> Vec<f64> {
    let mut closes = Vec::with_capacity(self.days);
    let mut s = self.s0;
    for t in 0..self.days {
      if t > 0 {
        s *= (self.mu + self.sigma * normal.sample(rng)).exp();
      }
      closes.push(s);
    }
    closes
  }
}

impl PriceSource for RandomWalkSource {
  fn load_panel(&self) -> Result<Arc<PricePanel>> {
    if !(self.s0 > 0.0 && self.sigma >= 0.0) {
      return Err(anyhow!(
        "random walk requires a positive start price and non-negative volatility"
      ));
    }

    let normal = Normal::new(0.0, 1.0)?;
    let mut rng = StdRng::seed_from_u64(self.seed);
    let mut series = Vec::with_capacity(self.symbols.len());
    for symbol in &self.symbols {
      let closes = self.path(&mut rng, &normal);
      series.push(PriceSeries::from_closes(symbol.clone(), self.start, &closes)?);
    }

    Ok(Arc::new(PricePanel::new(series)?))
  }
}

/// Memoizes the first successful load of the wrapped source. Failed loads are not cached.
pub struct CachedSource<S> {
  inner: S,
  cached: Mutex<Option<Arc<PricePanel>>>,
}

impl<S: PriceSource> CachedSource<S> {
  pub fn new(inner: S) -> Self {
    Self {
      inner,
      cached: Mutex::new(None),
    }
  }

  /// Drop the memoized panel so the next load reaches the wrapped source.
  pub fn invalidate(&self) {
    if let Ok(mut slot) = self.cached.lock() {
      *slot = None;
    }
  }

  pub fn inner(&self) -> &S {
    &self.inner
  }
}

impl<S: PriceSource> PriceSource for CachedSource<S> {
  fn load_panel(&self) -> Result<Arc<PricePanel>> {
    let mut slot = self
      .cached
      .lock()
      .map_err(|_| anyhow!("price cache lock poisoned"))?;

    if let Some(panel) = slot.as_ref() {
      debug!("serving cached price panel");
      return Ok(Arc::clone(panel));
    }

    let panel = self.inner.load_panel()?;
    *slot = Some(Arc::clone(&panel));
    Ok(panel)
  }
}
