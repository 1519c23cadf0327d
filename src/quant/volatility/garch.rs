//! # GARCH(1,1)
//!
//! $$
//! r_t=\mu+\varepsilon_t,\quad \varepsilon_t=\sigma_t z_t,\quad
//! \sigma_t^2=\omega+\alpha\varepsilon_{t-1}^2+\beta\sigma_{t-1}^2,\quad z_t\sim\mathcal N(0,1)
//! $$
//!
//! Gaussian quasi-maximum-likelihood fit with a Nelder-Mead search, in-sample conditional
//! volatility and multi-step variance forecasts.

use std::f64::consts::PI;
use std::time::Duration;

use argmin::core::CostFunction;
use argmin::core::Executor;
use argmin::core::State;
use argmin::core::TerminationReason;
use argmin::solver::neldermead::NelderMead;
use rand::Rng;
use rand_distr::Distribution;
use rand_distr::StandardNormal;
use statrs::statistics::Statistics;
use thiserror::Error;
use tracing::debug;

use crate::config::GarchConfig;
use crate::error::RiskError;

/// Parameters estimated per fit: `mu`, `omega`, `alpha`, `beta`.
const N_PARAMS: usize = 4;
/// Observations entering the variance backcast.
const BACKCAST_WINDOW: usize = 75;
/// Decay of the backcast weights.
const BACKCAST_DECAY: f64 = 0.94;

/// Why an instrument could not be fitted.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum GarchFailureReason {
  #[error("insufficient data: need at least {required} observations, got {observations}")]
  InsufficientData { observations: usize, required: usize },
  #[error("low variability: return std {std:e} is below {floor:e}")]
  LowVariability { std: f64, floor: f64 },
  #[error("failed to converge within {iterations} iterations")]
  NonConvergence { iterations: u64 },
  #[error("timed out after {budget:?} ({iterations} iterations) without converging")]
  TimedOut { budget: Duration, iterations: u64 },
  #[error("solver fault: {0}")]
  SolverFault(String),
}

impl From<GarchFailureReason> for RiskError {
  fn from(reason: GarchFailureReason) -> Self {
    match reason {
      GarchFailureReason::InsufficientData {
        observations,
        required,
      } => RiskError::insufficient("GARCH(1,1) fit", required, observations),
      GarchFailureReason::LowVariability { .. } => RiskError::NumericalDegeneracy(reason.to_string()),
      GarchFailureReason::NonConvergence { iterations }
      | GarchFailureReason::TimedOut { iterations, .. } => RiskError::ConvergenceFailure { iterations },
      GarchFailureReason::SolverFault(msg) => RiskError::NumericalDegeneracy(msg),
    }
  }
}

/// GARCH(1,1) coefficients with a constant mean.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Garch11Params {
  pub mu: f64,
  pub omega: f64,
  pub alpha: f64,
  pub beta: f64,
}

impl Garch11Params {
  /// `alpha + beta`; a covariance-stationary process needs it below one.
  pub fn persistence(&self) -> f64 {
    self.alpha + self.beta
  }

  pub fn is_stationary(&self) -> bool {
    self.persistence() < 1.0
  }

  /// `omega / (1 - alpha - beta)`, or `None` for a non-stationary process.
  pub fn unconditional_variance(&self) -> Option<f64> {
    if self.is_stationary() {
      Some(self.omega / (1.0 - self.persistence()))
    } else {
      None
    }
  }

  /// Conditional variances of `returns` starting from `backcast` for the pre-sample
  /// squared residual and variance.
  pub fn filter(&self, returns: &[f64], backcast: f64) -> Vec<f64> {
    let mut sigma2 = Vec::with_capacity(returns.len());
    let mut prev_eps2 = backcast;
    let mut prev_var = backcast;
    for &r in returns {
      let var = self.omega + self.alpha * prev_eps2 + self.beta * prev_var;
      sigma2.push(var);
      prev_eps2 = (r - self.mu).powi(2);
      prev_var = var;
    }
    sigma2
  }

  /// Gaussian log-likelihood of `returns` given their conditional variances.
  pub fn log_likelihood(&self, returns: &[f64], sigma2: &[f64]) -> f64 {
    let ln_2pi = (2.0 * PI).ln();
    returns
      .iter()
      .zip(sigma2)
      .map(|(&r, &v)| -0.5 * (ln_2pi + v.ln() + (r - self.mu).powi(2) / v))
      .sum()
  }

  /// Variance forecasts for `1..=horizon` steps after the last observation.
  pub fn forecast_variance(&self, last_residual: f64, last_variance: f64, horizon: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(horizon);
    let mut var = self.omega + self.alpha * last_residual.powi(2) + self.beta * last_variance;
    for _ in 0..horizon {
      out.push(var);
      var = self.omega + self.persistence() * var;
    }
    out
  }

  /// Simulated return path of length `n`, started at the unconditional variance.
  pub fn simulate<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Vec<f64> {
    let denom = (1.0 - self.persistence()).max(1e-8);
    let mut var = self.omega / denom;
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
      let z: f64 = StandardNormal.sample(&mut *rng);
      let eps = var.sqrt() * z;
      out.push(self.mu + eps);
      var = self.omega + self.alpha * eps * eps + self.beta * var;
    }
    out
  }
}

/// Exponentially weighted mean of the first squared residuals.
pub fn variance_backcast(residuals: &[f64]) -> f64 {
  let tau = residuals.len().min(BACKCAST_WINDOW);
  let mut num = 0.0;
  let mut den = 0.0;
  let mut w = 1.0;
  for e in &residuals[..tau] {
    num += w * e * e;
    den += w;
    w *= BACKCAST_DECAY;
  }
  if den > 0.0 {
    num / den
  } else {
    0.0
  }
}

/// Successful GARCH(1,1) fit, expressed in the units of the input returns.
#[derive(Clone, Debug)]
pub struct GarchFit {
  pub params: Garch11Params,
  /// Log-likelihood of the unscaled returns.
  pub log_likelihood: f64,
  pub aic: f64,
  pub bic: f64,
  /// Observations used by the fit.
  pub n_obs: usize,
  /// Nelder-Mead iterations spent.
  pub iterations: u64,
  /// In-sample conditional volatility `sigma_t`.
  pub conditional_volatility: Vec<f64>,
  last_residual: f64,
  last_variance: f64,
}

impl GarchFit {
  pub fn persistence(&self) -> f64 {
    self.params.persistence()
  }

  /// Forecast variances for days `1..=horizon`.
  pub fn forecast_variance(&self, horizon: usize) -> Vec<f64> {
    self
      .params
      .forecast_variance(self.last_residual, self.last_variance, horizon)
  }

  /// Forecast volatilities (square roots of [`Self::forecast_variance`]).
  pub fn forecast(&self, horizon: usize) -> Vec<f64> {
    self
      .forecast_variance(horizon)
      .into_iter()
      .map(|v| v.max(0.0).sqrt())
      .collect()
  }
}

/// Negative log-likelihood over an unconstrained parameterization:
/// `mu = m + s x0`, `omega = s^2 exp(x1)`, `(alpha, beta, 1 - alpha - beta) = softmax(x2, x3, 0)`.
#[derive(Clone)]
struct GarchLikelihood {
  returns: Vec<f64>,
  mean: f64,
  sd: f64,
  backcast: f64,
}

impl GarchLikelihood {
  fn decode(&self, x: &[f64]) -> Garch11Params {
    let m = x[2].max(x[3]).max(0.0);
    let ea = (x[2] - m).exp();
    let eb = (x[3] - m).exp();
    let z = ea + eb + (-m).exp();
    Garch11Params {
      mu: self.mean + self.sd * x[0],
      omega: self.sd * self.sd * x[1].exp(),
      alpha: ea / z,
      beta: eb / z,
    }
  }

  fn start(&self) -> Vec<f64> {
    // alpha = 0.1, beta = 0.8, unconditional variance equal to the sample variance.
    vec![0.0, 0.1_f64.ln(), 0.0, 8.0_f64.ln()]
  }

  fn neg_log_likelihood(&self, params: &Garch11Params) -> f64 {
    let sigma2 = params.filter(&self.returns, self.backcast);
    let nll = -params.log_likelihood(&self.returns, &sigma2);
    if nll.is_finite() {
      nll
    } else {
      f64::MAX
    }
  }
}

impl CostFunction for GarchLikelihood {
  type Param = Vec<f64>;
  type Output = f64;

  fn cost(&self, x: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
    Ok(self.neg_log_likelihood(&self.decode(x)))
  }
}

/// Fits GARCH(1,1) to a single return series.
#[derive(Clone, Debug, Default)]
pub struct GarchFitter {
  config: GarchConfig,
}

impl GarchFitter {
  pub fn new(config: GarchConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &GarchConfig {
    &self.config
  }

  /// Fit `returns`, ignoring missing (non-finite) values.
  ///
  /// Returns are multiplied by `config.scale` before the search; parameters, likelihood and
  /// volatilities are mapped back to the input units.
  pub fn fit(&self, returns: &[f64]) -> Result<GarchFit, GarchFailureReason> {
    let clean: Vec<f64> = returns.iter().copied().filter(|r| r.is_finite()).collect();
    let n = clean.len();
    if n < self.config.min_observations {
      return Err(GarchFailureReason::InsufficientData {
        observations: n,
        required: self.config.min_observations,
      });
    }

    let std = clean.iter().std_dev();
    if !(std >= self.config.min_std) {
      return Err(GarchFailureReason::LowVariability {
        std,
        floor: self.config.min_std,
      });
    }

    let scale = self.config.scale;
    let scaled: Vec<f64> = clean.iter().map(|r| r * scale).collect();
    let mean = scaled.iter().mean();
    let residuals: Vec<f64> = scaled.iter().map(|r| r - mean).collect();
    let problem = GarchLikelihood {
      backcast: variance_backcast(&residuals),
      sd: std * scale,
      mean,
      returns: scaled,
    };

    let x0 = problem.start();
    let mut simplex = Vec::with_capacity(N_PARAMS + 1);
    simplex.push(x0.clone());
    for i in 0..N_PARAMS {
      let mut point = x0.clone();
      point[i] += 0.5;
      simplex.push(point);
    }

    let solver = NelderMead::new(simplex)
      .with_sd_tolerance(self.config.sd_tolerance)
      .map_err(|e| GarchFailureReason::SolverFault(e.to_string()))?;
    let max_iters = self.config.max_iters;
    let mut executor = Executor::new(problem.clone(), solver).configure(|state| state.max_iters(max_iters));
    if let Some(timeout) = self.config.timeout {
      executor = executor.timeout(timeout);
    }
    let res = executor
      .run()
      .map_err(|e| GarchFailureReason::SolverFault(e.to_string()))?;

    let iterations = res.state.get_iter();
    let reason = res.state.get_termination_reason();
    debug!("GARCH search stopped after {} iterations ({:?})", iterations, reason);
    match (reason, self.config.timeout) {
      (Some(TerminationReason::SolverConverged), _) => {}
      (Some(TerminationReason::Timeout), Some(budget)) => {
        return Err(GarchFailureReason::TimedOut { budget, iterations });
      }
      _ => return Err(GarchFailureReason::NonConvergence { iterations }),
    }

    let best = res
      .state
      .best_param
      .as_ref()
      .ok_or_else(|| GarchFailureReason::SolverFault("no parameters returned".into()))?;
    let scaled_params = problem.decode(best);
    let sigma2 = scaled_params.filter(&problem.returns, problem.backcast);
    let scaled_ll = scaled_params.log_likelihood(&problem.returns, &sigma2);
    if !scaled_ll.is_finite() {
      return Err(GarchFailureReason::SolverFault(
        "non-finite likelihood at optimum".into(),
      ));
    }

    let s2 = scale * scale;
    let params = Garch11Params {
      mu: scaled_params.mu / scale,
      omega: scaled_params.omega / s2,
      alpha: scaled_params.alpha,
      beta: scaled_params.beta,
    };
    // Change of variables r = y / scale adds n ln(scale) to the density of r.
    let log_likelihood = scaled_ll + n as f64 * scale.ln();
    let k = N_PARAMS as f64;

    Ok(GarchFit {
      params,
      log_likelihood,
      aic: 2.0 * k - 2.0 * log_likelihood,
      bic: k * (n as f64).ln() - 2.0 * log_likelihood,
      n_obs: n,
      iterations,
      conditional_volatility: sigma2.iter().map(|v| v.sqrt() / scale).collect(),
      last_residual: (problem.returns[n - 1] - scaled_params.mu) / scale,
      last_variance: sigma2[n - 1] / s2,
    })
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use approx::assert_relative_eq;
  use rand::rngs::StdRng;
  use rand::SeedableRng;

  use super::*;

  fn truth() -> Garch11Params {
    Garch11Params {
      mu: 0.0005,
      omega: 1.125e-5,
      alpha: 0.1,
      beta: 0.85,
    }
  }

  fn simulated(n: usize, seed: u64) -> Vec<f64> {
    truth().simulate(n, &mut StdRng::seed_from_u64(seed))
  }

  #[test]
  fn recovers_simulated_parameters() {
    let returns = simulated(2000, 42);
    let fit = GarchFitter::default().fit(&returns).unwrap();

    assert!(fit.params.alpha > 0.02 && fit.params.alpha < 0.25, "{:?}", fit.params);
    assert!(fit.params.beta > 0.6 && fit.params.beta < 0.97, "{:?}", fit.params);
    assert!(fit.params.omega > 0.0);
    assert!(fit.persistence() < 1.0);
    assert_eq!(fit.conditional_volatility.len(), 2000);
    assert!(fit.conditional_volatility.iter().all(|v| v.is_finite() && *v > 0.0));
    assert!(fit.iterations <= 1000);
  }

  #[test]
  fn information_criteria_follow_likelihood() {
    let fit = GarchFitter::default().fit(&simulated(500, 3)).unwrap();
    assert_abs_diff_eq!(fit.aic, 8.0 - 2.0 * fit.log_likelihood, epsilon = 1e-9);
    assert_abs_diff_eq!(fit.bic, 4.0 * 500f64.ln() - 2.0 * fit.log_likelihood, epsilon = 1e-9);
  }

  #[test]
  fn scaling_is_a_pure_conditioning_transform() {
    let returns = simulated(800, 9);
    let scaled = GarchFitter::new(GarchConfig {
      scale: 100.0,
      ..GarchConfig::default()
    })
    .fit(&returns)
    .unwrap();
    let raw = GarchFitter::new(GarchConfig {
      scale: 1.0,
      ..GarchConfig::default()
    })
    .fit(&returns)
    .unwrap();

    for (a, b) in scaled
      .conditional_volatility
      .iter()
      .zip(&raw.conditional_volatility)
    {
      assert_relative_eq!(*a, *b, max_relative = 5e-3);
    }
    assert_relative_eq!(scaled.log_likelihood, raw.log_likelihood, max_relative = 1e-6);
  }

  #[test]
  fn forecast_converges_to_unconditional_volatility() {
    let fit = GarchFitter::default().fit(&simulated(1500, 17)).unwrap();
    let short = fit.forecast(1);
    let long = fit.forecast(30);

    assert_eq!(short.len(), 1);
    assert_eq!(long.len(), 30);
    assert_abs_diff_eq!(short[0], long[0], epsilon = 1e-15);

    let target = fit.params.unconditional_variance().unwrap().sqrt();
    let first_gap = (long[0] - target).abs();
    let last_gap = (long[29] - target).abs();
    assert!(last_gap <= first_gap + 1e-15);
  }

  #[test]
  fn too_few_observations() {
    let err = GarchFitter::default().fit(&simulated(99, 1)).unwrap_err();
    assert_eq!(
      err,
      GarchFailureReason::InsufficientData {
        observations: 99,
        required: 100
      }
    );
    assert!(err.to_string().starts_with("insufficient data"));
  }

  #[test]
  fn missing_values_do_not_count() {
    let mut returns = simulated(120, 2);
    for r in returns.iter_mut().take(30) {
      *r = f64::NAN;
    }
    let err = GarchFitter::default().fit(&returns).unwrap_err();
    assert!(matches!(
      err,
      GarchFailureReason::InsufficientData { observations: 90, .. }
    ));
  }

  #[test]
  fn constant_series_is_low_variability() {
    let err = GarchFitter::default().fit(&vec![0.0; 300]).unwrap_err();
    assert!(matches!(err, GarchFailureReason::LowVariability { .. }));
    assert!(err.to_string().starts_with("low variability"));
  }

  #[test]
  fn tiny_budget_does_not_converge() {
    let fitter = GarchFitter::new(GarchConfig {
      max_iters: 3,
      ..GarchConfig::default()
    });
    let err = fitter.fit(&simulated(400, 4)).unwrap_err();
    assert!(matches!(err, GarchFailureReason::NonConvergence { .. }));
    assert!(matches!(RiskError::from(err), RiskError::ConvergenceFailure { .. }));
  }

  #[test]
  fn exhausted_time_budget_is_reported_as_timeout() {
    let fitter = GarchFitter::new(GarchConfig {
      timeout: Some(Duration::ZERO),
      ..GarchConfig::default()
    });
    let err = fitter.fit(&simulated(400, 6)).unwrap_err();
    assert!(
      matches!(err, GarchFailureReason::TimedOut { budget, .. } if budget == Duration::ZERO),
      "{err:?}"
    );
    assert!(err.to_string().starts_with("timed out"));
    assert!(matches!(RiskError::from(err), RiskError::ConvergenceFailure { .. }));
  }

  #[test]
  fn filter_recursion() {
    let p = Garch11Params {
      mu: 0.0,
      omega: 0.1,
      alpha: 0.2,
      beta: 0.7,
    };
    let s = p.filter(&[1.0, -2.0], 1.0);
    assert_abs_diff_eq!(s[0], 0.1 + 0.2 + 0.7, epsilon = 1e-12);
    assert_abs_diff_eq!(s[1], 0.1 + 0.2 * 1.0 + 0.7 * s[0], epsilon = 1e-12);
    assert_abs_diff_eq!(variance_backcast(&[2.0]), 4.0, epsilon = 1e-12);
  }
}
