use anyhow::Result;
use basket_risk::config::AnalysisConfig;
use basket_risk::config::SimplexSampling;
use basket_risk::data::CachedSource;
use basket_risk::data::RandomWalkSource;
use basket_risk::quant::portfolio::PortfolioProfile;
use basket_risk::quant::portfolio::RiskEngine;
use clap::Parser;
use prettytable::Table;
use prettytable::row;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
  author,
  version,
  about = "Basket risk analysis: Monte-Carlo efficient frontier, correlation and GARCH(1,1) volatility",
  after_help = "EXAMPLES:
    # Six synthetic instruments, two years of daily closes
    cargo run --release -- --symbols AAA,BBB,CCC,DDD,EEE,FFF --days 500

    # Uniform-on-simplex weights and a 30-day forecast
    cargo run --release -- --dirichlet --horizon 30"
)]
struct Args {
  /// Comma-separated instrument identifiers
  #[arg(long, value_delimiter = ',', default_value = "AAA,BBB,CCC,DDD,EEE,FFF")]
  symbols: Vec<String>,

  /// Daily observations per instrument
  #[arg(long, default_value_t = 500)]
  days: usize,

  /// Seed for both the synthetic prices and the portfolio sampler
  #[arg(long, default_value_t = 42)]
  seed: u64,

  /// Random portfolios to draw
  #[arg(long, default_value_t = 10_000)]
  samples: usize,

  /// GARCH forecast horizon in days
  #[arg(long, default_value_t = 10)]
  horizon: usize,

  /// Annual risk-free rate
  #[arg(long, default_value_t = 0.0)]
  risk_free: f64,

  /// Draw weights uniformly on the simplex instead of normalizing uniforms
  #[arg(long)]
  dirichlet: bool,
}

fn main() -> Result<()> {
  let env_filter =
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("basket_risk=info"));
  tracing_subscriber::fmt().with_env_filter(env_filter).init();
  let args = Args::parse();

  let config = AnalysisConfig {
    sample_count: args.samples,
    forecast_horizon: args.horizon,
    risk_free: args.risk_free,
    sampling: if args.dirichlet {
      SimplexSampling::UniformSimplex
    } else {
      SimplexSampling::NormalizedUniform
    },
    ..AnalysisConfig::default()
  };
  let engine = RiskEngine::new(config)?;

  let symbols: Vec<&str> = args.symbols.iter().map(String::as_str).collect();
  let source = CachedSource::new(RandomWalkSource::new(&symbols, args.days, args.seed));
  let report = engine.analyze_source(&source, &mut StdRng::seed_from_u64(args.seed))?;
  info!("analysis finished");

  let mut perf = Table::new();
  perf.set_titles(row!["Symbol", "Total return", "Annual return", "Annual vol", "Sharpe"]);
  for p in &report.performance {
    perf.add_row(row![
      p.symbol,
      format!("{:.2}%", 100.0 * p.total_return),
      format!("{:.2}%", 100.0 * p.annual_return),
      format!("{:.2}%", 100.0 * p.annual_volatility),
      format!("{:.3}", p.sharpe)
    ]);
  }
  perf.printstd();

  let mut frontier = Table::new();
  frontier.set_titles(row!["Portfolio", "Return", "Volatility", "Sharpe", "Diversification", "Top holdings"]);
  let profiles = [
    ("Max Sharpe", &report.frontier.max_sharpe),
    ("Min volatility", &report.frontier.min_volatility),
  ];
  for (name, profile) in profiles {
    frontier.add_row(row![
      name,
      format!("{:.2}%", 100.0 * profile.record.expected_return),
      format!("{:.2}%", 100.0 * profile.record.volatility),
      format!("{:.3}", profile.record.sharpe),
      format!("{:.3}", profile.diversification),
      holdings(profile)
    ]);
  }
  frontier.printstd();
  println!(
    "Recommended: {:?} (max Sharpe {:.3}, threshold {:.2})",
    report.frontier.recommendation.pick,
    report.frontier.recommendation.sharpe,
    report.frontier.recommendation.threshold
  );

  let strong: Vec<_> = report
    .correlation
    .strong_positive()
    .chain(report.correlation.strong_negative())
    .collect();
  if strong.is_empty() {
    println!("No strongly correlated pairs");
  } else {
    let mut corr = Table::new();
    corr.set_titles(row!["Pair", "Correlation", "Signal"]);
    for pair in strong {
      corr.add_row(row![
        format!("{} / {}", pair.first, pair.second),
        format!("{:.3}", pair.correlation),
        format!("{:?}", pair.signal)
      ]);
    }
    corr.printstd();
  }

  let mut vol = Table::new();
  vol.set_titles(row!["Symbol", "alpha", "beta", "Persistence", "Day 1", "Last day", "Change"]);
  let summary = report.volatility.forecast_summary();
  for (symbol, fit) in report.volatility.fitted() {
    let Some(s) = summary.iter().find(|s| s.symbol == symbol) else {
      continue;
    };
    vol.add_row(row![
      symbol,
      format!("{:.4}", fit.params.alpha),
      format!("{:.4}", fit.params.beta),
      format!("{:.4}", fit.persistence()),
      format!("{:.3}%", 100.0 * s.first_day),
      format!("{:.3}%", 100.0 * s.last_day),
      format!("{:+.2}%", s.change_pct)
    ]);
  }
  vol.printstd();
  for (symbol, reason) in report.volatility.failures() {
    println!("{symbol}: {reason}");
  }
  if let Some(fallback) = &report.volatility.fallback {
    for (j, symbol) in fallback.symbols.iter().enumerate() {
      if let Some((date, v)) = fallback.latest(j) {
        println!(
          "{symbol}: {}-day rolling volatility {:.2}% on {date}",
          fallback.window,
          100.0 * v
        );
      }
    }
  }

  Ok(())
}

fn holdings(profile: &PortfolioProfile) -> String {
  profile
    .top_holdings
    .iter()
    .map(|h| format!("{} {:.1}%", h.symbol, 100.0 * h.weight))
    .collect::<Vec<_>>()
    .join(", ")
}
