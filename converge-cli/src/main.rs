//! Converge CLI — scoring, catalyst management, and sizing commands.
//!
//! Commands:
//! - `evaluate` — converge per-ticker signal sets from a JSON file
//! - `catalysts add|import|list|alerts` — manage the catalyst store
//! - `classify` — classify a ticker's daily bars (CSV) into a pattern state
//! - `size` — size a trade against a portfolio snapshot
//! - `decide` — full go / no-go from signals, trade, and portfolio
//!
//! Every command prints JSON on stdout. Logs go to stderr.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use converge_core::catalyst::{import, CatalystScorer, CatalystStore, JsonFileRepository};
use converge_core::config::ScoringConfig;
use converge_core::convergence::ConvergenceEngine;
use converge_core::decision::DecisionPipeline;
use converge_core::domain::{
    Bar, Catalyst, CatalystType, Impact, PortfolioState, Side, Signal, SignalSet, TradeCandidate,
};
use converge_core::pattern::PatternClassifier;
use converge_core::sizing::RiskSizer;

#[derive(Parser)]
#[command(
    name = "converge",
    about = "Converge CLI — multi-signal trade scoring and risk sizing"
)]
struct Cli {
    /// Path to a TOML scoring config. Defaults are used when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Converge signals for many tickers.
    Evaluate {
        /// JSON object mapping ticker to a list of signals.
        #[arg(long)]
        signals: PathBuf,
    },
    /// Catalyst store commands.
    Catalysts {
        /// Catalyst store file. Defaults to the user data directory.
        #[arg(long)]
        store: Option<PathBuf>,

        #[command(subcommand)]
        action: CatalystAction,
    },
    /// Classify daily bars into a pattern state.
    Classify {
        /// CSV with header `date,open,high,low,close,volume`, oldest first.
        #[arg(long)]
        bars: PathBuf,

        /// Ticker the bars belong to.
        #[arg(long, default_value = "UNKNOWN")]
        ticker: String,
    },
    /// Size a trade for a convergence score.
    Size {
        #[arg(long)]
        ticker: String,

        #[arg(long)]
        entry: f64,

        #[arg(long)]
        stop: f64,

        /// Convergence score, 0–100.
        #[arg(long)]
        score: f64,

        /// JSON portfolio snapshot.
        #[arg(long)]
        portfolio: PathBuf,

        /// Sector of the ticker, for the sector cap.
        #[arg(long)]
        sector: Option<String>,

        /// Short trade (stop above entry).
        #[arg(long, default_value_t = false)]
        short: bool,

        /// Also run portfolio limit checks.
        #[arg(long, default_value_t = false)]
        check_limits: bool,
    },
    /// Go / no-go decision from a single JSON request.
    Decide {
        /// JSON with `ticker`, `signals`, `candidate`, `portfolio`.
        #[arg(long)]
        input: PathBuf,
    },
}

#[derive(Subcommand)]
enum CatalystAction {
    /// Add or replace a catalyst (same ticker, type, and date replaces).
    Add {
        #[arg(long)]
        ticker: String,

        /// EARNINGS, REGULATORY_DECISION, CLINICAL_TRIAL, CONTRACT_AWARD,
        /// POLICY_EVENT, PRODUCT_LAUNCH, MERGER, MANUAL.
        #[arg(long = "type")]
        catalyst_type: String,

        /// Event date (YYYY-MM-DD).
        #[arg(long)]
        date: String,

        /// LOW, MEDIUM, HIGH, BINARY.
        #[arg(long)]
        impact: String,

        #[arg(long, default_value = "")]
        description: String,

        #[arg(long, default_value = "")]
        source: String,
    },
    /// Append catalysts from a CSV file.
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// List stored catalysts.
    List {
        /// Only this ticker.
        #[arg(long)]
        ticker: Option<String>,

        /// Only events on or after --as-of.
        #[arg(long, default_value_t = false)]
        active: bool,

        /// Reference date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        as_of: Option<String>,
    },
    /// Scored catalysts within a horizon, most urgent first.
    Alerts {
        /// Horizon in days.
        #[arg(long, default_value_t = 7)]
        days: i64,

        /// Reference date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        as_of: Option<String>,
    },
}

/// Request body for `decide`.
#[derive(Deserialize)]
struct DecideRequest {
    ticker: String,
    signals: Vec<Signal>,
    candidate: TradeCandidate,
    portfolio: PortfolioState,
}

#[derive(Serialize)]
struct SizeResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    limits: Option<converge_core::sizing::LimitCheck>,
    sizing: converge_core::sizing::PositionSizeRecommendation,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => ScoringConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ScoringConfig::default(),
    };

    match cli.command {
        Commands::Evaluate { signals } => run_evaluate(&config, &signals),
        Commands::Catalysts { store, action } => {
            let store_path = store.unwrap_or_else(default_store_path);
            run_catalysts(&config, &store_path, action)
        }
        Commands::Classify { bars, ticker } => run_classify(&config, &bars, &ticker),
        Commands::Size {
            ticker,
            entry,
            stop,
            score,
            portfolio,
            sector,
            short,
            check_limits,
        } => {
            let side = if short { Side::Short } else { Side::Long };
            let candidate = TradeCandidate {
                ticker,
                sector,
                side,
                entry_price: entry,
                stop_price: stop,
            };
            run_size(&config, &candidate, score, &portfolio, check_limits)
        }
        Commands::Decide { input } => run_decide(config, &input),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("converge").join("catalysts.json"))
        .unwrap_or_else(|| PathBuf::from("catalysts.json"))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

fn parse_date(s: Option<&str>) -> Result<NaiveDate> {
    match s {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("invalid date '{s}', expected YYYY-MM-DD")),
        None => Ok(chrono::Local::now().date_naive()),
    }
}

/// Parse a SCREAMING_SNAKE_CASE enum name the same way the JSON store does.
fn parse_enum<T: DeserializeOwned>(what: &str, s: &str) -> Result<T> {
    let name = s.trim().to_ascii_uppercase().replace('-', "_");
    serde_json::from_value(serde_json::Value::String(name))
        .with_context(|| format!("unknown {what} '{s}'"))
}

fn run_evaluate(config: &ScoringConfig, path: &Path) -> Result<()> {
    let by_ticker: BTreeMap<String, Vec<Signal>> = read_json(path)?;
    let batch: Vec<(String, SignalSet)> = by_ticker
        .into_iter()
        .map(|(ticker, signals)| (ticker, SignalSet::from(signals)))
        .collect();

    let engine = ConvergenceEngine::new(config.convergence.clone());
    let results = engine.evaluate_many(&batch);
    tracing::info!(
        tickers = batch.len(),
        converged = results.len(),
        "evaluation complete"
    );
    print_json(&results)
}

fn run_catalysts(config: &ScoringConfig, store_path: &Path, action: CatalystAction) -> Result<()> {
    let store = CatalystStore::new(JsonFileRepository::new(store_path));
    let scorer = CatalystScorer::new(config.catalyst.clone());

    match action {
        CatalystAction::Add {
            ticker,
            catalyst_type,
            date,
            impact,
            description,
            source,
        } => {
            let ticker = ticker.trim().to_ascii_uppercase();
            if ticker.is_empty() {
                bail!("--ticker must not be empty");
            }
            let catalyst = Catalyst::new(
                ticker,
                parse_enum::<CatalystType>("catalyst type", &catalyst_type)?,
                parse_date(Some(&date))?,
                parse_enum::<Impact>("impact", &impact)?,
            )
            .with_description(description)
            .with_source(source);
            let replaced = store.upsert(catalyst.clone())?;
            print_json(&serde_json::json!({
                "replaced": replaced,
                "catalyst": catalyst,
                "store": store_path,
            }))
        }
        CatalystAction::Import { csv } => {
            let batch = import::read_csv_file(&csv)
                .with_context(|| format!("importing {}", csv.display()))?;
            let added = store.append_all(batch)?;
            print_json(&serde_json::json!({ "imported": added, "store": store_path }))
        }
        CatalystAction::List {
            ticker,
            active,
            as_of,
        } => {
            let as_of = parse_date(as_of.as_deref())?;
            let mut catalysts = match ticker.as_deref() {
                Some(t) => store.for_ticker(t)?,
                None => store.load_all()?,
            };
            if active {
                catalysts.retain(|c| !c.is_expired(as_of));
            }
            catalysts.sort_by(|a, b| a.event_date.cmp(&b.event_date));
            print_json(&catalysts)
        }
        CatalystAction::Alerts { days, as_of } => {
            if days < 0 {
                bail!("--days must be >= 0");
            }
            let as_of = parse_date(as_of.as_deref())?;
            let catalysts = store.load_all()?;
            print_json(&scorer.alerts(&catalysts, as_of, days))
        }
    }
}

fn read_bars(path: &Path) -> Result<Vec<Bar>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let mut bars = Vec::new();
    for (i, row) in rdr.deserialize::<Bar>().enumerate() {
        let bar = row.with_context(|| format!("{} row {}", path.display(), i + 1))?;
        if !bar.is_sane() {
            bail!("{} row {}: malformed bar on {}", path.display(), i + 1, bar.date);
        }
        bars.push(bar);
    }
    bars.sort_by_key(|b| b.date);
    Ok(bars)
}

fn run_classify(config: &ScoringConfig, bars_path: &Path, ticker: &str) -> Result<()> {
    let bars = read_bars(bars_path)?;
    let classifier = PatternClassifier::new(config.pattern.clone());
    print_json(&classifier.classify(ticker, &bars))
}

fn run_size(
    config: &ScoringConfig,
    candidate: &TradeCandidate,
    score: f64,
    portfolio_path: &Path,
    check_limits: bool,
) -> Result<()> {
    let portfolio: PortfolioState = read_json(portfolio_path)?;
    let sizer = RiskSizer::new(config.risk.clone());
    let limits = check_limits.then(|| sizer.check_limits(&portfolio, candidate));
    let sizing = sizer.size(candidate, score, &portfolio)?;
    print_json(&SizeResponse { limits, sizing })
}

fn run_decide(config: ScoringConfig, input: &Path) -> Result<()> {
    let request: DecideRequest = read_json(input)?;
    let signals = SignalSet::from(request.signals);
    let pipeline = DecisionPipeline::new(config);
    let decision = pipeline.decide(
        &request.ticker,
        &signals,
        &request.candidate,
        &request.portfolio,
    )?;
    print_json(&decision)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "date,open,high,low,close,volume\n";

    fn write_bars(dir: &tempfile::TempDir, rows: &str) -> PathBuf {
        let path = dir.path().join("bars.csv");
        std::fs::write(&path, format!("{HEADER}{rows}")).unwrap();
        path
    }

    #[test]
    fn bars_are_sorted_by_date() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_bars(
            &dir,
            "2024-01-03,10,11,9,10.5,1000\n2024-01-02,10,11,9,10,900\n",
        );
        let bars = read_bars(&path).unwrap();
        assert_eq!(bars.len(), 2);
        assert!(bars[0].date < bars[1].date);
    }

    #[test]
    fn malformed_bar_fails_the_load() {
        let dir = tempfile::tempdir().unwrap();
        // high below low on the second row
        let path = write_bars(
            &dir,
            "2024-01-02,10,11,9,10,900\n2024-01-03,10,8,9,10.5,1000\n",
        );
        let err = read_bars(&path).unwrap_err().to_string();
        assert!(err.contains("row 2"), "{err}");
        assert!(err.contains("2024-01-03"), "{err}");
    }
}
