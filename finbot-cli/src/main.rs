//! FinBot CLI: watch a tank, trade on the fish.
//!
//! Commands:
//! - `run`: start the tracking loop (stop with `q` + Enter)
//! - `market-status`: report whether the exchange gate is open
//! - `quotes`: fetch last prices for symbols
//! - `symbols`: print the configured symbol universe

use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use finbot_core::data::{CircuitBreaker, QuoteSource, YahooQuoteSource};
use finbot_core::engine::MachineEvent;
use finbot_core::market_hours::GateMode;
use finbot_runner::config::SinkConfig;
use finbot_runner::{RunOptions, StopReason, TickReport, Tracker, TrackerConfig};

const DEFAULT_CONFIG: &str = "finbot.toml";

#[derive(Parser)]
#[command(
    name = "finbot",
    about = "FinBot: a fish picks the trades, the market clock decides when"
)]
struct Cli {
    /// Append logs to this file instead of stderr.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the tracking loop until `q` + Enter, max frames, or the frames run out.
    Run {
        /// Path to a TOML config file. Defaults to ./finbot.toml when present.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the frame directory (replays images, no live camera).
        #[arg(long, conflicts_with = "device")]
        frames: Option<PathBuf>,

        /// Capture live from /dev/video<N>.
        #[arg(long)]
        device: Option<usize>,

        /// Stop after this many ticks.
        #[arg(long)]
        max_frames: Option<u64>,

        /// Ignore exchange hours.
        #[arg(long, default_value_t = false)]
        always_open: bool,

        /// Keep trades in memory instead of the configured sink.
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    /// Report whether the market gate is open.
    MarketStatus {
        #[arg(long)]
        config: Option<PathBuf>,

        /// Instant to check (RFC 3339). Defaults to now.
        #[arg(long)]
        at: Option<String>,
    },
    /// Fetch the latest price for each symbol.
    Quotes {
        /// Symbols to price. Defaults to the configured universe.
        symbols: Vec<String>,

        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the symbol universe.
    Symbols {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_deref())?;

    match cli.command {
        Commands::Run {
            config,
            frames,
            device,
            max_frames,
            always_open,
            dry_run,
        } => run_tracker(config, frames, device, max_frames, always_open, dry_run),
        Commands::MarketStatus { config, at } => run_market_status(config, at),
        Commands::Quotes { symbols, config } => run_quotes(symbols, config),
        Commands::Symbols { config } => run_symbols(config),
    }
}

fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };
    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter())
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter())
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

/// Explicit path, else ./finbot.toml if it exists, else built-in defaults.
fn load_config(path: Option<PathBuf>) -> Result<TrackerConfig> {
    match path {
        Some(path) => TrackerConfig::from_file(&path)
            .with_context(|| format!("loading config {}", path.display())),
        None if Path::new(DEFAULT_CONFIG).exists() => {
            TrackerConfig::from_file(Path::new(DEFAULT_CONFIG))
                .with_context(|| format!("loading config {DEFAULT_CONFIG}"))
        }
        None => Ok(TrackerConfig::default()),
    }
}

fn run_tracker(
    config_path: Option<PathBuf>,
    frames: Option<PathBuf>,
    device: Option<usize>,
    max_frames: Option<u64>,
    always_open: bool,
    dry_run: bool,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(dir) = frames {
        config.camera.dir = dir;
        config.camera.device = None;
    }
    if device.is_some() {
        config.camera.device = device;
    }
    if max_frames.is_some() {
        config.camera.max_frames = max_frames;
    }
    if always_open {
        config.market.gate = GateMode::AlwaysOpen;
    }
    if dry_run {
        config.sink = SinkConfig::Memory;
    }

    let mut tracker = Tracker::from_config(&config)?;
    let stop = spawn_stop_listener();

    println!("Tracking. Type q and press Enter to stop.");
    let opts = RunOptions {
        max_frames: config.camera.max_frames,
        frame_interval: config.camera.frame_interval(),
    };
    let on_tick: &dyn Fn(&TickReport) = &print_trade;
    let outcome = tracker.run(&opts, Some(stop.as_ref()), Utc::now, Some(on_tick));

    let s = &outcome.summary;
    println!();
    println!("=== Run Summary ===");
    println!("Ticks:                {}", s.ticks);
    println!("Candidates started:   {}", s.candidates_started);
    println!("Candidates cancelled: {}", s.candidates_cancelled);
    println!("Market resets:        {}", s.market_resets);
    println!("Trades committed:     {}", s.trades_committed);
    println!("Trades stored:        {}", s.trades_stored);
    println!("Sink failures:        {}", s.sink_failures);
    println!("Quote failures:       {}", s.quote_failures);

    if let StopReason::Failed(message) = outcome.reason {
        bail!("tracking stopped: {message}");
    }
    Ok(())
}

fn print_trade(report: &TickReport) {
    if let MachineEvent::Committed(trade) = &report.event {
        let price = trade
            .price
            .map_or_else(|| "n/a".to_string(), |p| format!("{p:.2}"));
        println!(
            "{}  {:<4} {:<6} @ {:>10}  ({}, {})",
            trade.timestamp.format("%Y-%m-%d %H:%M:%S"),
            trade.decision,
            trade.stock,
            price,
            trade.position_x,
            trade.position_y
        );
    }
}

/// Raise the returned flag when a line starting with `q` arrives on stdin.
fn spawn_stop_listener() -> Arc<AtomicBool> {
    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) if line.trim().eq_ignore_ascii_case("q") => {
                    info!("stop requested");
                    flag.store(true, Ordering::Relaxed);
                    return;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "stdin closed, stop key unavailable");
                    return;
                }
            }
        }
    });
    stop
}

fn run_market_status(config_path: Option<PathBuf>, at: Option<String>) -> Result<()> {
    let config = load_config(config_path)?;
    let now = match at {
        Some(s) => DateTime::parse_from_rfc3339(&s)
            .with_context(|| format!("parsing --at {s}"))?
            .with_timezone(&Utc),
        None => Utc::now(),
    };
    let hours = config.market.hours()?;
    let schedule = config.market.schedule()?;

    println!("UTC:        {}", now.format("%Y-%m-%d %H:%M:%S"));
    println!(
        "Exchange:   {} ({})",
        hours.local(now).format("%a %Y-%m-%d %H:%M:%S"),
        hours.timezone()
    );
    println!("Session:    {} - {}", hours.open_time(), hours.close_time());
    if config.market.gate == GateMode::AlwaysOpen {
        println!("Gate:       always open (override)");
    }
    println!(
        "Status:     {}",
        if schedule.is_open(now) { "OPEN" } else { "CLOSED" }
    );
    Ok(())
}

fn run_quotes(symbols: Vec<String>, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;
    let symbols = if symbols.is_empty() {
        config.symbols.load()?.symbols().to_vec()
    } else {
        symbols
    };

    let breaker = Arc::new(CircuitBreaker::default_provider());
    let source = YahooQuoteSource::new(breaker, Duration::from_secs(config.quotes.timeout_secs))?
        .with_retries(
            config.quotes.max_retries,
            Duration::from_millis(config.quotes.retry_delay_ms),
        );

    let mut failures = 0;
    for symbol in &symbols {
        match source.last_price(symbol) {
            Ok(price) => println!("{symbol:<8} {price:>12.2}"),
            Err(e) => {
                failures += 1;
                eprintln!("{symbol:<8} error: {e}");
            }
        }
    }
    if failures == symbols.len() && !symbols.is_empty() {
        bail!("no quotes retrieved");
    }
    Ok(())
}

fn run_symbols(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;
    let universe = config.symbols.load()?;
    for symbol in universe.symbols() {
        println!("{symbol}");
    }
    eprintln!("{} symbols", universe.len());
    Ok(())
}
