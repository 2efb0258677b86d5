//! Confluence CLI — replay, leadership export, and config tooling.
//!
//! Commands:
//! - `replay` — run a paired JSONL feed through the decision pipeline
//! - `leadership` — export leadership snapshots for a paired feed
//! - `gate` — replay a feed, then evaluate the leadership gate for one side
//! - `check-config` — validate an engine config and print its fingerprint
//! - `simulate` — write a seeded synthetic paired feed

mod feed;
mod logging;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use confluence_core::components::{LeadershipTracker, RegimeAdapter};
use confluence_core::config::EngineConfig;
use confluence_core::domain::{Instrument, LevelSet, Side};
use confluence_core::engine::{DecisionOrchestrator, PipelineStats, Stage};
use confluence_core::synthetic::{SyntheticFeed, SyntheticParams};

use feed::{read_frames, JsonlWriter};

#[derive(Parser)]
#[command(
    name = "confluence",
    about = "Confluence CLI — multi-factor decision pipeline tooling"
)]
struct Cli {
    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true, default_value_t = false)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a paired JSONL feed through the decision pipeline.
    Replay {
        /// Paired feed, one `{primary, secondary}` frame per line.
        #[arg(long)]
        feed: PathBuf,

        /// Reference levels (TOML).
        #[arg(long)]
        levels: PathBuf,

        /// Engine config (TOML). Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write every DecisionResult as JSONL here.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Export leadership snapshots for a paired feed.
    Leadership {
        #[arg(long)]
        feed: PathBuf,

        /// Output JSONL. Defaults to stdout.
        #[arg(long)]
        out: Option<PathBuf>,

        /// Maximum timestamp skew between legs, in milliseconds.
        #[arg(long, default_value_t = 200)]
        max_delay_ms: i64,
    },
    /// Replay a feed, then evaluate the leadership gate for one side.
    Gate {
        #[arg(long)]
        feed: PathBuf,

        #[arg(long, value_enum)]
        side: SideArg,

        /// Volatility index used to pick the regime. MID when omitted.
        #[arg(long)]
        vix: Option<f64>,

        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Validate an engine config and print its fingerprint.
    CheckConfig {
        #[arg(long)]
        config: PathBuf,

        /// Also print the normalized config with every default filled in.
        #[arg(long, default_value_t = false)]
        print: bool,
    },
    /// Write a seeded synthetic paired feed.
    Simulate {
        #[arg(long, default_value_t = 42)]
        seed: u64,

        #[arg(long, default_value_t = 3600)]
        frames: usize,

        #[arg(long)]
        out: PathBuf,

        /// Per-step drift of the secondary leg, as a fraction of price.
        #[arg(long, default_value_t = 0.0)]
        drift: f64,

        /// Volatility index stamped on every primary snapshot.
        #[arg(long)]
        vix: Option<f64>,

        /// First frame timestamp (RFC 3339).
        #[arg(long)]
        start: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SideArg {
    Long,
    Short,
}

impl From<SideArg> for Side {
    fn from(arg: SideArg) -> Self {
        match arg {
            SideArg::Long => Side::Long,
            SideArg::Short => Side::Short,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logger(cli.log_json);

    match cli.command {
        Commands::Replay { feed, levels, config, out } => {
            run_replay(&feed, &levels, config.as_deref(), out.as_deref())
        }
        Commands::Leadership { feed, out, max_delay_ms } => {
            run_leadership(&feed, out.as_deref(), max_delay_ms)
        }
        Commands::Gate { feed, side, vix, config } => {
            run_gate(&feed, side.into(), vix, config.as_deref())
        }
        Commands::CheckConfig { config, print } => run_check_config(&config, print),
        Commands::Simulate { seed, frames, out, drift, vix, start } => {
            run_simulate(seed, frames, &out, drift, vix, start.as_deref())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

fn run_replay(
    feed_path: &Path,
    levels_path: &Path,
    config_path: Option<&Path>,
    out: Option<&Path>,
) -> Result<()> {
    let config = load_config(config_path)?;
    let levels = LevelSet::from_file(levels_path)
        .with_context(|| format!("loading levels {}", levels_path.display()))?;
    let frames = read_frames(feed_path)?;
    if frames.is_empty() {
        bail!("feed {} has no frames", feed_path.display());
    }

    let mut orch = DecisionOrchestrator::new(config)?;
    tracing::info!(
        config = orch.config_hash().short(),
        levels = levels.len(),
        frames = frames.len(),
        "replay started"
    );

    let mut writer = out.map(|p| JsonlWriter::create(Some(p))).transpose()?;
    for frame in &frames {
        let result = orch.step(&frame.primary, &frame.secondary, &levels);
        if let Some(w) = writer.as_mut() {
            w.write(&result)?;
        }
    }
    if let Some(w) = writer {
        let lines = w.finish()?;
        tracing::info!(lines, "decisions written");
    }

    print_stats(orch.stats());
    Ok(())
}

fn print_stats(stats: &PipelineStats) {
    println!();
    println!("=== Replay Summary ===");
    println!("Calls:          {}", stats.calls);
    println!("Pairs accepted: {}", stats.pairs_accepted);
    println!("Pairs skipped:  {}", stats.pairs_skipped);
    println!("Triggers:       {}", stats.triggers);
    println!("Decisions:      {}", stats.decisions);
    println!("Success rate:   {:.2}%", stats.success_rate() * 100.0);
    println!("Mean latency:   {:.1} µs", stats.mean_latency_us());
    println!("Max latency:    {} µs", stats.max_latency_us);
    println!();
    println!("{:<20} {:>10} {:>10}", "Stage", "Passed", "Rejected");
    for stage in Stage::ALL {
        println!(
            "{:<20} {:>10} {:>10}",
            stage.as_str(),
            stats.passed_at(stage),
            stats.rejected_at(stage)
        );
    }
}

fn run_leadership(feed_path: &Path, out: Option<&Path>, max_delay_ms: i64) -> Result<()> {
    if max_delay_ms < 0 {
        bail!("--max-delay-ms must be non-negative (got {max_delay_ms})");
    }
    let frames = read_frames(feed_path)?;
    let config = EngineConfig::default();
    let mut tracker = LeadershipTracker::new(config.leadership);
    let max_delay = Duration::milliseconds(max_delay_ms);

    let mut writer = JsonlWriter::create(out)?;
    let mut skipped = 0usize;
    for frame in &frames {
        match tracker.update_from_paired_inputs(&frame.primary, &frame.secondary, max_delay) {
            Ok(snapshot) => writer.write(&snapshot)?,
            Err(err) => {
                skipped += 1;
                tracing::debug!(%err, "pair skipped");
            }
        }
    }
    let written = writer.finish()?;
    tracing::info!(written, skipped, ls = tracker.ls(), beta = tracker.beta(), "leadership export done");
    Ok(())
}

fn run_gate(
    feed_path: &Path,
    side: Side,
    vix: Option<f64>,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = load_config(config_path)?;
    let frames = read_frames(feed_path)?;
    let max_delay = Duration::milliseconds(config.leadership.max_pair_delay_ms);
    let mut tracker = LeadershipTracker::new(config.leadership.clone());
    for frame in &frames {
        if let Err(err) = tracker.update_from_paired_inputs(&frame.primary, &frame.secondary, max_delay)
        {
            tracing::debug!(%err, "pair skipped");
        }
    }

    let adapter = RegimeAdapter::new(config.breakpoints.clone(), config.regimes.clone());
    let (reading, thresholds) = adapter.adapt(vix);
    let gate = tracker.gate(side, reading.regime, &thresholds.leadership);

    println!("Side:         {side}");
    println!("Regime:       {}{}", reading.regime, if reading.defaulted { " (default)" } else { "" });
    println!("LS:           {:.4}", gate.ls);
    match gate.correlation {
        Some(corr) => println!("Correlation:  {corr:.4} ({} samples)", tracker.correlation_samples()),
        None => println!("Correlation:  n/a ({} samples)", tracker.correlation_samples()),
    }
    println!("Allow:        {}", gate.allow);
    println!("Hard block:   {}", gate.hard_block);
    println!("Bypassed:     {}", gate.bypassed);
    println!("Bonus:        {:.2}", gate.bonus);
    println!("Extra conf.:  {}", gate.extra_confirmations);
    println!("Reason:       {}", gate.reason);
    Ok(())
}

fn run_check_config(path: &Path, print: bool) -> Result<()> {
    let config = EngineConfig::from_file(path)
        .with_context(|| format!("validating {}", path.display()))?;
    println!("{}: ok", path.display());
    println!("Fingerprint: {}", config.config_hash());
    if print {
        println!();
        print!("{}", config.to_toml_string()?);
    }
    Ok(())
}

fn run_simulate(
    seed: u64,
    frames: usize,
    out: &Path,
    drift: f64,
    vix: Option<f64>,
    start: Option<&str>,
) -> Result<()> {
    let mut params = SyntheticParams { secondary_drift: drift, ..SyntheticParams::default() };
    if vix.is_some() {
        params.volatility_index = vix;
    }
    if let Some(start) = start {
        params.start = DateTime::parse_from_rfc3339(start)
            .with_context(|| format!("invalid --start '{start}'"))?
            .with_timezone(&Utc);
    }

    let mut writer = JsonlWriter::create(Some(out))?;
    for frame in SyntheticFeed::new(seed, params, Instrument::es()).take(frames) {
        writer.write(&frame)?;
    }
    let written = writer.finish()?;
    println!("Wrote {written} frames to {}", out.display());
    Ok(())
}
