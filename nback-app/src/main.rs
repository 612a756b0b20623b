mod app;
mod player;
mod settings;

use std::{fs, path::PathBuf};

use anyhow::{Context, Result, ensure};
use clap::{Args, Parser, Subcommand};
use nback_engine::{PacingMode, RoundMode, SessionConfig};
use nback_timing::{HighPrecisionTimer, ManualTimer};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use app::App;
use player::PlayerProfile;

#[derive(Parser, Debug)]
#[command(name = "dual-nback", version, about = "Dual N-back trial engine")]
struct Cli {
    /// TOML settings file; ./nback.toml is read when present
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one session against a simulated player and print its result as JSON
    Simulate(SimulateArgs),
    /// Print a generated sequence as JSON
    Sequence(SessionArgs),
}

#[derive(Args, Debug)]
struct SessionArgs {
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    n: Option<usize>,
    /// Fixed trial count, replacing the configured round mode
    #[arg(long)]
    rounds: Option<usize>,
    /// standard, dynamic or self-paced
    #[arg(long)]
    pacing: Option<PacingMode>,
    /// Draw each trial's lag from the configured weights
    #[arg(long)]
    variable: bool,
}

impl SessionArgs {
    fn apply(&self, config: &mut SessionConfig) {
        if let Some(n) = self.n {
            config.n = n;
        }
        if let Some(count) = self.rounds {
            config.rounds = RoundMode::Custom { count };
        }
        if let Some(pacing) = self.pacing {
            config.pacing = pacing;
        }
        if self.variable {
            config.variable_mode = true;
        }
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        }
    }
}

#[derive(Args, Debug)]
struct SimulateArgs {
    #[command(flatten)]
    session: SessionArgs,
    /// Chance of answering each modality correctly
    #[arg(long, default_value_t = 0.9)]
    accuracy: f64,
    /// Share of target presses delivered inside the next trial's grace window
    #[arg(long, default_value_t = 0.0)]
    late_rate: f64,
    /// Run on the wall clock instead of a virtual one
    #[arg(long)]
    realtime: bool,
    /// Stop after this many resolved trials
    #[arg(long)]
    stop_after: Option<usize>,
    /// Write the result here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = settings::load_settings(cli.config.as_deref())?;

    match cli.command {
        Command::Simulate(args) => simulate(config, args),
        Command::Sequence(args) => sequence(config, args),
    }
}

fn simulate(mut config: SessionConfig, args: SimulateArgs) -> Result<()> {
    args.session.apply(&mut config);
    ensure!(
        (0.0..=1.0).contains(&args.accuracy),
        "--accuracy must be between 0 and 1, got {}",
        args.accuracy
    );
    ensure!(
        (0.0..=1.0).contains(&args.late_rate),
        "--late-rate must be between 0 and 1, got {}",
        args.late_rate
    );

    let profile = PlayerProfile::new(args.accuracy, args.late_rate);
    let rng = args.session.rng();
    let result = if args.realtime {
        App::new(config, HighPrecisionTimer::new(), rng, profile, args.stop_after)?.run()?
    } else {
        App::new(config, ManualTimer::new(), rng, profile, args.stop_after)?.run()?
    };

    let json =
        serde_json::to_string_pretty(&result).context("failed to serialize session result")?;
    match &args.output {
        Some(path) => {
            fs::write(path, json)
                .with_context(|| format!("failed to write result to '{}'", path.display()))?;
            info!(path = %path.display(), "result written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn sequence(mut config: SessionConfig, args: SessionArgs) -> Result<()> {
    args.apply(&mut config);
    config.validate().context("invalid session configuration")?;

    let generator = config.generator();
    let sequence = generator.generate(&mut args.rng());
    info!(
        trials = sequence.len(),
        effective_difficulty = generator.effective_difficulty(),
        "sequence generated"
    );
    println!(
        "{}",
        serde_json::to_string_pretty(&sequence).context("failed to serialize sequence")?
    );
    Ok(())
}
