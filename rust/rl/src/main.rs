use clap::Parser;
use mdp_env::*;
use mdp_rl::config::{Config, Mode};
use mdp_rl::envs::simple_golf;
use rand::prelude::*;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Learns the cheapest way to reach the absorbing state of an MDP.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Transition facts, one `from/action/to/probability` per line.
    /// Defaults to a built-in golf hole.
    facts: Option<PathBuf>,

    /// TOML file with run settings.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(short, long, value_enum)]
    mode: Option<Mode>,

    #[arg(short, long)]
    seed: Option<u64>,

    /// Total episodes of a model-free run.
    #[arg(long)]
    episodes: Option<usize>,

    /// Iteration budget of a model-based run.
    #[arg(long)]
    iterations: Option<usize>,

    /// Print the report as JSON.
    #[arg(long)]
    json: bool,

    /// Raise log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut cfg = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(mode) = args.mode {
        cfg.mode = mode;
    }
    if let Some(seed) = args.seed {
        cfg.seed = Some(seed);
    }
    if let Some(n) = args.episodes {
        cfg.total_episodes = n;
    }
    if let Some(n) = args.iterations {
        cfg.max_iterations = n;
    }
    cfg.validate()?;

    let facts = match &args.facts {
        Some(path) => load_facts(path)?,
        None => simple_golf::course(),
    };
    info!(facts = facts.len(), mode = ?cfg.mode, seed = ?cfg.seed, "starting run");

    let rng = &mut match cfg.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let report = mdp_rl::solve(&facts, &cfg, rng)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{report}");
    }

    Ok(())
}
