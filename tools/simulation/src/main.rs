//! brokerage-sim: run the simulation scenarios and print or save the report

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use simulation::config::SimulationConfig;
use simulation::export::{build_export, export_json, write_to_file};
use simulation::scenarios::ScenarioKind;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Scenario {
    All,
    Lifecycle,
    RandomFlow,
    Contention,
}

#[derive(Parser, Debug)]
#[command(name = "brokerage-sim")]
#[command(about = "Drive the brokerage ledger and order engine through simulated order flows")]
#[command(version)]
struct Cli {
    /// JSON configuration file; defaults are used when omitted
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write the JSON report here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value_t = Scenario::All)]
    scenario: Scenario,

    /// Override the random flow seed
    #[arg(long)]
    seed: Option<u64>,

    /// Override the number of random flow steps
    #[arg(long)]
    steps: Option<usize>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => SimulationConfig::from_file(path)?,
        None => SimulationConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.rng_seed = seed;
    }
    if let Some(steps) = cli.steps {
        config.random_steps = steps;
    }

    let kinds: Vec<ScenarioKind> = match cli.scenario {
        Scenario::All => ScenarioKind::ALL.to_vec(),
        Scenario::Lifecycle => vec![ScenarioKind::Lifecycle],
        Scenario::RandomFlow => vec![ScenarioKind::RandomFlow],
        Scenario::Contention => vec![ScenarioKind::Contention],
    };

    info!(scenarios = kinds.len(), seed = config.rng_seed, "starting simulation");
    let results: Vec<_> = kinds.into_iter().map(|kind| kind.run(&config)).collect();
    for result in results.iter().filter(|r| !r.passed) {
        warn!(scenario = %result.name, failures = ?result.failures, "scenario failed");
    }

    let export = build_export(&config, results);
    match &cli.output {
        Some(path) => {
            write_to_file(&export, path)
                .with_context(|| format!("writing report to {}", path.display()))?;
            info!(path = %path.display(), "report written");
        }
        None => println!("{}", export_json(&export)?),
    }

    if !export.passed {
        bail!("one or more scenarios failed");
    }
    Ok(())
}
