//! Command-line shell for the rotation calculator.
//!
//! Every subcommand maps onto one JSON command. The response is printed to
//! stdout as pretty JSON; logs go to stderr (`RUST_LOG` controls the level).

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use rotation_calc::{GameData, invoke};
use serde_json::{Value, json};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "rotation-calc", version, about = "Team rotation damage calculator")]
struct Cli {
    /// Directory holding characters.json, builds.json, scenarios.json, ...
    #[arg(long, global = true, default_value = "data")]
    data_dir: PathBuf,

    /// Loop cycles to project; overrides config.json.
    #[arg(long, global = true)]
    loops: Option<u32>,

    /// Monte Carlo runs; overrides config.json.
    #[arg(long, global = true)]
    runs: Option<usize>,

    /// Base seed for rolled crits; overrides config.json.
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the loaded data and the echo stat tables.
    Bootstrap,

    /// Resolve the stats of one saved build.
    Stats {
        build: String,
    },

    /// Show every buff and skill a scenario's team contributes.
    Team {
        scenario: String,
    },

    /// Annotate a scenario's actions with buffs and energy meters.
    Rotation {
        scenario: String,
    },

    /// Expected damage of a scenario.
    Damage {
        scenario: String,

        /// Leave this buff key out, to measure what it contributes.
        #[arg(long)]
        ignore_buff: Option<String>,
    },

    /// Damage distribution with rolled crits.
    Simulate {
        scenario: String,
    },

    /// Rank loadouts drawn from a JSON file of owned echoes.
    Optimize {
        scenario: String,

        /// JSON array of echoes.
        #[arg(long)]
        owned: PathBuf,

        /// Character to optimize; defaults to the first team member.
        #[arg(long)]
        character: Option<String>,

        /// Cost combination like 4-3-3-1-1; repeatable.
        #[arg(long = "combo")]
        combos: Vec<String>,

        #[arg(long, default_value_t = 5)]
        top_k: usize,
    },

    /// Rank loadouts generated from the echo stat tables.
    Theoretical {
        scenario: String,

        /// JSON build search: cost_combos, subs_per_echo, sub_stats, main_stats, ...
        #[arg(long)]
        search: PathBuf,

        /// Character to optimize; defaults to the first team member.
        #[arg(long)]
        character: Option<String>,

        #[arg(long, default_value_t = 5)]
        top_k: usize,
    },

    /// Run any command with a raw JSON payload (`-` reads stdin).
    Invoke {
        command: String,
        #[arg(default_value = "{}")]
        payload: String,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("failed to load data: {0}")]
    Load(#[from] rotation_calc::StoreError),
    #[error(transparent)]
    Command(#[from] rotation_calc::CommandError),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

fn read_json(path: &Path) -> Result<Value, CliError> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn raw_payload(payload: &str) -> Result<Value, CliError> {
    if payload == "-" {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        return Ok(serde_json::from_str(&text)?);
    }
    Ok(serde_json::from_str(payload)?)
}

fn request(command: Command) -> Result<(String, Value), CliError> {
    let request = match command {
        Command::Bootstrap => ("bootstrap".to_string(), Value::Null),
        Command::Stats { build } => ("resolve_stats".to_string(), json!({ "buildName": build })),
        Command::Team { scenario } => ("aggregate_team".to_string(), json!({ "scenario": scenario })),
        Command::Rotation { scenario } => {
            ("simulate_rotation".to_string(), json!({ "scenario": scenario }))
        }
        Command::Damage {
            scenario,
            ignore_buff,
        } => (
            "compute_damage".to_string(),
            json!({ "scenario": scenario, "ignoredBuff": ignore_buff }),
        ),
        Command::Simulate { scenario } => ("simulate_rng".to_string(), json!({ "scenario": scenario })),
        Command::Optimize {
            scenario,
            owned,
            character,
            combos,
            top_k,
        } => {
            let mut payload = json!({
                "scenario": scenario,
                "ownedEchoes": read_json(&owned)?,
                "character": character,
                "topK": top_k,
            });
            if !combos.is_empty() {
                payload["costCombos"] = json!(combos);
            }
            ("optimize_echoes".to_string(), payload)
        }
        Command::Theoretical {
            scenario,
            search,
            character,
            top_k,
        } => (
            "optimize_theoretical".to_string(),
            json!({
                "scenario": scenario,
                "search": read_json(&search)?,
                "character": character,
                "topK": top_k,
            }),
        ),
        Command::Invoke { command, payload } => (command, raw_payload(&payload)?),
    };
    Ok(request)
}

fn run(cli: Cli) -> Result<Value, CliError> {
    let mut data = GameData::load_dir(&cli.data_dir)?;
    if let Some(loops) = cli.loops {
        data.config.loop_count = loops;
    }
    if let Some(runs) = cli.runs {
        data.config.simulation_runs = runs;
    }
    if let Some(seed) = cli.seed {
        data.config.rng_seed = seed;
    }

    let (command, payload) = request(cli.command)?;
    debug!(command = command.as_str(), "dispatching");
    Ok(invoke(&command, payload, &data)?)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(response) => match serde_json::to_string_pretty(&response) {
            Ok(text) => {
                println!("{text}");
                ExitCode::SUCCESS
            }
            Err(err) => {
                eprintln!("Error: {err}");
                ExitCode::FAILURE
            }
        },
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}
