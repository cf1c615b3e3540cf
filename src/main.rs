use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use runconf::{DEFAULT_MAX_DEPTH, Generator, Limits};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

pub type Result<T> = anyhow::Result<T>;

#[derive(Parser)]
#[command(name = "runconf")]
#[command(about = "Expand experiment config templates", long_about = None)]
struct Cli {
    /// Maximum nesting depth for expansion and directive lookups.
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve all directives and print the merged config.
    Expand {
        #[arg(long)]
        config: PathBuf,

        /// Print every concrete variant instead of the merged config.
        #[arg(long)]
        variants: bool,
    },

    /// Print the experiments stored under one key, with trial expressions resolved.
    Experiments {
        #[arg(long)]
        config: PathBuf,

        #[arg(long)]
        key: String,
    },
}

/// Read a YAML or JSON config file (JSON is valid YAML).
fn load_config(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_yaml::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "runconf=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let generator = Generator::new(Limits::with_max_depth(cli.max_depth));

    match cli.cmd {
        Commands::Expand { config, variants } => {
            let raw = load_config(&config)?;
            let output = if variants {
                let variants = generator
                    .expand(&raw)
                    .with_context(|| format!("failed to expand {}", config.display()))?;
                serde_json::to_string_pretty(&variants)?
            } else {
                let merged = generator
                    .transform(&raw)
                    .with_context(|| format!("failed to transform {}", config.display()))?;
                serde_json::to_string_pretty(&merged)?
            };
            println!("{}", output);
        }
        Commands::Experiments { config, key } => {
            let raw = load_config(&config)?;
            let merged = generator
                .transform(&raw)
                .with_context(|| format!("failed to transform {}", config.display()))?;

            let Some(value) = merged.get(&key) else {
                bail!("{} has no top-level key {:?}", config.display(), key);
            };
            let Some(experiments) = value.experiments() else {
                bail!("{:?} holds {}, not experiments", key, value.kind());
            };
            let experiments = generator
                .materialize(&experiments)
                .with_context(|| format!("failed to materialize experiments in {:?}", key))?;
            println!("{}", serde_json::to_string_pretty(&experiments)?);
        }
    }

    Ok(())
}
