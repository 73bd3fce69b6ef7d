mod app;
mod logging;
mod report;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use viewseed_config::{AppConfig, ConfigLoader};

#[derive(Parser)]
#[command(
    name = "viewseed",
    version,
    about = "Create the users/products schema and view, seed it and read a row back"
)]
struct Cli {
    /// Config file (YAML or TOML). Defaults to ~/.viewseed/config.{yml,yaml,toml}
    #[arg(long, global = true, env = "VIEWSEED_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database path, or `:memory:`
    #[arg(long, global = true, env = "VIEWSEED_DATABASE")]
    database: Option<String>,

    /// Fixed RNG seed for reproducible data
    #[arg(long, global = true, env = "VIEWSEED_SEED")]
    seed: Option<u64>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Migrate, replace the view, seed and fetch the first view row (default)
    Run,
    /// Migrate the tables and replace the view without seeding
    Migrate,
    /// Print rows from the user/product view
    Rows {
        #[arg(long, default_value_t = 10)]
        limit: u64,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Print user, product and view row counts
    Stats,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut config, source) = load_config(cli.config.as_deref())?;
    if let Some(database) = cli.database {
        config.database.path = Some(database);
    }
    if let Some(seed) = cli.seed {
        config.seed.rng_seed = Some(seed);
    }

    logging::init(&config.log, cli.verbose)?;
    match &source {
        Some(path) => info!("config loaded from {}", path.display()),
        None => debug!("no config file found, using defaults"),
    }

    let db = app::connect(&config.database, || data_dir(&config))?;
    let mut stdout = std::io::stdout().lock();

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => app::run_demo(&db, &config.seed, &mut stdout),
        Command::Migrate => app::migrate(&db, &mut stdout),
        Command::Rows { limit, json } => app::rows(&db, limit, json, &mut stdout),
        Command::Stats => app::stats(&db, &mut stdout),
    }
}

/// `--config` if given, else the first config file under `~/.viewseed`, else defaults.
/// Also returns the file that was read.
fn load_config(explicit: Option<&Path>) -> Result<(AppConfig, Option<PathBuf>)> {
    if let Some(path) = explicit {
        return Ok((ConfigLoader::load_from(path)?, Some(path.to_path_buf())));
    }

    let loader = ConfigLoader::new()?;
    match loader.find() {
        Some(path) => Ok((ConfigLoader::load_from(&path)?, Some(path))),
        None => Ok((AppConfig::default(), None)),
    }
}

/// Only consults the home directory when the config leaves `data_dir` unset.
fn data_dir(config: &AppConfig) -> Result<PathBuf> {
    match &config.data_dir {
        Some(dir) => Ok(dir.clone()),
        None => Ok(ConfigLoader::new()?.data_dir(config)),
    }
}
