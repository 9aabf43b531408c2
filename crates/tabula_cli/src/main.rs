//! `tabula` command line.
//!
//! # Usage
//!
//! ```bash
//! tabula --uri sqlite:///var/data/app.db datasets
//! tabula --config repo.json count people
//! tabula --uri sqlite:///var/data/app.db dump people --where name=ada
//! ```

use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use std::process::ExitCode;
use tabula_core::{
    default_log_level, init_logging, AdapterRegistry, ConfigError, Filter, RepoError, Repository,
    RepositoryConfig,
};

#[derive(Parser)]
#[command(name = "tabula")]
#[command(version)]
#[command(about = "Inspect tabular data sources through the repository layer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Connection URI, e.g. sqlite:///var/data/app.db
    #[arg(long, global = true, conflicts_with = "config")]
    uri: Option<String>,

    /// JSON repository config with adapter, uri and options
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// trace, debug, info, warn or error
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Write rotating log files here instead of stderr
    #[arg(long, global = true)]
    log_dir: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List dataset names captured at connect time
    Datasets,

    /// Count rows of a dataset
    Count {
        dataset: String,

        /// Equality condition `column=value`; repeatable
        #[arg(long = "where", value_name = "COLUMN=VALUE")]
        conditions: Vec<String>,
    },

    /// Print rows of a dataset as JSON lines
    Dump {
        dataset: String,

        /// Equality condition `column=value`; repeatable
        #[arg(long = "where", value_name = "COLUMN=VALUE")]
        conditions: Vec<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = cli.log_level.as_deref().unwrap_or(default_log_level());
    if let Err(err) = init_logging(level, cli.log_dir.as_deref()) {
        eprintln!("error: {err}");
        return ExitCode::FAILURE;
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            log::error!("event=cli_run module=cli status=error error={message}");
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let mut repo = connect(cli).map_err(|err| err.to_string())?;
    let outcome = execute(&repo, &cli.command);
    repo.disconnect().map_err(|err| err.to_string())?;
    outcome
}

fn connect(cli: &Cli) -> Result<Repository, RepoError> {
    let adapters = AdapterRegistry::with_defaults();
    let config = match (&cli.config, &cli.uri) {
        (Some(path), _) => RepositoryConfig::load(path)?,
        (None, Some(uri)) => RepositoryConfig::new(uri.clone()),
        (None, None) => return Err(RepoError::Config(ConfigError::MissingUri)),
    };
    Repository::from_config(&config, &adapters)
}

fn execute(repo: &Repository, command: &Commands) -> Result<(), String> {
    match command {
        Commands::Datasets => {
            for name in repo.schema().names() {
                println!("{name}");
            }
        }
        Commands::Count {
            dataset,
            conditions,
        } => {
            let filter = parse_filter(conditions)?;
            let count = repo
                .dataset(dataset)
                .and_then(|handle| Ok(handle.count(&filter)?))
                .map_err(|err| err.to_string())?;
            println!("{count}");
        }
        Commands::Dump {
            dataset,
            conditions,
        } => {
            let filter = parse_filter(conditions)?;
            let rows = repo
                .relation(dataset)
                .find(&filter)
                .map_err(|err| err.to_string())?;
            for row in rows {
                let line = serde_json::to_string(&row).map_err(|err| err.to_string())?;
                println!("{line}");
            }
        }
    }
    Ok(())
}

/// Parses `column=value` pairs; values are read as JSON when they parse,
/// otherwise as plain strings.
fn parse_filter(conditions: &[String]) -> Result<Filter, String> {
    let mut filter = Filter::all();
    for condition in conditions {
        let (column, raw) = condition
            .split_once('=')
            .ok_or_else(|| format!("condition `{condition}` must be COLUMN=VALUE"))?;
        let column = column.trim();
        if column.is_empty() {
            return Err(format!("condition `{condition}` has an empty column"));
        }
        let value = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::from(raw));
        filter = filter.and(column, value);
    }
    Ok(filter)
}
