//! immulog CLI - Command line interface for immulog
//!
//! Each invocation opens the database, runs one command and exits. The
//! verified commands keep the client's trusted state in a small JSON file
//! so that successive invocations check each other.

use clap::{Parser, Subcommand};
use immulog::{Database, Entry, ImmutableState, KeyValue, Options, TxMetadata};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "immulog")]
#[command(about = "A verifiable, append-only key-value transaction log")]
#[command(version)]
struct Cli {
    /// Directory holding the databases
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Database name
    #[arg(short, long)]
    name: Option<String>,

    /// JSON options file (flags override its values)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// File holding the client's trusted state
    #[arg(long)]
    state_file: Option<PathBuf>,

    /// Output format (json or text)
    #[arg(short, long, default_value = "json")]
    format: OutputFormat,

    /// Log debug events to stderr
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new database
    Init,

    /// Commit one transaction of key=value pairs
    Set {
        /// Entries as key=value
        #[arg(required = true)]
        entries: Vec<String>,
    },

    /// Commit and verify the new transaction against the trusted state
    VerifiedSet {
        /// Entries as key=value
        #[arg(required = true)]
        entries: Vec<String>,
    },

    /// Read the latest value of a key
    Get {
        key: String,
        /// Read as of this transaction id
        #[arg(long)]
        at: Option<u64>,
    },

    /// Read a key and verify it against the trusted state
    VerifiedGet {
        key: String,
        /// Read as of this transaction id
        #[arg(long)]
        at: Option<u64>,
    },

    /// Show every revision of a key
    History {
        key: String,
        /// Newest first
        #[arg(long)]
        desc: bool,
        /// Maximum number of revisions to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show a transaction
    Tx {
        id: u64,
    },

    /// Show the current state (the checkpoint clients trust)
    State,

    /// Recompute every hash in the log
    Verify,

    /// Report whether the database accepts commits
    Health,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let options = load_options(&cli)?;
    let state_file = cli
        .state_file
        .clone()
        .unwrap_or_else(|| options.root_path.join(format!("{}.state.json", options.name)));

    match cli.command {
        Commands::Init => {
            let db = Database::create(options.clone())?;
            db.close()?;
            output(
                &cli.format,
                &serde_json::json!({
                    "status": "ok",
                    "message": format!("Created database at {}", options.db_dir().display())
                }),
            );
        }

        Commands::Set { entries } => {
            let db = Database::open(options)?;
            let md = db.set(parse_entries(&entries)?)?;
            db.close()?;
            output(&cli.format, &tx_json(&md));
        }

        Commands::VerifiedSet { entries } => {
            let db = Database::open(options)?;
            let trusted = load_state(&state_file)?;
            let vtx = db.verifiable_set(parse_entries(&entries)?, trusted.tx_id)?;
            let next = vtx.verify(&trusted)?;
            save_state(&state_file, &next)?;
            db.close()?;
            output(
                &cli.format,
                &serde_json::json!({
                    "verified": true,
                    "tx": tx_json(&vtx.tx),
                    "state": state_json(&next),
                }),
            );
        }

        Commands::Get { key, at } => {
            let db = Database::open(options)?;
            let entry = db.get(key.as_bytes(), at)?;
            output(&cli.format, &entry_json(&entry));
        }

        Commands::VerifiedGet { key, at } => {
            let db = Database::open(options)?;
            let trusted = load_state(&state_file)?;
            let ventry = db.verifiable_get(key.as_bytes(), at, trusted.tx_id)?;
            let next = ventry.verify(&trusted)?;
            save_state(&state_file, &next)?;
            output(
                &cli.format,
                &serde_json::json!({
                    "verified": true,
                    "entry": entry_json(&ventry.entry),
                    "state": state_json(&next),
                }),
            );
        }

        Commands::History { key, desc, limit } => {
            let db = Database::open(options)?;
            let history = db.history(key.as_bytes())?;
            let limit = limit.unwrap_or(usize::MAX);
            let revisions: Vec<_> = if desc {
                history.rev().take(limit).map(|e| entry_json(&e)).collect()
            } else {
                history.take(limit).map(|e| entry_json(&e)).collect()
            };
            output(
                &cli.format,
                &serde_json::json!({
                    "key": key,
                    "count": revisions.len(),
                    "revisions": revisions,
                }),
            );
        }

        Commands::Tx { id } => {
            let db = Database::open(options)?;
            let tx = db.tx_by_id(id)?;
            let entries: Vec<_> = tx
                .entries
                .iter()
                .map(|kv| {
                    serde_json::json!({
                        "key": String::from_utf8_lossy(&kv.key),
                        "value": String::from_utf8_lossy(&kv.value),
                    })
                })
                .collect();
            let mut json = tx_json(&tx.metadata);
            json["entries"] = serde_json::Value::Array(entries);
            output(&cli.format, &json);
        }

        Commands::State => {
            let db = Database::open(options)?;
            output(&cli.format, &state_json(&db.current_state()?));
        }

        Commands::Verify => {
            let db = Database::open(options.with_corruption_checker(true))?;
            let state = db.check_integrity()?;
            output(
                &cli.format,
                &serde_json::json!({
                    "status": "ok",
                    "state": state_json(&state),
                }),
            );
        }

        Commands::Health => {
            let db = Database::open(options)?;
            let health = db.health();
            output(&cli.format, &serde_json::to_value(health)?);
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_options(cli: &Cli) -> anyhow::Result<Options> {
    let mut options = match &cli.config {
        Some(path) => Options::from_json_file(path)?,
        None => Options::default(),
    };
    if let Some(root) = &cli.root {
        options = options.with_root_path(root);
    }
    if let Some(name) = &cli.name {
        options = options.with_name(name);
    }
    options.validate()?;
    Ok(options)
}

fn parse_entries(raw: &[String]) -> anyhow::Result<Vec<KeyValue>> {
    raw.iter()
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => Ok(KeyValue::new(key, value)),
            None => anyhow::bail!("Expected key=value, got: {}", pair),
        })
        .collect()
}

fn load_state(path: &Path) -> anyhow::Result<ImmutableState> {
    if !path.exists() {
        return Ok(ImmutableState::empty());
    }
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn save_state(path: &Path, state: &ImmutableState) -> anyhow::Result<()> {
    std::fs::write(path, serde_json::to_string_pretty(state)?)?;
    Ok(())
}

fn tx_json(md: &TxMetadata) -> serde_json::Value {
    serde_json::json!({
        "id": md.id,
        "timestamp": md.timestamp,
        "entries": md.n_entries,
        "alh": md.alh().to_hex(),
        "entry_root": md.entry_root.to_hex(),
        "tree_root": md.tree_root.to_hex(),
    })
}

fn entry_json(entry: &Entry) -> serde_json::Value {
    serde_json::json!({
        "key": String::from_utf8_lossy(&entry.key),
        "value": String::from_utf8_lossy(&entry.value),
        "tx": entry.tx,
    })
}

fn state_json(state: &ImmutableState) -> serde_json::Value {
    serde_json::json!({
        "tx_id": state.tx_id,
        "alh": state.tx_alh.to_hex(),
        "tree_root": state.tree_root.to_hex(),
    })
}

fn output(format: &OutputFormat, value: &serde_json::Value) {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string(value),
        OutputFormat::Text => serde_json::to_string_pretty(value),
    };
    match rendered {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("Failed to render output: {}", e),
    }
}
