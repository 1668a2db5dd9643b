//! Keepsake CLI - command-line front end for the Keepsake core.
//!
//! Wires a file-backed record store to the authentication gate and the note
//! envelope. See `keepsake --help` for the command surface.

mod cli;
mod commands;
mod prompt;

use std::path::{Path, PathBuf};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use keepsake_core::{AuthGate, GateConfig, JsonFileStore, NoteEnvelope};

use cli::{Cli, Commands, SessionCommands};

fn main() {
    init_logging();

    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };

    match cli.command {
        Commands::Init(args) => commands::auth::init(&open_gate(&data_dir)?, &args),
        Commands::Unlock(args) => commands::auth::unlock(&open_gate(&data_dir)?, &args),
        Commands::Logout { session_id } => {
            commands::auth::logout(&open_gate(&data_dir)?, &session_id)
        }
        Commands::ChangePassphrase(args) => {
            commands::auth::change_passphrase(&open_gate(&data_dir)?, &args)
        }
        Commands::Session(SessionCommands::Validate { session_id, json }) => {
            commands::session::validate(&open_gate(&data_dir)?, &session_id, json)
        }
        Commands::Session(SessionCommands::Cleanup) => {
            commands::session::cleanup(&open_gate(&data_dir)?)
        }
        Commands::Note(command) => commands::note::run(&NoteEnvelope::default(), command),
        Commands::Pwgen(args) => commands::misc::pwgen(&args),
    }
}

fn open_gate(data_dir: &Path) -> anyhow::Result<AuthGate<JsonFileStore>> {
    let store = JsonFileStore::open(data_dir)?;
    Ok(AuthGate::new(store, GateConfig::default()))
}

fn default_data_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var_os("HOME")
        .ok_or_else(|| anyhow::anyhow!("HOME is not set; pass --data-dir"))?;
    Ok(PathBuf::from(home).join(".keepsake"))
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("KEEPSAKE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
