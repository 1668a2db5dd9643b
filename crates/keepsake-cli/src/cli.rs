use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use keepsake_core::VERSION;

/// Keepsake - protect notes and vault content with a passphrase
#[derive(Parser)]
#[command(name = "keepsake")]
#[command(author, version = VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory holding Keepsake records
    #[arg(short, long, global = true, env = "KEEPSAKE_DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set the master passphrase
    Init(InitArgs),

    /// Authenticate and print a session id
    Unlock(UnlockArgs),

    /// Destroy a session
    Logout {
        /// Session id to destroy
        #[arg(value_name = "SESSION_ID")]
        session_id: String,
    },

    /// Replace the master passphrase
    ChangePassphrase(ChangePassphraseArgs),

    /// Session maintenance
    #[command(subcommand)]
    Session(SessionCommands),

    /// Encrypted note operations
    #[command(subcommand)]
    Note(NoteCommands),

    /// Generate a strong random password
    Pwgen(PwgenArgs),
}

/// Arguments for the `init` command
#[derive(Args)]
pub struct InitArgs {
    /// Recovery hint stored in plaintext alongside the record
    #[arg(long)]
    pub hint: Option<String>,
}

/// Arguments for the `unlock` command
#[derive(Args)]
pub struct UnlockArgs {
    /// Print the full response as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `change-passphrase` command
#[derive(Args)]
pub struct ChangePassphraseArgs {
    /// Replace the recovery hint (otherwise the existing one is kept)
    #[arg(long)]
    pub hint: Option<String>,
}

#[derive(Subcommand)]
pub enum SessionCommands {
    /// Check a session id and refresh its activity stamp
    Validate {
        /// Session id to validate
        #[arg(value_name = "SESSION_ID")]
        session_id: String,

        /// Print the full response as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove expired and idle sessions
    Cleanup,
}

#[derive(Subcommand)]
pub enum NoteCommands {
    /// Encrypt plaintext into a self-contained note record
    Encrypt {
        /// Plaintext file (stdin if omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Destination for the JSON record (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Password hint stored in plaintext on the record
        #[arg(long)]
        hint: Option<String>,
    },

    /// Decrypt a note record back to plaintext
    Decrypt {
        /// JSON record file (stdin if omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Destination for the plaintext (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Re-encrypt a note under a new password
    Rekey {
        /// JSON record file (stdin if omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Destination for the new record (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Replace the hint (otherwise the existing one is kept)
        #[arg(long)]
        hint: Option<String>,
    },

    /// Remove protection, turning the record back into plaintext
    Strip {
        /// JSON record file (stdin if omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Destination for the plaintext (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Arguments for the `pwgen` command
#[derive(Args)]
pub struct PwgenArgs {
    /// Length of the generated password
    #[arg(long, default_value_t = keepsake_core::crypto::DEFAULT_GENERATED_LENGTH)]
    pub length: usize,
}
