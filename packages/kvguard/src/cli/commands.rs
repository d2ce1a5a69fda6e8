//! CLI command definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "kvguard")]
#[command(about = "Back up and restore Azure Key Vault secrets and certificates")]
pub struct Cli {
    /// Name of the Key Vault to operate on (prompts if not provided)
    #[arg(long, global = true)]
    pub vault: Option<String>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Approve all confirmations without prompting (role grants,
    /// clearing a non-empty backup directory)
    #[arg(long, global = true)]
    pub auto_approve: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Subcommand)]
pub enum Commands {
    /// Back up every secret and certificate of a vault to a directory
    ///
    /// The acting identity needs the "Key Vault Secrets Officer" and
    /// "Key Vault Certificates Officer" roles on the vault; missing
    /// roles are granted after confirmation and the command waits for
    /// the grants to propagate before exporting.
    ///
    /// Each item lands in its own file, the kind recorded in the file
    /// name:
    ///   <name>.secret.backup for secrets
    ///   <name>.cert.backup   for certificates
    ///
    /// A non-empty target directory is offered for clearing first. One
    /// item failing to export never aborts the run; the final report
    /// lists every failure.
    ///
    /// Example usage:
    ///   kvguard --vault prod-kv backup --dir ~/kv-backups/prod
    ///   kvguard backup
    Backup {
        /// Directory the backup files are written to (prompts if not
        /// provided; created if missing)
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Restore previously backed-up items into a vault
    ///
    /// The kind of each file is recovered from its name; files matching
    /// neither *.secret.backup nor *.cert.backup are skipped. Secrets
    /// are restored before certificates, and one item failing never
    /// aborts the batch.
    ///
    /// Example usage:
    ///   kvguard --vault dr-kv restore --dir ~/kv-backups/prod
    ///   kvguard --vault dr-kv restore --file ~/kv-backups/prod/db-pass.secret.backup
    Restore {
        /// Directory to scan for backup files
        #[arg(long, conflicts_with = "file")]
        dir: Option<PathBuf>,

        /// Restore a single backup file instead of a whole directory
        #[arg(long)]
        file: Option<PathBuf>,
    },
}
