//! CLI module for command-line interface functionality

pub mod backup_ops;
pub mod commands;
pub mod prompts;
pub mod restore_ops;

pub use commands::{Cli, Commands};

use crate::config::KvGuardConfig;
use crate::core::consent::{AutoApprove, Consent};
use crate::core::pipeline::RestoreSource;
use prompts::InteractiveConsent;
use std::path::PathBuf;

/// Entry point for the CLI application
#[tokio::main]
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    use clap::Parser;

    let cli = Cli::parse();
    let config = KvGuardConfig::load();

    let consent: Box<dyn Consent> = if cli.auto_approve {
        Box::new(AutoApprove)
    } else {
        Box::new(InteractiveConsent)
    };

    let vault_name = match cli.vault {
        Some(name) => name,
        None => prompts::prompt_text("Key Vault name")?,
    };

    match cli.command {
        Commands::Backup { dir } => {
            let dir = resolve_dir(dir, &config)?;
            backup_ops::handle_backup(&config, &vault_name, &dir, consent.as_ref(), cli.json).await
        }

        Commands::Restore { dir, file } => {
            let source = match file {
                Some(file) => RestoreSource::File(expand_path(file)?),
                None => RestoreSource::Directory(resolve_dir(dir, &config)?),
            };
            restore_ops::handle_restore(&config, &vault_name, source, consent.as_ref(), cli.json)
                .await
        }
    }
}

/// Pick the run directory: the flag value if given, otherwise a prompt
/// pre-filled with the configured default.
fn resolve_dir(
    dir: Option<PathBuf>,
    config: &KvGuardConfig,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let dir = match dir {
        Some(dir) => dir,
        None => PathBuf::from(prompts::prompt_text_with_default(
            "Backup directory",
            &config.backup_dir.to_string_lossy(),
        )?),
    };
    Ok(expand_path(dir)?)
}

/// Expand home directory if needed (e.g., "~/path" -> "/home/user/path")
fn expand_path(path: PathBuf) -> crate::error::KvResult<PathBuf> {
    match shellexpand::full(&path.to_string_lossy()) {
        Ok(expanded) => Ok(PathBuf::from(expanded.to_string())),
        Err(e) => Err(crate::error::KvError::InvalidPath(format!(
            "{}: {}",
            path.display(),
            e
        ))),
    }
}
