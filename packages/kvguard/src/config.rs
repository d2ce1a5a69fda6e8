use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KvGuardConfig {
    /// Azure subscription the vaults are resolved in
    #[serde(default)]
    pub subscription_id: String,
    /// Default directory offered for backup and restore runs
    #[serde(default = "default_backup_dir")]
    pub backup_dir: PathBuf,
    /// Seconds between role-propagation visibility checks
    #[serde(default = "default_propagation_poll_secs")]
    pub propagation_poll_secs: u64,
    /// Seconds to keep polling before giving up on role propagation
    #[serde(default = "default_propagation_deadline_secs")]
    pub propagation_deadline_secs: u64,
    /// Per-request timeout for Azure REST calls, in seconds
    #[serde(default = "default_api_timeout_secs")]
    pub api_timeout_secs: u64,
}

fn default_backup_dir() -> PathBuf {
    match dirs::home_dir() {
        Some(mut dir) => {
            dir.push("kv-backups");
            dir
        }
        None => PathBuf::from("./kv-backups"),
    }
}

fn default_propagation_poll_secs() -> u64 {
    5
}

fn default_propagation_deadline_secs() -> u64 {
    120
}

fn default_api_timeout_secs() -> u64 {
    30
}

impl Default for KvGuardConfig {
    fn default() -> Self {
        Self {
            subscription_id: String::new(),
            backup_dir: default_backup_dir(),
            propagation_poll_secs: default_propagation_poll_secs(),
            propagation_deadline_secs: default_propagation_deadline_secs(),
            api_timeout_secs: default_api_timeout_secs(),
        }
    }
}

impl KvGuardConfig {
    /// Load the configuration file from the OS config directory, falling
    /// back to defaults when the file is absent or unreadable. The
    /// subscription id may also come from `AZURE_SUBSCRIPTION_ID`, which
    /// takes precedence over the file.
    pub fn load() -> Self {
        let mut config = match Self::config_file_path() {
            Some(path) if path.exists() => match std::fs::read_to_string(&path) {
                Ok(raw) => match serde_json::from_str(&raw) {
                    Ok(config) => config,
                    Err(e) => {
                        warn!(
                            path = %path.display(),
                            error = %e,
                            "Malformed config file, using defaults"
                        );
                        Self::default()
                    }
                },
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read config file, using defaults"
                    );
                    Self::default()
                }
            },
            _ => Self::default(),
        };

        if let Ok(subscription) = std::env::var("AZURE_SUBSCRIPTION_ID") {
            config.subscription_id = subscription;
        }

        config
    }

    fn config_file_path() -> Option<PathBuf> {
        let mut dir = dirs::config_dir()?;
        dir.push("kvguard");
        dir.push("config.json");
        Some(dir)
    }

    pub fn propagation_poll(&self) -> Duration {
        Duration::from_secs(self.propagation_poll_secs)
    }

    pub fn propagation_deadline(&self) -> Duration {
        Duration::from_secs(self.propagation_deadline_secs)
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }
}
