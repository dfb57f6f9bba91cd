use std::env;
use std::path::PathBuf;
use std::time::Duration;

use uplink_core::ToolConfig;
use uplink_logging::LoggingConfig;

pub const DEFAULT_ROOT_PATH: &str = "/var/lib/uplinkd";
pub const STATUS_FILENAME: &str = "status.json";

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub root_path: PathBuf,
    pub tools: ToolConfig,
    pub logging: LoggingConfig,
}

impl DaemonConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let root_path = lookup("UPLINKD_ROOT")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ROOT_PATH));

        let defaults = ToolConfig::default();
        let inspector = lookup("UPLINKD_INSPECTOR")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.inspector);
        let client = lookup("UPLINKD_DHCP_CLIENT")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.client);
        let client_args = lookup("UPLINKD_DHCP_ARGS")
            .map(|v| v.split_whitespace().map(str::to_string).collect())
            .unwrap_or(defaults.client_args);
        let terminate_grace = lookup("UPLINKD_TERM_GRACE_MS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.terminate_grace);

        let logging = LoggingConfig::from_lookup(&lookup);
        let client_log_dir = logging
            .enabled
            .then(|| uplink_logging::init::log_dir(&root_path));

        Self {
            tools: ToolConfig {
                inspector,
                client,
                client_args,
                client_log_dir,
                terminate_grace,
            },
            logging,
            root_path,
        }
    }

    pub fn status_path(&self) -> PathBuf {
        self.root_path.join(STATUS_FILENAME)
    }
}
