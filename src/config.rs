//! Parameters shared by the provisioning and launch workflows.
use std::{path::PathBuf, str::FromStr, time::Duration};

use crate::error::{DeployError, DeployErrorKind};

/// Time limit for a single download attempt.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Port the daemon's JSON-RPC interface listens on unless configured otherwise.
pub const DEFAULT_RPC_PORT: u16 = 6800;

/// Wait between starting the daemon and probing its JSON-RPC interface.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(2);

/// Serialization format of the daemon's main configuration file.
///
/// The format also decides where the file lives, see
/// [`Layout::main_config_path()`](crate::path::Layout::main_config_path).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigFormat {
    /// aria2's native `key=value` format, `config/aria2.conf`.
    #[default]
    Aria2,
    /// JSON document, `config.json`.
    Json,
    /// TOML document, `config.toml`.
    Toml,
}

impl ConfigFormat {
    /// Returns whether the daemon can read this format directly with `--conf-path`.
    pub fn is_native(&self) -> bool {
        matches!(self, Self::Aria2)
    }
}

impl FromStr for ConfigFormat {
    type Err = DeployError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "aria2" | "conf" => Ok(Self::Aria2),
            "json" => Ok(Self::Json),
            "toml" => Ok(Self::Toml),
            _ => Err(DeployError::new(DeployErrorKind::InvalidInput)
                .with_context(format!("unknown config format {value:?}"))),
        }
    }
}

/// Parameters that control where and how the daemon is deployed.
///
/// Built once at startup and passed by reference to each component.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct DeployConfig {
    /// Program root. Executables go in `bin/`, configuration in `config/`.
    pub root: PathBuf,
    /// Format of the daemon's main configuration file.
    pub config_format: ConfigFormat,
    /// Time limit for each HTTP request.
    pub fetch_timeout: Duration,
    /// JSON-RPC port written into a default configuration.
    pub rpc_port: u16,
    /// Wait before the JSON-RPC probe after launching.
    pub settle_delay: Duration,
    /// Overrides the platform download URL of the executable.
    pub executable_url: Option<String>,
    /// Where to download the main configuration from.
    ///
    /// When absent, a default configuration is generated locally.
    pub main_config_url: Option<String>,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::new(),
            config_format: ConfigFormat::default(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            rpc_port: DEFAULT_RPC_PORT,
            settle_delay: DEFAULT_SETTLE_DELAY,
            executable_url: None,
            main_config_url: None,
        }
    }
}

impl DeployConfig {
    /// Create a new config rooted at the directory of the running binary.
    pub fn new() -> Result<Self, DeployError> {
        let root = crate::os::current_exe_dir()?;
        tracing::info!(?root, "using program root");

        Ok(Self::with_root(root))
    }

    /// Create a new config rooted at the given directory.
    pub fn with_root<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_format_from_str() {
        assert_eq!("aria2".parse::<ConfigFormat>().unwrap(), ConfigFormat::Aria2);
        assert_eq!("JSON".parse::<ConfigFormat>().unwrap(), ConfigFormat::Json);
        assert_eq!("toml".parse::<ConfigFormat>().unwrap(), ConfigFormat::Toml);

        let error = "yaml".parse::<ConfigFormat>().unwrap_err();
        assert!(matches!(error.kind(), DeployErrorKind::InvalidInput));
    }

    #[test]
    fn test_defaults() {
        let config = DeployConfig::with_root("/opt/ariad");

        assert_eq!(config.root, PathBuf::from("/opt/ariad"));
        assert_eq!(config.fetch_timeout, Duration::from_secs(10));
        assert_eq!(config.rpc_port, 6800);
        assert_eq!(config.settle_delay, Duration::from_secs(2));
        assert!(config.main_config_url.is_none());
    }
}
