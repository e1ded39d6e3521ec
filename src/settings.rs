//! Contents of the daemon and user configuration files.
//!
//! The daemon's main configuration ([`DaemonSettings`]) can be stored in
//! aria2's native `key=value` format, JSON or TOML. The user configuration
//! (`user.conf`) is a TOML document holding an optional `[proxy]` table:
//!
//! ```toml
//! [proxy]
//! http-proxy = "http://proxy.example:8080"
//! https-proxy = ""
//! ftp-proxy = ""
//! ```
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    config::{ConfigFormat, DEFAULT_RPC_PORT},
    error::{format_error, AddContext, DeployError, DeployErrorKind},
    path::Layout,
};

/// Contents written to a fresh `user.conf`.
pub const DEFAULT_USER_CONFIG: &str = r#"# Proxy servers used by the download daemon. Leave empty for none.
[proxy]
http-proxy = ""
https-proxy = ""
ftp-proxy = ""
"#;

/// Daemon options managed by the main configuration file.
///
/// Keys use the daemon's own option names (`rpc-listen-port` and so on)
/// in every format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DaemonSettings {
    /// Directory downloads are saved to.
    pub dir: PathBuf,
    /// Whether the JSON-RPC interface is enabled.
    pub enable_rpc: bool,
    /// Port of the JSON-RPC interface.
    pub rpc_listen_port: u16,
    /// Whether the JSON-RPC interface accepts any `Origin`.
    pub rpc_allow_origin_all: bool,
    /// Number of parallel downloads.
    pub max_concurrent_downloads: u32,
    /// Log file of the daemon.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log: Option<PathBuf>,
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            enable_rpc: true,
            rpc_listen_port: DEFAULT_RPC_PORT,
            rpc_allow_origin_all: true,
            max_concurrent_downloads: 5,
            log: None,
        }
    }
}

impl DaemonSettings {
    /// Default settings for the given layout.
    pub fn new(layout: &Layout, rpc_port: u16) -> Self {
        Self {
            dir: layout.download_dir(),
            rpc_listen_port: rpc_port,
            log: Some(layout.log_path()),
            ..Default::default()
        }
    }

    /// Deserialize from the given path.
    pub fn load<P: AsRef<Path>>(path: P, format: ConfigFormat) -> Result<Self, DeployError> {
        let path = path.as_ref();
        let buf =
            std::fs::read(path).with_contextc(|_error| format!("could not open file {path:?}"))?;

        Self::from_slice(&buf, format).map_err(|error| error.with_context(format!("{path:?}")))
    }

    /// Deserialize from a document in the given format.
    pub fn from_slice(buf: &[u8], format: ConfigFormat) -> Result<Self, DeployError> {
        match format {
            ConfigFormat::Aria2 => {
                let text = std::str::from_utf8(buf).map_err(|error| {
                    DeployError::new(DeployErrorKind::InvalidConfig).with_source(error)
                })?;
                Self::from_aria2_conf(text)
            }
            ConfigFormat::Json => Ok(serde_json::from_slice(buf)?),
            ConfigFormat::Toml => {
                let text = std::str::from_utf8(buf).map_err(|error| {
                    DeployError::new(DeployErrorKind::InvalidConfig).with_source(error)
                })?;
                Ok(toml::from_str(text)?)
            }
        }
    }

    /// Serialize to a document in the given format.
    pub fn to_bytes(&self, format: ConfigFormat) -> Result<Vec<u8>, DeployError> {
        match format {
            ConfigFormat::Aria2 => Ok(self.to_aria2_conf().into_bytes()),
            ConfigFormat::Json => {
                let mut buf = serde_json::to_vec_pretty(self).map_err(|error| {
                    DeployError::new(DeployErrorKind::Other).with_source(error)
                })?;
                buf.push(b'\n');
                Ok(buf)
            }
            ConfigFormat::Toml => Ok(toml::to_string_pretty(self)?.into_bytes()),
        }
    }

    fn to_aria2_conf(&self) -> String {
        let mut lines = vec![
            format!("dir={}", self.dir.display()),
            format!("enable-rpc={}", self.enable_rpc),
            format!("rpc-listen-port={}", self.rpc_listen_port),
            format!("rpc-allow-origin-all={}", self.rpc_allow_origin_all),
            format!("max-concurrent-downloads={}", self.max_concurrent_downloads),
        ];
        if let Some(log) = &self.log {
            lines.push(format!("log={}", log.display()));
        }

        lines.into_iter().map(|line| line + "\n").collect()
    }

    fn from_aria2_conf(text: &str) -> Result<Self, DeployError> {
        let mut settings = Self::default();

        for (index, line) in text.lines().enumerate() {
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(DeployError::new(DeployErrorKind::InvalidConfig)
                    .with_context(format!("line {}: expected key=value", index + 1)));
            };
            let (key, value) = (key.trim(), value.trim());

            let result = match key {
                "dir" => {
                    settings.dir = PathBuf::from(value);
                    Ok(())
                }
                "enable-rpc" => parse_value(value).map(|v| settings.enable_rpc = v),
                "rpc-listen-port" => parse_value(value).map(|v| settings.rpc_listen_port = v),
                "rpc-allow-origin-all" => {
                    parse_value(value).map(|v| settings.rpc_allow_origin_all = v)
                }
                "max-concurrent-downloads" => {
                    parse_value(value).map(|v| settings.max_concurrent_downloads = v)
                }
                "log" => {
                    settings.log = Some(PathBuf::from(value));
                    Ok(())
                }
                _ => {
                    tracing::trace!(key, "ignoring unmanaged option");
                    Ok(())
                }
            };

            result.map_err(|error| error.with_context(format!("line {}: {key}", index + 1)))?;
        }

        Ok(settings)
    }
}

fn parse_value<T>(value: &str) -> Result<T, DeployError>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse()
        .map_err(|error| DeployError::new(DeployErrorKind::InvalidConfig).with_source(error))
}

/// Proxy servers passed to the daemon.
///
/// Empty fields mean "no proxy" for that protocol.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ProxySettings {
    /// Proxy for HTTP downloads.
    pub http_proxy: String,
    /// Proxy for HTTPS downloads.
    pub https_proxy: String,
    /// Proxy for FTP downloads.
    pub ftp_proxy: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UserConfig {
    proxy: Option<ProxySettings>,
}

impl ProxySettings {
    /// Returns whether no proxy is configured.
    pub fn is_empty(&self) -> bool {
        self.http_proxy.is_empty() && self.https_proxy.is_empty() && self.ftp_proxy.is_empty()
    }

    /// Loads the `[proxy]` table of the user configuration.
    ///
    /// This never fails: a missing file, a missing table or an unreadable
    /// document all result in empty settings.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            tracing::debug!(?path, "no user config, not using a proxy");
            return Self::default();
        }

        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(error) => {
                tracing::warn!(?path, error = %format_error(error), "could not read user config");
                return Self::default();
            }
        };

        match Self::from_user_config(&text) {
            Ok(settings) => settings,
            Err(error) => {
                tracing::warn!(?path, error = %format_error(error), "malformed user config");
                Self::default()
            }
        }
    }

    /// Parses the `[proxy]` table out of a user configuration document.
    pub fn from_user_config(text: &str) -> Result<Self, DeployError> {
        let config = toml::from_str::<UserConfig>(text)?;

        Ok(config.proxy.unwrap_or_default())
    }

    /// Returns the daemon flags for the non-empty fields.
    pub fn to_args(&self) -> Vec<String> {
        [
            ("--http-proxy", &self.http_proxy),
            ("--https-proxy", &self.https_proxy),
            ("--ftp-proxy", &self.ftp_proxy),
        ]
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(flag, value)| format!("{flag}={value}"))
        .collect()
    }
}
