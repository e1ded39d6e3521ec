//! Describing where files are located.
//!
//! This module resolves the platform dependent names, download URLs and
//! local paths of the managed artifacts.
//!
//! ## File locations
//!
//! Relative to the program root:
//!
//! * `bin/aria2c` (`bin/aria2c.exe` on Windows)
//! * `config/aria2.conf`, `config.json` or `config.toml`
//!   depending on [`ConfigFormat`]
//! * `config/user.conf`
//! * `downloads/`
//! * `logs/aria2.log`
//!
use std::path::{Path, PathBuf};

use crate::{
    config::{ConfigFormat, DeployConfig},
    error::{DeployError, DeployErrorKind},
};

const DOWNLOAD_BASE_URL: &str = "https://downloads.aria2.no22.top/downloads";

/// OS family the daemon is deployed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsFamily {
    /// Linux, macOS and friends.
    Unix,
    /// Microsoft Windows.
    Windows,
}

impl OsFamily {
    /// Returns the family of the running OS.
    pub fn current() -> Result<Self, DeployError> {
        Self::from_family_name(std::env::consts::FAMILY)
    }

    fn from_family_name(name: &str) -> Result<Self, DeployError> {
        match name {
            "unix" => Ok(Self::Unix),
            "windows" => Ok(Self::Windows),
            _ => Err(DeployError::new(DeployErrorKind::UnsupportedOsFamily).with_context(name)),
        }
    }

    /// Filename of the daemon executable.
    pub fn executable_name(&self) -> &'static str {
        match self {
            Self::Unix => "aria2c",
            Self::Windows => "aria2c.exe",
        }
    }

    /// URL the daemon executable is downloaded from.
    pub fn download_url(&self) -> String {
        match self {
            Self::Unix => format!("{DOWNLOAD_BASE_URL}/Linux/aria2c"),
            Self::Windows => format!("{DOWNLOAD_BASE_URL}/Windows/aria2c.exe"),
        }
    }
}

/// A file managed by the provisioning workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// The daemon binary.
    Executable,
    /// The daemon's configuration.
    MainConfig,
    /// User settings such as proxies.
    UserConfig,
}

impl ArtifactKind {
    /// Returns a short name suitable for log messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Executable => "executable",
            Self::MainConfig => "main config",
            Self::UserConfig => "user config",
        }
    }
}

/// Where an artifact lives locally and where it comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallTarget {
    /// Which artifact this is.
    pub kind: ArtifactKind,
    /// Location on disk.
    pub local_path: PathBuf,
    /// Location on the download server, if the artifact is fetched.
    pub remote_url: Option<String>,
}

/// Resolves the program root into concrete artifact paths.
#[derive(Debug, Clone)]
pub struct Layout {
    root: PathBuf,
    family: OsFamily,
    config_format: ConfigFormat,
}

impl Layout {
    /// Create a layout for the running OS.
    pub fn new(config: &DeployConfig) -> Result<Self, DeployError> {
        Ok(Self::with_family(config, OsFamily::current()?))
    }

    /// Create a layout for the given OS family.
    pub fn with_family(config: &DeployConfig, family: OsFamily) -> Self {
        Self {
            root: config.root.clone(),
            family,
            config_format: config.config_format,
        }
    }

    /// Returns the program root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the OS family the paths were resolved for.
    pub fn family(&self) -> OsFamily {
        self.family
    }

    /// Returns the format of the main configuration file.
    pub fn config_format(&self) -> ConfigFormat {
        self.config_format
    }

    /// Returns the directory containing the daemon executable.
    pub fn bin_dir(&self) -> PathBuf {
        self.root.join("bin")
    }

    /// Returns the directory containing configuration files.
    pub fn config_dir(&self) -> PathBuf {
        self.root.join("config")
    }

    /// Returns the path of the daemon executable.
    pub fn executable_path(&self) -> PathBuf {
        self.bin_dir().join(self.family.executable_name())
    }

    /// Returns the path of the daemon's main configuration file.
    pub fn main_config_path(&self) -> PathBuf {
        match self.config_format {
            ConfigFormat::Aria2 => self.config_dir().join("aria2.conf"),
            ConfigFormat::Json => self.root.join("config.json"),
            ConfigFormat::Toml => self.root.join("config.toml"),
        }
    }

    /// Returns the path of the user settings file.
    pub fn user_config_path(&self) -> PathBuf {
        self.config_dir().join("user.conf")
    }

    /// Returns the default directory for downloaded files.
    pub fn download_dir(&self) -> PathBuf {
        self.root.join("downloads")
    }

    /// Returns the path of the daemon's log file.
    pub fn log_path(&self) -> PathBuf {
        self.root.join("logs").join("aria2.log")
    }

    /// Returns the install target of the given artifact.
    pub fn target(&self, kind: ArtifactKind, config: &DeployConfig) -> InstallTarget {
        match kind {
            ArtifactKind::Executable => InstallTarget {
                kind,
                local_path: self.executable_path(),
                remote_url: Some(
                    config
                        .executable_url
                        .clone()
                        .unwrap_or_else(|| self.family.download_url()),
                ),
            },
            ArtifactKind::MainConfig => InstallTarget {
                kind,
                local_path: self.main_config_path(),
                remote_url: config.main_config_url.clone(),
            },
            ArtifactKind::UserConfig => InstallTarget {
                kind,
                local_path: self.user_config_path(),
                remote_url: None,
            },
        }
    }

    /// Returns the install targets of all managed artifacts, executable first.
    pub fn targets(&self, config: &DeployConfig) -> Vec<InstallTarget> {
        [
            ArtifactKind::Executable,
            ArtifactKind::MainConfig,
            ArtifactKind::UserConfig,
        ]
        .into_iter()
        .map(|kind| self.target(kind, config))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(format: ConfigFormat) -> DeployConfig {
        let mut config = DeployConfig::with_root("/opt/ariad");
        config.config_format = format;
        config
    }

    #[test]
    fn test_unix_layout() {
        let config = config(ConfigFormat::Aria2);
        let layout = Layout::with_family(&config, OsFamily::Unix);

        assert_eq!(layout.executable_path(), Path::new("/opt/ariad/bin/aria2c"));
        assert_eq!(
            layout.main_config_path(),
            Path::new("/opt/ariad/config/aria2.conf")
        );
        assert_eq!(
            layout.user_config_path(),
            Path::new("/opt/ariad/config/user.conf")
        );
        assert_eq!(layout.log_path(), Path::new("/opt/ariad/logs/aria2.log"));

        let target = layout.target(ArtifactKind::Executable, &config);
        assert_eq!(
            target.remote_url.as_deref(),
            Some("https://downloads.aria2.no22.top/downloads/Linux/aria2c")
        );
    }

    #[test]
    fn test_windows_layout() {
        let config = config(ConfigFormat::Aria2);
        let layout = Layout::with_family(&config, OsFamily::Windows);

        assert_eq!(
            layout.executable_path(),
            Path::new("/opt/ariad/bin/aria2c.exe")
        );

        let target = layout.target(ArtifactKind::Executable, &config);
        assert_eq!(
            target.remote_url.as_deref(),
            Some("https://downloads.aria2.no22.top/downloads/Windows/aria2c.exe")
        );
    }

    #[test]
    fn test_alternate_config_formats() {
        let layout = Layout::with_family(&config(ConfigFormat::Json), OsFamily::Unix);
        assert_eq!(layout.main_config_path(), Path::new("/opt/ariad/config.json"));

        let layout = Layout::with_family(&config(ConfigFormat::Toml), OsFamily::Unix);
        assert_eq!(layout.main_config_path(), Path::new("/opt/ariad/config.toml"));
    }

    #[test]
    fn test_url_overrides() {
        let mut config = config(ConfigFormat::Aria2);
        config.executable_url = Some("http://mirror.local/aria2c".to_string());
        config.main_config_url = Some("http://mirror.local/aria2.conf".to_string());
        let layout = Layout::with_family(&config, OsFamily::Unix);

        let targets = layout.targets(&config);

        assert_eq!(targets.len(), 3);
        assert_eq!(targets[0].kind, ArtifactKind::Executable);
        assert_eq!(
            targets[0].remote_url.as_deref(),
            Some("http://mirror.local/aria2c")
        );
        assert_eq!(
            targets[1].remote_url.as_deref(),
            Some("http://mirror.local/aria2.conf")
        );
        assert_eq!(targets[2].remote_url, None);
    }

    #[test]
    fn test_unsupported_family() {
        let error = OsFamily::from_family_name("wasm").unwrap_err();
        assert!(matches!(error.kind(), DeployErrorKind::UnsupportedOsFamily));
    }
}
