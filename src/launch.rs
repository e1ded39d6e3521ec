//! Starting the download daemon.
//!
//! The daemon is started in the background and is not supervised
//! afterwards. Optionally, its JSON-RPC interface is queried once after a
//! short delay to confirm that it is up.
//!
//! The daemon reads its options from the main configuration file when it
//! is in aria2's own format. For JSON and TOML configuration, the options
//! are loaded by the launcher and passed as explicit flags.
use std::process::Stdio;

use crate::{
    config::DeployConfig,
    error::{format_error, DeployError, DeployErrorKind},
    path::Layout,
    settings::{DaemonSettings, ProxySettings},
};

pub use self::command::*;
pub use self::rpc::*;

mod command;
mod rpc;

/// How the daemon process detaches from the launcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DaemonMode {
    /// The daemon forks itself (`--daemon=true`); the launcher waits for
    /// the short-lived parent process and reports its exit status.
    #[default]
    Background,
    /// The launcher spawns the daemon and returns immediately. A
    /// background thread reaps the process when it exits.
    Foreground,
}

/// Parameters that control how the daemon is launched.
#[derive(Debug, Clone, Default)]
#[non_exhaustive]
pub struct LaunchOptions {
    /// Query the JSON-RPC interface after starting.
    pub probe_rpc: bool,
    /// How the process detaches.
    pub mode: DaemonMode,
}

/// A started daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonHandle {
    /// ID of the process spawned by the launcher.
    ///
    /// In [`DaemonMode::Background`] this process has already exited and
    /// the daemon runs under a different ID.
    pub pid: u32,
    /// Session ID reported by the JSON-RPC interface, when probed and
    /// reachable. [`SESSION_ID_NOT_FOUND`] when the reply lacked one.
    pub session_id: Option<String>,
}

/// Outcome of a launch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchResult {
    /// The daemon is running.
    Started(DaemonHandle),
    /// The daemon exited with an error. Contains its error output.
    Failed(String),
    /// The daemon could not be spawned.
    Exception(String),
}

impl LaunchResult {
    /// Returns whether it is the Started variant.
    pub fn is_started(&self) -> bool {
        matches!(self, Self::Started(_))
    }
}

/// The launcher interface.
#[derive(Debug, Clone)]
pub struct Launcher {
    config: DeployConfig,
    layout: Layout,
}

impl Launcher {
    /// Create a new launcher for the running OS.
    pub fn new(config: &DeployConfig) -> Result<Self, DeployError> {
        let layout = Layout::new(config)?;
        Ok(Self::with_layout(config, layout))
    }

    /// Create a new launcher with an already resolved layout.
    pub fn with_layout(config: &DeployConfig, layout: Layout) -> Self {
        Self {
            config: config.clone(),
            layout,
        }
    }

    /// Starts the daemon.
    pub fn launch(&self, options: &LaunchOptions) -> LaunchResult {
        let settings = self.daemon_settings();
        let proxy = ProxySettings::load(self.layout.user_config_path());
        let command = self.build_command(&settings, &proxy, options.mode);

        self.prepare_dirs(&settings);

        let mut result = start(&command, options.mode);

        if let LaunchResult::Started(handle) = &mut result {
            if options.probe_rpc {
                handle.session_id = self.probe(&settings);
            }
        }

        result
    }

    /// Returns the options the daemon will run with.
    ///
    /// A missing or unreadable main configuration falls back to defaults.
    pub fn daemon_settings(&self) -> DaemonSettings {
        let path = self.layout.main_config_path();
        let defaults = || DaemonSettings::new(&self.layout, self.config.rpc_port);

        if !path.exists() {
            tracing::debug!(?path, "no main config, using defaults");
            return defaults();
        }

        match DaemonSettings::load(&path, self.layout.config_format()) {
            Ok(settings) => settings,
            Err(error) => {
                tracing::warn!(?path, error = %format_error(error), "could not load main config, using defaults");
                defaults()
            }
        }
    }

    /// Builds the daemon's command line.
    pub fn build_command(
        &self,
        settings: &DaemonSettings,
        proxy: &ProxySettings,
        mode: DaemonMode,
    ) -> DaemonCommand {
        let config_path = self.layout.main_config_path();
        let mut command = DaemonCommand::new(self.layout.executable_path());

        command = if self.layout.config_format().is_native() && config_path.exists() {
            command.with_config_file(&config_path)
        } else {
            command.with_explicit_options(settings, &self.layout.log_path())
        };

        if mode == DaemonMode::Background {
            command = command.with_daemon_mode();
        }

        command.with_proxy(proxy)
    }

    fn prepare_dirs(&self, settings: &DaemonSettings) {
        let log_path = settings
            .log
            .clone()
            .unwrap_or_else(|| self.layout.log_path());
        let dirs = [log_path.parent().map(|dir| dir.to_path_buf()), Some(settings.dir.clone())];

        for dir in dirs.into_iter().flatten() {
            if let Err(error) = std::fs::create_dir_all(&dir) {
                tracing::warn!(?dir, error = %format_error(error), "could not create directory");
            }
        }
    }

    fn probe(&self, settings: &DaemonSettings) -> Option<String> {
        tracing::debug!(delay = ?self.config.settle_delay, "waiting for daemon to settle");
        std::thread::sleep(self.config.settle_delay);

        let endpoint = rpc_endpoint(settings.rpc_listen_port);

        match probe_session(&endpoint, self.config.fetch_timeout) {
            Ok(session_id) => {
                tracing::info!(%session_id, "daemon answered");
                Some(session_id)
            }
            Err(error) => {
                tracing::error!(error = %format_error(error), "daemon did not answer");
                None
            }
        }
    }
}

fn start(command: &DaemonCommand, mode: DaemonMode) -> LaunchResult {
    tracing::info!(program = ?command.program(), args = ?command.args(), "starting daemon");

    let mut process = command.to_command();
    process.stdin(Stdio::null()).stdout(Stdio::null());

    match mode {
        DaemonMode::Background => {
            process.stderr(Stdio::piped());
        }
        DaemonMode::Foreground => {
            process.stderr(Stdio::null());

            #[cfg(unix)]
            {
                use std::os::unix::process::CommandExt;
                process.process_group(0);
            }
        }
    }

    let mut child = match process.spawn() {
        Ok(child) => child,
        Err(error) => {
            let error = DeployError::new(DeployErrorKind::LaunchSpawn)
                .with_context(command.program().to_string_lossy())
                .with_source(error);
            return exception(error);
        }
    };
    let pid = child.id();

    if mode == DaemonMode::Foreground {
        tracing::info!(pid, "daemon started");

        // Reaps the daemon once it exits.
        std::thread::spawn(move || match child.wait() {
            Ok(status) => tracing::debug!(pid, %status, "daemon exited"),
            Err(error) => tracing::warn!(pid, error = %format_error(error), "could not wait on daemon"),
        });

        return LaunchResult::Started(DaemonHandle {
            pid,
            session_id: None,
        });
    }

    match child.wait_with_output() {
        Ok(output) if output.status.success() => {
            tracing::info!(pid, "daemon started");
            LaunchResult::Started(DaemonHandle {
                pid,
                session_id: None,
            })
        }
        Ok(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            let error =
                DeployError::new(DeployErrorKind::LaunchExit).with_context(output.status.to_string());
            tracing::error!(error = %format_error(error), %stderr, "startup failed");
            LaunchResult::Failed(stderr)
        }
        Err(error) => exception(
            DeployError::new(DeployErrorKind::LaunchSpawn)
                .with_context("waiting for daemon")
                .with_source(error),
        ),
    }
}

fn exception(error: DeployError) -> LaunchResult {
    let message = format_error(error);
    tracing::error!(error = %message, "exception occurred");
    LaunchResult::Exception(message)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use crate::{config::ConfigFormat, path::OsFamily};

    use super::*;

    fn launcher(root: &Path, format: ConfigFormat) -> Launcher {
        let mut config = DeployConfig::with_root(root);
        config.config_format = format;
        let layout = Layout::with_family(&config, OsFamily::Unix);
        Launcher::with_layout(&config, layout)
    }

    #[test]
    fn test_native_config_file_is_passed_through() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = launcher(dir.path(), ConfigFormat::Aria2);
        let config_path = dir.path().join("config").join("aria2.conf");
        std::fs::create_dir_all(config_path.parent().unwrap()).unwrap();
        std::fs::write(&config_path, "rpc-listen-port=6900\n").unwrap();

        let settings = launcher.daemon_settings();
        let command =
            launcher.build_command(&settings, &ProxySettings::default(), DaemonMode::Background);

        assert_eq!(settings.rpc_listen_port, 6900);
        assert_eq!(
            command.args_lossy(),
            vec![
                format!("--conf-path={}", config_path.display()),
                "--daemon=true".to_string(),
            ]
        );
    }

    #[test]
    fn test_json_config_becomes_explicit_flags() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = launcher(dir.path(), ConfigFormat::Json);
        std::fs::write(
            dir.path().join("config.json"),
            r#"{"rpc-listen-port": 6901, "dir": "/srv/downloads"}"#,
        )
        .unwrap();

        let settings = launcher.daemon_settings();
        let command =
            launcher.build_command(&settings, &ProxySettings::default(), DaemonMode::Foreground);
        let args = command.args_lossy();

        assert_eq!(args[0], "--no-conf");
        assert!(args.contains(&"--rpc-listen-port=6901".to_string()));
        assert!(args.contains(&"--dir=/srv/downloads".to_string()));
        assert!(!args.contains(&"--daemon=true".to_string()));
    }

    #[test]
    fn test_malformed_config_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = launcher(dir.path(), ConfigFormat::Toml);
        std::fs::write(dir.path().join("config.toml"), "rpc-listen-port = [").unwrap();

        let settings = launcher.daemon_settings();

        assert_eq!(settings.rpc_listen_port, 6800);
        assert_eq!(settings.dir, dir.path().join("downloads"));
    }

    #[test]
    fn test_missing_executable_is_exception() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = launcher(dir.path(), ConfigFormat::Aria2);

        let result = launcher.launch(&LaunchOptions::default());

        match result {
            LaunchResult::Exception(message) => {
                assert!(message.starts_with(&format!(
                    "{}: {}",
                    dir.path().join("bin").join("aria2c").display(),
                    DeployErrorKind::LaunchSpawn
                )));
            }
            other => panic!("unexpected result {other:?}"),
        }
    }
}
