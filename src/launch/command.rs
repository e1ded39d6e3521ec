use std::{
    ffi::{OsStr, OsString},
    path::{Path, PathBuf},
    process::Command,
};

use crate::settings::{DaemonSettings, ProxySettings};

/// Command line of the download daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonCommand {
    program: PathBuf,
    args: Vec<OsString>,
}

impl DaemonCommand {
    /// Starts a command line for the given executable.
    pub fn new<P: Into<PathBuf>>(program: P) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Reads all options from a configuration file in the daemon's format.
    pub fn with_config_file(mut self, path: &Path) -> Self {
        self.push_pair("--conf-path=", path.as_os_str());
        self
    }

    /// Passes the options explicitly, ignoring the daemon's default
    /// configuration file.
    pub fn with_explicit_options(mut self, settings: &DaemonSettings, log_path: &Path) -> Self {
        self.args.push("--no-conf".into());

        if settings.enable_rpc {
            self.args.push("--enable-rpc".into());
            self.args
                .push(format!("--rpc-listen-port={}", settings.rpc_listen_port).into());
        }

        self.push_pair("--dir=", settings.dir.as_os_str());

        let log_path = settings.log.as_deref().unwrap_or(log_path);
        self.push_pair("--log=", log_path.as_os_str());

        self
    }

    /// Makes the daemon detach itself from the launcher.
    pub fn with_daemon_mode(mut self) -> Self {
        self.args.push("--daemon=true".into());
        self
    }

    /// Adds flags for the configured proxies.
    pub fn with_proxy(mut self, proxy: &ProxySettings) -> Self {
        self.args
            .extend(proxy.to_args().into_iter().map(OsString::from));
        self
    }

    /// Returns the executable path.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Returns the arguments after the executable path.
    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// Returns the arguments as (lossy) strings.
    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }

    /// Builds a process builder for this command line.
    pub fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        command
    }

    fn push_pair(&mut self, flag: &str, value: &OsStr) {
        let mut arg = OsString::from(flag);
        arg.push(value);
        self.args.push(arg);
    }
}
