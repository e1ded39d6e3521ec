//! Deploy and launch the aria2 download daemon beside your application.
//!
//! This crate fetches the `aria2c` executable and its configuration into
//! a program root, makes the executable runnable, and starts the daemon in
//! the background, optionally confirming through its JSON-RPC interface
//! that a session started.
//!
//! ## Example
//!
//! ```no_run
//! # use ariad::config::DeployConfig;
//! # use ariad::launch::LaunchOptions;
//! # use ariad::provision::ProvisionFlags;
//! let config = DeployConfig::new().unwrap();
//!
//! let report = ariad::provision(&config, ProvisionFlags::default()).unwrap();
//!
//! if report.is_success() {
//!     let mut options = LaunchOptions::default();
//!     options.probe_rpc = true;
//!
//!     let result = ariad::launch(&config, &options).unwrap();
//!     println!("{result:?}");
//! }
//! ```
//!
//! ## Principles
//!
//! ### Repeated runs
//!
//! Every run looks at the filesystem again. An installed artifact is left
//! alone unless `force` or `update` is given, in which case it is removed
//! and fetched again.
//!
//! ### Files
//!
//! Downloads and generated configuration are written to a temporary file
//! and renamed into place, so an interrupted run never leaves a truncated
//! executable behind. Downloads are not verified against a checksum.
//!
//! ### Failures
//!
//! Failures are logged with [`tracing`] and reported in the returned
//! values instead of aborting. Only a missing executable or a failed
//! launch count as failure; configuration problems are warnings.
//!
use config::DeployConfig;
use error::DeployError;
use launch::{LaunchOptions, LaunchResult, Launcher};
use provision::{ProvisionFlags, ProvisionReport, Provisioner};

pub mod config;
pub mod error;
pub mod launch;
pub mod os;
pub mod path;
pub mod provision;
pub mod settings;

/// Fetches and installs the daemon and its configuration.
///
/// Returns an error only when the HTTP client or the layout could not be
/// set up. Download and write failures are reported in the
/// [`ProvisionReport`].
pub fn provision(
    config: &DeployConfig,
    flags: ProvisionFlags,
) -> Result<ProvisionReport, DeployError> {
    let provisioner = Provisioner::new(config)?;
    provisioner.run(flags)
}

/// Starts the installed daemon.
///
/// Returns an error only when the layout could not be resolved. Launch
/// failures are reported in the [`LaunchResult`].
pub fn launch(config: &DeployConfig, options: &LaunchOptions) -> Result<LaunchResult, DeployError> {
    let launcher = Launcher::new(config)?;
    Ok(launcher.launch(options))
}
