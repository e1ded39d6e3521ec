//! Provisioning workflow.
//!
//! Each managed artifact (daemon executable, main configuration, user
//! configuration) is checked on disk and then either skipped, or removed
//! and fetched again, depending on [`ProvisionFlags`]. Running the
//! workflow twice without flags downloads nothing the second time.
//!
//! ```no_run
//! # use ariad::config::DeployConfig;
//! # use ariad::provision::{ProvisionFlags, Provisioner};
//! let config = DeployConfig::new().unwrap();
//! let report = Provisioner::new(&config)
//!     .unwrap()
//!     .run(ProvisionFlags::default())
//!     .unwrap();
//!
//! assert!(report.is_success());
//! ```
//!
//! Only the executable is essential: configuration failures are logged
//! and reported but do not fail the run.
//!
//! Two processes provisioning the same program root at once is not
//! supported.
use std::path::PathBuf;

use exec::Executor;
use policy::Planner;

use crate::{
    config::DeployConfig,
    error::DeployError,
    path::{ArtifactKind, Layout},
};

pub use self::fetch::*;
pub use self::policy::{decide, Action, ProvisionFlags};
pub use self::writer::*;

mod exec;
mod fetch;
mod policy;
mod writer;

/// Final state of a single artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactOutcome {
    /// The artifact was already installed.
    Skipped,
    /// The artifact was downloaded, or the download failed.
    Download(FetchOutcome),
    /// A configuration file was generated.
    Written(ConfigStatus),
    /// A configuration file could not be generated.
    WriteFailed(String),
}

impl ArtifactOutcome {
    /// Returns whether the artifact is installed.
    pub fn is_ok(&self) -> bool {
        match self {
            Self::Skipped | Self::Written(_) => true,
            Self::Download(outcome) => outcome.is_success(),
            Self::WriteFailed(_) => false,
        }
    }
}

/// What happened to a single artifact.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ArtifactReport {
    /// Which artifact.
    pub kind: ArtifactKind,
    /// Location on disk.
    pub path: PathBuf,
    /// Decision taken by [`decide()`].
    pub action: Action,
    /// Whether an installed copy was removed first.
    pub removed: bool,
    /// Final state.
    pub outcome: ArtifactOutcome,
}

/// Result of a provisioning run.
#[derive(Debug, Clone)]
pub struct ProvisionReport {
    /// One entry per artifact, executable first.
    pub artifacts: Vec<ArtifactReport>,
}

impl ProvisionReport {
    /// Returns the entry for the given artifact.
    pub fn artifact(&self, kind: ArtifactKind) -> Option<&ArtifactReport> {
        self.artifacts.iter().find(|entry| entry.kind == kind)
    }

    /// Returns whether the daemon executable is installed.
    ///
    /// Configuration artifacts don't affect the result.
    pub fn is_success(&self) -> bool {
        self.artifact(ArtifactKind::Executable)
            .is_some_and(|entry| entry.outcome.is_ok())
    }
}

/// The provisioning interface.
#[derive(Debug, Clone)]
pub struct Provisioner {
    config: DeployConfig,
    layout: Layout,
}

impl Provisioner {
    /// Create a new provisioner for the running OS.
    pub fn new(config: &DeployConfig) -> Result<Self, DeployError> {
        let layout = Layout::new(config)?;
        Ok(Self::with_layout(config, layout))
    }

    /// Create a new provisioner with an already resolved layout.
    pub fn with_layout(config: &DeployConfig, layout: Layout) -> Self {
        Self {
            config: config.clone(),
            layout,
        }
    }

    /// Returns the resolved layout.
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Provision with a new HTTP client.
    pub fn run(&self, flags: ProvisionFlags) -> Result<ProvisionReport, DeployError> {
        let fetcher = HttpFetcher::new()?;
        Ok(self.run_with(flags, &fetcher))
    }

    /// Provision using the given fetcher.
    pub fn run_with(&self, flags: ProvisionFlags, fetcher: &dyn Fetcher) -> ProvisionReport {
        tracing::debug!(config = ?self.config, ?flags, "running planner");

        let plan = Planner::new(&self.config, &self.layout, flags).run();

        tracing::debug!(?plan, "created plan");

        let report = Executor::new(&self.config, &self.layout, &plan, fetcher).run();

        for entry in report.artifacts.iter().filter(|entry| !entry.outcome.is_ok()) {
            tracing::warn!(artifact = entry.kind.name(), outcome = ?entry.outcome, "artifact not installed");
        }

        if report.is_success() {
            tracing::info!("deployment complete");
        } else {
            tracing::error!("deployment failed, possibly due to network issues");
        }

        report
    }
}
