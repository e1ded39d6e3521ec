use std::path::Path;

use crate::{
    config::DeployConfig,
    error::format_error,
    path::{ArtifactKind, InstallTarget, Layout},
    settings::{DaemonSettings, DEFAULT_USER_CONFIG},
};

use super::{
    fetch::{FetchOutcome, Fetcher},
    policy::{Action, PlanEntry, ProvisionPlan},
    writer::ensure_config,
    ArtifactOutcome, ArtifactReport, ProvisionReport,
};

pub struct Executor<'a> {
    config: &'a DeployConfig,
    layout: &'a Layout,
    plan: &'a ProvisionPlan,
    fetcher: &'a dyn Fetcher,
}

impl<'a> Executor<'a> {
    pub fn new(
        config: &'a DeployConfig,
        layout: &'a Layout,
        plan: &'a ProvisionPlan,
        fetcher: &'a dyn Fetcher,
    ) -> Self {
        Self {
            config,
            layout,
            plan,
            fetcher,
        }
    }

    pub fn run(&self) -> ProvisionReport {
        let artifacts = self
            .plan
            .entries
            .iter()
            .map(|entry| self.run_entry(entry))
            .collect();

        ProvisionReport { artifacts }
    }

    fn run_entry(&self, entry: &PlanEntry) -> ArtifactReport {
        let target = &entry.target;
        let span = tracing::info_span!("artifact", kind = target.kind.name(), path = ?target.local_path);
        let _guard = span.enter();

        let mut report = ArtifactReport {
            kind: target.kind,
            path: target.local_path.clone(),
            action: entry.action,
            removed: false,
            outcome: ArtifactOutcome::Skipped,
        };

        if entry.action == Action::Skip {
            tracing::info!("already installed, skipping");
            return report;
        }

        if entry.exists {
            report.removed = self.remove_existing(&target.local_path);
        } else {
            tracing::warn!("not found, installing");
        }

        report.outcome = match target.kind {
            ArtifactKind::Executable => self.install_executable(target),
            ArtifactKind::MainConfig => self.install_main_config(target),
            ArtifactKind::UserConfig => {
                self.write_config(&target.local_path, DEFAULT_USER_CONFIG.as_bytes())
            }
        };

        report
    }

    fn remove_existing(&self, path: &Path) -> bool {
        tracing::info!("removing installed copy");

        match std::fs::remove_file(path) {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(error = %format_error(error), "could not remove installed copy");
                false
            }
        }
    }

    fn install_executable(&self, target: &InstallTarget) -> ArtifactOutcome {
        let outcome = self.download(target);

        if outcome.is_success() {
            if let Err(error) = crate::os::ensure_executable(&target.local_path) {
                tracing::error!(error = %format_error(error), "failed to set permissions");
            } else {
                tracing::info!("permissions set");
            }
        }

        ArtifactOutcome::Download(outcome)
    }

    fn install_main_config(&self, target: &InstallTarget) -> ArtifactOutcome {
        if target.remote_url.is_some() {
            return ArtifactOutcome::Download(self.download(target));
        }

        let settings = DaemonSettings::new(self.layout, self.config.rpc_port);

        match settings.to_bytes(self.layout.config_format()) {
            Ok(payload) => self.write_config(&target.local_path, &payload),
            Err(error) => {
                let message = format_error(error);
                tracing::error!(error = %message, "could not serialize default configuration");
                ArtifactOutcome::WriteFailed(message)
            }
        }
    }

    fn write_config(&self, path: &Path, payload: &[u8]) -> ArtifactOutcome {
        match ensure_config(path, payload, true) {
            Ok(status) => ArtifactOutcome::Written(status),
            Err(error) => {
                let message = format_error(error);
                tracing::error!(error = %message, "could not write configuration");
                ArtifactOutcome::WriteFailed(message)
            }
        }
    }

    fn download(&self, target: &InstallTarget) -> FetchOutcome {
        match &target.remote_url {
            Some(url) => self
                .fetcher
                .fetch(url, &target.local_path, self.config.fetch_timeout),
            None => FetchOutcome::UnexpectedError("no download URL".to_string()),
        }
    }
}
