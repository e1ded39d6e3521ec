use crate::{
    config::DeployConfig,
    path::{InstallTarget, Layout},
};

/// Command line switches that control replacing installed artifacts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProvisionFlags {
    /// Replace installed artifacts, for repairing a broken install.
    pub force: bool,
    /// Replace installed artifacts, for upgrading to the current version.
    pub update: bool,
}

impl ProvisionFlags {
    /// Returns whether existing artifacts should be replaced.
    ///
    /// Both switches do the same thing; they only differ in intent.
    pub fn replaces_existing(&self) -> bool {
        self.force || self.update
    }
}

/// What to do with a single artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Leave the installed artifact alone.
    Skip,
    /// Remove the artifact if present, then fetch or write it again.
    RemoveAndFetch,
}

/// Decides what to do with an artifact given whether it is installed.
pub fn decide(exists: bool, flags: ProvisionFlags) -> Action {
    if exists && !flags.replaces_existing() {
        Action::Skip
    } else {
        Action::RemoveAndFetch
    }
}

#[derive(Debug, Clone)]
pub struct ProvisionPlan {
    pub entries: Vec<PlanEntry>,
}

#[derive(Debug, Clone)]
pub struct PlanEntry {
    pub target: InstallTarget,
    pub exists: bool,
    pub action: Action,
}

#[derive(Debug)]
pub struct Planner<'a> {
    config: &'a DeployConfig,
    layout: &'a Layout,
    flags: ProvisionFlags,
}

impl<'a> Planner<'a> {
    pub fn new(config: &'a DeployConfig, layout: &'a Layout, flags: ProvisionFlags) -> Self {
        Self {
            config,
            layout,
            flags,
        }
    }

    pub fn run(&self) -> ProvisionPlan {
        let entries = self
            .layout
            .targets(self.config)
            .into_iter()
            .map(|target| {
                let exists = target.local_path.exists();
                let action = decide(exists, self.flags);

                tracing::debug!(artifact = target.kind.name(), path = ?target.local_path, exists, ?action, "planned");

                PlanEntry {
                    target,
                    exists,
                    action,
                }
            })
            .collect();

        ProvisionPlan { entries }
    }
}
