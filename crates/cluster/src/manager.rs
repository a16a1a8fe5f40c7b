use crate::config::KubeautoConfig;
use crate::confirm::Confirmation;
use crate::layout::ClusterLayout;
use crate::playbook::Playbook;
use crate::registry::ClusterRegistry;
use crate::runner::{CommandOutput, CommandRunner, CommandSpec};
use crate::{ClusterError, Result};
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;

/// How a confirmation-gated or dispatched operation ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    /// The operator declined or did not answer in time. Nothing changed.
    Aborted,
    /// The request named an unknown step and was logged instead of run.
    Skipped,
}

/// Entry point for every cluster operation. Holds the shared config and the
/// two seams that touch the outside world: process execution and operator
/// confirmation.
#[derive(Clone)]
pub struct ClusterManager {
    pub(crate) config: Arc<KubeautoConfig>,
    pub(crate) layout: ClusterLayout,
    pub(crate) registry: ClusterRegistry,
    pub(crate) runner: Arc<dyn CommandRunner>,
    pub(crate) confirm: Arc<dyn Confirmation>,
}

impl ClusterManager {
    pub fn new(
        config: Arc<KubeautoConfig>,
        runner: Arc<dyn CommandRunner>,
        confirm: Arc<dyn Confirmation>,
    ) -> Self {
        let registry = ClusterRegistry::new(Arc::clone(&config));
        let layout = registry.layout().clone();
        Self {
            config,
            layout,
            registry,
            runner,
            confirm,
        }
    }

    pub fn config(&self) -> &KubeautoConfig {
        &self.config
    }

    pub fn registry(&self) -> &ClusterRegistry {
        &self.registry
    }

    pub fn layout(&self) -> &ClusterLayout {
        &self.layout
    }

    /// A workflow under `playbooks/` against `cluster`'s inventory and
    /// parameters.
    pub(crate) fn workflow(&self, cluster: &str, workflow: &str) -> Playbook {
        self.playbook_at(cluster, &self.layout.playbook(workflow))
    }

    pub(crate) fn playbook_at(&self, cluster: &str, path: &Path) -> Playbook {
        Playbook::new(
            path,
            &self.layout.inventory(cluster),
            &self.layout.parameters(cluster),
        )
    }

    pub(crate) async fn run_playbook(&self, playbook: Playbook) -> Result<()> {
        let spec = playbook.into_command(&self.config.provisioner);
        log::info!("Running command: {spec}");
        self.runner.run(&spec).await.map(|_| ())
    }

    pub(crate) async fn run_captured(&self, spec: CommandSpec) -> Result<CommandOutput> {
        log::debug!("Running command: {spec}");
        self.runner.run(&spec).await
    }

    pub(crate) async fn confirmed(&self, prompt: &str) -> bool {
        self.confirm.confirm(prompt).await
    }
}

pub(crate) fn validate_ip(ip: &str) -> Result<()> {
    ip.parse::<IpAddr>()
        .map(|_| ())
        .map_err(|_| ClusterError::InvalidIp(ip.to_string()))
}
