use crate::config::NetworkPlugin;
use crate::manager::ClusterManager;
use crate::runner::CommandSpec;
use crate::{ClusterError, Result};
use kubeauto_inventory::InventoryFile;
use std::fmt;
use std::path::PathBuf;

const UNKNOWN: &str = "unknown";

/// Versions shown to the operator before a setup step runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentBanner {
    pub arch: String,
    pub kubernetes: String,
    pub etcd: String,
    pub network: Option<(NetworkPlugin, String)>,
}

impl fmt::Display for ComponentBanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "*** Component Version ({}) ***************", self.arch)?;
        writeln!(f, "*   kubernetes: {}", self.kubernetes)?;
        writeln!(f, "*   etcd: {}", self.etcd)?;
        match &self.network {
            Some((plugin, version)) => writeln!(f, "*   {plugin}: {version}")?,
            None => writeln!(f, "*   network plugin: not declared")?,
        }
        write!(f, "*******************************************")
    }
}

impl ClusterManager {
    /// Probes the installed kube-apiserver and etcd binaries and resolves the
    /// network plugin declared in `cluster`'s inventory. A probe that fails
    /// or times out reports "unknown"; a declared but unsupported plugin
    /// is an error.
    pub async fn component_banner(&self, cluster: &str) -> Result<ComponentBanner> {
        let network = match self.declared_network_plugin(cluster).await? {
            Some(plugin) => Some((
                plugin,
                self.config.versions.network_plugin(plugin).to_string(),
            )),
            None => None,
        };

        let kubernetes = self
            .probe_version(self.config.kube_bin_dir.join("kube-apiserver"), parse_kube_version)
            .await;
        let etcd = self
            .probe_version(self.config.extra_bin_dir.join("etcd"), parse_etcd_version)
            .await;

        Ok(ComponentBanner {
            arch: self.config.arch.clone(),
            kubernetes,
            etcd,
            network,
        })
    }

    async fn declared_network_plugin(&self, cluster: &str) -> Result<Option<NetworkPlugin>> {
        let file = InventoryFile::new(self.layout.inventory(cluster));
        if !file.exists() {
            return Ok(None);
        }
        let doc = file.load().await?;
        match doc.variable("CLUSTER_NETWORK") {
            Some(name) => name
                .parse::<NetworkPlugin>()
                .map(Some)
                .map_err(ClusterError::UnknownNetworkPlugin),
            None => Ok(None),
        }
    }

    async fn probe_version(&self, binary: PathBuf, parse: fn(&str) -> Option<String>) -> String {
        let spec = CommandSpec::new(binary)
            .arg("--version")
            .probe(self.config.probe_timeout);
        let name = spec.program_name();
        match self.run_captured(spec).await {
            Ok(output) => parse(&output.stdout).unwrap_or_else(|| {
                log::warn!("Unrecognised {name} version output: {}", output.stdout.trim());
                UNKNOWN.to_string()
            }),
            Err(err) => {
                log::warn!("Could not probe {name} version: {err}");
                UNKNOWN.to_string()
            }
        }
    }
}

/// `Kubernetes v1.33.1` → `v1.33.1`
fn parse_kube_version(output: &str) -> Option<String> {
    output.split_whitespace().nth(1).map(str::to_string)
}

/// `etcd Version: 3.5.21` → `v3.5.21`
fn parse_etcd_version(output: &str) -> Option<String> {
    output
        .split_whitespace()
        .nth(2)
        .map(|v| format!("v{}", v.trim_start_matches('v')))
}
