use crate::config::KubeautoConfig;
use crate::fingerprint::fingerprint_file;
use crate::layout::{is_valid_cluster_name, ClusterLayout, CREDENTIAL_FILE};
use crate::pending::{read_pending, PendingOperation};
use crate::{ClusterError, Result};
use kubeauto_inventory::write_atomic;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One row of `kubeauto list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterSummary {
    pub name: String,
    pub current: bool,
    pub pending: Vec<PendingOperation>,
}

/// Clusters known under `<base>/clusters` and which of them the active
/// kubeconfig points at.
#[derive(Debug, Clone)]
pub struct ClusterRegistry {
    config: Arc<KubeautoConfig>,
    layout: ClusterLayout,
}

impl ClusterRegistry {
    pub fn new(config: Arc<KubeautoConfig>) -> Self {
        let layout = ClusterLayout::new(&config.base_path);
        Self { config, layout }
    }

    pub fn layout(&self) -> &ClusterLayout {
        &self.layout
    }

    pub fn exists(&self, name: &str) -> bool {
        is_valid_cluster_name(name) && self.layout.cluster_dir(name).is_dir()
    }

    pub fn require(&self, name: &str) -> Result<()> {
        if self.exists(name) {
            Ok(())
        } else {
            Err(ClusterError::ClusterNotFound(name.to_string()))
        }
    }

    /// Names of cluster directories holding an admin credential. Clusters
    /// that were created but never set up are not listed.
    pub async fn list(&self) -> Result<BTreeSet<String>> {
        let clusters_dir = self.layout.clusters_dir();
        if !clusters_dir.is_dir() {
            return Err(ClusterError::RegistryUnavailable(format!(
                "clusters directory {} missing",
                clusters_dir.display()
            )));
        }
        if !self.config.active_kubeconfig.is_file() {
            return Err(ClusterError::RegistryUnavailable(format!(
                "kubeconfig {} missing",
                self.config.active_kubeconfig.display()
            )));
        }

        let mut names = BTreeSet::new();
        let mut entries = tokio::fs::read_dir(&clusters_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            if entry.path().join(CREDENTIAL_FILE).is_file() {
                names.insert(entry.file_name().to_string_lossy().into_owned());
            }
        }
        Ok(names)
    }

    /// The cluster whose credential matches the active kubeconfig, ignoring
    /// API server endpoints. First match in name order wins.
    pub async fn current_cluster(&self) -> Result<Option<String>> {
        if !self.config.active_kubeconfig.is_file() {
            return Ok(None);
        }
        let active = fingerprint_file(&self.config.active_kubeconfig).await?;
        for name in self.list().await? {
            let candidate = fingerprint_file(&self.layout.credential(&name)).await?;
            if candidate == active {
                return Ok(Some(name));
            }
        }
        Ok(None)
    }

    pub async fn pending(&self, name: &str) -> Result<Vec<PendingOperation>> {
        read_pending(&self.layout.pending_marker(name)).await
    }

    pub async fn summaries(&self) -> Result<Vec<ClusterSummary>> {
        let names = self.list().await?;
        let current = self.current_cluster().await?;
        let mut rows = Vec::with_capacity(names.len());
        for name in names {
            let pending = self.pending(&name).await?;
            rows.push(ClusterSummary {
                current: current.as_deref() == Some(name.as_str()),
                name,
                pending,
            });
        }
        Ok(rows)
    }

    /// Creates `clusters/<name>` from the multi-node templates.
    pub async fn new_cluster(&self, name: &str) -> Result<PathBuf> {
        self.create_from_templates(name, "hosts.multi-node", &[]).await
    }

    /// Creates `clusters/<name>` from `example/<hosts_template>` and
    /// `example/config.yml`. `_cluster_name_` and the version placeholders
    /// are filled in, then each `(from, to)` of `substitutions` is applied to
    /// the inventory.
    pub async fn create_from_templates(
        &self,
        name: &str,
        hosts_template: &str,
        substitutions: &[(&str, &str)],
    ) -> Result<PathBuf> {
        if !is_valid_cluster_name(name) {
            return Err(ClusterError::Other(format!("invalid cluster name: {name:?}")));
        }
        let dir = self.layout.cluster_dir(name);
        if dir.exists() {
            return Err(ClusterError::ClusterExists(name.to_string()));
        }

        let mut hosts = read_template(&self.layout.example(hosts_template))
            .await?
            .replace("_cluster_name_", name);
        for (from, to) in substitutions {
            hosts = hosts.replace(from, to);
        }
        let mut parameters = read_template(&self.layout.example("config.yml")).await?;
        for (placeholder, value) in self.config.versions.placeholders() {
            parameters = parameters.replace(placeholder, value);
        }

        tokio::fs::create_dir_all(&dir).await?;
        write_atomic(&self.layout.inventory(name), hosts.as_bytes()).await?;
        write_atomic(&self.layout.parameters(name), parameters.as_bytes()).await?;
        log::info!("Cluster {name} created under {}", dir.display());
        log::info!(
            "Next steps: edit {} and {}",
            self.layout.inventory(name).display(),
            self.layout.parameters(name).display()
        );
        Ok(dir)
    }

    /// Makes `name` the active cluster by replacing the active kubeconfig
    /// with the cluster's credential.
    pub async fn checkout(&self, name: &str) -> Result<()> {
        self.require(name)?;
        let credential = self.layout.credential(name);
        if !credential.is_file() {
            log::warn!("Cluster {name} has no {CREDENTIAL_FILE}; run setup first");
            return Err(ClusterError::ClusterNotFound(name.to_string()));
        }

        let bytes = tokio::fs::read(&credential).await?;
        let active = &self.config.active_kubeconfig;
        if let Some(parent) = active.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        write_atomic(active, &bytes).await?;
        log::info!("Switched active kubeconfig to cluster {name}");
        Ok(())
    }
}

async fn read_template(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|err| ClusterError::Other(format!("read template {}: {err}", path.display())))
}
