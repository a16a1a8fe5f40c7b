use std::path::{Path, PathBuf};

pub const INVENTORY_FILE: &str = "hosts";
pub const PARAMETERS_FILE: &str = "config.yml";
pub const CREDENTIAL_FILE: &str = "kubectl.kubeconfig";
pub const PENDING_FILE: &str = ".pending-node.json";

/// On-disk layout under the kubeauto base path.
#[derive(Debug, Clone)]
pub struct ClusterLayout {
    base: PathBuf,
}

impl ClusterLayout {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn clusters_dir(&self) -> PathBuf {
        self.base.join("clusters")
    }

    pub fn cluster_dir(&self, name: &str) -> PathBuf {
        self.clusters_dir().join(name)
    }

    pub fn inventory(&self, name: &str) -> PathBuf {
        self.cluster_dir(name).join(INVENTORY_FILE)
    }

    pub fn parameters(&self, name: &str) -> PathBuf {
        self.cluster_dir(name).join(PARAMETERS_FILE)
    }

    pub fn credential(&self, name: &str) -> PathBuf {
        self.cluster_dir(name).join(CREDENTIAL_FILE)
    }

    pub fn pending_marker(&self, name: &str) -> PathBuf {
        self.cluster_dir(name).join(PENDING_FILE)
    }

    pub fn user_certs_dir(&self, name: &str) -> PathBuf {
        self.cluster_dir(name).join("ssl").join("users")
    }

    pub fn playbook(&self, workflow: &str) -> PathBuf {
        self.base.join("playbooks").join(workflow)
    }

    pub fn deploy_role(&self) -> PathBuf {
        self.base.join("roles").join("deploy").join("deploy.yml")
    }

    pub fn example(&self, file: &str) -> PathBuf {
        self.base.join("example").join(file)
    }
}

/// Cluster names become directory names, so they must stay a single path
/// component.
pub fn is_valid_cluster_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}
