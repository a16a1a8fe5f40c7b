//! Per-user kubeconfigs (`kcfg-adm`): issue, revoke, list.

use crate::manager::ClusterManager;
use crate::runner::CommandSpec;
use crate::{ClusterError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

pub const DEFAULT_EXPIRY: &str = "4800h";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum UserType {
    Admin,
    View,
}

impl UserType {
    pub const fn as_str(self) -> &'static str {
        match self {
            UserType::Admin => "admin",
            UserType::View => "view",
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserType {
    type Err = ClusterError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "admin" => Ok(UserType::Admin),
            "view" => Ok(UserType::View),
            other => Err(ClusterError::Other(format!("unknown user type: {other}"))),
        }
    }
}

/// One row of `kcfg-adm --list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub name: String,
    /// `cluster-admin`, `view` or `unknown`.
    pub kind: String,
    pub expiry: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BindingList {
    #[serde(default)]
    items: Vec<Binding>,
}

#[derive(Debug, Deserialize)]
struct Binding {
    metadata: Metadata,
    #[serde(rename = "roleRef")]
    role_ref: Metadata,
    #[serde(default)]
    subjects: Vec<Metadata>,
}

#[derive(Debug, Deserialize)]
struct Metadata {
    name: String,
}

#[derive(Debug, Deserialize)]
struct CertInfo {
    not_after: Option<String>,
}

impl ClusterManager {
    /// Issues a kubeconfig for `user` (default `user-<unix seconds>`) through
    /// the deploy role and returns the user name.
    pub async fn add_user(
        &self,
        cluster: &str,
        user: Option<&str>,
        user_type: UserType,
        expiry: &str,
    ) -> Result<String> {
        self.registry.require(cluster)?;
        let user = match user {
            Some(name) => name.to_string(),
            None => default_user_name(),
        };

        log::info!("Adding user {user} ({user_type}) to cluster {cluster}");
        let playbook = self
            .playbook_at(cluster, &self.layout.deploy_role())
            .var("CUSTOM_EXPIRY", expiry)
            .var("USER_TYPE", user_type)
            .var("USER_NAME", &user)
            .var("ADD_KCFG", "true")
            .tag("add-kcfg");
        self.run_playbook(playbook).await?;
        Ok(user)
    }

    /// Deletes the cluster-role-bindings whose first subject is `user` and the
    /// user's certificate files.
    pub async fn delete_user(&self, cluster: &str, user: &str) -> Result<()> {
        self.registry.require(cluster)?;
        let bindings = self.cluster_role_bindings(cluster).await?;
        let owned: Vec<String> = bindings
            .items
            .iter()
            .filter(|b| b.subjects.first().is_some_and(|s| s.name == user))
            .map(|b| b.metadata.name.clone())
            .collect();

        if owned.is_empty() {
            log::warn!("No cluster-role-binding found for user {user}");
        } else {
            let spec = self
                .kubectl(cluster)
                .args(["delete", "clusterrolebindings"])
                .args(owned.iter().map(String::as_str))
                .captured();
            log::info!("Running command: {spec}");
            self.run_captured(spec).await?;
        }

        let removed = remove_user_files(&self.layout.user_certs_dir(cluster), user).await?;
        log::info!("Deleted user {user} from cluster {cluster} ({removed} certificate files)");
        Ok(())
    }

    /// Users bound to a cluster role that were issued a certificate by
    /// `add_user`.
    pub async fn list_users(&self, cluster: &str) -> Result<Vec<UserRecord>> {
        self.registry.require(cluster)?;
        let bindings = self.cluster_role_bindings(cluster).await?;
        let certs = self.layout.user_certs_dir(cluster);

        let mut records = Vec::new();
        for (name, kind) in classify_subjects(&bindings) {
            let cert = certs.join(format!("{name}.pem"));
            if !cert.is_file() {
                continue;
            }
            let expiry = self.certificate_expiry(&cert).await;
            records.push(UserRecord { name, kind, expiry });
        }
        Ok(records)
    }

    pub(crate) fn kubectl(&self, cluster: &str) -> CommandSpec {
        CommandSpec::new(self.config.kubectl())
            .arg("--kubeconfig")
            .arg(self.layout.credential(cluster))
    }

    async fn cluster_role_bindings(&self, cluster: &str) -> Result<BindingList> {
        let spec = self
            .kubectl(cluster)
            .args(["get", "clusterrolebindings", "-o", "json"])
            .probe(self.config.probe_timeout);
        let output = self.run_captured(spec).await?;
        Ok(serde_json::from_str(&output.stdout)?)
    }

    async fn certificate_expiry(&self, cert: &Path) -> Option<String> {
        let spec = CommandSpec::new(self.config.kube_bin_dir.join("cfssl-certinfo"))
            .arg("-cert")
            .arg(cert)
            .probe(self.config.probe_timeout);
        match self.run_captured(spec).await {
            Ok(output) => parse_not_after(&output.stdout),
            Err(err) => {
                log::warn!("Could not read expiry of {}: {err}", cert.display());
                None
            }
        }
    }
}

/// Subject name → binding kind. `cluster-admin` wins over `view`, which wins
/// over anything else.
fn classify_subjects(bindings: &BindingList) -> BTreeMap<String, String> {
    fn rank(kind: &str) -> u8 {
        match kind {
            "cluster-admin" => 2,
            "view" => 1,
            _ => 0,
        }
    }

    let mut users: BTreeMap<String, String> = BTreeMap::new();
    for binding in &bindings.items {
        let kind = match binding.role_ref.name.as_str() {
            "cluster-admin" => "cluster-admin",
            "view" => "view",
            _ => "unknown",
        };
        for subject in &binding.subjects {
            let entry = users
                .entry(subject.name.clone())
                .or_insert_with(|| kind.to_string());
            if rank(kind) > rank(entry.as_str()) {
                *entry = kind.to_string();
            }
        }
    }
    users
}

fn parse_not_after(certinfo: &str) -> Option<String> {
    serde_json::from_str::<CertInfo>(certinfo)
        .ok()
        .and_then(|info| info.not_after)
}

/// `<user>.<ext>` or `<user>-key.<ext>` / `<user>-csr.<ext>`, the files
/// issued for one user.
fn is_user_file(file_name: &str, user: &str) -> bool {
    let Some(rest) = file_name.strip_prefix(user) else {
        return false;
    };
    let rest = rest
        .strip_prefix("-key")
        .or_else(|| rest.strip_prefix("-csr"))
        .unwrap_or(rest);
    rest.starts_with('.')
}

async fn remove_user_files(dir: &Path, user: &str) -> Result<usize> {
    if !dir.is_dir() {
        return Ok(0);
    }
    let mut removed = 0;
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if is_user_file(&entry.file_name().to_string_lossy(), user) {
            tokio::fs::remove_file(entry.path()).await?;
            removed += 1;
        }
    }
    Ok(removed)
}

fn default_user_name() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("user-{secs}")
}
