use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BASE_PATH: &str = "/usr/local/kubeauto";
pub const DEFAULT_CONFIG_PATH: &str = "/etc/kubeauto/kubeauto.toml";
pub const DEFAULT_PROVISIONER: &str = "ansible-playbook";

const DEFAULT_CONFIRM_TIMEOUT_SECS: u64 = 5;
const DEFAULT_PROBE_TIMEOUT_MS: u64 = 3_000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("home directory not found; set active_kubeconfig and ssh_dir")]
    NoHomeDir,
}

/// Process-wide settings. Built once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct KubeautoConfig {
    pub base_path: PathBuf,
    pub kube_bin_dir: PathBuf,
    pub extra_bin_dir: PathBuf,
    /// The kubeconfig kubectl reads by default (`~/.kube/config`).
    pub active_kubeconfig: PathBuf,
    /// Where the all-in-one bootstrap keeps the operator's SSH keys.
    pub ssh_dir: PathBuf,
    pub provisioner: String,
    pub confirm_timeout: Duration,
    pub probe_timeout: Duration,
    pub log_file: Option<PathBuf>,
    pub versions: ComponentVersions,
    pub arch: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    base_path: Option<PathBuf>,
    kube_bin_dir: Option<PathBuf>,
    extra_bin_dir: Option<PathBuf>,
    active_kubeconfig: Option<PathBuf>,
    ssh_dir: Option<PathBuf>,
    provisioner: Option<String>,
    confirm_timeout_secs: Option<u64>,
    probe_timeout_ms: Option<u64>,
    log_file: Option<PathBuf>,
    versions: Option<ComponentVersions>,
}

impl KubeautoConfig {
    /// Loads defaults, then the TOML file (`explicit`, `$KUBEAUTO_CONFIG`, or
    /// the system path when present), then environment overrides.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os("KUBEAUTO_CONFIG").map(PathBuf::from))
            .or_else(|| {
                let default = PathBuf::from(DEFAULT_CONFIG_PATH);
                default.is_file().then_some(default)
            });

        let mut raw = match path {
            Some(path) => {
                let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                    path: path.clone(),
                    source,
                })?;
                log::debug!("Loaded config from {}", path.display());
                parse_raw(&path, &text)?
            }
            None => RawConfig::default(),
        };

        if let Some(base) = std::env::var_os("KUBEAUTO_BASE_PATH") {
            raw.base_path = Some(PathBuf::from(base));
        }
        if let Some(kubeconfig) = std::env::var_os("KUBEAUTO_KUBECONFIG") {
            raw.active_kubeconfig = Some(PathBuf::from(kubeconfig));
        }

        Self::from_raw(raw, dirs::home_dir())
    }

    /// Parses a TOML document without consulting the environment.
    pub fn from_toml_str(text: &str, home: Option<PathBuf>) -> Result<Self, ConfigError> {
        let raw = parse_raw(Path::new("<inline>"), text)?;
        Self::from_raw(raw, home)
    }

    /// Defaults rooted at `base_path`, with the per-user files (active
    /// kubeconfig, `.ssh`) under `home`. Used by embedders and tests that own
    /// a sandbox.
    pub fn sandboxed(base_path: impl Into<PathBuf>, home: &Path) -> Self {
        let raw = RawConfig {
            base_path: Some(base_path.into()),
            ..RawConfig::default()
        };
        Self::resolve(raw, home)
    }

    fn from_raw(raw: RawConfig, home: Option<PathBuf>) -> Result<Self, ConfigError> {
        match home {
            Some(home) => Ok(Self::resolve(raw, &home)),
            None if raw.active_kubeconfig.is_some() && raw.ssh_dir.is_some() => {
                Ok(Self::resolve(raw, Path::new("/")))
            }
            None => Err(ConfigError::NoHomeDir),
        }
    }

    fn resolve(raw: RawConfig, home: &Path) -> Self {
        let base_path = raw
            .base_path
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BASE_PATH));

        Self {
            kube_bin_dir: raw
                .kube_bin_dir
                .unwrap_or_else(|| base_path.join("kube-bin")),
            extra_bin_dir: raw
                .extra_bin_dir
                .unwrap_or_else(|| base_path.join("extra-bin")),
            base_path,
            active_kubeconfig: raw
                .active_kubeconfig
                .unwrap_or_else(|| home.join(".kube").join("config")),
            ssh_dir: raw.ssh_dir.unwrap_or_else(|| home.join(".ssh")),
            provisioner: raw
                .provisioner
                .unwrap_or_else(|| DEFAULT_PROVISIONER.to_string()),
            confirm_timeout: Duration::from_secs(
                raw.confirm_timeout_secs
                    .unwrap_or(DEFAULT_CONFIRM_TIMEOUT_SECS),
            ),
            probe_timeout: Duration::from_millis(
                raw.probe_timeout_ms.unwrap_or(DEFAULT_PROBE_TIMEOUT_MS),
            ),
            log_file: raw.log_file,
            versions: raw.versions.unwrap_or_default(),
            arch: std::env::consts::ARCH.to_string(),
        }
    }

    pub fn kubectl(&self) -> PathBuf {
        self.kube_bin_dir.join("kubectl")
    }
}

fn parse_raw(path: &Path, text: &str) -> Result<RawConfig, ConfigError> {
    toml::from_str(text).map_err(|err| ConfigError::Parse {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

/// Pinned component versions written into new cluster parameter documents.
///
/// Unknown keys are rejected when the config is loaded, so a typo in a
/// plugin name fails at startup instead of surfacing as "unknown" later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ComponentVersions {
    pub k8s: String,
    pub calico: String,
    pub flannel: String,
    pub cilium: String,
    pub kube_ovn: String,
    pub kube_router: String,
    pub coredns: String,
    pub pause: String,
    pub dns_node_cache: String,
    pub dashboard: String,
    pub metrics_server: String,
    pub local_path_provisioner: String,
    pub nfs_provisioner: String,
    pub prom_chart: String,
    pub kubeapps_chart: String,
    pub harbor: String,
}

impl Default for ComponentVersions {
    fn default() -> Self {
        Self {
            k8s: "v1.33.1".to_string(),
            calico: "v3.28.4".to_string(),
            flannel: "v0.26.7".to_string(),
            cilium: "v1.17.4".to_string(),
            kube_ovn: "v1.11.5".to_string(),
            kube_router: "v1.5.4".to_string(),
            coredns: "1.12.1".to_string(),
            pause: "3.10".to_string(),
            dns_node_cache: "1.25.0".to_string(),
            dashboard: "7.12.0".to_string(),
            metrics_server: "v0.7.2".to_string(),
            local_path_provisioner: "v0.0.31".to_string(),
            nfs_provisioner: "v4.0.2".to_string(),
            prom_chart: "45.23.0".to_string(),
            kubeapps_chart: "12.4.3".to_string(),
            harbor: "v2.12.4".to_string(),
        }
    }
}

impl ComponentVersions {
    pub fn network_plugin(&self, plugin: NetworkPlugin) -> &str {
        match plugin {
            NetworkPlugin::Calico => &self.calico,
            NetworkPlugin::Flannel => &self.flannel,
            NetworkPlugin::Cilium => &self.cilium,
            NetworkPlugin::KubeOvn => &self.kube_ovn,
            NetworkPlugin::KubeRouter => &self.kube_router,
        }
    }

    /// Placeholder → value pairs substituted into a new cluster's
    /// parameter document.
    pub fn placeholders(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("__k8s_ver__", self.k8s.trim_start_matches('v')),
            ("__flannel__", &self.flannel),
            ("__calico__", &self.calico),
            ("__cilium__", &self.cilium),
            ("__kube_ovn__", &self.kube_ovn),
            ("__kube_router__", &self.kube_router),
            ("__coredns__", &self.coredns),
            ("__pause__", &self.pause),
            ("__dns_node_cache__", &self.dns_node_cache),
            ("__dashboard__", &self.dashboard),
            ("__local_path_provisioner__", &self.local_path_provisioner),
            ("__nfs_provisioner__", &self.nfs_provisioner),
            ("__prom_chart__", &self.prom_chart),
            ("__kubeapps_chart__", &self.kubeapps_chart),
            ("__harbor__", &self.harbor),
            ("__metrics__", &self.metrics_server),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkPlugin {
    Calico,
    Flannel,
    Cilium,
    KubeOvn,
    KubeRouter,
}

impl NetworkPlugin {
    pub const fn as_str(self) -> &'static str {
        match self {
            NetworkPlugin::Calico => "calico",
            NetworkPlugin::Flannel => "flannel",
            NetworkPlugin::Cilium => "cilium",
            NetworkPlugin::KubeOvn => "kube-ovn",
            NetworkPlugin::KubeRouter => "kube-router",
        }
    }
}

impl fmt::Display for NetworkPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetworkPlugin {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "calico" => Ok(NetworkPlugin::Calico),
            "flannel" => Ok(NetworkPlugin::Flannel),
            "cilium" => Ok(NetworkPlugin::Cilium),
            "kubeovn" => Ok(NetworkPlugin::KubeOvn),
            "kuberouter" => Ok(NetworkPlugin::KubeRouter),
            _ => Err(s.trim().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_derive_from_base_path() {
        let cfg = KubeautoConfig::from_toml_str(
            r#"base_path = "/opt/kubeauto""#,
            Some(PathBuf::from("/home/ops")),
        )
        .unwrap();
        assert_eq!(cfg.kube_bin_dir, PathBuf::from("/opt/kubeauto/kube-bin"));
        assert_eq!(cfg.extra_bin_dir, PathBuf::from("/opt/kubeauto/extra-bin"));
        assert_eq!(cfg.active_kubeconfig, PathBuf::from("/home/ops/.kube/config"));
        assert_eq!(cfg.provisioner, "ansible-playbook");
        assert_eq!(cfg.confirm_timeout, Duration::from_secs(5));
    }

    #[test]
    fn version_overrides_keep_other_defaults() {
        let cfg = KubeautoConfig::from_toml_str(
            "[versions]\ncalico = \"v3.29.0\"\n",
            Some(PathBuf::from("/root")),
        )
        .unwrap();
        assert_eq!(cfg.versions.calico, "v3.29.0");
        assert_eq!(cfg.versions.flannel, ComponentVersions::default().flannel);
    }

    #[test]
    fn unknown_plugin_version_key_fails_at_load() {
        let err = KubeautoConfig::from_toml_str(
            "[versions]\nweave = \"v2.8.1\"\n",
            Some(PathBuf::from("/root")),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("weave"), "{err}");
    }

    #[test]
    fn missing_home_requires_explicit_user_paths() {
        let err = KubeautoConfig::from_toml_str("", None).unwrap_err();
        assert!(matches!(err, ConfigError::NoHomeDir));

        let cfg = KubeautoConfig::from_toml_str(
            "active_kubeconfig = \"/srv/kube/config\"\nssh_dir = \"/srv/ssh\"\n",
            None,
        )
        .unwrap();
        assert_eq!(cfg.active_kubeconfig, PathBuf::from("/srv/kube/config"));
        assert_eq!(cfg.ssh_dir, PathBuf::from("/srv/ssh"));
    }

    #[test]
    fn sandbox_keeps_user_files_under_home() {
        let cfg = KubeautoConfig::sandboxed("/tmp/base", Path::new("/tmp/home"));
        assert_eq!(cfg.active_kubeconfig, PathBuf::from("/tmp/home/.kube/config"));
        assert_eq!(cfg.ssh_dir, PathBuf::from("/tmp/home/.ssh"));
        assert_eq!(cfg.kubectl(), PathBuf::from("/tmp/base/kube-bin/kubectl"));
    }

    #[test]
    fn network_plugin_lookup_is_explicit() {
        let versions = ComponentVersions::default();
        let plugin: NetworkPlugin = "kube-ovn".parse().unwrap();
        assert_eq!(versions.network_plugin(plugin), "v1.11.5");
        assert_eq!("kube_router".parse::<NetworkPlugin>(), Ok(NetworkPlugin::KubeRouter));
        assert_eq!("weave".parse::<NetworkPlugin>(), Err("weave".to_string()));
    }
}
