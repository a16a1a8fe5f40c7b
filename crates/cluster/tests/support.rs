#![allow(dead_code)]

use async_trait::async_trait;
use kubeauto_cluster::{
    ClusterError, ClusterManager, CommandOutput, CommandRunner, CommandSpec, Confirmation,
    KubeautoConfig,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const HOSTS: &str = "\
# cluster inventory
[etcd]
10.0.0.1
10.0.0.2

[kube_master]
10.0.0.1 k8s_nodename='master-01'
10.0.0.2 k8s_nodename='master-02'

[kube_node]
10.0.0.11 k8s_nodename='worker-01'
10.0.0.12 k8s_nodename='worker-02'

[all:vars]
CLUSTER_NETWORK=\"calico\"
CLUSTER_NAME=\"_cluster_name_\"
";

pub const ALLINONE_HOSTS: &str = "\
[etcd]
192.168.1.1

[kube_master]
192.168.1.1 k8s_nodename='master-01'

[kube_node]
192.168.1.1 k8s_nodename='worker-01'

[all:vars]
CLUSTER_NETWORK=\"calico\"
CLUSTER_NAME=\"_cluster_name_\"
";

pub const PARAMETERS: &str = "\
K8S_VER: \"__k8s_ver__\"
calico_ver: \"__calico__\"
coredns_ver: \"__coredns__\"
";

type Predicate = Box<dyn Fn(&CommandSpec) -> bool + Send + Sync>;

/// Records every command instead of running it. Scripted predicates decide
/// which commands fail and which return canned stdout.
#[derive(Default)]
pub struct RecordingRunner {
    calls: Mutex<Vec<CommandSpec>>,
    failures: Mutex<Vec<Predicate>>,
    responses: Mutex<Vec<(Predicate, String)>>,
}

impl RecordingRunner {
    pub fn fail_when(&self, predicate: impl Fn(&CommandSpec) -> bool + Send + Sync + 'static) {
        self.failures.lock().unwrap().push(Box::new(predicate));
    }

    pub fn respond_when(
        &self,
        predicate: impl Fn(&CommandSpec) -> bool + Send + Sync + 'static,
        stdout: &str,
    ) {
        self.responses
            .lock()
            .unwrap()
            .push((Box::new(predicate), stdout.to_string()));
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    /// Provisioner invocations only, as `(workflow file, tag)` pairs.
    pub fn workflows(&self) -> Vec<(String, Option<String>)> {
        self.calls()
            .iter()
            .filter(|spec| spec.program_name() == "ansible-playbook")
            .map(|spec| (workflow_of(spec), tag_of(spec)))
            .collect()
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(&self, spec: &CommandSpec) -> kubeauto_cluster::Result<CommandOutput> {
        self.calls.lock().unwrap().push(spec.clone());
        if self.failures.lock().unwrap().iter().any(|fail| fail(spec)) {
            return Err(ClusterError::ExternalWorkflow {
                command: spec.to_string(),
                status: Some(2),
                stdout: String::new(),
                stderr: "scripted failure".to_string(),
            });
        }
        let stdout = self
            .responses
            .lock()
            .unwrap()
            .iter()
            .find(|(matches, _)| matches(spec))
            .map(|(_, stdout)| stdout.clone())
            .unwrap_or_default();
        Ok(CommandOutput {
            stdout,
            stderr: String::new(),
        })
    }
}

pub struct Decline;

#[async_trait]
impl Confirmation for Decline {
    async fn confirm(&self, _prompt: &str) -> bool {
        false
    }
}

pub fn workflow_of(spec: &CommandSpec) -> String {
    spec.args
        .last()
        .map(|arg| {
            Path::new(arg)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default()
        })
        .unwrap_or_default()
}

pub fn tag_of(spec: &CommandSpec) -> Option<String> {
    let args: Vec<String> = spec
        .args
        .iter()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();
    args.iter()
        .position(|arg| arg == "-t")
        .and_then(|idx| args.get(idx + 1).cloned())
}

pub fn arg_index(spec: &CommandSpec, needle: &str) -> Option<usize> {
    spec.args.iter().position(|arg| arg.to_string_lossy() == needle)
}

/// A throwaway base path with templates and a home directory.
pub struct Sandbox {
    temp: TempDir,
    pub config: Arc<KubeautoConfig>,
}

impl Sandbox {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("tempdir");
        let base = temp.path().join("base");
        let home = temp.path().join("home");
        std::fs::create_dir_all(base.join("clusters")).expect("clusters dir");
        std::fs::create_dir_all(base.join("example")).expect("example dir");
        std::fs::create_dir_all(home.join(".kube")).expect("kube dir");
        std::fs::write(base.join("example/hosts.multi-node"), HOSTS).expect("template");
        std::fs::write(base.join("example/hosts.allinone"), ALLINONE_HOSTS).expect("template");
        std::fs::write(base.join("example/config.yml"), PARAMETERS).expect("template");

        let config = Arc::new(KubeautoConfig::sandboxed(&base, &home));
        Self { temp, config }
    }

    pub fn base(&self) -> PathBuf {
        self.config.base_path.clone()
    }

    pub fn cluster_dir(&self, name: &str) -> PathBuf {
        self.base().join("clusters").join(name)
    }

    pub fn add_cluster(&self, name: &str, hosts: &str) {
        let dir = self.cluster_dir(name);
        std::fs::create_dir_all(&dir).expect("cluster dir");
        std::fs::write(dir.join("hosts"), hosts.replace("_cluster_name_", name)).expect("hosts");
        std::fs::write(dir.join("config.yml"), PARAMETERS).expect("config.yml");
    }

    pub fn hosts(&self, name: &str) -> String {
        std::fs::read_to_string(self.cluster_dir(name).join("hosts")).expect("read hosts")
    }

    pub fn pending_marker(&self, name: &str) -> PathBuf {
        self.cluster_dir(name).join(".pending-node.json")
    }

    pub fn manager(
        &self,
        runner: Arc<RecordingRunner>,
        confirm: Arc<dyn Confirmation>,
    ) -> ClusterManager {
        ClusterManager::new(Arc::clone(&self.config), runner, confirm)
    }
}
