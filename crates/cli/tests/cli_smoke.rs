use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::{tempdir, TempDir};

const CREDENTIAL: &str = "\
apiVersion: v1
clusters:
- cluster:
    server: https://10.0.0.1:6443
  name: cluster1
";

struct Workspace {
    temp: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let temp = tempdir().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("base/example")).unwrap();
        fs::create_dir_all(root.join("home/.kube")).unwrap();
        fs::write(
            root.join("base/example/hosts.multi-node"),
            "[etcd]\n192.168.1.1\n\n[all:vars]\nCLUSTER_NAME=\"_cluster_name_\"\n",
        )
        .unwrap();
        fs::write(root.join("base/example/config.yml"), "K8S_VER: \"__k8s_ver__\"\n").unwrap();
        fs::write(
            root.join("kubeauto.toml"),
            format!(
                "base_path = {:?}\nactive_kubeconfig = {:?}\nssh_dir = {:?}\n",
                root.join("base").display().to_string(),
                root.join("home/.kube/config").display().to_string(),
                root.join("home/.ssh").display().to_string(),
            ),
        )
        .unwrap();
        Self { temp }
    }

    fn root(&self) -> &Path {
        self.temp.path()
    }

    #[allow(deprecated)]
    fn kubeauto(&self) -> Command {
        let mut cmd = Command::cargo_bin("kubeauto").expect("binary");
        cmd.env("KUBEAUTO_CONFIG", self.root().join("kubeauto.toml"))
            .env_remove("KUBEAUTO_BASE_PATH")
            .env_remove("KUBEAUTO_KUBECONFIG")
            .env_remove("RUST_LOG");
        cmd
    }
}

#[test]
fn help_lists_lifecycle_commands() {
    let ws = Workspace::new();
    ws.kubeauto()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("add-master"))
        .stdout(predicate::str::contains("del-node"))
        .stdout(predicate::str::contains("kcfg-adm"));
}

#[test]
fn kcfg_adm_requires_an_action() {
    let ws = Workspace::new();
    ws.kubeauto().args(["kcfg-adm", "demo"]).assert().failure();
}

#[test]
fn kcfg_adm_delete_requires_a_user() {
    let ws = Workspace::new();
    ws.kubeauto()
        .args(["kcfg-adm", "demo", "-D"])
        .assert()
        .failure();
}

#[test]
fn list_without_clusters_dir_reports_unavailable_registry() {
    let ws = Workspace::new();
    ws.kubeauto()
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Registry unavailable"));
}

#[test]
fn new_then_list_marks_the_current_cluster() {
    let ws = Workspace::new();
    ws.kubeauto()
        .args(["new", "demo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("clusters/demo"));

    let hosts = fs::read_to_string(ws.root().join("base/clusters/demo/hosts")).unwrap();
    assert!(hosts.contains("CLUSTER_NAME=\"demo\""));
    assert!(ws.root().join("base/clusters/demo/config.yml").is_file());

    fs::write(
        ws.root().join("base/clusters/demo/kubectl.kubeconfig"),
        CREDENTIAL,
    )
    .unwrap();
    fs::write(
        ws.root().join("home/.kube/config"),
        CREDENTIAL.replace("10.0.0.1", "lb.example.com"),
    )
    .unwrap();

    ws.kubeauto()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("==> 1: demo"));
}

#[test]
fn new_rejects_existing_cluster() {
    let ws = Workspace::new();
    fs::create_dir_all(ws.root().join("base/clusters/demo")).unwrap();
    ws.kubeauto()
        .args(["new", "demo"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn setup_with_unknown_step_is_skipped() {
    let ws = Workspace::new();
    ws.kubeauto().args(["new", "demo"]).assert().success();
    ws.kubeauto()
        .args(["--yes", "setup", "demo", "08"])
        .assert()
        .success();
}

#[test]
fn add_node_rejects_invalid_address() {
    let ws = Workspace::new();
    ws.kubeauto().args(["new", "demo"]).assert().success();
    ws.kubeauto()
        .args(["add-node", "demo", "10.0.0.256", "--yes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid IP address"));
}

#[test]
fn operations_on_unknown_cluster_fail() {
    let ws = Workspace::new();
    fs::create_dir_all(ws.root().join("base/clusters")).unwrap();
    ws.kubeauto()
        .args(["stop", "ghost", "--yes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cluster ghost not found"));
}
