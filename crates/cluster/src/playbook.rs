use crate::runner::CommandSpec;
use std::path::{Path, PathBuf};

/// One provisioner invocation:
///
/// ```text
/// <provisioner> -i <inventory> [-e key=value]... -e @<parameters> [extra]... [-t <tag>] <workflow>
/// ```
#[derive(Debug, Clone)]
pub struct Playbook {
    workflow: PathBuf,
    inventory: PathBuf,
    parameters: PathBuf,
    vars: Vec<(String, String)>,
    tag: Option<String>,
    extra_args: Vec<String>,
}

impl Playbook {
    pub fn new(workflow: impl Into<PathBuf>, inventory: &Path, parameters: &Path) -> Self {
        Self {
            workflow: workflow.into(),
            inventory: inventory.to_path_buf(),
            parameters: parameters.to_path_buf(),
            vars: Vec::new(),
            tag: None,
            extra_args: Vec::new(),
        }
    }

    pub fn var(mut self, key: &str, value: impl ToString) -> Self {
        self.vars.push((key.to_string(), value.to_string()));
        self
    }

    /// Restricts the run to one tagged sub-procedure.
    pub fn tag(mut self, tag: &str) -> Self {
        self.tag = Some(tag.to_string());
        self
    }

    /// Raw provisioner arguments forwarded verbatim.
    pub fn extra_args(mut self, args: &[String]) -> Self {
        self.extra_args.extend(args.iter().cloned());
        self
    }

    pub fn workflow(&self) -> &Path {
        &self.workflow
    }

    pub fn into_command(self, provisioner: &str) -> CommandSpec {
        let mut spec = CommandSpec::new(provisioner)
            .arg("-i")
            .arg(self.inventory.as_os_str());
        for (key, value) in &self.vars {
            spec = spec.arg("-e").arg(format!("{key}={value}"));
        }
        spec = spec
            .arg("-e")
            .arg(format!("@{}", self.parameters.display()))
            .args(self.extra_args);
        if let Some(tag) = self.tag {
            spec = spec.arg("-t").arg(tag);
        }
        spec.arg(self.workflow.as_os_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn assembles_provisioner_contract() {
        let spec = Playbook::new(
            "/kubeauto/playbooks/23.addmaster.yml",
            Path::new("/kubeauto/clusters/demo/hosts"),
            Path::new("/kubeauto/clusters/demo/config.yml"),
        )
        .var("NODE_TO_ADD", "10.0.0.3")
        .into_command("ansible-playbook");

        assert_eq!(
            spec.to_string(),
            "ansible-playbook -i /kubeauto/clusters/demo/hosts -e NODE_TO_ADD=10.0.0.3 \
             -e @/kubeauto/clusters/demo/config.yml /kubeauto/playbooks/23.addmaster.yml"
        );
    }

    #[test]
    fn tag_precedes_workflow() {
        let spec = Playbook::new(
            "/p/02.etcd.yml",
            Path::new("/c/hosts"),
            Path::new("/c/config.yml"),
        )
        .extra_args(&["-vv".to_string()])
        .tag("restart_etcd")
        .into_command("ansible-playbook");

        assert_eq!(
            spec.to_string(),
            "ansible-playbook -i /c/hosts -e @/c/config.yml -vv -t restart_etcd /p/02.etcd.yml"
        );
    }
}
