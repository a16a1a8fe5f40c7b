use crate::manager::{ClusterManager, Outcome};
use crate::{ClusterError, Result};

/// Maps a setup step, by number or by name, to its workflow.
pub fn setup_workflow(step: &str) -> Result<&'static str> {
    let workflow = match step {
        "01" | "prepare" => "01.prepare.yml",
        "02" | "etcd" => "02.etcd.yml",
        "03" | "container-runtime" => "03.runtime.yml",
        "04" | "kube-master" => "04.kube-master.yml",
        "05" | "kube-node" => "05.kube-node.yml",
        "06" | "network" => "06.network.yml",
        "07" | "cluster-addon" => "07.cluster-addon.yml",
        "90" | "all" => "90.setup.yml",
        "10" | "ex-lb" => "10.ex-lb.yml",
        "11" | "harbor" => "11.harbor.yml",
        other => return Err(ClusterError::InvalidStep(other.to_string())),
    };
    Ok(workflow)
}

/// Maps a cluster-wide operation to its workflow.
pub fn operation_workflow(command: &str) -> Result<&'static str> {
    let workflow = match command {
        "start" => "91.start.yml",
        "stop" => "92.stop.yml",
        "upgrade" => "93.upgrade.yml",
        "backup" => "94.backup.yml",
        "restore" => "95.restore.yml",
        "destroy" => "99.clean.yml",
        other => return Err(ClusterError::InvalidStep(other.to_string())),
    };
    Ok(workflow)
}

impl ClusterManager {
    /// Runs one setup step against `cluster`. `extra_args` are handed to the
    /// provisioner ahead of the workflow path. An unknown step is logged and
    /// skipped.
    pub async fn setup(&self, cluster: &str, step: &str, extra_args: &[String]) -> Result<Outcome> {
        self.registry.require(cluster)?;
        let workflow = match setup_workflow(step) {
            Ok(workflow) => workflow,
            Err(err) => {
                log::error!("{err}");
                return Ok(Outcome::Skipped);
            }
        };

        let banner = self.component_banner(cluster).await?;
        println!("{banner}");

        let prompt = format!("cluster:{cluster} setup step:{step} begins");
        if !self.confirmed(&prompt).await {
            return Ok(Outcome::Aborted);
        }
        self.run_playbook(self.workflow(cluster, workflow).extra_args(extra_args))
            .await?;
        Ok(Outcome::Completed)
    }

    /// Runs a cluster-wide operation (`start`, `stop`, `upgrade`, `backup`,
    /// `restore`, `destroy`). An unknown operation is logged and skipped.
    pub async fn operate(&self, cluster: &str, command: &str) -> Result<Outcome> {
        self.registry.require(cluster)?;
        let workflow = match operation_workflow(command) {
            Ok(workflow) => workflow,
            Err(err) => {
                log::error!("{err}");
                return Ok(Outcome::Skipped);
            }
        };

        let prompt = format!("cluster:{cluster} {command} begins");
        if !self.confirmed(&prompt).await {
            return Ok(Outcome::Aborted);
        }
        self.run_playbook(self.workflow(cluster, workflow)).await?;
        Ok(Outcome::Completed)
    }

    /// Recreates the cluster CA and every certificate issued from it.
    pub async fn renew_ca(&self, cluster: &str) -> Result<Outcome> {
        self.registry.require(cluster)?;
        log::warn!("This recreates the CA and all other certificates in cluster {cluster}");
        log::warn!("Only use it if the admin kubeconfig has been compromised");

        let prompt = format!("Renew all certs in cluster {cluster}");
        if !self.confirmed(&prompt).await {
            return Ok(Outcome::Aborted);
        }
        let playbook = self
            .workflow(cluster, "96.update-certs.yml")
            .var("CHANGE_CA", "true")
            .tag("force_change_certs");
        self.run_playbook(playbook).await?;
        Ok(Outcome::Completed)
    }
}
