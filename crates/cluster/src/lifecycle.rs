//! Adding and removing nodes of a running cluster.
//!
//! Both directions share one shape: validate, check membership, ask the
//! operator, run the role's provisioning workflow, then converge the cluster
//! so existing members pick up the change. An add rewrites the inventory
//! before provisioning (the workflow reads the new member from it); a remove
//! rewrites it only after the workflow succeeded (the workflow still needs
//! to reach the departing member).

use crate::manager::{validate_ip, ClusterManager, Outcome};
use crate::pending::{record_pending, resolve_pending, PendingOperation};
use crate::{ClusterError, Result};
use kubeauto_inventory::{InventoryError, InventoryFile, Membership, Role};

fn add_workflow(role: Role) -> &'static str {
    match role {
        Role::Etcd => "21.addetcd.yml",
        Role::Master => "23.addmaster.yml",
        Role::Worker => "22.addnode.yml",
    }
}

fn remove_workflow(role: Role) -> &'static str {
    match role {
        Role::Etcd => "31.deletcd.yml",
        Role::Master => "33.delmaster.yml",
        Role::Worker => "32.delnode.yml",
    }
}

impl ClusterManager {
    /// Adds `ip` to `cluster` as a `role` member. `extra_info` is written
    /// after the address on the inventory line (for example
    /// `k8s_nodename=worker-3`).
    ///
    /// If the provisioner fails the inventory already lists the node and a
    /// pending marker records the add. Re-running the same add resumes from
    /// provisioning instead of failing on the existing entry.
    pub async fn add_node(
        &self,
        cluster: &str,
        role: Role,
        ip: &str,
        extra_info: Option<&str>,
    ) -> Result<Outcome> {
        let file = self.inventory_file(cluster)?;
        validate_ip(ip)?;

        let mut doc = file.load().await?;
        let pending = self.registry.pending(cluster).await?;
        let membership = doc.locate(role, ip);
        let resuming =
            membership == Membership::InRole && pending.iter().any(|op| op.matches(role, ip));

        match membership {
            Membership::InRole if resuming => {
                log::warn!("Resuming pending add of {role} node {ip}");
            }
            Membership::InRole => {
                return Err(InventoryError::NodeExists {
                    ip: ip.to_string(),
                    role,
                }
                .into());
            }
            Membership::InOtherRole(other) => {
                log::info!("{ip} is already a {other} member; adding it as {role} as well");
            }
            Membership::Absent => {}
        }
        for op in pending.iter().filter(|op| !op.matches(role, ip)) {
            log::warn!("Cluster {cluster} has an unfinished operation: {op}");
        }

        let prompt = format!("cluster:{cluster} add {role} node {ip}");
        if !self.confirmed(&prompt).await {
            return Ok(Outcome::Aborted);
        }

        if !resuming {
            let line = match extra_info.map(str::trim).filter(|s| !s.is_empty()) {
                Some(extra) => format!("{ip} {extra}"),
                None => ip.to_string(),
            };
            doc.insert(role, &line)?;
            let marker = self.layout.pending_marker(cluster);
            record_pending(&marker, &PendingOperation::add(role, ip)).await?;
            if let Err(err) = file.save(&doc).await {
                if let Err(cleanup) = resolve_pending(&marker, role, ip).await {
                    log::warn!("Could not drop pending marker for {ip}: {cleanup}");
                }
                return Err(err.into());
            }
        }

        log::info!("Adding {role} node {ip} to cluster {cluster}");
        let playbook = self
            .workflow(cluster, add_workflow(role))
            .var("NODE_TO_ADD", ip);
        if let Err(err) = self.run_playbook(playbook).await {
            log::error!(
                "Provisioning {role} node {ip} failed; {} already lists it. \
                 Re-run the add to retry or remove the line to revert.",
                file.path().display()
            );
            return Err(err);
        }
        resolve_pending(&self.layout.pending_marker(cluster), role, ip).await?;

        match role {
            Role::Etcd => self.restart_etcd_and_apiservers(cluster).await?,
            Role::Master => self.restart_load_balancers(cluster).await?,
            Role::Worker => {}
        }
        log::info!("{role} node {ip} added to cluster {cluster}");
        Ok(Outcome::Completed)
    }

    /// Removes the `role` member `ip` from `cluster`.
    pub async fn remove_node(&self, cluster: &str, role: Role, ip: &str) -> Result<Outcome> {
        let file = self.inventory_file(cluster)?;
        validate_ip(ip)?;

        let doc = file.load().await?;
        match doc.locate(role, ip) {
            Membership::InRole => {}
            Membership::InOtherRole(other) => {
                log::warn!("{ip} is a {other} member, not {role}");
                return Err(not_found(role, ip));
            }
            Membership::Absent => return Err(not_found(role, ip)),
        }

        let prompt = format!("cluster:{cluster} remove {role} node {ip}");
        if !self.confirmed(&prompt).await {
            return Ok(Outcome::Aborted);
        }

        log::info!("Removing {role} node {ip} from cluster {cluster}");
        let playbook = self
            .workflow(cluster, remove_workflow(role))
            .var("NODE_TO_DEL", ip)
            .var("CLUSTER", cluster);
        self.run_playbook(playbook).await?;

        // The workflow may have touched the file; edit what is on disk now.
        let mut doc = file.load().await?;
        doc.remove(role, ip)?;
        file.save(&doc).await?;

        if role == Role::Etcd {
            self.restart_etcd_and_apiservers(cluster).await?;
        } else if role == Role::Master {
            self.regenerate_admin_kubeconfig(cluster).await?;
            self.restart_load_balancers(cluster).await?;
            self.delete_node_object(cluster, ip).await;
        }
        log::info!("{role} node {ip} removed from cluster {cluster}");
        Ok(Outcome::Completed)
    }

    fn inventory_file(&self, cluster: &str) -> Result<InventoryFile> {
        self.registry.require(cluster)?;
        let file = InventoryFile::new(self.layout.inventory(cluster));
        if !file.exists() {
            log::error!("Inventory {} missing", file.path().display());
            return Err(ClusterError::ClusterNotFound(cluster.to_string()));
        }
        Ok(file)
    }

    async fn restart_etcd_and_apiservers(&self, cluster: &str) -> Result<()> {
        log::info!("Reconfiguring etcd members and API servers");
        self.run_playbook(self.workflow(cluster, "02.etcd.yml").tag("restart_etcd"))
            .await?;
        self.run_playbook(
            self.workflow(cluster, "04.kube-master.yml")
                .tag("restart_master"),
        )
        .await
    }

    async fn restart_load_balancers(&self, cluster: &str) -> Result<()> {
        log::info!("Reconfiguring node-local and external load balancers");
        self.run_playbook(self.workflow(cluster, "90.setup.yml").tag("restart_kube-lb"))
            .await?;
        self.run_playbook(self.workflow(cluster, "10.ex-lb.yml").tag("restart_lb"))
            .await
    }

    async fn regenerate_admin_kubeconfig(&self, cluster: &str) -> Result<()> {
        let playbook = self
            .playbook_at(cluster, &self.layout.deploy_role())
            .tag("create_kctl_cfg");
        self.run_playbook(playbook).await
    }

    /// Deletes the Kubernetes node object of a removed master. Failures are
    /// logged and swallowed: the machine is already gone from the cluster.
    async fn delete_node_object(&self, cluster: &str, ip: &str) {
        let get = self
            .kubectl(cluster)
            .args(["get", "node", "-o", "wide"])
            .probe(self.config.probe_timeout);

        let listing = match self.run_captured(get).await {
            Ok(output) => output.stdout,
            Err(err) => {
                log::warn!("Could not list nodes to delete {ip}: {err}");
                return;
            }
        };
        let Some(name) = node_name_for_ip(&listing, ip) else {
            log::warn!("No Kubernetes node found for {ip}");
            return;
        };

        let delete = self
            .kubectl(cluster)
            .args(["delete", "node"])
            .arg(&name)
            .captured();
        match self.run_captured(delete).await {
            Ok(_) => log::info!("Deleted Kubernetes node {name}"),
            Err(err) => log::warn!("Failed to delete Kubernetes node {name}: {err}"),
        }
    }
}

fn not_found(role: Role, ip: &str) -> ClusterError {
    InventoryError::NodeNotFound {
        ip: ip.to_string(),
        role,
    }
    .into()
}

/// First column of the `kubectl get node -o wide` row mentioning `ip`.
fn node_name_for_ip(listing: &str, ip: &str) -> Option<String> {
    listing
        .lines()
        .skip(1)
        .find(|line| line.split_whitespace().any(|token| token == ip))
        .and_then(|line| line.split_whitespace().next())
        .map(str::to_string)
}
