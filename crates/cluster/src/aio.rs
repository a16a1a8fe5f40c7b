use crate::manager::{ClusterManager, Outcome};
use crate::runner::CommandSpec;
use crate::Result;
use regex::Regex;
use std::net::IpAddr;
use std::path::Path;

pub const AIO_CLUSTER: &str = "aio";

/// Address the all-in-one template uses for its single host.
const TEMPLATE_HOST: &str = "192.168.1.1";
const FALLBACK_HOST: &str = "127.0.0.1";

impl ClusterManager {
    /// Single-host cluster on this machine: trusts the local SSH key, creates
    /// cluster `aio` from the all-in-one template, then runs setup step
    /// `all`.
    pub async fn start_aio(&self) -> Result<Outcome> {
        log::info!("Initializing all-in-one cluster environment");
        let host_ip = self.detect_host_ip().await;
        self.trust_local_ssh(&host_ip).await?;
        self.registry
            .create_from_templates(AIO_CLUSTER, "hosts.allinone", &[(TEMPLATE_HOST, &host_ip)])
            .await?;
        log::info!("All-in-one cluster environment initialized on {host_ip}");

        let outcome = self.setup(AIO_CLUSTER, "all", &[]).await?;
        if outcome == Outcome::Completed {
            log::info!("All-in-one cluster established");
        }
        Ok(outcome)
    }

    async fn detect_host_ip(&self) -> String {
        let spec = CommandSpec::new("ip")
            .args(["route", "get", "1"])
            .probe(self.config.probe_timeout);
        match self.run_captured(spec).await {
            Ok(output) => route_source(&output.stdout).unwrap_or_else(|| {
                log::warn!("No source address in route output; using {FALLBACK_HOST}");
                FALLBACK_HOST.to_string()
            }),
            Err(err) => {
                log::warn!("Failed to get host IP: {err}; using {FALLBACK_HOST}");
                FALLBACK_HOST.to_string()
            }
        }
    }

    /// Makes `ssh <host_ip>` work without a password for the current user.
    async fn trust_local_ssh(&self, host_ip: &str) -> Result<()> {
        let ssh_dir = &self.config.ssh_dir;
        tokio::fs::create_dir_all(ssh_dir).await?;
        restrict_permissions(ssh_dir, 0o700).await?;

        let private_key = ssh_dir.join("id_rsa");
        if !private_key.exists() {
            log::info!("Generating SSH key pair");
            let keygen = CommandSpec::new("ssh-keygen")
                .args(["-t", "rsa", "-b", "2048", "-N", "", "-f"])
                .arg(&private_key)
                .captured();
            self.run_captured(keygen).await?;
        }

        let authorized_keys = ssh_dir.join("authorized_keys");
        let public_key = ssh_dir.join("id_rsa.pub");
        if public_key.is_file() {
            let key = tokio::fs::read_to_string(&public_key).await?;
            let existing = read_or_empty(&authorized_keys).await?;
            if let Some(updated) = with_line(&existing, key.trim()) {
                tokio::fs::write(&authorized_keys, updated).await?;
            }
            restrict_permissions(&authorized_keys, 0o600).await?;
        } else {
            log::warn!("{} missing; skipping authorized_keys", public_key.display());
        }

        let keyscan = CommandSpec::new("ssh-keyscan")
            .args(["-t", "ecdsa", "-H", host_ip])
            .probe(self.config.probe_timeout);
        match self.run_captured(keyscan).await {
            Ok(output) if !output.stdout.trim().is_empty() => {
                let known_hosts = ssh_dir.join("known_hosts");
                let mut content = read_or_empty(&known_hosts).await?;
                if !content.is_empty() && !content.ends_with('\n') {
                    content.push('\n');
                }
                content.push_str(&output.stdout);
                tokio::fs::write(&known_hosts, content).await?;
            }
            Ok(_) => log::warn!("ssh-keyscan returned no host key for {host_ip}"),
            Err(err) => log::warn!("ssh-keyscan {host_ip} failed: {err}"),
        }
        Ok(())
    }
}

/// The `src` address of `ip route get` output.
fn route_source(output: &str) -> Option<String> {
    let re = Regex::new(r"\bsrc\s+(\S+)").ok()?;
    let addr = re.captures(output)?.get(1)?.as_str();
    addr.parse::<IpAddr>().ok().map(|ip| ip.to_string())
}

/// `content` with `line` appended, or `None` when it is already present.
fn with_line(content: &str, line: &str) -> Option<String> {
    if line.is_empty() || content.lines().any(|existing| existing.trim() == line) {
        return None;
    }
    let mut updated = content.to_string();
    if !updated.is_empty() && !updated.ends_with('\n') {
        updated.push('\n');
    }
    updated.push_str(line);
    updated.push('\n');
    Some(updated)
}

async fn read_or_empty(path: &Path) -> Result<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(content),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        Err(err) => Err(err.into()),
    }
}

#[cfg(unix)]
async fn restrict_permissions(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).await?;
    Ok(())
}

#[cfg(not(unix))]
async fn restrict_permissions(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}
