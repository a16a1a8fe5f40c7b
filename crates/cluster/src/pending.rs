use crate::Result;
use kubeauto_inventory::{write_atomic, Role};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Written before an add rewrites the inventory and kept until that add's
/// provisioning succeeded, so the window where the inventory is ahead of the
/// machines is visible to later invocations.
///
/// The marker file holds one entry per unfinished add, keyed by role and
/// address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingOperation {
    pub role: Role,
    pub ip: String,
    pub started_at_unix_ms: u64,
}

impl PendingOperation {
    pub fn add(role: Role, ip: &str) -> Self {
        Self {
            role,
            ip: ip.to_string(),
            started_at_unix_ms: unix_now_ms(),
        }
    }

    pub fn matches(&self, role: Role, ip: &str) -> bool {
        self.role == role && self.ip == ip
    }
}

impl fmt::Display for PendingOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "add {} node {} (provisioning pending)", self.role, self.ip)
    }
}

pub async fn read_pending(path: &Path) -> Result<Vec<PendingOperation>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let bytes = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Adds `op` to the marker, replacing an older entry for the same node.
pub async fn record_pending(path: &Path, op: &PendingOperation) -> Result<()> {
    let mut ops = read_pending(path).await?;
    ops.retain(|existing| !existing.matches(op.role, &op.ip));
    ops.push(op.clone());
    store(path, &ops).await
}

/// Drops the entry for `role`/`ip`; the file goes away with its last entry.
pub async fn resolve_pending(path: &Path, role: Role, ip: &str) -> Result<()> {
    let mut ops = read_pending(path).await?;
    let before = ops.len();
    ops.retain(|existing| !existing.matches(role, ip));
    if ops.len() == before {
        return Ok(());
    }
    if ops.is_empty() {
        return match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        };
    }
    store(path, &ops).await
}

async fn store(path: &Path, ops: &[PendingOperation]) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(ops)?;
    write_atomic(path, &bytes).await?;
    Ok(())
}

fn unix_now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
