use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Cluster membership role. Each role owns exactly one inventory section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Etcd,
    Master,
    Worker,
}

impl Role {
    /// Roles in the order their sections appear in the inventory.
    pub const ALL: [Role; 3] = [Role::Etcd, Role::Master, Role::Worker];

    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Etcd => "etcd",
            Role::Master => "master",
            Role::Worker => "worker",
        }
    }

    /// Canonical section header written by the cluster templates.
    pub const fn section(self) -> &'static str {
        match self {
            Role::Etcd => "[etcd]",
            Role::Master => "[kube_master]",
            Role::Worker => "[kube_node]",
        }
    }

    /// Every header accepted for this role, canonical spelling first.
    pub const fn headers(self) -> &'static [&'static str] {
        match self {
            Role::Etcd => &["[etcd]"],
            Role::Master => &["[kube_master]", "[master]"],
            Role::Worker => &["[kube_node]", "[worker]"],
        }
    }

    pub fn matches_header(self, line: &str) -> bool {
        let line = line.trim();
        self.headers().iter().any(|header| *header == line)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "etcd" => Ok(Role::Etcd),
            "master" | "kube_master" => Ok(Role::Master),
            "worker" | "node" | "kube_node" => Ok(Role::Worker),
            other => Err(format!("unknown node role: {other}")),
        }
    }
}
