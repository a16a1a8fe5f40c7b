//! # Kubeauto Cluster
//!
//! Cluster registry and node lifecycle orchestration. All provisioning is
//! delegated to an external playbook engine; this crate decides what to run,
//! in which order, and keeps the inventory consistent with it.
//!
//! ## Add / remove protocol
//!
//! ```text
//! add:    validate ─> check absent ─> confirm ─> write inventory ─> provision ─> converge
//! remove: validate ─> check present ─> confirm ─> provision removal ─> write inventory ─> converge
//!
//! converge:  etcd   -> restart etcd, restart API servers
//!            master -> restart node-local LB, restart external LB
//!                      (remove: regenerate admin kubeconfig first, delete node object last)
//!            worker -> nothing
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use kubeauto_cluster::{AssumeYes, ClusterManager, KubeautoConfig, SystemRunner};
//! use kubeauto_inventory::Role;
//! use std::sync::Arc;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> kubeauto_cluster::Result<()> {
//!     let config = Arc::new(KubeautoConfig::load(None)?);
//!     let manager = ClusterManager::new(config, Arc::new(SystemRunner), Arc::new(AssumeYes));
//!     manager.add_node("prod", Role::Worker, "10.0.0.14", None).await?;
//!     Ok(())
//! }
//! ```

mod aio;
mod config;
mod confirm;
mod dispatch;
mod error;
mod fingerprint;
mod layout;
mod lifecycle;
mod manager;
mod pending;
mod playbook;
mod registry;
mod runner;
mod users;
mod versions;

pub use aio::AIO_CLUSTER;
pub use config::{
    ComponentVersions, ConfigError, KubeautoConfig, NetworkPlugin, DEFAULT_BASE_PATH,
    DEFAULT_CONFIG_PATH, DEFAULT_PROVISIONER,
};
pub use confirm::{is_affirmative, AssumeYes, Confirmation, PromptConfirmation};
pub use dispatch::{operation_workflow, setup_workflow};
pub use error::{ClusterError, Result};
pub use fingerprint::{credential_fingerprint, fingerprint_file};
pub use layout::{is_valid_cluster_name, ClusterLayout};
pub use manager::{ClusterManager, Outcome};
pub use pending::PendingOperation;
pub use playbook::Playbook;
pub use registry::{ClusterRegistry, ClusterSummary};
pub use runner::{CommandOutput, CommandRunner, CommandSpec, StdioMode, SystemRunner};
pub use users::{UserRecord, UserType, DEFAULT_EXPIRY};
pub use versions::ComponentBanner;
