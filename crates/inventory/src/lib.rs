//! # Kubeauto Inventory
//!
//! Role-partitioned machine inventory: the single source of truth for cluster
//! membership and the input handed to the provisioner.
//!
//! ## Layout
//!
//! ```text
//! [etcd]            <- Role::Etcd
//! 10.0.0.1
//!
//! [kube_master]     <- Role::Master   ([master] accepted)
//! 10.0.0.1 k8s_nodename='master-01'
//!
//! [kube_node]       <- Role::Worker   ([worker] accepted)
//! 10.0.0.4
//!
//! [all:vars]        <- preserved verbatim
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use kubeauto_inventory::{InventoryFile, Role};
//!
//! #[tokio::main]
//! async fn main() -> kubeauto_inventory::Result<()> {
//!     let file = InventoryFile::new("/usr/local/kubeauto/clusters/demo/hosts");
//!     let mut doc = file.load().await?;
//!     doc.insert(Role::Worker, "10.0.0.5 k8s_nodename='worker-05'")?;
//!     file.save(&doc).await?;
//!     Ok(())
//! }
//! ```

mod document;
mod editor;
mod error;
mod role;
mod store;

pub use document::{Inventory, NodeEntry};
pub use editor::Membership;
pub use error::{InventoryError, Result};
pub use role::Role;
pub use store::{write_atomic, InventoryFile};
