use crate::Role;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, InventoryError>;

#[derive(Error, Debug)]
pub enum InventoryError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Section {section} not found in inventory")]
    SectionNotFound { section: String },

    #[error("Node {ip} already exists in {role} section")]
    NodeExists { ip: String, role: Role },

    #[error("Node {ip} not found in {role} section")]
    NodeNotFound { ip: String, role: Role },

    #[error("Invalid IP address: {0}")]
    InvalidIp(String),
}
