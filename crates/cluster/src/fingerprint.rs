use crate::Result;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Content hash of a kubeconfig with its `server:` lines dropped.
///
/// The same cluster reached through different API endpoints (a load
/// balancer, a single master) yields the same fingerprint, while any other
/// difference in the document changes it.
pub fn credential_fingerprint(content: &str) -> String {
    let mut hasher = Sha256::new();
    // Terminators are hashed as found (LF, CRLF, or none on the last line).
    for line in content.split_inclusive('\n') {
        if is_server_line(line) {
            continue;
        }
        hasher.update(line.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

pub async fn fingerprint_file(path: &Path) -> Result<String> {
    let content = tokio::fs::read_to_string(path).await?;
    Ok(credential_fingerprint(&content))
}

fn is_server_line(line: &str) -> bool {
    line.trim_start()
        .trim_start_matches("- ")
        .starts_with("server:")
}
