use crate::{Inventory, Result};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// An inventory file on disk. Every save rewrites the whole document through
/// a sibling temp file and a rename, so readers never observe a torn write.
#[derive(Debug, Clone)]
pub struct InventoryFile {
    path: PathBuf,
}

impl InventoryFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    pub async fn load(&self) -> Result<Inventory> {
        let text = tokio::fs::read_to_string(&self.path).await?;
        Ok(Inventory::parse(&text))
    }

    pub async fn save(&self, doc: &Inventory) -> Result<()> {
        write_atomic(&self.path, doc.render().as_bytes()).await
    }
}

/// Writes `bytes` to `path` via `.<name>.tmp`, fsync, then rename in the
/// same directory.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "inventory".to_string());
    let tmp = path.with_file_name(format!(".{name}.tmp"));

    let mut file = tokio::fs::File::create(&tmp).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    drop(file);

    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
