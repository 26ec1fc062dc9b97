//! Environment/runtime helpers
//!
//! Sanity checks to ensure expected directories exist at startup.

use std::path::Path;

use tracing::debug;

/// Ensure the directory holding the local cache file exists.
pub async fn ensure_data_dir(cache_file: &Path) -> anyhow::Result<()> {
    let Some(dir) = cache_file.parent().filter(|d| !d.as_os_str().is_empty()) else {
        return Ok(());
    };
    if tokio::fs::metadata(dir).await.is_err() {
        debug!(dir = %dir.display(), "creating data directory");
    }
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| anyhow::anyhow!("cannot create {}: {e}", dir.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn creates_missing_parent() -> anyhow::Result<()> {
        let root = std::env::temp_dir().join(format!("namerator_env_{}", uuid::Uuid::new_v4()));
        let file = root.join("nested").join("cache.json");
        ensure_data_dir(&file).await?;
        assert!(tokio::fs::metadata(root.join("nested")).await?.is_dir());

        // bare file names have no directory to create
        ensure_data_dir(Path::new("cache.json")).await?;

        let _ = tokio::fs::remove_dir_all(&root).await;
        Ok(())
    }
}
