use std::path::Path;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;

/// OS integration used by the local gateway: clipboard and default viewer.
#[async_trait]
pub trait DesktopShell: Send + Sync {
    async fn copy_text(&self, text: String) -> Result<()>;
    async fn open_path(&self, path: &Path) -> Result<()>;
}

/// Real desktop integration. Both calls block, so they run on the blocking pool.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemShell;

#[async_trait]
impl DesktopShell for SystemShell {
    async fn copy_text(&self, text: String) -> Result<()> {
        tokio::task::spawn_blocking(move || {
            let mut clipboard = arboard::Clipboard::new().context("clipboard unavailable")?;
            clipboard
                .set_text(text)
                .context("failed to write clipboard")
        })
        .await
        .map_err(|err| anyhow!("clipboard task failed: {err}"))?
    }

    async fn open_path(&self, path: &Path) -> Result<()> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || {
            open::that(&path).with_context(|| format!("failed to open {}", path.display()))
        })
        .await
        .map_err(|err| anyhow!("open task failed: {err}"))?
    }
}
