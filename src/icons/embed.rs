use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use std::path::Path;
use tokio::fs;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{info, warn};

use super::IconApplier;
use crate::constants::timeouts;
use crate::library::media_files;

/// Embeds the poster into each media file in the folder as an attached
/// picture stream, using ffmpeg stream copy. The original file is kept as a
/// `.backup` sibling the first time it is touched.
pub struct ArtworkEmbedder;

impl ArtworkEmbedder {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    async fn embed_one(&self, media: &Path, poster: &Path) -> Result<()> {
        let file_name = media
            .file_name()
            .and_then(|n| n.to_str())
            .context("Media file has no usable name")?;
        let extension = media
            .extension()
            .and_then(|e| e.to_str())
            .context("Media file has no extension")?;
        let parent = media.parent().context("Media file has no parent")?;

        let backup = parent.join(format!("{file_name}.backup"));
        if !backup.exists() {
            fs::copy(media, &backup)
                .await
                .with_context(|| format!("Failed to back up {}", media.display()))?;
        }

        // ffmpeg picks the container from the extension, so the temp output
        // has to keep it.
        let temp = parent.join(format!("{file_name}.tmp.{extension}"));

        let mut child = Command::new("ffmpeg")
            .arg("-y")
            .arg("-i")
            .arg(media)
            .arg("-i")
            .arg(poster)
            .args(["-map", "0", "-map", "1", "-c", "copy"])
            .args(["-disposition:v:1", "attached_pic"])
            .arg(&temp)
            .kill_on_drop(true)
            .spawn()
            .context("Failed to launch ffmpeg, is it installed?")?;

        let status = match timeout(timeouts::ARTWORK_EMBED, child.wait()).await {
            Ok(status) => status?,
            Err(_) => {
                let _ = child.kill().await;
                let _ = fs::remove_file(&temp).await;
                bail!("ffmpeg timed out embedding into {}", media.display());
            }
        };

        if !status.success() {
            let _ = fs::remove_file(&temp).await;
            bail!("ffmpeg exited with {} for {}", status, media.display());
        }

        fs::rename(&temp, media)
            .await
            .with_context(|| format!("Failed to replace {}", media.display()))?;
        Ok(())
    }
}

impl Default for ArtworkEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IconApplier for ArtworkEmbedder {
    fn name(&self) -> &'static str {
        "artwork_embed"
    }

    async fn apply(&self, folder: &Path, poster: &Path) -> Result<()> {
        let files = media_files(folder);
        if files.is_empty() {
            return Ok(());
        }

        let mut embedded = 0usize;
        for media in &files {
            match self.embed_one(media, poster).await {
                Ok(()) => embedded += 1,
                Err(e) => warn!(file = %media.display(), error = %e, "Artwork embed failed"),
            }
        }

        if embedded == 0 {
            bail!("No media file in {} accepted artwork", folder.display());
        }
        info!(folder = %folder.display(), embedded, "Artwork embedded");
        Ok(())
    }
}
