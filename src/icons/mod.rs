pub mod embed;
pub mod folder;

pub use embed::ArtworkEmbedder;
pub use folder::FolderIconApplier;

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

/// Applies an already-fetched poster to a media folder. Implementations
/// differ by mechanism: file-manager folder icons versus artwork embedded
/// in the media files themselves.
#[async_trait]
pub trait IconApplier: Send + Sync {
    fn name(&self) -> &'static str;

    async fn apply(&self, folder: &Path, poster: &Path) -> Result<()>;
}
