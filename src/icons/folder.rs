use anyhow::{Context, Result};
use async_trait::async_trait;
use image::imageops::FilterType;
use image::{Rgba, RgbaImage, imageops};
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

use super::IconApplier;

const ICO_SIZE: u32 = 256;
const ICON_FILE: &str = "folder.ico";
pub(crate) const DESKTOP_INI: &str = "desktop.ini";

/// Writes a `folder.ico` and a `desktop.ini` next to the poster already in
/// the media folder. File managers on Windows pick the icon up directly.
pub struct FolderIconApplier;

impl FolderIconApplier {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for FolderIconApplier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IconApplier for FolderIconApplier {
    fn name(&self) -> &'static str {
        "folder_icon"
    }

    async fn apply(&self, folder: &Path, poster: &Path) -> Result<()> {
        let icon_path = folder.join(ICON_FILE);
        let ico = build_ico(poster)?;
        fs::write(&icon_path, ico)
            .await
            .with_context(|| format!("Failed to write {}", icon_path.display()))?;

        let ini_path = folder.join(DESKTOP_INI);
        fs::write(&ini_path, desktop_ini_contents())
            .await
            .with_context(|| format!("Failed to write {}", ini_path.display()))?;

        hide_icon_files(folder, &icon_path, &ini_path).await;

        info!(folder = %folder.display(), "Folder icon applied");
        Ok(())
    }
}

/// Scale the poster into a square transparent canvas and encode as a single
/// 256px ICO frame.
fn build_ico(poster: &Path) -> Result<Vec<u8>> {
    let img = image::open(poster)
        .with_context(|| format!("Failed to open poster {}", poster.display()))?;

    let scaled = img.resize(ICO_SIZE, ICO_SIZE, FilterType::Lanczos3).to_rgba8();
    let mut canvas = RgbaImage::from_pixel(ICO_SIZE, ICO_SIZE, Rgba([0, 0, 0, 0]));
    let x = i64::from((ICO_SIZE - scaled.width()) / 2);
    let y = i64::from((ICO_SIZE - scaled.height()) / 2);
    imageops::overlay(&mut canvas, &scaled, x, y);

    let mut buf = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(canvas)
        .write_to(&mut buf, image::ImageFormat::Ico)
        .context("Failed to encode folder icon")?;
    Ok(buf.into_inner())
}

fn desktop_ini_contents() -> &'static str {
    "[.ShellClassInfo]\r\nIconResource=.\\folder.ico,0\r\n"
}

#[cfg(windows)]
async fn hide_icon_files(folder: &Path, icon: &Path, ini: &Path) {
    use tokio::process::Command;

    // Explorer only honors desktop.ini when the folder carries the system
    // attribute and the ini file is hidden.
    for (path, flags) in [
        (folder, &["+s"][..]),
        (icon, &["+h"][..]),
        (ini, &["+h", "+s"][..]),
    ] {
        let result = Command::new("attrib").args(flags).arg(path).status().await;
        if let Err(e) = result {
            debug!(path = %path.display(), error = %e, "attrib call failed");
        }
    }
}

#[cfg(not(windows))]
async fn hide_icon_files(folder: &Path, _icon: &Path, _ini: &Path) {
    debug!(folder = %folder.display(), "Skipping attrib outside Windows");
}
