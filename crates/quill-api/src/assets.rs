use std::path::{Path, PathBuf};

use anyhow::Result;
use axum::body::Bytes;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::info;
use uuid::Uuid;

/// Request path prefix under which stored images are published.
pub const PUBLIC_PREFIX: &str = "/img";

/// Image formats accepted for post uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
}

impl ImageKind {
    /// Matches on the declared MIME type, ignoring case and parameters.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or_default().trim();
        if essence.eq_ignore_ascii_case("image/jpeg") {
            Some(ImageKind::Jpeg)
        } else if essence.eq_ignore_ascii_case("image/png") {
            Some(ImageKind::Png)
        } else {
            None
        }
    }

    fn default_extension(&self) -> &'static str {
        match self {
            ImageKind::Jpeg => "jpg",
            ImageKind::Png => "png",
        }
    }
}

/// An uploaded file as received from the multipart form.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl ImageUpload {
    pub fn kind(&self) -> Option<ImageKind> {
        self.content_type.as_deref().and_then(ImageKind::from_mime)
    }
}

/// Writes uploaded post images to the public asset directory.
///
/// Files are named `{uuid}.{ext}`; the client-supplied name only ever
/// contributes its extension.
pub struct AssetStore {
    dir: PathBuf,
}

impl AssetStore {
    pub async fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Asset directory: {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist an image and return its public URL (`/img/<name>`).
    pub async fn store_image(
        &self,
        kind: ImageKind,
        original_name: Option<&str>,
        data: &[u8],
    ) -> Result<String> {
        let name = asset_name(kind, original_name);
        let path = self.dir.join(&name);

        let mut file = fs::File::create(&path).await?;
        file.write_all(data).await?;
        file.flush().await?;

        Ok(format!("{}/{}", PUBLIC_PREFIX, name))
    }

    /// Filesystem path behind a URL returned by [`AssetStore::store_image`].
    pub fn path_for_url(&self, url: &str) -> Option<PathBuf> {
        let name = url.strip_prefix(PUBLIC_PREFIX)?.strip_prefix('/')?;
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return None;
        }
        Some(self.dir.join(name))
    }
}

fn asset_name(kind: ImageKind, original_name: Option<&str>) -> String {
    let ext = original_name
        .and_then(|n| Path::new(n).extension())
        .and_then(|e| e.to_str())
        .filter(|e| (1..=5).contains(&e.len()) && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_else(|| kind.default_extension().to_string());

    format!("{}.{}", Uuid::new_v4(), ext)
}
