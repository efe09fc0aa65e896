use std::path::{Component, Path, PathBuf};

use tokio::fs;
use uuid::Uuid;

use crate::error::AppResult;

pub const ALLOWED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

const IMAGE_DIR: &str = "profile-images";

pub fn is_allowed_image(content_type: &str) -> bool {
    ALLOWED_IMAGE_TYPES.contains(&content_type)
}

/// Profile images on local disk, addressed by public paths such as
/// `/profile-images/<uuid>.png` relative to the upload root.
#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn dir(&self) -> PathBuf {
        self.root.join(IMAGE_DIR)
    }

    /// Write `bytes` under a fresh random name and return its public path.
    pub async fn save(
        &self,
        original_name: Option<&str>,
        content_type: &str,
        bytes: &[u8],
    ) -> AppResult<String> {
        let filename = image_filename(original_name, content_type);
        let dir = self.dir();
        fs::create_dir_all(&dir).await?;
        fs::write(dir.join(&filename), bytes).await?;
        Ok(format!("/{IMAGE_DIR}/{filename}"))
    }

    /// Best-effort removal; a file that is already gone is not an error.
    pub async fn remove(&self, public_path: &str) {
        let Some(path) = self.resolve(public_path) else {
            tracing::warn!(path = %public_path, "refusing to remove image outside upload root");
            return;
        };
        if let Err(err) = fs::remove_file(&path).await {
            tracing::debug!(path = %path.display(), error = %err, "image removal skipped");
        }
    }

    /// Map a public path onto the upload root, rejecting anything that could
    /// escape it.
    pub fn resolve(&self, public_path: &str) -> Option<PathBuf> {
        let relative = Path::new(public_path.trim_start_matches('/'));
        let safe = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
        if !safe || relative.as_os_str().is_empty() {
            return None;
        }
        Some(self.root.join(relative))
    }
}

/// Random UUID file name keeping the uploaded file's extension. Extensions
/// that are not plain ASCII alphanumerics are replaced by one derived from
/// the content type.
pub fn image_filename(original_name: Option<&str>, content_type: &str) -> String {
    let ext = original_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| extension_for(content_type).to_string());
    format!("{}.{}", Uuid::new_v4(), ext)
}

fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => "bin",
    }
}
