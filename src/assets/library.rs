//! On-disk image library: originals under `images/YYYY-MM/`, thumbnails
//! under `thumbnails/`. Paths handed out and accepted are relative to the
//! library root.

use std::{
    io,
    path::{Component, Path, PathBuf},
};

use anyhow::{anyhow, bail, Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::Local;
use image::{imageops::FilterType, DynamicImage};
use uuid::Uuid;

use super::upload::DecodedUpload;

const ENABLE_LOGS: bool = true;
use crate::{log_debug, log_warn};

const IMAGES_DIR: &str = "images";
const THUMBNAILS_DIR: &str = "thumbnails";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub image_path: String,
    pub thumbnail_path: String,
}

#[derive(Debug, Clone)]
pub struct ImageLibrary {
    root: PathBuf,
}

impl ImageLibrary {
    pub fn new(root: PathBuf) -> Result<Self> {
        for dir in [IMAGES_DIR, THUMBNAILS_DIR] {
            let path = root.join(dir);
            std::fs::create_dir_all(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path for a library-relative reference. Absolute paths and
    /// `..` components are refused.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf> {
        let rel = Path::new(relative);
        if relative.is_empty()
            || rel.is_absolute()
            || rel.components().any(|c| {
                matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_))
            })
        {
            bail!("invalid path");
        }
        Ok(self.root.join(rel))
    }

    /// Write the original and a thumbnail no larger than `max_edge` on either side.
    /// SVGs and images that fail to decode reuse the original as their thumbnail.
    pub async fn store(&self, upload: DecodedUpload, max_edge: u32) -> Result<StoredImage> {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || store_blocking(&root, upload, max_edge))
            .await
            .map_err(|err| anyhow!("image store task failed: {err}"))?
    }

    pub async fn read_base64(&self, relative: &str) -> Result<String> {
        let path = self.resolve(relative)?;
        let bytes = tokio::fs::read(&path)
            .await
            .with_context(|| format!("failed to read {relative}"))?;
        Ok(BASE64.encode(bytes))
    }

    /// Best-effort removal; a file that is already gone is not an error.
    pub async fn remove(&self, relative: &str) {
        let path = match self.resolve(relative) {
            Ok(path) => path,
            Err(_) => return,
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => log_debug!("removed {}", path.display()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => log_warn!("failed to remove {}: {err}", path.display()),
        }
    }
}

fn store_blocking(root: &Path, upload: DecodedUpload, max_edge: u32) -> Result<StoredImage> {
    let id = Uuid::new_v4().to_string();
    let month_dir = Local::now().format("%Y-%m").to_string();
    let ext = upload.extension;

    let images_dir = root.join(IMAGES_DIR).join(&month_dir);
    std::fs::create_dir_all(&images_dir)
        .with_context(|| format!("failed to create {}", images_dir.display()))?;

    let image_name = format!("{id}.{ext}");
    std::fs::write(images_dir.join(&image_name), &upload.bytes)
        .context("failed to write original image")?;
    let image_path = format!("{IMAGES_DIR}/{month_dir}/{image_name}");

    if ext.eq_ignore_ascii_case("svg") {
        return Ok(StoredImage {
            thumbnail_path: image_path.clone(),
            image_path,
        });
    }

    let decoded = match image::load_from_memory(&upload.bytes) {
        Ok(img) => img,
        Err(err) => {
            log_warn!("could not decode {image_path} for thumbnail: {err}");
            return Ok(StoredImage {
                thumbnail_path: image_path.clone(),
                image_path,
            });
        }
    };

    let thumbnail_name = format!("{id}_thumb.{ext}");
    let thumbnail_full = root.join(THUMBNAILS_DIR).join(&thumbnail_name);
    let mut thumbnail = decoded.resize(max_edge, max_edge, FilterType::Lanczos3);
    if matches!(ext.as_str(), "jpg" | "jpeg") {
        thumbnail = DynamicImage::ImageRgb8(thumbnail.to_rgb8());
    }

    match thumbnail.save(&thumbnail_full) {
        Ok(()) => Ok(StoredImage {
            image_path,
            thumbnail_path: format!("{THUMBNAILS_DIR}/{thumbnail_name}"),
        }),
        Err(err) => {
            log_warn!("thumbnail encode failed for {image_path}: {err}");
            let _ = std::fs::remove_file(&thumbnail_full);
            Ok(StoredImage {
                thumbnail_path: image_path.clone(),
                image_path,
            })
        }
    }
}
