use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose, Engine as _};

use crate::error::{KinshipError, Result};

use super::ImageResolver;

/// Resolves file paths (relative to a base directory) and `data:` URIs
#[derive(Debug, Clone)]
pub struct FsImageResolver {
    base_dir: PathBuf,
}

impl FsImageResolver {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        FsImageResolver {
            base_dir: base_dir.into(),
        }
    }

    /// Resolver rooted at the directory containing `snapshot_path`
    pub fn for_snapshot(snapshot_path: &Path) -> Self {
        let base = snapshot_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self::new(base)
    }

    fn path_for(&self, image_ref: &str) -> PathBuf {
        let raw = image_ref.strip_prefix("file://").unwrap_or(image_ref);
        let path = Path::new(raw);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

impl ImageResolver for FsImageResolver {
    fn resolve(&self, image_ref: &str) -> Result<Vec<u8>> {
        let image_ref = image_ref.trim();
        if image_ref.starts_with("data:") {
            return decode_data_uri(image_ref);
        }
        Ok(fs::read(self.path_for(image_ref))?)
    }
}

/// Decode a `data:<mime>;base64,<payload>` URI
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>> {
    let (header, payload) = uri
        .split_once(',')
        .ok_or_else(|| KinshipError::Other("data URI without payload".to_string()))?;
    if !header.ends_with(";base64") {
        return Err(KinshipError::Other(
            "only base64 data URIs are supported".to_string(),
        ));
    }
    general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| KinshipError::Other(format!("invalid base64 payload: {}", e)))
}

/// In-memory resolver keyed by reference string
#[derive(Debug, Clone, Default)]
pub struct MemoryImageResolver {
    images: HashMap<String, Vec<u8>>,
}

impl MemoryImageResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, image_ref: impl Into<String>, bytes: Vec<u8>) {
        self.images.insert(image_ref.into(), bytes);
    }
}

impl ImageResolver for MemoryImageResolver {
    fn resolve(&self, image_ref: &str) -> Result<Vec<u8>> {
        self.images
            .get(image_ref)
            .cloned()
            .ok_or_else(|| KinshipError::Other(format!("no image stored under {}", image_ref)))
    }
}

/// Resolver for callers without image storage; every lookup fails softly
#[derive(Debug, Clone, Copy, Default)]
pub struct NoImages;

impl ImageResolver for NoImages {
    fn resolve(&self, _image_ref: &str) -> Result<Vec<u8>> {
        Err(KinshipError::Other("image resolution disabled".to_string()))
    }
}
