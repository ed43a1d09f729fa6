//! Model and texture assets and the loaders that resolve them from disk.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{ensure, Context};
use engine_core::{AssetHandle, AssetLoader, LoadState};

use crate::error::GameError;

pub const TREE_MODEL: &str = "tree/tree01.fbx";
pub const NEST_MODEL: &str = "nest/nest.obj";
pub const TARGET_TEXTURE: &str = "target.png";

/// Scale the nest model is attached at.
pub const NEST_MODEL_SCALE: f32 = 10.0;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

/// Something a loader worker can build from the bytes of one file.
pub trait FileAsset: Sized + Send + Sync + 'static {
    /// Word used in log lines.
    const KIND: &'static str;

    fn decode(path: &str, data: &[u8]) -> anyhow::Result<Self>;

    /// Empty stand-in for a file that is not on disk.
    fn placeholder(path: &str) -> Self;
}

/// A loaded model file. Geometry is opaque to the game; it only needs a
/// handle it can hang in the scene.
#[derive(Debug, Clone)]
pub struct ModelAsset {
    pub path: String,
    pub bytes: usize,
    /// The file was missing and an empty stand-in was produced.
    pub placeholder: bool,
}

impl FileAsset for ModelAsset {
    const KIND: &'static str = "model";

    fn decode(path: &str, data: &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            path: path.to_string(),
            bytes: data.len(),
            placeholder: false,
        })
    }

    fn placeholder(path: &str) -> Self {
        Self {
            path: path.to_string(),
            bytes: 0,
            placeholder: true,
        }
    }
}

/// A PNG texture. Only the header is read; pixels are left to the GPU side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureAsset {
    pub path: String,
    pub width: u32,
    pub height: u32,
    pub placeholder: bool,
}

impl FileAsset for TextureAsset {
    const KIND: &'static str = "texture";

    fn decode(path: &str, data: &[u8]) -> anyhow::Result<Self> {
        ensure!(
            data.len() >= 24 && data[..8] == PNG_SIGNATURE && data[12..16] == *b"IHDR",
            "{} is not a PNG file",
            path
        );
        let dimension = |at: usize| u32::from_be_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]]);
        Ok(Self {
            path: path.to_string(),
            width: dimension(16),
            height: dimension(20),
            placeholder: false,
        })
    }

    fn placeholder(path: &str) -> Self {
        Self {
            path: path.to_string(),
            width: 1,
            height: 1,
            placeholder: true,
        }
    }
}

/// Build the worker-side resolver for files under `root`. A missing file
/// becomes a placeholder so the game stays playable without the art pack;
/// that is warned about once per loader.
pub fn file_resolver<T: FileAsset>(root: PathBuf) -> impl Fn(&str) -> anyhow::Result<T> + Send + 'static {
    let warned = AtomicBool::new(false);
    move |path: &str| {
        let full = root.join(path);
        match std::fs::read(&full) {
            Ok(data) => T::decode(path, &data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if !warned.swap(true, Ordering::Relaxed) {
                    log::warn!(
                        "Asset {:?} not found; using placeholder {}s for missing files",
                        full,
                        T::KIND
                    );
                }
                Ok(T::placeholder(path))
            }
            Err(e) => Err(e).with_context(|| format!("reading {}", full.display())),
        }
    }
}

/// Every asset the game streams: models and textures each behind their
/// own worker.
pub struct GameAssets {
    pub models: AssetLoader<ModelAsset>,
    pub textures: AssetLoader<TextureAsset>,
    /// Texture shared by every target decal.
    target_texture: AssetHandle,
    texture_ready: bool,
}

impl GameAssets {
    pub fn new(root: &Path) -> Result<Self, GameError> {
        let models = AssetLoader::new("models", file_resolver::<ModelAsset>(root.to_path_buf()))?;
        let mut textures = AssetLoader::new("textures", file_resolver::<TextureAsset>(root.to_path_buf()))?;
        let target_texture = textures.request(TARGET_TEXTURE)?;
        Ok(Self {
            models,
            textures,
            target_texture,
            texture_ready: false,
        })
    }

    /// Drain finished loads. Call once at the top of a frame.
    pub fn poll(&mut self) -> usize {
        let applied = self.models.poll() + self.textures.poll();
        if !self.texture_ready {
            if let Some(texture) = self.target_texture() {
                log::info!(
                    "Target texture {} ready: {}x{}{}",
                    texture.path,
                    texture.width,
                    texture.height,
                    if texture.placeholder { " (placeholder)" } else { "" }
                );
                self.texture_ready = true;
            }
        }
        applied
    }

    /// The decal texture, a placeholder if its load failed, `None` while in
    /// flight.
    pub fn target_texture(&self) -> Option<Arc<TextureAsset>> {
        match self.textures.state(self.target_texture) {
            Some(LoadState::Ready(texture)) => Some(Arc::clone(texture)),
            Some(LoadState::Failed(_)) | None => Some(Arc::new(TextureAsset::placeholder(TARGET_TEXTURE))),
            Some(LoadState::Pending) => None,
        }
    }

    pub fn is_texture_ready(&self) -> bool {
        self.texture_ready
    }

    /// Resolved model behind `handle`, substituting a placeholder for a
    /// failed load. `None` while the load is still in flight.
    pub fn resolved_or_placeholder(&self, handle: AssetHandle, path: &str) -> Option<Arc<ModelAsset>> {
        match self.models.state(handle) {
            Some(LoadState::Ready(model)) => Some(Arc::clone(model)),
            Some(LoadState::Failed(_)) | None => Some(Arc::new(ModelAsset::placeholder(path))),
            Some(LoadState::Pending) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("woodpecker-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn png_header(width: u32, height: u32) -> Vec<u8> {
        let mut data = PNG_SIGNATURE.to_vec();
        data.extend_from_slice(&13u32.to_be_bytes());
        data.extend_from_slice(b"IHDR");
        data.extend_from_slice(&width.to_be_bytes());
        data.extend_from_slice(&height.to_be_bytes());
        data.extend_from_slice(&[8, 6, 0, 0, 0]);
        data
    }

    #[test]
    fn missing_file_resolves_to_placeholder() {
        let resolve = file_resolver::<ModelAsset>(PathBuf::from("/nonexistent/woodpecker-assets"));
        let model = resolve(TREE_MODEL).unwrap();
        assert!(model.placeholder);
        assert_eq!(model.path, TREE_MODEL);
    }

    #[test]
    fn existing_file_is_read() {
        let dir = scratch_dir("models");
        std::fs::create_dir_all(dir.join("nest")).unwrap();
        std::fs::write(dir.join(NEST_MODEL), b"v 0 0 0\n").unwrap();

        let resolve = file_resolver::<ModelAsset>(dir.clone());
        let model = resolve(NEST_MODEL).unwrap();
        assert!(!model.placeholder);
        assert_eq!(model.bytes, 8);

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn png_header_gives_texture_size() {
        let dir = scratch_dir("textures");
        std::fs::write(dir.join(TARGET_TEXTURE), png_header(256, 128)).unwrap();
        std::fs::write(dir.join("bogus.png"), b"not an image at all, honest").unwrap();

        let resolve = file_resolver::<TextureAsset>(dir.clone());
        let texture = resolve(TARGET_TEXTURE).unwrap();
        assert_eq!((texture.width, texture.height), (256, 128));
        assert!(!texture.placeholder);
        assert!(resolve("bogus.png").is_err());
        assert!(resolve("absent.png").unwrap().placeholder);

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn target_texture_comes_from_the_texture_loader() {
        let dir = scratch_dir("decal");
        std::fs::write(dir.join(TARGET_TEXTURE), png_header(64, 64)).unwrap();

        let mut assets = GameAssets::new(&dir).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while !assets.is_texture_ready() {
            assets.poll();
            assert!(Instant::now() < deadline);
            std::thread::sleep(Duration::from_millis(1));
        }
        let texture = assets.target_texture().unwrap();
        assert_eq!(texture.path, TARGET_TEXTURE);
        assert_eq!(texture.width, 64);
        assert_eq!(assets.models.progress().total, 0);

        std::fs::remove_dir_all(dir).ok();
    }
}
