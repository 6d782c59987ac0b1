//! Model and texture loading.
//!
//! Loaders turn files into CPU-side [`SceneFragment`]s; nothing here touches
//! the GPU, so loads can run on worker threads.

pub mod gltf_loader;
pub mod manifest;
pub mod obj_loader;
pub mod pipeline;
pub mod texture;

use std::path::{Path, PathBuf};

use crate::model::SceneFragment;

pub use manifest::{default_manifest, AssetRef, ModelRole, Placement};
pub use pipeline::{AssetPipeline, LoadEvent, LoadHandle};

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to load glTF: {0}")]
    Gltf(#[from] gltf::Error),

    #[error("failed to load OBJ/MTL: {0}")]
    Obj(#[from] tobj::LoadError),

    #[error("failed to decode image: {0}")]
    Image(#[from] image::ImageError),

    #[error("missing position data for mesh: {0}")]
    MissingPositions(String),

    #[error("load was abandoned before it completed")]
    Cancelled,
}

/// Anything that can turn an [`AssetRef`] into a scene fragment.
pub trait AssetSource: Send + Sync {
    fn load(&self, asset: &AssetRef) -> Result<SceneFragment, AssetError>;
}

/// Loads assets from files below a root directory.
#[derive(Debug, Clone)]
pub struct FileAssetSource {
    root: PathBuf,
}

impl FileAssetSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn resolve(&self, relative: &Path) -> PathBuf {
        self.root.join(relative)
    }
}

impl AssetSource for FileAssetSource {
    fn load(&self, asset: &AssetRef) -> Result<SceneFragment, AssetError> {
        match asset {
            AssetRef::Gltf(path) => gltf_loader::load_gltf(self.resolve(path)),
            AssetRef::ObjMtl { obj, mtl } => obj_loader::load_obj_with_mtl(self.resolve(obj), self.resolve(mtl)),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::PathBuf;

    /// Fresh scratch directory under the system temp dir.
    pub fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("seascape-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }
}
