use std::path::Path;

use image::RgbaImage;

use crate::assets::AssetError;

/// Tiling normal map for the ocean surface, relative to the asset root.
pub const WATER_NORMALS: &str = "textures/sea1/waternormals.png";

pub fn load_rgba(path: impl AsRef<Path>) -> Result<RgbaImage, AssetError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| AssetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(image::load_from_memory(&bytes)?.to_rgba8())
}

/// 1x1 normal map pointing straight out of the surface.
pub fn flat_normal_map() -> RgbaImage {
    RgbaImage::from_pixel(1, 1, image::Rgba([128, 128, 255, 255]))
}

/// Water normals from `root`, or a flat map if the file is unusable.
pub fn water_normals_or_flat(root: &Path) -> RgbaImage {
    match load_rgba(root.join(WATER_NORMALS)) {
        Ok(img) => img,
        Err(e) => {
            tracing::warn!("water normal map unavailable, using flat normals: {e}");
            flat_normal_map()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::test_support::scratch_dir;

    #[test]
    fn test_missing_normals_fall_back_to_flat() {
        let dir = scratch_dir("tex-missing");
        let img = water_normals_or_flat(&dir);
        assert_eq!(img.dimensions(), (1, 1));
        assert_eq!(img.get_pixel(0, 0).0, [128, 128, 255, 255]);
    }

    #[test]
    fn test_load_png() {
        let dir = scratch_dir("tex-png");
        let path = dir.join(WATER_NORMALS);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        RgbaImage::from_pixel(4, 2, image::Rgba([10, 20, 30, 255])).save(&path).unwrap();

        let img = water_normals_or_flat(&dir);
        assert_eq!(img.dimensions(), (4, 2));
        assert_eq!(img.get_pixel(3, 1).0, [10, 20, 30, 255]);
    }

    #[test]
    fn test_garbage_is_an_image_error() {
        let dir = scratch_dir("tex-garbage");
        let path = dir.join("bad.png");
        std::fs::write(&path, b"not a png").unwrap();
        assert!(matches!(load_rgba(&path), Err(AssetError::Image(_))));
    }
}
