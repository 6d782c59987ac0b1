use std::path::PathBuf;

use glam::Vec3;

use crate::model::scene::{Pose, Transform};

/// How a loaded model is wired into the viewer once it arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelRole {
    /// Pose editable from the GUI.
    Submarine,
    Island,
    /// All clips play in a loop.
    Birds,
}

/// Model file(s), relative to the asset root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetRef {
    Gltf(PathBuf),
    ObjMtl { obj: PathBuf, mtl: PathBuf },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub label: String,
    pub role: ModelRole,
    pub asset: AssetRef,
    pub position: Vec3,
    /// XYZ Euler angles in radians.
    pub rotation: Vec3,
    pub scale: f32,
}

impl Placement {
    pub fn new(label: impl Into<String>, role: ModelRole, asset: AssetRef, position: Vec3, scale: f32) -> Self {
        Self {
            label: label.into(),
            role,
            asset,
            position,
            rotation: Vec3::ZERO,
            scale,
        }
    }

    pub fn transform(&self) -> Transform {
        Transform::from_placement(self.position, self.rotation, Vec3::splat(self.scale))
    }

    pub fn pose(&self) -> Pose {
        Pose { position: self.position, rotation: self.rotation }
    }
}

pub const SUBMARINE_MODEL: &str = "model/submarine.glb";
pub const BIRDS_MODEL: &str = "model/birds.glb";
pub const ISLAND_OBJ: &str = "model/island3.obj";
pub const ISLAND_MTL: &str = "model/island3.mtl";

const ISLAND_X: [f32; 3] = [-10000.0, 5900.0, -15000.0];

/// Every model the viewer requests at startup, in issue order.
///
/// The islands are three separate loads of the same files.
pub fn default_manifest() -> Vec<Placement> {
    let mut placements = vec![Placement::new(
        "submarine",
        ModelRole::Submarine,
        AssetRef::Gltf(SUBMARINE_MODEL.into()),
        Vec3::new(100.0, -150.0, 8500.0),
        3.0,
    )];

    placements.extend(ISLAND_X.iter().enumerate().map(|(i, &x)| {
        Placement::new(
            format!("island-{}", i + 1),
            ModelRole::Island,
            AssetRef::ObjMtl {
                obj: ISLAND_OBJ.into(),
                mtl: ISLAND_MTL.into(),
            },
            Vec3::new(x, -50.0, -50.0),
            10.0,
        )
    }));

    placements.push(Placement::new(
        "birds",
        ModelRole::Birds,
        AssetRef::Gltf(BIRDS_MODEL.into()),
        Vec3::new(0.0, 1500.0, 0.0),
        500.0,
    ));

    placements
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_manifest() {
        let manifest = default_manifest();
        assert_eq!(manifest.len(), 5);
        assert_eq!(manifest.iter().filter(|p| p.role == ModelRole::Island).count(), 3);

        let sub = &manifest[0];
        assert_eq!(sub.role, ModelRole::Submarine);
        assert_eq!(sub.pose().position, Vec3::new(100.0, -150.0, 8500.0));
        assert_eq!(sub.transform().scale, Vec3::splat(3.0));

        let birds = manifest.last().unwrap();
        assert_eq!(birds.asset, AssetRef::Gltf(PathBuf::from("model/birds.glb")));
        assert_eq!(birds.scale, 500.0);
    }
}
