use std::cell::Cell;
use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::Path;

use crate::assets::AssetError;
use crate::model::mesh::{Mesh, Primitive};
use crate::model::scene::{FragmentNode, SceneFragment, Transform};

const DEFAULT_DIFFUSE: [f32; 3] = [0.8, 0.8, 0.8];

/// Load an OBJ model whose materials come from an explicitly given MTL file.
///
/// Each OBJ object becomes one node with a single primitive. The MTL file is
/// read whether or not the OBJ names a library, and any `mtllib` lines in the
/// OBJ resolve to it. A material library that cannot be read fails the whole load.
pub fn load_obj_with_mtl(obj_path: impl AsRef<Path>, mtl_path: impl AsRef<Path>) -> Result<SceneFragment, AssetError> {
    let obj_path = obj_path.as_ref();
    let mtl_path = mtl_path.as_ref();

    let file = File::open(obj_path).map_err(|source| AssetError::Io {
        path: obj_path.to_path_buf(),
        source,
    })?;
    // a leading mtllib line makes tobj always ask for the explicit library
    let mut reader = Cursor::new(&b"mtllib explicit.mtl\n"[..]).chain(BufReader::new(file));
    let library_read = Cell::new(false);

    let (models, materials) = tobj::load_obj_buf(
        &mut reader,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
        |_| {
            if library_read.replace(true) {
                return Ok((Vec::new(), Default::default()));
            }
            tobj::load_mtl(mtl_path)
        },
    )?;
    let materials = materials?;

    let mut nodes = Vec::with_capacity(models.len());
    let mut primitives = Vec::with_capacity(models.len());

    for model in models {
        let mesh = model.mesh;
        if mesh.positions.is_empty() {
            return Err(AssetError::MissingPositions(model.name));
        }

        let positions: Vec<[f32; 3]> = mesh.positions.chunks_exact(3).map(|p| [p[0], p[1], p[2]]).collect();
        let normals: Vec<[f32; 3]> = mesh.normals.chunks_exact(3).map(|n| [n[0], n[1], n[2]]).collect();
        let uvs: Vec<[f32; 2]> = mesh.texcoords.chunks_exact(2).map(|t| [t[0], t[1]]).collect();

        let material = mesh.material_id.and_then(|id| materials.get(id));
        let diffuse = material.and_then(|m| m.diffuse).unwrap_or(DEFAULT_DIFFUSE);
        let alpha = material.and_then(|m| m.dissolve).unwrap_or(1.0);

        let built = Mesh::from_attributes(
            &positions,
            (!normals.is_empty()).then_some(&normals[..]),
            (!uvs.is_empty()).then_some(&uvs[..]),
            mesh.indices,
        );

        nodes.push(FragmentNode {
            name: model.name,
            transform: Transform::IDENTITY,
            children: Vec::new(),
            primitives: vec![primitives.len()],
        });
        primitives.push(Primitive::new(built, [diffuse[0], diffuse[1], diffuse[2], alpha]));
    }

    let name = obj_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "obj".to_string());

    tracing::info!(
        "Loaded OBJ {} with {} materials: {} objects",
        obj_path.display(),
        materials.len(),
        nodes.len()
    );

    Ok(SceneFragment {
        name,
        nodes,
        primitives,
        clips: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::test_support::scratch_dir;

    const ISLAND_OBJ: &str = "\
mtllib island.mtl
o Rock
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 1.0 0.0 1.0
v 0.0 0.0 1.0
usemtl sand
f 1 3 2
f 1 4 3
o Palm
v 0.0 1.0 0.0
v 0.0 2.0 0.0
v 1.0 1.0 0.0
usemtl leaf
f 5 7 6
";

    const ISLAND_MTL: &str = "\
newmtl sand
Kd 0.9 0.8 0.5
newmtl leaf
Kd 0.1 0.6 0.2
d 0.5
";

    #[test]
    fn test_load_obj_with_materials() {
        let dir = scratch_dir("obj");
        std::fs::write(dir.join("island.obj"), ISLAND_OBJ).unwrap();
        std::fs::write(dir.join("island.mtl"), ISLAND_MTL).unwrap();

        let fragment = load_obj_with_mtl(dir.join("island.obj"), dir.join("island.mtl")).unwrap();
        assert_eq!(fragment.name, "island");
        assert_eq!(fragment.nodes.len(), 2);
        assert_eq!(fragment.primitives.len(), 2);
        assert!(!fragment.has_animations());

        let rock = &fragment.primitives[0];
        assert_eq!(rock.mesh.indices.len(), 6);
        assert_eq!(rock.base_color, [0.9, 0.8, 0.5, 1.0]);

        let palm = &fragment.primitives[1];
        assert_eq!(palm.base_color[3], 0.5);
        assert_eq!(fragment.nodes[1].primitives, vec![1]);
    }

    #[test]
    fn test_explicit_mtl_applies_without_mtllib_line() {
        let dir = scratch_dir("obj-no-mtllib");
        let obj = ISLAND_OBJ.replacen("mtllib island.mtl\n", "", 1);
        std::fs::write(dir.join("island.obj"), obj).unwrap();
        std::fs::write(dir.join("materials.mtl"), ISLAND_MTL).unwrap();

        let fragment = load_obj_with_mtl(dir.join("island.obj"), dir.join("materials.mtl")).unwrap();
        assert_eq!(fragment.primitives[0].base_color, [0.9, 0.8, 0.5, 1.0]);
        assert_eq!(fragment.primitives[1].base_color, [0.1, 0.6, 0.2, 0.5]);

        let missing = load_obj_with_mtl(dir.join("island.obj"), dir.join("absent.mtl"));
        assert!(matches!(missing, Err(AssetError::Obj(_))));
    }

    #[test]
    fn test_missing_mtl_fails() {
        let dir = scratch_dir("obj-nomtl");
        std::fs::write(dir.join("island.obj"), ISLAND_OBJ).unwrap();
        let result = load_obj_with_mtl(dir.join("island.obj"), dir.join("absent.mtl"));
        assert!(matches!(result, Err(AssetError::Obj(_))));
    }

    #[test]
    fn test_missing_obj_reports_path() {
        let dir = scratch_dir("obj-noobj");
        match load_obj_with_mtl(dir.join("nothing.obj"), dir.join("nothing.mtl")) {
            Err(AssetError::Io { path, .. }) => assert!(path.ends_with("nothing.obj")),
            other => panic!("expected io error, got {other:?}"),
        }
    }
}
