//! glTF/GLB loader.
//!
//! Extracts the node hierarchy, one [`Primitive`] per triangle primitive and
//! node TRS animations. Skins and morph targets are ignored.

use std::path::Path;

use glam::{Quat, Vec3};
use gltf::animation::util::ReadOutputs;

use crate::assets::AssetError;
use crate::model::animation::{AnimationChannel, ChannelValues, Interpolation};
use crate::model::mesh::{Mesh, Primitive};
use crate::model::scene::{FragmentNode, SceneFragment, Transform};
use crate::model::AnimationClip;

pub fn load_gltf(path: impl AsRef<Path>) -> Result<SceneFragment, AssetError> {
    let path = path.as_ref();
    let (document, buffers, images) = gltf::import(path)?;

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "gltf".to_string());

    let fragment = build_fragment(name, &document, &buffers, &images)?;

    tracing::info!(
        "Loaded glTF {}: {} nodes, {} primitives, {} clips",
        path.display(),
        fragment.nodes.len(),
        fragment.primitives.len(),
        fragment.clips.len()
    );

    Ok(fragment)
}

fn build_fragment(
    name: String,
    document: &gltf::Document,
    buffers: &[gltf::buffer::Data],
    images: &[gltf::image::Data],
) -> Result<SceneFragment, AssetError> {
    let mut primitives = Vec::new();
    // primitive indices of every glTF mesh, by mesh index
    let mut mesh_primitives: Vec<Vec<usize>> = Vec::new();

    for mesh in document.meshes() {
        let mesh_name = mesh.name().unwrap_or("unnamed").to_string();
        let mut indices = Vec::new();
        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                tracing::debug!("skipping non-triangle primitive in mesh {mesh_name}");
                continue;
            }
            let mesh = extract_mesh(&primitive, buffers, &mesh_name)?;
            let base_color = base_color(&primitive.material(), images);
            indices.push(primitives.len());
            primitives.push(Primitive::new(mesh, base_color));
        }
        mesh_primitives.push(indices);
    }

    // only nodes reachable from the displayed scene take part
    let reachable = scene_nodes(document);
    let mut remap: Vec<Option<usize>> = vec![None; document.nodes().len()];
    for (new, node) in reachable.iter().enumerate() {
        remap[node.index()] = Some(new);
    }

    let nodes = reachable
        .iter()
        .map(|node| {
            let (translation, rotation, scale) = node.transform().decomposed();
            FragmentNode {
                name: node.name().unwrap_or("node").to_string(),
                transform: Transform {
                    translation: Vec3::from(translation),
                    rotation: Quat::from_array(rotation),
                    scale: Vec3::from(scale),
                },
                children: node.children().filter_map(|c| remap[c.index()]).collect(),
                primitives: node
                    .mesh()
                    .and_then(|m| mesh_primitives.get(m.index()).cloned())
                    .unwrap_or_default(),
            }
        })
        .collect();

    let clips = document
        .animations()
        .filter_map(|a| read_animation(&a, buffers, &remap))
        .collect();

    Ok(SceneFragment { name, nodes, primitives, clips })
}

/// Nodes of the default scene (or the first one) in depth-first order.
fn scene_nodes(document: &gltf::Document) -> Vec<gltf::Node<'_>> {
    let Some(scene) = document.default_scene().or_else(|| document.scenes().next()) else {
        return Vec::new();
    };
    let mut visited = vec![false; document.nodes().len()];
    let mut order = Vec::new();
    let mut stack: Vec<gltf::Node> = scene.nodes().collect();
    stack.reverse();
    while let Some(node) = stack.pop() {
        if std::mem::replace(&mut visited[node.index()], true) {
            continue;
        }
        let mut children: Vec<gltf::Node> = node.children().collect();
        children.reverse();
        order.push(node);
        stack.extend(children);
    }
    order
}

fn extract_mesh(primitive: &gltf::Primitive, buffers: &[gltf::buffer::Data], mesh_name: &str) -> Result<Mesh, AssetError> {
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|d| &d.0[..]));

    let positions: Vec<[f32; 3]> = reader
        .read_positions()
        .ok_or_else(|| AssetError::MissingPositions(mesh_name.to_string()))?
        .collect();

    let normals: Option<Vec<[f32; 3]>> = reader.read_normals().map(|iter| iter.collect());
    let uvs: Option<Vec<[f32; 2]>> = reader.read_tex_coords(0).map(|tc| tc.into_f32().collect());

    let indices: Vec<u32> = reader
        .read_indices()
        .map(|iter| iter.into_u32().collect())
        .unwrap_or_else(|| (0..positions.len() as u32).collect());

    Ok(Mesh::from_attributes(&positions, normals.as_deref(), uvs.as_deref(), indices))
}

/// Base color factor, tinted by the average of the base color texture if there is one.
fn base_color(material: &gltf::Material, images: &[gltf::image::Data]) -> [f32; 4] {
    let pbr = material.pbr_metallic_roughness();
    let mut color = pbr.base_color_factor();
    let texture_average = pbr
        .base_color_texture()
        .and_then(|info| images.get(info.texture().source().index()))
        .and_then(average_color);
    if let Some(avg) = texture_average {
        for (c, a) in color.iter_mut().zip(avg) {
            *c *= a;
        }
    }
    color
}

/// Mean linear color of an 8-bit RGB(A) image.
fn average_color(image: &gltf::image::Data) -> Option<[f32; 4]> {
    let channels = match image.format {
        gltf::image::Format::R8G8B8 => 3,
        gltf::image::Format::R8G8B8A8 => 4,
        _ => return None,
    };
    let texel_count = image.pixels.len() / channels;
    if texel_count == 0 {
        return None;
    }

    let mut sum = [0.0f64; 4];
    for texel in image.pixels.chunks_exact(channels) {
        for c in 0..3 {
            sum[c] += srgb_to_linear(texel[c] as f32 / 255.0) as f64;
        }
        sum[3] += if channels == 4 { texel[3] as f64 / 255.0 } else { 1.0 };
    }
    let n = texel_count as f64;
    Some([(sum[0] / n) as f32, (sum[1] / n) as f32, (sum[2] / n) as f32, (sum[3] / n) as f32])
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn read_animation(
    animation: &gltf::Animation,
    buffers: &[gltf::buffer::Data],
    remap: &[Option<usize>],
) -> Option<AnimationClip> {
    let name = animation.name().unwrap_or("animation").to_string();
    let mut channels = Vec::new();

    for channel in animation.channels() {
        let Some(target) = remap.get(channel.target().node().index()).copied().flatten() else {
            continue;
        };
        let reader = channel.reader(|buffer| buffers.get(buffer.index()).map(|d| &d.0[..]));
        let Some(times) = reader.read_inputs().map(|i| i.collect::<Vec<f32>>()) else {
            continue;
        };
        let values = match reader.read_outputs() {
            Some(ReadOutputs::Translations(iter)) => ChannelValues::Translation(iter.map(Vec3::from).collect()),
            Some(ReadOutputs::Scales(iter)) => ChannelValues::Scale(iter.map(Vec3::from).collect()),
            Some(ReadOutputs::Rotations(rotations)) => {
                ChannelValues::Rotation(rotations.into_f32().map(Quat::from_array).collect())
            }
            Some(ReadOutputs::MorphTargetWeights(_)) | None => continue,
        };
        let interpolation = match channel.sampler().interpolation() {
            gltf::animation::Interpolation::Step => Interpolation::Step,
            gltf::animation::Interpolation::Linear => Interpolation::Linear,
            gltf::animation::Interpolation::CubicSpline => Interpolation::CubicSpline,
        };
        channels.push(AnimationChannel {
            target,
            interpolation,
            times,
            values,
        });
    }

    if channels.is_empty() {
        tracing::debug!("animation {name} has no node channels, skipping");
        return None;
    }
    Some(AnimationClip::new(name, channels))
}
