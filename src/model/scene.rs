use glam::{EulerRot, Mat4, Quat, Vec3};

use crate::model::animation::AnimationClip;
use crate::model::mesh::Primitive;
use crate::model::sky::{EnvironmentMap, SkyMaterial};
use crate::model::water::WaterMaterial;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(usize);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Position, XYZ Euler rotation in radians and per-axis scale.
    pub fn from_placement(position: Vec3, euler: Vec3, scale: Vec3) -> Self {
        Self {
            translation: position,
            rotation: Quat::from_euler(EulerRot::XYZ, euler.x, euler.y, euler.z),
            scale,
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// Editable position and XYZ Euler rotation (radians) of a placed model.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Vec3,
}

impl Pose {
    /// Overwrite translation and rotation, keeping the scale.
    pub fn apply_to(&self, transform: &mut Transform) {
        transform.translation = self.position;
        transform.rotation = Quat::from_euler(EulerRot::XYZ, self.rotation.x, self.rotation.y, self.rotation.z);
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub transform: Transform,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub meshes: Vec<MeshId>,
}

/// Node of a freshly loaded model, indexed within its fragment.
#[derive(Debug, Clone, Default)]
pub struct FragmentNode {
    pub name: String,
    pub transform: Transform,
    pub children: Vec<usize>,
    pub primitives: Vec<usize>,
}

/// CPU-side result of loading one model file, ready for insertion.
#[derive(Debug, Clone, Default)]
pub struct SceneFragment {
    pub name: String,
    pub nodes: Vec<FragmentNode>,
    pub primitives: Vec<Primitive>,
    pub clips: Vec<AnimationClip>,
}

impl SceneFragment {
    pub fn has_animations(&self) -> bool {
        !self.clips.is_empty()
    }
}

/// Objects that exist from startup, independent of any model load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaticObject {
    Water,
    Sky,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lights {
    pub ambient_color: Vec3,
    pub ambient_intensity: f32,
    pub directional_color: Vec3,
    pub directional_intensity: f32,
    /// Light shines from this position towards the origin.
    pub directional_position: Vec3,
}

impl Default for Lights {
    fn default() -> Self {
        Self {
            ambient_color: Vec3::ONE,
            ambient_intensity: 1.0,
            directional_color: Vec3::ONE,
            directional_intensity: 0.5,
            directional_position: Vec3::new(1.0, 0.0, 2.0),
        }
    }
}

/// Where a fragment ended up after insertion.
#[derive(Debug, Clone)]
pub struct InsertedFragment {
    pub root: NodeId,
    /// Scene node for every fragment node, in fragment order.
    pub nodes: Vec<NodeId>,
}

#[derive(Debug, Clone)]
struct FragmentRecord {
    name: String,
    root: NodeId,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawItem {
    pub mesh: MeshId,
    pub world: Mat4,
}

pub struct Scene {
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
    primitives: Vec<Primitive>,
    fragments: Vec<FragmentRecord>,
    pub water: WaterMaterial,
    pub sky: SkyMaterial,
    pub environment: Option<EnvironmentMap>,
    pub lights: Lights,
}

impl Scene {
    pub fn new(water: WaterMaterial) -> Self {
        Self {
            nodes: Vec::new(),
            roots: Vec::new(),
            primitives: Vec::new(),
            fragments: Vec::new(),
            water,
            sky: SkyMaterial::default(),
            environment: None,
            lights: Lights::default(),
        }
    }

    pub fn statics(&self) -> [StaticObject; 2] {
        [StaticObject::Water, StaticObject::Sky]
    }

    pub fn add_node(&mut self, name: impl Into<String>, transform: Transform, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            name: name.into(),
            transform,
            parent,
            children: Vec::new(),
            meshes: Vec::new(),
        });
        match parent.and_then(|p| self.nodes.get_mut(p.0)) {
            Some(p) => p.children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    pub fn primitive(&self, id: MeshId) -> Option<&Primitive> {
        self.primitives.get(id.0)
    }

    pub fn primitive_count(&self) -> usize {
        self.primitives.len()
    }

    pub fn fragment_count(&self) -> usize {
        self.fragments.len()
    }

    pub fn fragment_root(&self, name: &str) -> Option<NodeId> {
        self.fragments.iter().find(|f| f.name == name).map(|f| f.root)
    }

    /// Insert a loaded model under a new root node carrying `placement`.
    ///
    /// Fragment nodes that are nobody's child hang directly off the root.
    pub fn insert_fragment(&mut self, fragment: SceneFragment, placement: Transform) -> InsertedFragment {
        let root = self.add_node(fragment.name.clone(), placement, None);

        let mesh_base = self.primitives.len();
        self.primitives.extend(fragment.primitives);
        let mesh_count = self.primitives.len() - mesh_base;

        let mut parents: Vec<Option<usize>> = vec![None; fragment.nodes.len()];
        for (i, node) in fragment.nodes.iter().enumerate() {
            for &child in &node.children {
                if child < parents.len() && parents[child].is_none() && !is_ancestor(&parents, child, i) {
                    parents[child] = Some(i);
                }
            }
        }

        let node_base = self.nodes.len();
        let ids: Vec<NodeId> = (0..fragment.nodes.len()).map(|i| NodeId(node_base + i)).collect();

        for (i, node) in fragment.nodes.into_iter().enumerate() {
            let parent = parents[i].map(|p| ids[p]).unwrap_or(root);
            let meshes = node
                .primitives
                .iter()
                .filter(|&&p| p < mesh_count)
                .map(|&p| MeshId(mesh_base + p))
                .collect();
            self.nodes.push(Node {
                name: node.name,
                transform: node.transform,
                parent: Some(parent),
                children: Vec::new(),
                meshes,
            });
        }
        // link children after every node exists so forward references resolve
        for id in &ids {
            if let Some(parent) = self.nodes[id.0].parent {
                self.nodes[parent.0].children.push(*id);
            }
        }

        self.fragments.push(FragmentRecord { name: fragment.name, root });
        InsertedFragment { root, nodes: ids }
    }

    /// Accumulated world matrix of a node.
    pub fn world_matrix(&self, id: NodeId) -> Mat4 {
        let mut matrix = Mat4::IDENTITY;
        let mut current = Some(id);
        while let Some(node) = current.and_then(|c| self.nodes.get(c.0)) {
            matrix = node.transform.matrix() * matrix;
            current = node.parent;
        }
        matrix
    }

    /// Every mesh instance with its world matrix, in depth-first order.
    pub fn draw_list(&self) -> Vec<DrawItem> {
        let mut items = Vec::new();
        let mut stack: Vec<(NodeId, Mat4)> = self.roots.iter().rev().map(|&r| (r, Mat4::IDENTITY)).collect();
        while let Some((id, parent)) = stack.pop() {
            let node = &self.nodes[id.0];
            let world = parent * node.transform.matrix();
            items.extend(node.meshes.iter().map(|&mesh| DrawItem { mesh, world }));
            stack.extend(node.children.iter().rev().map(|&c| (c, world)));
        }
        items
    }
}

/// Whether `candidate` is `node` itself or one of its ancestors.
fn is_ancestor(parents: &[Option<usize>], candidate: usize, node: usize) -> bool {
    let mut current = Some(node);
    while let Some(c) = current {
        if c == candidate {
            return true;
        }
        current = parents[c];
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::mesh::Mesh;

    fn triangle() -> Primitive {
        let positions = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        Primitive::new(Mesh::from_attributes(&positions, None, None, vec![0, 1, 2]), [1.0; 4])
    }

    fn two_level_fragment(name: &str) -> SceneFragment {
        SceneFragment {
            name: name.to_string(),
            nodes: vec![
                FragmentNode {
                    name: "body".into(),
                    transform: Transform { translation: Vec3::new(0.0, 1.0, 0.0), ..Transform::IDENTITY },
                    children: vec![1],
                    primitives: vec![0],
                },
                FragmentNode {
                    name: "fin".into(),
                    transform: Transform { translation: Vec3::new(2.0, 0.0, 0.0), ..Transform::IDENTITY },
                    children: vec![],
                    primitives: vec![0],
                },
            ],
            primitives: vec![triangle()],
            clips: vec![],
        }
    }

    #[test]
    fn test_new_scene_has_only_statics() {
        let scene = Scene::new(WaterMaterial::default());
        assert_eq!(scene.fragment_count(), 0);
        assert_eq!(scene.statics(), [StaticObject::Water, StaticObject::Sky]);
        assert!(scene.draw_list().is_empty());
    }

    #[test]
    fn test_insert_fragment_builds_hierarchy() {
        let mut scene = Scene::new(WaterMaterial::default());
        let placement = Transform::from_placement(Vec3::new(100.0, 0.0, 0.0), Vec3::ZERO, Vec3::splat(3.0));
        let inserted = scene.insert_fragment(two_level_fragment("sub"), placement);

        assert_eq!(scene.fragment_count(), 1);
        assert_eq!(scene.fragment_root("sub"), Some(inserted.root));
        assert_eq!(inserted.nodes.len(), 2);

        let body = scene.node(inserted.nodes[0]).unwrap();
        assert_eq!(body.parent, Some(inserted.root));
        assert_eq!(body.children, vec![inserted.nodes[1]]);
        assert_eq!(scene.node(inserted.root).unwrap().children, vec![inserted.nodes[0]]);

        // fin sits at root(100,0,0) + 3 * (body(0,1,0) + fin(2,0,0))
        let fin_world = scene.world_matrix(inserted.nodes[1]).transform_point3(Vec3::ZERO);
        assert!((fin_world - Vec3::new(106.0, 3.0, 0.0)).length() < 1e-4);

        let draws = scene.draw_list();
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].mesh, draws[1].mesh);
    }

    #[test]
    fn test_identical_fragments_get_separate_meshes() {
        let mut scene = Scene::new(WaterMaterial::default());
        scene.insert_fragment(two_level_fragment("island"), Transform::IDENTITY);
        scene.insert_fragment(two_level_fragment("island"), Transform::IDENTITY);
        assert_eq!(scene.fragment_count(), 2);
        assert_eq!(scene.primitive_count(), 2);
        assert_eq!(scene.draw_list().len(), 4);
    }

    #[test]
    fn test_out_of_range_indices_are_ignored() {
        let mut scene = Scene::new(WaterMaterial::default());
        let fragment = SceneFragment {
            name: "broken".into(),
            nodes: vec![FragmentNode {
                name: "n".into(),
                transform: Transform::IDENTITY,
                children: vec![5],
                primitives: vec![3],
            }],
            primitives: vec![],
            clips: vec![],
        };
        let inserted = scene.insert_fragment(fragment, Transform::IDENTITY);
        assert!(scene.node(inserted.nodes[0]).unwrap().meshes.is_empty());
        assert!(scene.draw_list().is_empty());
    }

    #[test]
    fn test_pose_keeps_scale() {
        let mut transform = Transform::from_placement(Vec3::ZERO, Vec3::ZERO, Vec3::splat(3.0));
        let pose = Pose { position: Vec3::new(100.0, -150.0, 8500.0), rotation: Vec3::new(0.0, std::f32::consts::PI, 0.0) };
        pose.apply_to(&mut transform);
        assert_eq!(transform.translation, pose.position);
        assert_eq!(transform.scale, Vec3::splat(3.0));
        let forward = transform.rotation * Vec3::Z;
        assert!((forward - Vec3::NEG_Z).length() < 1e-5);
    }

    #[test]
    fn test_cyclic_children_do_not_hang() {
        let mut scene = Scene::new(WaterMaterial::default());
        let mut fragment = two_level_fragment("loop");
        fragment.nodes[1].children = vec![0];
        let inserted = scene.insert_fragment(fragment, Transform::IDENTITY);
        assert_eq!(scene.node(inserted.nodes[0]).unwrap().parent, Some(inserted.root));
        assert_eq!(scene.draw_list().len(), 2);
    }
}
