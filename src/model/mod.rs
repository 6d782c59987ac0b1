// MODEL: Scene state and data
pub mod animation;
pub mod camera;
pub mod mesh;
pub mod scene;
pub mod sky;
pub mod sun;
pub mod water;

pub use animation::{AnimationClip, AnimationMixer, AnimationRegistry};
pub use camera::Camera;
pub use mesh::{Mesh, MeshBuffer, Primitive, Vertex};
pub use scene::{DrawItem, MeshId, NodeId, Pose, Scene, SceneFragment, StaticObject, Transform};
pub use sky::{EnvironmentMap, SkyMaterial};
pub use sun::SunParameters;
pub use water::WaterMaterial;
