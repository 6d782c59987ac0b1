//! GPU-side layouts of the per-frame and per-draw uniforms.
//!
//! Field order and padding match the structs in `shaders/*.wgsl`.

use glam::{Mat4, Vec3};

use crate::model::{Camera, Scene, SkyMaterial, WaterMaterial};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GlobalsUniform {
    pub view_proj: [[f32; 4]; 4],
    pub inv_view_proj: [[f32; 4]; 4],
    pub camera_pos: [f32; 4],
    pub ambient: [f32; 4],
    pub env_ambient: [f32; 4],
    pub light_dir: [f32; 4],
    pub light_color: [f32; 4],
}

impl GlobalsUniform {
    pub fn new(scene: &Scene, camera: &Camera) -> Self {
        let view_proj = camera.view_proj();
        let lights = &scene.lights;
        let ambient = lights.ambient_color * lights.ambient_intensity;
        let env_ambient = scene.environment.as_ref().map(|e| e.ambient).unwrap_or(Vec3::ZERO);
        // directional light shines from its position towards the origin
        let light_dir = lights.directional_position.try_normalize().unwrap_or(Vec3::Y);

        Self {
            view_proj: view_proj.to_cols_array_2d(),
            inv_view_proj: view_proj.inverse().to_cols_array_2d(),
            camera_pos: camera.eye.extend(1.0).to_array(),
            ambient: ambient.extend(1.0).to_array(),
            env_ambient: env_ambient.extend(1.0).to_array(),
            light_dir: light_dir.extend(lights.directional_intensity).to_array(),
            light_color: lights.directional_color.extend(1.0).to_array(),
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SkyUniform {
    pub sun_position: [f32; 4],
    pub params: [f32; 4],
}

impl SkyUniform {
    pub fn new(sky: &SkyMaterial) -> Self {
        Self {
            sun_position: sky.sun_position.extend(0.0).to_array(),
            params: [sky.turbidity, sky.rayleigh, sky.mie_coefficient, sky.mie_directional_g],
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct WaterUniform {
    pub sun_direction: [f32; 4],
    pub sun_color: [f32; 4],
    pub water_color: [f32; 4],
    pub params: [f32; 4],
}

impl WaterUniform {
    pub fn new(water: &WaterMaterial) -> Self {
        Self {
            sun_direction: water.sun_direction.extend(water.distortion_scale).to_array(),
            sun_color: water.sun_color.extend(water.time()).to_array(),
            water_color: water.water_color.extend(water.size).to_array(),
            params: [water.alpha, 0.0, 0.0, 0.0],
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelUniform {
    pub model: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 4],
    pub base_color: [f32; 4],
}

impl ModelUniform {
    pub fn new(world: Mat4, base_color: [f32; 4]) -> Self {
        let normal = if world.determinant().abs() > f32::EPSILON {
            world.inverse().transpose()
        } else {
            Mat4::IDENTITY
        };
        Self {
            model: world.to_cols_array_2d(),
            normal: normal.to_cols_array_2d(),
            base_color,
        }
    }
}

/// Round `size` up to a multiple of `alignment`.
pub fn aligned_stride(size: u64, alignment: u64) -> u64 {
    let alignment = alignment.max(1);
    size.div_ceil(alignment) * alignment
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SunParameters;

    #[test]
    fn test_uniform_sizes_are_vec4_aligned() {
        for size in [
            std::mem::size_of::<GlobalsUniform>(),
            std::mem::size_of::<SkyUniform>(),
            std::mem::size_of::<WaterUniform>(),
            std::mem::size_of::<ModelUniform>(),
        ] {
            assert_eq!(size % 16, 0, "size {size}");
        }
        assert_eq!(std::mem::size_of::<GlobalsUniform>(), 208);
        assert_eq!(std::mem::size_of::<ModelUniform>(), 144);
    }

    #[test]
    fn test_water_uniform_carries_time_and_sun() {
        let mut water = WaterMaterial::default();
        water.sun_direction = SunParameters::default().direction();
        for _ in 0..30 {
            water.advance_frame();
        }
        let u = WaterUniform::new(&water);
        assert!((u.sun_color[3] - 0.5).abs() < 1e-6);
        assert_eq!(u.sun_direction[3], 3.7);
        assert_eq!(&u.sun_direction[..3], &water.sun_direction.to_array()[..]);
    }

    #[test]
    fn test_globals_light_direction_and_ambient() {
        let scene = Scene::new(WaterMaterial::default());
        let camera = Camera::new(1280, 720);
        let g = GlobalsUniform::new(&scene, &camera);
        let dir = Vec3::from_slice(&g.light_dir[..3]);
        assert!((dir - Vec3::new(1.0, 0.0, 2.0).normalize()).length() < 1e-6);
        assert_eq!(g.light_dir[3], 0.5);
        assert_eq!(&g.ambient[..3], &[1.0, 1.0, 1.0]);
        assert_eq!(&g.env_ambient[..3], &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_model_normal_matrix_handles_scale() {
        let world = Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0));
        let u = ModelUniform::new(world, [1.0; 4]);
        assert!((u.normal[0][0] - 0.5).abs() < 1e-6);

        let flat = ModelUniform::new(Mat4::from_scale(Vec3::ZERO), [1.0; 4]);
        assert_eq!(flat.normal, Mat4::IDENTITY.to_cols_array_2d());
    }

    #[test]
    fn test_aligned_stride() {
        assert_eq!(aligned_stride(144, 256), 256);
        assert_eq!(aligned_stride(256, 256), 256);
        assert_eq!(aligned_stride(300, 256), 512);
        assert_eq!(aligned_stride(10, 0), 10);
    }
}
