use bytemuck::NoUninit;
use glam::Vec3;
use wgpu::util::DeviceExt;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, NoUninit)]
pub struct Vertex {
    pub pos: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 4],
    pub uv: [f32; 2],
}

impl Vertex {
    pub const ATTRIBUTES: [wgpu::VertexAttribute; 4] = [
        wgpu::VertexAttribute { offset: 0, shader_location: 0, format: wgpu::VertexFormat::Float32x3 },
        wgpu::VertexAttribute { offset: 12, shader_location: 1, format: wgpu::VertexFormat::Float32x3 },
        wgpu::VertexAttribute { offset: 24, shader_location: 2, format: wgpu::VertexFormat::Float32x4 },
        wgpu::VertexAttribute { offset: 40, shader_location: 3, format: wgpu::VertexFormat::Float32x2 },
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

pub struct MeshBuffer {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn empty() -> Self {
        Self {
            vertices: Vec::new(),
            indices: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.indices.is_empty()
    }

    /// Build a mesh from flat attribute arrays as produced by the model loaders.
    ///
    /// Missing normals are replaced by area-weighted vertex normals, missing
    /// colors by white and missing texture coordinates by zero.
    pub fn from_attributes(
        positions: &[[f32; 3]],
        normals: Option<&[[f32; 3]]>,
        uvs: Option<&[[f32; 2]]>,
        indices: Vec<u32>,
    ) -> Self {
        let computed;
        let normals = match normals {
            Some(n) if n.len() == positions.len() => n,
            _ => {
                computed = smooth_normals(positions, &indices);
                &computed[..]
            }
        };

        let vertices = positions
            .iter()
            .enumerate()
            .map(|(i, pos)| Vertex {
                pos: *pos,
                normal: normals[i],
                color: [1.0, 1.0, 1.0, 1.0],
                uv: uvs.and_then(|uv| uv.get(i).copied()).unwrap_or([0.0, 0.0]),
            })
            .collect();

        Self { vertices, indices }
    }

    /// Axis-aligned quad in the XZ plane centered on the origin, facing +Y.
    pub fn plane_xz(size: f32) -> Self {
        let h = size / 2.0;
        let n = [0.0, 1.0, 0.0];
        let c = [1.0, 1.0, 1.0, 1.0];
        let vertices = vec![
            Vertex { pos: [-h, 0.0, -h], normal: n, color: c, uv: [0.0, 0.0] },
            Vertex { pos: [h, 0.0, -h], normal: n, color: c, uv: [1.0, 0.0] },
            Vertex { pos: [h, 0.0, h], normal: n, color: c, uv: [1.0, 1.0] },
            Vertex { pos: [-h, 0.0, h], normal: n, color: c, uv: [0.0, 1.0] },
        ];
        // counter-clockwise when seen from above
        let indices = vec![0, 2, 1, 0, 3, 2];
        Self { vertices, indices }
    }

    pub fn upload(&self, device: &wgpu::Device) -> MeshBuffer {
        let vertices = bytemuck::cast_slice(&self.vertices);
        let indices = bytemuck::cast_slice(&self.indices);

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Vertex Buffer"),
            contents: vertices,
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Index Buffer"),
            contents: indices,
            usage: wgpu::BufferUsages::INDEX,
        });

        MeshBuffer {
            vertex_buffer,
            index_buffer,
            index_count: self.indices.len() as u32,
        }
    }
}

/// A mesh with the flat material color it is drawn with.
#[derive(Debug, Clone)]
pub struct Primitive {
    pub mesh: Mesh,
    pub base_color: [f32; 4],
}

impl Primitive {
    pub fn new(mesh: Mesh, base_color: [f32; 4]) -> Self {
        Self { mesh, base_color }
    }
}

pub fn smooth_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut acc = vec![Vec3::ZERO; positions.len()];
    for tri in indices.chunks_exact(3) {
        let (a, b, c) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        if a >= positions.len() || b >= positions.len() || c >= positions.len() {
            continue;
        }
        let pa = Vec3::from(positions[a]);
        let pb = Vec3::from(positions[b]);
        let pc = Vec3::from(positions[c]);
        // unnormalized cross product weights by triangle area
        let face = (pb - pa).cross(pc - pa);
        acc[a] += face;
        acc[b] += face;
        acc[c] += face;
    }
    acc.into_iter()
        .map(|n| n.try_normalize().unwrap_or(Vec3::Y).to_array())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smooth_normals_of_flat_triangle() {
        let positions = [[0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 0.0]];
        let normals = smooth_normals(&positions, &[0, 1, 2]);
        for n in normals {
            assert!((Vec3::from(n) - Vec3::Y).length() < 1e-6, "got {n:?}");
        }
    }

    #[test]
    fn test_from_attributes_fills_missing_channels() {
        let positions = [[0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 0.0]];
        let mesh = Mesh::from_attributes(&positions, None, None, vec![0, 1, 2]);
        assert_eq!(mesh.vertices.len(), 3);
        assert_eq!(mesh.vertices[1].uv, [0.0, 0.0]);
        assert_eq!(mesh.vertices[2].color, [1.0; 4]);
        assert!(!mesh.is_empty());
    }

    #[test]
    fn test_plane_faces_up() {
        let plane = Mesh::plane_xz(10.0);
        let normals = smooth_normals(
            &plane.vertices.iter().map(|v| v.pos).collect::<Vec<_>>(),
            &plane.indices,
        );
        assert!(normals.iter().all(|n| n[1] > 0.99));
    }
}
