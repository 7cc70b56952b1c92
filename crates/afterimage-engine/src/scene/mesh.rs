use bytemuck::{Pod, Zeroable};

/// Vertex layout shared by all scene meshes.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl Vertex {
    const ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x3, // position
        1 => Float32x3  // normal
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// CPU-side triangle mesh.
///
/// Meshes are immutable after construction; the scene pass uploads them once
/// and keeps the GPU buffers cached per node.
#[derive(Debug, Clone)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    /// UV sphere centered at the origin.
    ///
    /// `sectors` is the number of longitudinal slices, `stacks` the number of
    /// latitudinal rings. 16x12 is plenty for a small marker.
    pub fn uv_sphere(radius: f32, sectors: u32, stacks: u32) -> Self {
        let sectors = sectors.max(3);
        let stacks = stacks.max(2);

        let mut vertices = Vec::with_capacity(((sectors + 1) * (stacks + 1)) as usize);
        let mut indices = Vec::new();

        for i in 0..=stacks {
            // Latitude from +pi/2 down to -pi/2.
            let lat = std::f32::consts::FRAC_PI_2 - (i as f32 / stacks as f32) * std::f32::consts::PI;
            let xz = lat.cos();
            let y = lat.sin();

            for j in 0..=sectors {
                let lon = (j as f32 / sectors as f32) * std::f32::consts::TAU;
                let n = [xz * lon.cos(), y, xz * lon.sin()];
                vertices.push(Vertex {
                    position: [n[0] * radius, n[1] * radius, n[2] * radius],
                    normal: n,
                });
            }
        }

        let ring = sectors + 1;
        for i in 0..stacks {
            for j in 0..sectors {
                let a = i * ring + j;
                let b = a + ring;

                // Counter-clockwise when seen from outside; degenerate
                // triangles at the poles are skipped.
                if i != 0 {
                    indices.extend_from_slice(&[a, a + 1, b]);
                }
                if i != stacks - 1 {
                    indices.extend_from_slice(&[a + 1, b + 1, b]);
                }
            }
        }

        Self { vertices, indices }
    }

    /// Flat rectangle in the XY plane, facing +Z, centered at the origin.
    pub fn plane(width: f32, height: f32) -> Self {
        let hw = width * 0.5;
        let hh = height * 0.5;
        let n = [0.0, 0.0, 1.0];

        Self {
            vertices: vec![
                Vertex { position: [-hw, -hh, 0.0], normal: n },
                Vertex { position: [hw, -hh, 0.0], normal: n },
                Vertex { position: [hw, hh, 0.0], normal: n },
                Vertex { position: [-hw, hh, 0.0], normal: n },
            ],
            indices: vec![0, 1, 2, 0, 2, 3],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sphere_has_expected_counts() {
        let m = Mesh::uv_sphere(1.0, 16, 12);
        assert_eq!(m.vertices.len(), 17 * 13);
        // Two triangles per quad, minus one per pole column.
        assert_eq!(m.indices.len() as u32, 16 * (12 * 2 - 2) * 3);
        assert_eq!(m.indices.len() % 3, 0);
    }

    #[test]
    fn sphere_vertices_lie_on_radius() {
        let r = 0.5;
        let m = Mesh::uv_sphere(r, 8, 6);
        for v in &m.vertices {
            let len = (v.position[0].powi(2) + v.position[1].powi(2) + v.position[2].powi(2)).sqrt();
            assert!((len - r).abs() < 1e-5);
        }
    }

    #[test]
    fn sphere_indices_in_bounds() {
        let m = Mesh::uv_sphere(1.0, 5, 4);
        let n = m.vertices.len() as u32;
        assert!(m.indices.iter().all(|&i| i < n));
    }

    #[test]
    fn plane_is_two_triangles() {
        let m = Mesh::plane(2.0, 1.0);
        assert_eq!(m.vertices.len(), 4);
        assert_eq!(m.indices.len(), 6);
        assert!(m.vertices.iter().all(|v| v.position[2] == 0.0));
    }
}
