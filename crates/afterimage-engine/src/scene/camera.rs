use glam::{Mat4, Vec2, Vec3};

use crate::picking::Ray;

/// Perspective camera.
///
/// Projection uses a 0..1 depth range (wgpu convention, `Mat4::perspective_rh`).
#[derive(Debug, Copy, Clone)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,

    /// Vertical field of view in degrees.
    pub fov_y_deg: f32,
    pub z_near: f32,
    pub z_far: f32,
}

impl Camera {
    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    pub fn projection(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(
            self.fov_y_deg.to_radians(),
            aspect.max(f32::EPSILON),
            self.z_near,
            self.z_far,
        )
    }

    pub fn view_proj(&self, aspect: f32) -> Mat4 {
        self.projection(aspect) * self.view()
    }

    /// Casts a ray from the eye through a point given in normalized device
    /// coordinates ([-1, 1], y up).
    pub fn ray_through_ndc(&self, ndc: Vec2, aspect: f32) -> Ray {
        let inv = self.view_proj(aspect).inverse();

        // Unproject onto the near and far planes (NDC depth 0 and 1).
        let near = inv.project_point3(Vec3::new(ndc.x, ndc.y, 0.0));
        let far = inv.project_point3(Vec3::new(ndc.x, ndc.y, 1.0));

        Ray {
            origin: near,
            dir: (far - near).normalize(),
        }
    }
}

impl Default for Camera {
    fn default() -> Self {
        // Matches the viewer's sketch framing: short pull-back on +Z with a
        // narrow vertical FOV.
        Self {
            eye: Vec3::new(0.0, 0.0, 2.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov_y_deg: 40.0,
            z_near: 0.1,
            z_far: 100.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_ray_points_at_target() {
        let cam = Camera::default();
        let ray = cam.ray_through_ndc(Vec2::ZERO, 16.0 / 9.0);

        let to_target = (cam.target - cam.eye).normalize();
        assert!(ray.dir.dot(to_target) > 0.999);
    }

    #[test]
    fn center_ray_origin_is_near_the_eye() {
        let cam = Camera::default();
        let ray = cam.ray_through_ndc(Vec2::ZERO, 1.0);

        // Origin sits on the near plane in front of the eye.
        assert!((ray.origin - cam.eye).length() <= cam.z_near * 1.5);
    }

    #[test]
    fn right_edge_ray_leans_right() {
        let cam = Camera::default();
        let ray = cam.ray_through_ndc(Vec2::new(1.0, 0.0), 1.0);
        // Camera looks down -Z from +Z, so +X in NDC is +X in world.
        assert!(ray.dir.x > 0.0);
    }
}
