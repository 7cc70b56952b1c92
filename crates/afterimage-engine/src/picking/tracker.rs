use glam::Vec2;

use crate::core::FrameState;
use crate::scene::{Camera, NodeId, Scene};

use super::ray::Plane;

/// Converts a pointer position in physical pixels to normalized device
/// coordinates in [-1, 1], y up.
pub fn pointer_ndc(pos: (f32, f32), viewport: (u32, u32)) -> Vec2 {
    let w = viewport.0.max(1) as f32;
    let h = viewport.1.max(1) as f32;

    Vec2::new(
        (pos.0 / w) * 2.0 - 1.0,
        1.0 - (pos.1 / h) * 2.0, // window y points down, NDC y points up
    )
}

/// Moves a marker node to the pointer's projection on a fixed picking plane.
///
/// The plane is invisible; it exists only as the intersection target. When
/// the ray misses (parallel, or hit behind the camera) the marker keeps its
/// last position.
#[derive(Debug, Copy, Clone)]
pub struct PointerTracker {
    pub plane: Plane,
    marker: NodeId,
}

impl PointerTracker {
    pub fn new(plane: Plane, marker: NodeId) -> Self {
        Self { plane, marker }
    }

    /// Updates `pointer_ndc` and, on a plane hit, `marker_position` plus the
    /// marker node's translation.
    pub fn update(
        &self,
        state: &mut FrameState,
        scene: &mut Scene,
        camera: &Camera,
        aspect: f32,
        pointer_px: (f32, f32),
        viewport: (u32, u32),
    ) {
        let ndc = pointer_ndc(pointer_px, viewport);
        state.pointer_ndc = ndc;

        let ray = camera.ray_through_ndc(ndc, aspect);
        if let Some(hit) = ray.intersect_plane(self.plane) {
            state.marker_position = hit;
            scene.node_mut(self.marker).translation = hit;
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use crate::scene::{Mesh, Node};

    use super::*;

    fn marker_scene() -> (Scene, NodeId) {
        let mut scene = Scene::new();
        let id = scene.push(Node::new(Mesh::uv_sphere(1.0, 8, 6)).with_scale(0.1));
        (scene, id)
    }

    #[test]
    fn ndc_corners() {
        let vp = (800, 600);
        assert_eq!(pointer_ndc((0.0, 0.0), vp), Vec2::new(-1.0, 1.0));
        assert_eq!(pointer_ndc((800.0, 600.0), vp), Vec2::new(1.0, -1.0));
        assert_eq!(pointer_ndc((400.0, 300.0), vp), Vec2::ZERO);
    }

    #[test]
    fn center_pointer_lands_on_plane_origin() {
        let (mut scene, marker) = marker_scene();
        let tracker = PointerTracker::new(Plane::new(Vec3::Z, 0.0), marker);
        let camera = Camera::default();
        let mut state = FrameState::default();

        tracker.update(&mut state, &mut scene, &camera, 1.0, (400.0, 300.0), (800, 600));

        assert!(state.marker_position.abs_diff_eq(Vec3::ZERO, 1e-4));
        assert!(scene.node(marker).translation.abs_diff_eq(Vec3::ZERO, 1e-4));
    }

    #[test]
    fn hit_point_lies_on_the_plane() {
        let (mut scene, marker) = marker_scene();
        let tracker = PointerTracker::new(Plane::new(Vec3::Z, 0.0), marker);
        let camera = Camera::default();
        let mut state = FrameState::default();

        tracker.update(&mut state, &mut scene, &camera, 1.6, (123.0, 456.0), (800, 600));

        assert!(state.marker_position.z.abs() < 1e-4);
        // Pointer left of center maps to negative world x for a camera on +Z.
        assert!(state.marker_position.x < 0.0);
    }

    #[test]
    fn miss_leaves_marker_unchanged() {
        let (mut scene, marker) = marker_scene();
        // Plane parallel to every camera ray through the horizon: use a plane
        // behind the camera instead, which every forward ray misses.
        let tracker = PointerTracker::new(Plane::new(Vec3::Z, 10.0), marker);
        let camera = Camera::default(); // eye at z=2 looking at -Z
        let mut state = FrameState::default();

        scene.node_mut(marker).translation = Vec3::new(5.0, 5.0, 0.0);
        state.marker_position = Vec3::new(5.0, 5.0, 0.0);

        tracker.update(&mut state, &mut scene, &camera, 1.0, (10.0, 10.0), (800, 600));

        assert_eq!(state.marker_position, Vec3::new(5.0, 5.0, 0.0));
        assert_eq!(scene.node(marker).translation, Vec3::new(5.0, 5.0, 0.0));
        // NDC still tracks the pointer even on a miss.
        assert!(state.pointer_ndc.x < -0.9);
    }
}
