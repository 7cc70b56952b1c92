use glam::Vec3;

/// A ray with a normalized direction.
#[derive(Debug, Copy, Clone)]
pub struct Ray {
    pub origin: Vec3,
    pub dir: Vec3,
}

/// An infinite plane `normal . x = offset`.
#[derive(Debug, Copy, Clone)]
pub struct Plane {
    pub normal: Vec3,
    pub offset: f32,
}

impl Plane {
    pub fn new(normal: Vec3, offset: f32) -> Self {
        let normal = normal.normalize();
        Self { normal, offset }
    }

    /// The plane through `point` with the given normal.
    pub fn from_point(normal: Vec3, point: Vec3) -> Self {
        let normal = normal.normalize();
        Self {
            normal,
            offset: normal.dot(point),
        }
    }
}

impl Ray {
    /// Intersects the ray with a plane.
    ///
    /// Returns `None` when the ray is parallel to the plane or the hit lies
    /// behind the origin. Both are expected, frequent cases for pointer
    /// picking, not errors.
    pub fn intersect_plane(&self, plane: Plane) -> Option<Vec3> {
        let denom = plane.normal.dot(self.dir);
        if denom.abs() < 1e-6 {
            return None;
        }

        let t = (plane.offset - plane.normal.dot(self.origin)) / denom;
        if t < 0.0 {
            return None;
        }

        Some(self.origin + self.dir * t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hits_plane_straight_on() {
        let ray = Ray {
            origin: Vec3::new(0.0, 0.0, 2.0),
            dir: Vec3::new(0.0, 0.0, -1.0),
        };
        let plane = Plane::new(Vec3::Z, 0.0);

        let hit = ray.intersect_plane(plane).unwrap();
        assert!(hit.abs_diff_eq(Vec3::ZERO, 1e-6));
    }

    #[test]
    fn oblique_hit_lands_on_plane() {
        let ray = Ray {
            origin: Vec3::new(0.0, 1.0, 2.0),
            dir: Vec3::new(0.3, -0.1, -1.0).normalize(),
        };
        let plane = Plane::new(Vec3::Z, 0.0);

        let hit = ray.intersect_plane(plane).unwrap();
        assert!(hit.z.abs() < 1e-5);
    }

    #[test]
    fn parallel_ray_misses() {
        let ray = Ray {
            origin: Vec3::new(0.0, 0.0, 2.0),
            dir: Vec3::X,
        };
        let plane = Plane::new(Vec3::Z, 0.0);

        assert!(ray.intersect_plane(plane).is_none());
    }

    #[test]
    fn hit_behind_origin_misses() {
        let ray = Ray {
            origin: Vec3::new(0.0, 0.0, 2.0),
            dir: Vec3::Z, // facing away from the plane
        };
        let plane = Plane::new(Vec3::Z, 0.0);

        assert!(ray.intersect_plane(plane).is_none());
    }

    #[test]
    fn from_point_matches_offset_form() {
        let a = Plane::new(Vec3::Y, 3.0);
        let b = Plane::from_point(Vec3::Y, Vec3::new(7.0, 3.0, -2.0));
        assert!((a.offset - b.offset).abs() < 1e-6);
    }
}
