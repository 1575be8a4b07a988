//! Perspective camera and pointer rays.

use glam::{Mat4, Vec2, Vec3};

use crate::picking::Ray;

/// A right-handed perspective camera looking at a target.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Eye position.
    pub position: Vec3,
    /// Look-at target.
    pub target: Vec3,
    /// Up direction.
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    /// Width / height.
    pub aspect: f32,
    /// Near clip distance.
    pub near: f32,
    /// Far clip distance.
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 1.6, 1.8),
            target: Vec3::new(0.0, 0.75, 0.0),
            up: Vec3::Y,
            fov_y: 50.0f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 0.01,
            far: 100.0,
        }
    }
}

impl Camera {
    /// View matrix.
    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    /// Projection matrix.
    #[must_use]
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }

    /// Update the aspect ratio from a viewport size.
    #[allow(clippy::cast_precision_loss)]
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    /// World-space ray through a pointer in normalized device coordinates
    /// (`x`, `y` in `[-1, 1]`, `y` up).
    #[must_use]
    pub fn ray_from_ndc(&self, ndc: Vec2) -> Ray {
        let inverse = (self.projection_matrix() * self.view_matrix()).inverse();
        let near = inverse.project_point3(ndc.extend(0.0));
        let far = inverse.project_point3(ndc.extend(1.0));
        Ray::new(near, far - near)
    }

    /// Look at the center of a box from far enough along +Z to see all of it.
    pub fn frame_bounds(&mut self, min: Vec3, max: Vec3) {
        let center = (min + max) * 0.5;
        let max_dim = (max - min).max_element();
        let distance = (max_dim / (2.0 * (self.fov_y / 2.0).tan())).abs() * 1.5;
        self.target = center;
        self.position = center + Vec3::Z * distance.max(self.near * 2.0);
    }

    /// Rotate the eye around the target by yaw (about +Y) and pitch, in radians.
    pub fn orbit(&mut self, yaw: f32, pitch: f32) {
        let offset = self.position - self.target;
        let radius = offset.length();
        if radius <= f32::EPSILON {
            return;
        }
        let current_pitch = (offset.y / radius).asin();
        let current_yaw = offset.x.atan2(offset.z);
        let limit = 89.0f32.to_radians();
        let new_pitch = (current_pitch + pitch).clamp(-limit, limit);
        let new_yaw = current_yaw + yaw;
        self.position = self.target
            + Vec3::new(
                radius * new_pitch.cos() * new_yaw.sin(),
                radius * new_pitch.sin(),
                radius * new_pitch.cos() * new_yaw.cos(),
            );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_ray_points_at_target() {
        let camera = Camera::default();
        let ray = camera.ray_from_ndc(Vec2::ZERO);
        let expected = (camera.target - camera.position).normalize();
        assert!(ray.direction.dot(expected) > 0.9999);
    }

    #[test]
    fn test_frame_bounds() {
        let mut camera = Camera::default();
        camera.frame_bounds(Vec3::new(-1.0, 0.0, -0.5), Vec3::new(1.0, 1.0, 0.5));
        assert_eq!(camera.target, Vec3::new(0.0, 0.5, 0.0));
        let expected = 2.0 / (2.0 * 25.0f32.to_radians().tan()) * 1.5;
        assert!((camera.position.z - expected).abs() < 1e-4);
    }

    #[test]
    fn test_orbit_keeps_distance() {
        let mut camera = Camera::default();
        let distance = camera.position.distance(camera.target);
        camera.orbit(0.5, 0.2);
        assert!((camera.position.distance(camera.target) - distance).abs() < 1e-4);
    }
}
