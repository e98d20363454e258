//! Fixed perspective camera looking at the plane.

use glam::{Mat4, Vec3};

use crate::params::RenderConfig;

/// Camera on the +Z axis looking at the origin
#[derive(Debug, Clone)]
pub struct PlaneCamera {
    fov_degrees: f32,
    distance: f32,
    near: f32,
    far: f32,
}

impl PlaneCamera {
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            fov_degrees: config.fov_degrees,
            distance: config.camera_distance,
            near: config.near_plane,
            far: config.far_plane,
        }
    }

    /// View-projection matrix for a surface of the given aspect ratio
    pub fn view_proj(&self, aspect: f32) -> Mat4 {
        let eye = Vec3::new(0.0, 0.0, self.distance);
        let view = Mat4::look_at_rh(eye, Vec3::ZERO, Vec3::Y);
        let proj = Mat4::perspective_rh(self.fov_degrees.to_radians(), aspect, self.near, self.far);
        proj * view
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn test_origin_projects_to_center() {
        let camera = PlaneCamera::new(&RenderConfig::default());
        let clip = camera.view_proj(1.0) * Vec4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip / clip.w;

        assert!(ndc.x.abs() < 1e-5);
        assert!(ndc.y.abs() < 1e-5);
        assert!((0.0..=1.0).contains(&ndc.z));
    }

    #[test]
    fn test_default_plane_fits_in_view() {
        let config = RenderConfig::default();
        let camera = PlaneCamera::new(&config);
        let half = config.plane_scale / 2.0;
        let clip = camera.view_proj(1.0) * Vec4::new(half, half, 0.0, 1.0);
        let ndc = clip / clip.w;

        assert!(ndc.x > 0.0 && ndc.x < 1.0);
        assert!(ndc.y > 0.0 && ndc.y < 1.0);
    }
}
