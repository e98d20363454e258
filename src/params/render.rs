//! Window, camera and distortion configuration.

/// Rendering configuration
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Window width (pixels)
    pub window_width: u32,

    /// Window height (pixels)
    pub window_height: u32,

    /// Side length of the square plane (world units)
    pub plane_scale: f32,

    /// Vertical field of view (degrees)
    pub fov_degrees: f32,

    /// Camera distance from the plane along +Z (world units)
    pub camera_distance: f32,

    /// Near clipping plane (world units)
    pub near_plane: f32,

    /// Far clipping plane (world units)
    pub far_plane: f32,

    /// UV displacement per unit of band energy
    /// Band values reach 255, so 0.001 shifts UVs by at most ~0.25 * radius.
    pub intensity: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            window_width: 900,
            window_height: 900,
            plane_scale: 5.0,
            fov_degrees: 75.0,
            camera_distance: 5.0,
            near_plane: 0.1,
            far_plane: 1000.0,
            intensity: 0.001,
        }
    }
}
