use glam::Mat4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraData {
    /// Width over height. Zero means the viewport decides.
    pub aspect: f32,
    /// Vertical field of view in radians. Zero means orthographic.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub view: Mat4,
}

impl CameraData {
    pub fn is_orthographic(&self) -> bool {
        self.fov == 0.0
    }

    /// Projection for a viewport, using the viewport's aspect when none is stored.
    pub fn projection(&self, viewport_aspect: f32) -> Mat4 {
        let aspect = if self.aspect == 0.0 {
            viewport_aspect
        } else {
            self.aspect
        };
        if self.is_orthographic() {
            Mat4::orthographic_rh(-aspect, aspect, -1.0, 1.0, self.near, self.far)
        } else {
            Mat4::perspective_rh(self.fov, aspect, self.near, self.far)
        }
    }
}

impl Default for CameraData {
    fn default() -> Self {
        Self {
            aspect: 0.0,
            fov: 0.0,
            near: 0.1,
            far: 1000.0,
            view: Mat4::IDENTITY,
        }
    }
}
