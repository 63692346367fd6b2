use foundation::math::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_deg: f64,
    pub near: f64,
    pub far: f64,
    /// Where the camera sits before a model has been framed.
    pub initial_position: [f64; 3],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_deg: 75.0,
            near: 0.1,
            far: 1000.0,
            initial_position: [5.0, 5.0, 5.0],
        }
    }
}

/// Right-handed perspective camera looking from `position` at `target`.
#[derive(Debug, Clone, PartialEq)]
pub struct PerspectiveCamera {
    pub fov_deg: f64,
    pub aspect: f64,
    pub near: f64,
    pub far: f64,
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
}

impl PerspectiveCamera {
    pub fn new(config: &CameraConfig, width: u32, height: u32) -> Self {
        Self {
            fov_deg: config.fov_deg,
            aspect: aspect_for(width, height),
            near: config.near,
            far: config.far,
            position: Vec3::from_array(config.initial_position),
            target: Vec3::ZERO,
            up: Vec3::Y,
        }
    }

    pub fn fov_y_rad(&self) -> f64 {
        self.fov_deg.to_radians()
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.aspect = aspect_for(width, height);
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    /// OpenGL depth convention: NDC z in `[-1, 1]`.
    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov_y_rad(), self.aspect, self.near, self.far)
    }

    pub fn view_proj(&self) -> Mat4 {
        self.projection() * self.view()
    }
}

fn aspect_for(width: u32, height: u32) -> f64 {
    if height == 0 {
        1.0
    } else {
        f64::from(width) / f64::from(height)
    }
}

#[cfg(test)]
mod tests {
    use super::{CameraConfig, PerspectiveCamera};
    use foundation::math::Vec3;

    #[test]
    fn defaults_match_tour_camera() {
        let cam = PerspectiveCamera::new(&CameraConfig::default(), 800, 400);
        assert_eq!(cam.fov_deg, 75.0);
        assert_eq!(cam.aspect, 2.0);
        assert_eq!(cam.position, Vec3::new(5.0, 5.0, 5.0));
    }

    #[test]
    fn zero_height_falls_back_to_square() {
        let mut cam = PerspectiveCamera::new(&CameraConfig::default(), 800, 0);
        assert_eq!(cam.aspect, 1.0);
        cam.set_viewport(300, 150);
        assert_eq!(cam.aspect, 2.0);
    }

    #[test]
    fn target_lands_at_ndc_origin() {
        let mut cam = PerspectiveCamera::new(&CameraConfig::default(), 640, 480);
        cam.position = Vec3::new(0.0, 0.0, 10.0);
        let clip = cam.view_proj().transform_point4(Vec3::ZERO);
        assert!((clip[0] / clip[3]).abs() < 1e-12);
        assert!((clip[1] / clip[3]).abs() < 1e-12);
        assert!(clip[2] / clip[3] < 1.0);
    }
}
