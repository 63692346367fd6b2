//! Orbit-style camera controller.
//!
//! The camera sits on a sphere around `target`, parameterized by yaw, pitch
//! and distance:
//! - Primary drag rotates, secondary (or middle) drag pans the target.
//! - Wheel dollies exponentially.
//! - With damping enabled, input accumulates as pending motion and each
//!   `update` applies a fraction of it, leaving the rest as inertia.

use std::f64::consts::TAU;

use foundation::math::Vec3;
use serde::{Deserialize, Serialize};

use crate::camera::PerspectiveCamera;

/// Pending motion smaller than this is dropped.
const SETTLE_EPSILON: f64 = 1e-6;

/// Wheel delta (pixels) to log-distance scale.
const WHEEL_ZOOM_SCALE: f64 = 0.001;

/// Reference step the damping factor is expressed against.
const DAMPING_REFERENCE_DT_S: f64 = 1.0 / 60.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlsConfig {
    pub enable_damping: bool,
    /// Fraction of pending motion applied per 1/60 s step.
    pub damping_factor: f64,
    pub rotate_speed: f64,
    pub pan_speed: f64,
    pub zoom_speed: f64,
    pub min_distance: f64,
    pub max_distance: f64,
    pub min_pitch_rad: f64,
    pub max_pitch_rad: f64,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            enable_damping: true,
            damping_factor: 0.05,
            rotate_speed: 1.0,
            pan_speed: 1.0,
            zoom_speed: 1.0,
            min_distance: 0.1,
            max_distance: 5000.0,
            min_pitch_rad: -1.55,
            max_pitch_rad: 1.55,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragButton {
    #[default]
    None,
    Rotate,
    Pan,
}

impl DragButton {
    /// Map a DOM `PointerEvent.button` (0 primary, 1 middle, 2 secondary).
    pub fn from_dom_button(button: i16) -> Self {
        match button {
            1 | 2 => DragButton::Pan,
            _ => DragButton::Rotate,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrbitControls {
    config: ControlsConfig,
    pub target: Vec3,
    pub yaw: f64,
    pub pitch: f64,
    pub distance: f64,
    max_distance: f64,

    pending_yaw: f64,
    pending_pitch: f64,
    pending_pan: Vec3,
    /// Log-space dolly; positive moves away.
    pending_zoom: f64,

    drag: DragButton,
    last_pos_px: [f64; 2],
    viewport_height_px: f64,
    fov_y_rad: f64,
    /// Set when the pose was changed outside of damped motion.
    dirty: bool,
}

impl OrbitControls {
    /// Adopt the camera's current pose.
    pub fn new(config: ControlsConfig, camera: &PerspectiveCamera, viewport_height_px: u32) -> Self {
        let offset = camera.position - camera.target;
        let distance = offset.length().max(config.min_distance);
        let pitch = if distance > 0.0 {
            (offset.y / distance).clamp(-1.0, 1.0).asin()
        } else {
            0.0
        };
        let yaw = offset.z.atan2(offset.x);
        let max_distance = config.max_distance;

        Self {
            config,
            target: camera.target,
            yaw,
            pitch,
            distance,
            max_distance,
            pending_yaw: 0.0,
            pending_pitch: 0.0,
            pending_pan: Vec3::ZERO,
            pending_zoom: 0.0,
            drag: DragButton::None,
            last_pos_px: [0.0, 0.0],
            viewport_height_px: f64::from(viewport_height_px.max(1)),
            fov_y_rad: camera.fov_y_rad(),
            dirty: true,
        }
    }

    pub fn config(&self) -> &ControlsConfig {
        &self.config
    }

    pub fn set_viewport(&mut self, height_px: u32, fov_y_rad: f64) {
        self.viewport_height_px = f64::from(height_px.max(1));
        self.fov_y_rad = fov_y_rad;
    }

    pub fn drag_button(&self) -> DragButton {
        self.drag
    }

    /// Whether motion remains to be applied by `update`.
    pub fn is_settling(&self) -> bool {
        self.pending_yaw != 0.0
            || self.pending_pitch != 0.0
            || self.pending_zoom != 0.0
            || self.pending_pan != Vec3::ZERO
    }

    /// Unit vector from target to camera.
    pub fn direction(&self) -> Vec3 {
        let (sy, cy) = self.yaw.sin_cos();
        let (sp, cp) = self.pitch.sin_cos();
        Vec3::new(cp * cy, sp, cp * sy)
    }

    pub fn eye(&self) -> Vec3 {
        self.target + self.direction().scale(self.distance)
    }

    /// Jump to a new target and distance, dropping any pending motion.
    ///
    /// The distance limit widens when a model needs more room than configured.
    pub fn frame(&mut self, target: Vec3, distance: f64) {
        self.target = target;
        self.max_distance = self.config.max_distance.max(distance * 4.0);
        self.distance = distance.clamp(self.config.min_distance, self.max_distance);
        self.pending_yaw = 0.0;
        self.pending_pitch = 0.0;
        self.pending_pan = Vec3::ZERO;
        self.pending_zoom = 0.0;
        self.dirty = true;
    }

    /// Write the current orbit pose into `camera` without advancing damping.
    pub fn apply(&mut self, camera: &mut PerspectiveCamera) {
        camera.position = self.eye();
        camera.target = self.target;
        self.dirty = false;
    }

    /// Rotate the orbit in radians; used for programmatic moves.
    pub fn rotate_by(&mut self, d_yaw: f64, d_pitch: f64) {
        self.pending_yaw += d_yaw;
        self.pending_pitch += d_pitch;
    }

    pub fn on_pointer_down(&mut self, pos_px: [f64; 2], button: DragButton) {
        self.drag = button;
        self.last_pos_px = pos_px;
    }

    pub fn on_pointer_move(&mut self, pos_px: [f64; 2]) {
        if self.drag == DragButton::None {
            return;
        }
        let dx = pos_px[0] - self.last_pos_px[0];
        let dy = pos_px[1] - self.last_pos_px[1];
        self.last_pos_px = pos_px;

        match self.drag {
            DragButton::Rotate => {
                let k = TAU / self.viewport_height_px * self.config.rotate_speed;
                self.pending_yaw += dx * k;
                self.pending_pitch += dy * k;
            }
            DragButton::Pan => {
                let world_per_px = self.distance * (0.5 * self.fov_y_rad).tan() * 2.0
                    / self.viewport_height_px
                    * self.config.pan_speed;
                let (right, up) = self.screen_axes();
                self.pending_pan =
                    self.pending_pan + right.scale(-dx * world_per_px) + up.scale(dy * world_per_px);
            }
            DragButton::None => {}
        }
    }

    pub fn on_pointer_up(&mut self) {
        self.drag = DragButton::None;
    }

    /// Positive `delta_y` (scroll down) moves the camera away.
    pub fn on_wheel(&mut self, delta_y: f64) {
        if !delta_y.is_finite() {
            return;
        }
        self.pending_zoom += delta_y * WHEEL_ZOOM_SCALE * self.config.zoom_speed;
    }

    /// Advance damping/inertia and write the pose into `camera`.
    ///
    /// Returns whether the camera moved.
    pub fn update(&mut self, dt_s: f64, camera: &mut PerspectiveCamera) -> bool {
        let fraction = if self.config.enable_damping {
            let steps = dt_s.max(DAMPING_REFERENCE_DT_S) / DAMPING_REFERENCE_DT_S;
            1.0 - (1.0 - self.config.damping_factor.clamp(0.0, 1.0)).powf(steps)
        } else {
            1.0
        };

        let moving = self.is_settling();
        if moving {
            let d_yaw = take_fraction(&mut self.pending_yaw, fraction);
            let d_pitch = take_fraction(&mut self.pending_pitch, fraction);
            let d_zoom = take_fraction(&mut self.pending_zoom, fraction);
            let pan = self.pending_pan.scale(fraction);
            self.pending_pan = self.pending_pan - pan;
            if self.pending_pan.length() < SETTLE_EPSILON {
                self.pending_pan = Vec3::ZERO;
            }

            self.yaw += d_yaw;
            self.pitch =
                (self.pitch + d_pitch).clamp(self.config.min_pitch_rad, self.config.max_pitch_rad);
            self.distance = (self.distance * d_zoom.exp())
                .clamp(self.config.min_distance, self.max_distance);
            self.target = self.target + pan;
        }

        if !moving && !self.dirty {
            return false;
        }
        self.dirty = false;

        let eye = self.eye();
        let changed = camera.position != eye || camera.target != self.target;
        camera.position = eye;
        camera.target = self.target;
        changed
    }

    fn screen_axes(&self) -> (Vec3, Vec3) {
        let forward = self.direction().scale(-1.0);
        let right = forward.cross(Vec3::Y).normalize();
        let up = right.cross(forward).normalize();
        (right, up)
    }
}

fn take_fraction(pending: &mut f64, fraction: f64) -> f64 {
    let step = *pending * fraction;
    *pending -= step;
    if pending.abs() < SETTLE_EPSILON {
        let rest = *pending;
        *pending = 0.0;
        return step + rest;
    }
    step
}
