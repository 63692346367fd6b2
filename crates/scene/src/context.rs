//! Scene context: the one owned bundle of camera, controls, lights and render
//! surface for a single viewer instance.
//!
//! The rendering surface and input listeners live behind ports so the same
//! context runs in the browser (wgpu + DOM listeners) and under test.

use foundation::math::{Mat4, Vec3};
use formats::ModelAsset;

use crate::camera::{CameraConfig, PerspectiveCamera};
use crate::controls::{ControlsConfig, OrbitControls};
use crate::lights::LightRig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    /// The host has no container to draw into.
    NoContainer,
    Unsupported(String),
    Gpu(String),
}

impl std::fmt::Display for SurfaceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SurfaceError::NoContainer => write!(f, "no container element"),
            SurfaceError::Unsupported(msg) => write!(f, "rendering unsupported: {msg}"),
            SurfaceError::Gpu(msg) => write!(f, "gpu error: {msg}"),
        }
    }
}

impl std::error::Error for SurfaceError {}

/// What a surface needs to draw one frame.
#[derive(Debug, Clone, Copy)]
pub struct RenderView<'a> {
    pub view_proj: Mat4,
    pub eye: Vec3,
    pub model: Mat4,
    pub lights: &'a LightRig,
    pub viewport: Viewport,
}

pub trait RenderSurface {
    fn resize(&mut self, viewport: Viewport);
    fn upload_model(&mut self, asset: &ModelAsset) -> Result<(), SurfaceError>;
    fn clear_model(&mut self);
    fn render(&mut self, view: &RenderView<'_>);
    /// Release GPU resources and remove the surface from its container.
    fn dispose(&mut self);
}

/// A set of input listeners; `detach` removes them.
pub trait InputBinding {
    fn detach(&mut self);
}

/// The container a scene context renders into.
pub trait SurfaceHost {
    /// Current container size, or `None` when there is no container.
    fn size(&self) -> Option<Viewport>;

    fn attach_surface(
        &mut self,
        viewport: Viewport,
    ) -> Result<Box<dyn RenderSurface>, SurfaceError>;
}

pub struct SceneContext {
    camera: PerspectiveCamera,
    controls: OrbitControls,
    lights: LightRig,
    viewport: Viewport,
    surface: Option<Box<dyn RenderSurface>>,
    input: Option<Box<dyn InputBinding>>,
    model_transform: Mat4,
    has_model: bool,
    disposed: bool,
}

impl std::fmt::Debug for SceneContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneContext")
            .field("camera", &self.camera)
            .field("viewport", &self.viewport)
            .field("has_surface", &self.surface.is_some())
            .field("has_input", &self.input.is_some())
            .field("has_model", &self.has_model)
            .field("disposed", &self.disposed)
            .finish()
    }
}

impl SceneContext {
    /// Build camera, controls and lights and attach a surface to the host.
    ///
    /// Returns `None` when the host has no container. A surface that fails to
    /// attach leaves a context without a surface; rendering is then skipped
    /// and `dispose` still works.
    pub fn initialize(
        host: &mut dyn SurfaceHost,
        camera_config: &CameraConfig,
        controls_config: ControlsConfig,
    ) -> Option<Self> {
        let viewport = host.size()?;

        let camera = PerspectiveCamera::new(camera_config, viewport.width, viewport.height);
        let controls = OrbitControls::new(controls_config, &camera, viewport.height);

        let surface = match host.attach_surface(viewport) {
            Ok(surface) => Some(surface),
            Err(e) => {
                tracing::warn!(error = %e, "scene surface unavailable; continuing without rendering");
                None
            }
        };

        Some(Self {
            camera,
            controls,
            lights: LightRig::standard(),
            viewport,
            surface,
            input: None,
            model_transform: Mat4::IDENTITY,
            has_model: false,
            disposed: false,
        })
    }

    /// Replaces (and detaches) any previous binding.
    pub fn attach_input(&mut self, mut input: Box<dyn InputBinding>) {
        if self.disposed {
            input.detach();
            return;
        }
        if let Some(mut old) = self.input.replace(input) {
            old.detach();
        }
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut PerspectiveCamera {
        &mut self.camera
    }

    pub fn controls(&self) -> &OrbitControls {
        &self.controls
    }

    pub fn controls_mut(&mut self) -> &mut OrbitControls {
        &mut self.controls
    }

    pub fn lights(&self) -> &LightRig {
        &self.lights
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn has_surface(&self) -> bool {
        self.surface.is_some()
    }

    pub fn has_model(&self) -> bool {
        self.has_model
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn resize(&mut self, viewport: Viewport) {
        if self.disposed {
            return;
        }
        self.viewport = viewport;
        self.camera.set_viewport(viewport.width, viewport.height);
        self.controls.set_viewport(viewport.height, self.camera.fov_y_rad());
        if let Some(surface) = self.surface.as_mut() {
            surface.resize(viewport);
        }
    }

    /// Advance damping/inertia by `dt_s`. Returns whether the camera moved.
    pub fn update_controls(&mut self, dt_s: f64) -> bool {
        if self.disposed {
            return false;
        }
        self.controls.update(dt_s, &mut self.camera)
    }

    /// Point the camera at `target` from `distance` right away, so anything
    /// projected before the next frame already sees the framed pose.
    pub fn frame_camera(&mut self, target: Vec3, distance: f64, far: f64) {
        if self.disposed {
            return;
        }
        self.camera.far = far;
        self.controls.frame(target, distance);
        self.controls.apply(&mut self.camera);
    }

    /// Show `asset` translated by `offset`, replacing any previous model.
    pub fn set_model(&mut self, asset: &ModelAsset, offset: Vec3) -> Result<(), SurfaceError> {
        if self.disposed {
            return Ok(());
        }
        self.clear_model();
        self.model_transform = Mat4::translation(offset);
        if let Some(surface) = self.surface.as_mut() {
            surface.upload_model(asset)?;
        }
        self.has_model = true;
        Ok(())
    }

    pub fn clear_model(&mut self) {
        if !self.has_model {
            return;
        }
        if let Some(surface) = self.surface.as_mut() {
            surface.clear_model();
        }
        self.model_transform = Mat4::IDENTITY;
        self.has_model = false;
    }

    pub fn render(&mut self) {
        if self.disposed {
            return;
        }
        let view = RenderView {
            view_proj: self.camera.view_proj(),
            eye: self.camera.position,
            model: self.model_transform,
            lights: &self.lights,
            viewport: self.viewport,
        };
        if let Some(surface) = self.surface.as_mut() {
            surface.render(&view);
        }
    }

    /// Detach input, drop the model and release the surface. Idempotent.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        if let Some(mut input) = self.input.take() {
            input.detach();
        }
        self.clear_model();
        if let Some(mut surface) = self.surface.take() {
            surface.dispose();
        }
        self.disposed = true;
    }
}

impl Drop for SceneContext {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::{
        InputBinding, RenderSurface, RenderView, SceneContext, SurfaceError, SurfaceHost, Viewport,
    };
    use crate::camera::CameraConfig;
    use crate::controls::ControlsConfig;
    use formats::ModelAsset;
    use foundation::bounds::Aabb3;
    use foundation::math::Vec3;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    struct FakeSurface(Log);

    impl RenderSurface for FakeSurface {
        fn resize(&mut self, v: Viewport) {
            self.0.borrow_mut().push(format!("resize {}x{}", v.width, v.height));
        }
        fn upload_model(&mut self, asset: &ModelAsset) -> Result<(), SurfaceError> {
            self.0.borrow_mut().push(format!("upload {}", asset.meshes.len()));
            Ok(())
        }
        fn clear_model(&mut self) {
            self.0.borrow_mut().push("clear".into());
        }
        fn render(&mut self, view: &RenderView<'_>) {
            self.0
                .borrow_mut()
                .push(format!("render {}x{}", view.viewport.width, view.viewport.height));
        }
        fn dispose(&mut self) {
            self.0.borrow_mut().push("dispose".into());
        }
    }

    struct FakeInput(Log);

    impl InputBinding for FakeInput {
        fn detach(&mut self) {
            self.0.borrow_mut().push("detach".into());
        }
    }

    struct FakeHost {
        size: Option<Viewport>,
        fail_surface: bool,
        log: Log,
    }

    impl SurfaceHost for FakeHost {
        fn size(&self) -> Option<Viewport> {
            self.size
        }
        fn attach_surface(&mut self, _: Viewport) -> Result<Box<dyn RenderSurface>, SurfaceError> {
            if self.fail_surface {
                return Err(SurfaceError::Unsupported("no webgl".into()));
            }
            Ok(Box::new(FakeSurface(self.log.clone())))
        }
    }

    fn host(size: Option<Viewport>, fail_surface: bool) -> FakeHost {
        FakeHost {
            size,
            fail_surface,
            log: Rc::new(RefCell::new(Vec::new())),
        }
    }

    fn empty_asset() -> ModelAsset {
        ModelAsset {
            meshes: Vec::new(),
            bounds: Aabb3::new([0.0; 3], [1.0; 3]),
            skipped_primitives: 0,
        }
    }

    #[test]
    fn absent_container_is_a_no_op() {
        let mut h = host(None, false);
        assert!(
            SceneContext::initialize(&mut h, &CameraConfig::default(), ControlsConfig::default())
                .is_none()
        );
        assert!(h.log.borrow().is_empty());
    }

    #[test]
    fn resize_updates_camera_and_surface() {
        let mut h = host(Some(Viewport::new(800, 600)), false);
        let mut ctx =
            SceneContext::initialize(&mut h, &CameraConfig::default(), ControlsConfig::default())
                .expect("ctx");
        ctx.resize(Viewport::new(1000, 500));
        ctx.resize(Viewport::new(1000, 500));
        assert_eq!(ctx.camera().aspect, 2.0);
        assert_eq!(ctx.viewport(), Viewport::new(1000, 500));
        ctx.render();
        assert_eq!(
            *h.log.borrow(),
            vec!["resize 1000x500", "resize 1000x500", "render 1000x500"]
        );
    }

    #[test]
    fn dispose_detaches_and_releases_once() {
        let mut h = host(Some(Viewport::new(10, 10)), false);
        let mut ctx =
            SceneContext::initialize(&mut h, &CameraConfig::default(), ControlsConfig::default())
                .expect("ctx");
        ctx.attach_input(Box::new(FakeInput(h.log.clone())));
        ctx.set_model(&empty_asset(), Vec3::ZERO).expect("model");
        ctx.dispose();
        ctx.dispose();
        drop(ctx);
        assert_eq!(*h.log.borrow(), vec!["upload 0", "detach", "clear", "dispose"]);
    }

    #[test]
    fn failed_surface_still_initializes_and_disposes() {
        let mut h = host(Some(Viewport::new(10, 10)), true);
        let mut ctx =
            SceneContext::initialize(&mut h, &CameraConfig::default(), ControlsConfig::default())
                .expect("ctx");
        assert!(!ctx.has_surface());
        ctx.render();
        ctx.set_model(&empty_asset(), Vec3::ZERO).expect("model");
        assert!(ctx.has_model());
        ctx.dispose();
        assert!(ctx.is_disposed());
    }

    #[test]
    fn framing_moves_camera_before_next_frame() {
        let mut h = host(Some(Viewport::new(800, 600)), false);
        let mut ctx =
            SceneContext::initialize(&mut h, &CameraConfig::default(), ControlsConfig::default())
                .expect("ctx");
        let before = ctx.camera().view_proj();
        ctx.frame_camera(Vec3::new(0.0, 1.0, 0.0), 300.0, 5000.0);

        assert_eq!(ctx.camera().target, Vec3::new(0.0, 1.0, 0.0));
        assert!(((ctx.camera().position - ctx.camera().target).length() - 300.0).abs() < 1e-6);
        assert_eq!(ctx.camera().far, 5000.0);
        assert_ne!(ctx.camera().view_proj(), before);
        // Nothing left for the controls to apply.
        assert!(!ctx.update_controls(1.0 / 60.0));
    }

    #[test]
    fn replacing_model_clears_previous() {
        let mut h = host(Some(Viewport::new(10, 10)), false);
        let mut ctx =
            SceneContext::initialize(&mut h, &CameraConfig::default(), ControlsConfig::default())
                .expect("ctx");
        ctx.set_model(&empty_asset(), Vec3::ZERO).expect("model");
        ctx.set_model(&empty_asset(), Vec3::new(1.0, 0.0, 0.0)).expect("model");
        assert_eq!(*h.log.borrow(), vec!["upload 0", "clear", "upload 0"]);
    }
}
