//! A floor view: one model, its hotspots and the loop that keeps them in
//! sync with the camera.
//!
//! `FloorView` performs no I/O. Fetches it wants started are queued as
//! [`FetchRequest`]s for the host, which reports back through
//! `on_fetch_progress` / `on_fetch_result`. Each frame runs controls,
//! render and projection in that order.

use formats::ModelAsset;
use foundation::time::Time;
use hotspots::{AnchorInput, HotspotProjector, ScreenAnchor, TargetNavigator};
use runtime::{Event, EventBus, FrameLoop, LoopState, TickScheduler};
use scene::{DragButton, InputBinding, SceneContext, SurfaceHost, Viewport, compute_framing};
use streaming::{AttemptTicket, FetchRequest, LoadState, LoadStep, ModelLoader, RetryError};

use crate::config::ViewerConfig;
use crate::events::ViewerEvent;

pub struct FloorView {
    config: ViewerConfig,
    context: Option<SceneContext>,
    loader: ModelLoader,
    projector: HotspotProjector,
    frame_loop: FrameLoop,
    navigator: TargetNavigator,
    events: EventBus<ViewerEvent>,
    fetches: Vec<FetchRequest>,
    frame_index: u64,
}

impl std::fmt::Debug for FloorView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FloorView")
            .field("mounted", &self.context.is_some())
            .field("load_state", self.loader.state())
            .field("anchors", &self.projector.len())
            .field("loop", &self.frame_loop.state())
            .finish()
    }
}

impl FloorView {
    pub fn new(config: ViewerConfig, target: Option<&str>) -> Self {
        let loader = ModelLoader::new(config.loading.clone());
        let navigator = TargetNavigator::new(target, config.navigation.scroll_delay_ms);
        Self {
            config,
            context: None,
            loader,
            projector: HotspotProjector::new(),
            frame_loop: FrameLoop::new(),
            navigator,
            events: EventBus::new(),
            fetches: Vec::new(),
            frame_index: 0,
        }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn is_mounted(&self) -> bool {
        self.context.is_some()
    }

    pub fn context(&self) -> Option<&SceneContext> {
        self.context.as_ref()
    }

    pub fn load_state(&self) -> &LoadState {
        self.loader.state()
    }

    pub fn loader(&self) -> &ModelLoader {
        &self.loader
    }

    pub fn loop_state(&self) -> LoopState {
        self.frame_loop.state()
    }

    pub fn projector(&self) -> &HotspotProjector {
        &self.projector
    }

    /// Build the scene, start the loop and begin loading `source`.
    ///
    /// Returns `false` (and does nothing) when the host has no container or
    /// the view is already mounted.
    pub fn mount(
        &mut self,
        host: &mut dyn SurfaceHost,
        scheduler: &mut dyn TickScheduler,
        source: &str,
        fallbacks: &[String],
        now: Time,
    ) -> bool {
        if self.context.is_some() {
            return false;
        }
        let Some(context) =
            SceneContext::initialize(host, &self.config.camera, self.config.controls.clone())
        else {
            tracing::debug!("floor view not mounted: no container");
            return false;
        };
        self.context = Some(context);
        self.frame_loop.start(scheduler);
        self.begin_load(source, fallbacks, now);
        true
    }

    pub fn attach_input(&mut self, binding: Box<dyn InputBinding>) {
        match self.context.as_mut() {
            Some(ctx) => ctx.attach_input(binding),
            None => {
                let mut binding = binding;
                binding.detach();
            }
        }
    }

    /// Switch to another model. Results for the previous one become stale.
    pub fn set_source(&mut self, source: &str, fallbacks: &[String], now: Time) {
        if self.context.is_none() {
            return;
        }
        self.begin_load(source, fallbacks, now);
    }

    /// Replace the anchor registry.
    pub fn set_anchors(&mut self, anchors: Vec<AnchorInput>) {
        self.projector.set_anchors(anchors);
        self.navigator.apply_highlight(&mut self.projector);
        self.project_now();
    }

    pub fn set_target(&mut self, target: Option<&str>, now: Time) {
        self.navigator.set_target(target);
        self.navigator.apply_highlight(&mut self.projector);
        if self.loader.state().is_loaded() {
            self.navigator.on_loaded(now);
        }
    }

    pub fn target(&self) -> Option<&str> {
        self.navigator.target()
    }

    /// Fetches the host should start, oldest first.
    pub fn drain_fetches(&mut self) -> Vec<FetchRequest> {
        std::mem::take(&mut self.fetches)
    }

    pub fn drain_events(&mut self) -> Vec<Event<ViewerEvent>> {
        self.events.drain()
    }

    pub fn on_fetch_progress(&mut self, ticket: AttemptTicket, loaded: u64, total: Option<u64>) {
        if let Some(percent) = self.loader.on_progress(ticket, loaded, total) {
            self.emit(ViewerEvent::LoadProgress { percent });
        }
    }

    /// Outcome of a fetch the host started. Stale tickets are ignored.
    pub fn on_fetch_result(
        &mut self,
        ticket: AttemptTicket,
        result: Result<ModelAsset, String>,
        now: Time,
    ) {
        if !self.loader.is_current(ticket) {
            tracing::debug!(?ticket, "dropping result for an abandoned load");
            return;
        }
        match result {
            Ok(asset) => self.install_model(ticket, asset, now),
            Err(reason) => self.fail_attempt(ticket, &reason, now),
        }
    }

    /// User-triggered retry after a failed load.
    pub fn retry(&mut self, now: Time) -> Result<(), RetryError> {
        let step = self.loader.retry(now)?;
        if let Some(ctx) = self.context.as_mut() {
            ctx.clear_model();
        }
        self.projector.set_ready(false);
        self.emit(ViewerEvent::LoadStarted {
            source: self.loader.source().to_string(),
            generation: self.loader.generation(),
        });
        self.apply_step(step);
        Ok(())
    }

    /// Run one scheduled frame at host time `now_ms`.
    ///
    /// Returns `false` when no frame ran (stopped, or no tick was pending).
    pub fn tick(&mut self, now_ms: f64, scheduler: &mut dyn TickScheduler) -> bool {
        let now = Time::from_millis(now_ms);
        let Some(frame) = self.frame_loop.begin_tick(now) else {
            return false;
        };
        self.frame_index = frame.index;

        if let Some(ctx) = self.context.as_mut() {
            ctx.update_controls(frame.dt_s);
            ctx.render();
            self.projector
                .project(&ctx.camera().view_proj(), ctx.viewport());
        }

        let timed_out = self.loader.in_flight().map(|r| r.url.clone());
        if let Some(step) = self.loader.check_timeout(now) {
            if let Some(url) = timed_out {
                let reason = format!(
                    "timed out after {} ms",
                    self.config.loading.attempt_timeout_ms
                );
                self.emit(ViewerEvent::AttemptFailed { url, reason });
            }
            self.apply_step(step);
        }

        if let Some(anchor_id) = self.navigator.poll_scroll(now) {
            self.emit(ViewerEvent::ScrollIntoView { anchor_id });
        }

        self.frame_loop.end_tick(scheduler);
        true
    }

    pub fn resize(&mut self, viewport: Viewport) {
        if let Some(ctx) = self.context.as_mut() {
            ctx.resize(viewport);
        }
        self.project_now();
    }

    pub fn pointer_down(&mut self, pos_px: [f64; 2], button: i16) {
        if let Some(ctx) = self.context.as_mut() {
            ctx.controls_mut()
                .on_pointer_down(pos_px, DragButton::from_dom_button(button));
        }
    }

    pub fn pointer_move(&mut self, pos_px: [f64; 2]) {
        if let Some(ctx) = self.context.as_mut() {
            ctx.controls_mut().on_pointer_move(pos_px);
        }
    }

    pub fn pointer_up(&mut self) {
        if let Some(ctx) = self.context.as_mut() {
            ctx.controls_mut().on_pointer_up();
        }
    }

    pub fn wheel(&mut self, delta_y: f64) {
        if let Some(ctx) = self.context.as_mut() {
            ctx.controls_mut().on_wheel(delta_y);
        }
    }

    /// Programmatic orbit, in radians.
    pub fn orbit_by(&mut self, d_yaw: f64, d_pitch: f64) {
        if let Some(ctx) = self.context.as_mut() {
            ctx.controls_mut().rotate_by(d_yaw, d_pitch);
        }
    }

    /// Stop the loop (cancelling the pending tick), then tear the scene down.
    pub fn unmount(&mut self, scheduler: &mut dyn TickScheduler) {
        self.frame_loop.stop(scheduler);
        self.loader.abandon();
        self.projector.set_ready(false);
        self.fetches.clear();
        if let Some(mut ctx) = self.context.take() {
            ctx.dispose();
        }
    }

    pub fn screen_position(&self, id: &str) -> Option<ScreenAnchor> {
        self.projector.screen_position(id)
    }

    pub fn screen_positions(&self) -> Vec<ScreenAnchor> {
        self.projector.screen_positions()
    }

    fn begin_load(&mut self, source: &str, fallbacks: &[String], now: Time) {
        self.fetches.clear();
        if let Some(ctx) = self.context.as_mut() {
            ctx.clear_model();
        }
        self.projector.set_ready(false);
        self.navigator.on_unloaded();
        let step = self.loader.begin(source, fallbacks, now);
        self.emit(ViewerEvent::LoadStarted {
            source: source.to_string(),
            generation: self.loader.generation(),
        });
        self.apply_step(step);
    }

    fn install_model(&mut self, ticket: AttemptTicket, asset: ModelAsset, now: Time) {
        let Some(ctx) = self.context.as_mut() else {
            return;
        };
        let framing = compute_framing(
            &asset.bounds,
            ctx.camera().fov_y_rad(),
            ctx.camera().far,
            &self.config.framing,
        );
        if let Err(e) = ctx.set_model(&asset, framing.model_offset) {
            let reason = format!("model upload failed: {e}");
            self.fail_attempt(ticket, &reason, now);
            return;
        }
        ctx.frame_camera(framing.target, framing.distance, framing.far);

        let url = self
            .loader
            .in_flight()
            .map(|r| r.url.clone())
            .unwrap_or_default();
        if !self.loader.on_attempt_succeeded(ticket, framing.bounds) {
            return;
        }
        self.projector.set_ready(true);
        self.navigator.apply_highlight(&mut self.projector);
        self.project_now();
        self.navigator.on_loaded(now);
        self.emit(ViewerEvent::loaded(url, &framing.bounds));
    }

    fn fail_attempt(&mut self, ticket: AttemptTicket, reason: &str, now: Time) {
        let url = self
            .loader
            .in_flight()
            .map(|r| r.url.clone())
            .unwrap_or_default();
        let Some(step) = self.loader.on_attempt_failed(ticket, reason, now) else {
            return;
        };
        self.emit(ViewerEvent::AttemptFailed {
            url,
            reason: reason.to_string(),
        });
        self.apply_step(step);
    }

    fn apply_step(&mut self, step: LoadStep) {
        match step {
            LoadStep::Fetch(request) => self.fetches.push(request),
            LoadStep::Failed { reason, attempted } => {
                if let Some(ctx) = self.context.as_mut() {
                    ctx.clear_model();
                }
                self.emit(ViewerEvent::LoadFailed {
                    reason,
                    attempted,
                    retries_remaining: self.loader.retries_remaining(),
                });
            }
        }
    }

    /// Projection outside the frame loop, for resize and registry changes.
    fn project_now(&mut self) {
        if let Some(ctx) = self.context.as_ref() {
            self.projector
                .project(&ctx.camera().view_proj(), ctx.viewport());
        }
    }

    fn emit(&mut self, event: ViewerEvent) {
        self.events.emit(self.frame_index, event);
    }
}

#[cfg(test)]
mod tests {
    use super::FloorView;
    use crate::config::ViewerConfig;
    use crate::events::ViewerEvent;
    use formats::{MeshData, ModelAsset};
    use foundation::bounds::Aabb3;
    use foundation::math::Vec3;
    use foundation::time::Time;
    use hotspots::{AnchorContent, AnchorInput, AnchorState, project_point};
    use pretty_assertions::assert_eq;
    use runtime::{LoopState, TickHandle, TickScheduler};
    use scene::{RenderSurface, RenderView, SurfaceError, SurfaceHost, Viewport};
    use std::cell::RefCell;
    use std::rc::Rc;
    use streaming::{FetchRequest, LoadState, RetryError};

    #[derive(Default)]
    struct Scheduler {
        next: i32,
        cancelled: Vec<TickHandle>,
    }

    impl TickScheduler for Scheduler {
        fn request_tick(&mut self) -> Option<TickHandle> {
            self.next += 1;
            Some(TickHandle(self.next))
        }
        fn cancel_tick(&mut self, handle: TickHandle) {
            self.cancelled.push(handle);
        }
    }

    struct Surface(Rc<RefCell<Vec<&'static str>>>);

    impl RenderSurface for Surface {
        fn resize(&mut self, _: Viewport) {}
        fn upload_model(&mut self, _: &ModelAsset) -> Result<(), SurfaceError> {
            self.0.borrow_mut().push("upload");
            Ok(())
        }
        fn clear_model(&mut self) {
            self.0.borrow_mut().push("clear");
        }
        fn render(&mut self, _: &RenderView<'_>) {
            self.0.borrow_mut().push("render");
        }
        fn dispose(&mut self) {
            self.0.borrow_mut().push("dispose");
        }
    }

    struct Host {
        size: Option<Viewport>,
        log: Rc<RefCell<Vec<&'static str>>>,
    }

    impl Host {
        fn new(size: Option<Viewport>) -> Self {
            Self {
                size,
                log: Rc::new(RefCell::new(Vec::new())),
            }
        }
    }

    impl SurfaceHost for Host {
        fn size(&self) -> Option<Viewport> {
            self.size
        }
        fn attach_surface(&mut self, _: Viewport) -> Result<Box<dyn RenderSurface>, SurfaceError> {
            Ok(Box::new(Surface(self.log.clone())))
        }
    }

    fn asset() -> ModelAsset {
        ModelAsset {
            meshes: vec![MeshData {
                positions: vec![[-10.0, 0.0, -10.0], [10.0, 4.0, 10.0], [10.0, 0.0, -10.0]],
                normals: vec![[0.0, 1.0, 0.0]; 3],
                indices: vec![0, 1, 2],
                base_color: [1.0; 4],
            }],
            bounds: Aabb3::new([-10.0, 0.0, -10.0], [10.0, 4.0, 10.0]),
            skipped_primitives: 0,
        }
    }

    fn anchor(id: &str, p: [f64; 3]) -> AnchorInput {
        AnchorInput::new(id, Some(p), AnchorContent::default())
    }

    fn mounted(config: ViewerConfig, target: Option<&str>) -> (FloorView, Host, Scheduler) {
        let mut host = Host::new(Some(Viewport::new(800, 600)));
        let mut sched = Scheduler::default();
        let mut view = FloorView::new(config, target);
        assert!(view.mount(&mut host, &mut sched, "Annex12F.gltf", &[], Time(0.0)));
        (view, host, sched)
    }

    fn one_fetch(view: &mut FloorView) -> FetchRequest {
        let mut fetches = view.drain_fetches();
        assert_eq!(fetches.len(), 1, "expected exactly one fetch");
        fetches.remove(0)
    }

    fn payloads(view: &mut FloorView) -> Vec<ViewerEvent> {
        view.drain_events().into_iter().map(|e| e.payload).collect()
    }

    fn fail_every_candidate(view: &mut FloorView) {
        while let Some(req) = view.drain_fetches().pop() {
            view.on_fetch_result(req.ticket, Err("HTTP 404".into()), Time(0.0));
        }
    }

    #[test]
    fn mount_without_container_is_a_no_op() {
        let mut host = Host::new(None);
        let mut sched = Scheduler::default();
        let mut view = FloorView::new(ViewerConfig::default(), None);
        assert!(!view.mount(&mut host, &mut sched, "a.glb", &[], Time(0.0)));
        assert_eq!(view.loop_state(), LoopState::Stopped);
        assert!(view.drain_fetches().is_empty());
        assert_eq!(view.load_state(), &LoadState::NotStarted);
    }

    #[test]
    fn mount_starts_loop_and_first_fetch() {
        let (mut view, _host, _sched) = mounted(ViewerConfig::default(), None);
        assert_eq!(view.loop_state(), LoopState::Running);
        let req = one_fetch(&mut view);
        assert_eq!(req.url, "Annex12F.gltf");
        assert!(matches!(
            payloads(&mut view).as_slice(),
            [ViewerEvent::LoadStarted { .. }]
        ));
    }

    #[test]
    fn falls_back_to_public_folder_and_loads() {
        let (mut view, host, _sched) = mounted(ViewerConfig::default(), None);
        let raw = one_fetch(&mut view);
        view.on_fetch_result(raw.ticket, Err("HTTP 404".into()), Time(0.1));
        let origin = one_fetch(&mut view);
        view.on_fetch_result(origin.ticket, Err("HTTP 404".into()), Time(0.2));
        let public = one_fetch(&mut view);
        assert_eq!(public.url, "/public/Annex12F.gltf");
        view.on_fetch_result(public.ticket, Ok(asset()), Time(0.3));

        assert!(view.load_state().is_loaded());
        assert_eq!(view.loader().attempted(), ["Annex12F.gltf", "/Annex12F.gltf"]);
        let events = payloads(&mut view);
        let failed_urls: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                ViewerEvent::AttemptFailed { url, .. } => Some(url.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(failed_urls, vec!["Annex12F.gltf", "/Annex12F.gltf"]);
        assert!(matches!(events.last(), Some(ViewerEvent::Loaded { url, .. }) if url == "/public/Annex12F.gltf"));
        assert!(host.log.borrow().contains(&"upload"));

        // Centered on the origin.
        let ctx = view.context().expect("mounted");
        assert_eq!(ctx.controls().target, Vec3::ZERO);
    }

    #[test]
    fn retry_cap_surfaces_terminal_failure() {
        let (mut view, _host, _sched) = mounted(ViewerConfig::default(), None);
        fail_every_candidate(&mut view);
        let LoadState::Failed { attempted, .. } = view.load_state().clone() else {
            panic!("expected failure");
        };
        assert_eq!(attempted, vec!["Annex12F.gltf", "/Annex12F.gltf", "/public/Annex12F.gltf"]);

        for remaining in [2, 1, 0] {
            view.drain_events();
            view.retry(Time(1.0)).expect("retry allowed");
            fail_every_candidate(&mut view);
            let events = payloads(&mut view);
            assert!(matches!(
                events.last(),
                Some(ViewerEvent::LoadFailed { retries_remaining, .. }) if *retries_remaining == remaining
            ));
        }

        assert_eq!(view.retry(Time(2.0)), Err(RetryError::CapExceeded { max: 3 }));
        assert!(view.load_state().is_failed());
        assert!(view.drain_fetches().is_empty());
    }

    #[test]
    fn late_result_for_previous_source_is_ignored() {
        let (mut view, host, _sched) = mounted(ViewerConfig::default(), None);
        let old = one_fetch(&mut view);
        view.set_source("Annex13F.gltf", &[], Time(0.5));
        let new = one_fetch(&mut view);

        view.on_fetch_result(old.ticket, Ok(asset()), Time(1.0));
        assert!(view.load_state().is_loading());
        assert!(!host.log.borrow().contains(&"upload"));

        view.on_fetch_result(new.ticket, Ok(asset()), Time(1.1));
        assert!(view.load_state().is_loaded());
    }

    #[test]
    fn hung_fetch_times_out_from_the_frame_loop() {
        let (mut view, _host, mut sched) = mounted(ViewerConfig::default(), None);
        let raw = one_fetch(&mut view);
        view.drain_events();

        assert!(view.tick(29_000.0, &mut sched));
        assert!(view.drain_fetches().is_empty());

        assert!(view.tick(30_000.0, &mut sched));
        let origin = one_fetch(&mut view);
        assert_eq!(origin.url, "/Annex12F.gltf");
        assert!(matches!(
            payloads(&mut view).as_slice(),
            [ViewerEvent::AttemptFailed { url, .. }] if url == "Annex12F.gltf"
        ));

        // The hung request finally answers; too late.
        view.on_fetch_result(raw.ticket, Ok(asset()), Time(31.0));
        assert!(view.load_state().is_loading());
    }

    #[test]
    fn anchors_stay_pending_until_model_loads() {
        let (mut view, _host, mut sched) = mounted(ViewerConfig::default(), None);
        view.set_anchors(vec![anchor("studio-08b", [0.0, 0.0, 0.0])]);
        view.tick(0.0, &mut sched);
        view.tick(16.0, &mut sched);
        assert_eq!(view.projector().get("studio-08b").map(|a| a.state), Some(AnchorState::Pending));
        assert!(view.screen_positions().is_empty());

        let req = one_fetch(&mut view);
        view.on_fetch_result(req.ticket, Ok(asset()), Time(0.05));
        view.tick(33.0, &mut sched);
        assert_eq!(view.projector().get("studio-08b").map(|a| a.state), Some(AnchorState::Visible));
    }

    #[test]
    fn target_anchor_is_highlighted_and_scrolled_once() {
        let (mut view, _host, mut sched) = mounted(ViewerConfig::default(), Some("ArcLab"));
        view.set_anchors(vec![anchor("arclab", [1.0, 1.0, 1.0]), anchor("crit-main", [2.0, 0.0, 0.0])]);
        let req = one_fetch(&mut view);
        view.drain_events();

        view.on_fetch_result(req.ticket, Ok(asset()), Time(1.0));
        let mut scrolls = Vec::new();
        for ms in [1000.0, 1050.0, 1119.0, 1121.0, 1200.0, 2000.0, 5000.0] {
            view.tick(ms, &mut sched);
            for e in view.drain_events() {
                if let ViewerEvent::ScrollIntoView { anchor_id } = e.payload {
                    scrolls.push((ms, anchor_id));
                }
            }
        }
        assert_eq!(scrolls, vec![(1121.0, "arclab".to_string())]);

        let arclab = view.screen_position("arclab").expect("projected");
        assert!(arclab.highlighted);
        assert!(!view.screen_position("crit-main").expect("projected").highlighted);
    }

    #[test]
    fn switching_source_before_scroll_waits_for_the_new_model() {
        let (mut view, _host, mut sched) = mounted(ViewerConfig::default(), Some("arclab"));
        view.set_anchors(vec![anchor("arclab", [1.0, 1.0, 1.0])]);
        let first = one_fetch(&mut view);
        view.on_fetch_result(first.ticket, Ok(asset()), Time(1.0));

        view.set_source("Annex13F.gltf", &[], Time(1.05));
        let second = one_fetch(&mut view);
        view.drain_events();
        view.tick(1200.0, &mut sched);
        assert!(view.load_state().is_loading());
        assert!(!payloads(&mut view)
            .iter()
            .any(|e| matches!(e, ViewerEvent::ScrollIntoView { .. })));

        view.on_fetch_result(second.ticket, Ok(asset()), Time(1.3));
        view.tick(1500.0, &mut sched);
        assert!(payloads(&mut view)
            .iter()
            .any(|e| matches!(e, ViewerEvent::ScrollIntoView { anchor_id } if anchor_id == "arclab")));
    }

    #[test]
    fn projection_uses_camera_after_orbit() {
        let mut config = ViewerConfig::default();
        config.controls.enable_damping = false;
        let (mut view, _host, mut sched) = mounted(config, None);
        view.set_anchors(vec![anchor("studio-08b", [27.0, 2.0, 3.0])]);
        let req = one_fetch(&mut view);
        view.on_fetch_result(req.ticket, Ok(asset()), Time(0.0));
        view.tick(0.0, &mut sched);
        let before = view.screen_position("studio-08b").expect("projected");

        view.orbit_by(std::f64::consts::FRAC_PI_2, 0.0);
        view.tick(16.0, &mut sched);
        let after = view.screen_position("studio-08b").expect("projected");

        let ctx = view.context().expect("mounted");
        let expected = project_point(&ctx.camera().view_proj(), Vec3::new(27.0, 2.0, 3.0), ctx.viewport())
            .expect("in front");
        assert!((after.x - expected.screen[0]).abs() < 1e-9);
        assert!((after.y - expected.screen[1]).abs() < 1e-9);
        assert!((after.x - before.x).abs() > 1.0);
    }

    #[test]
    fn anchors_set_right_after_load_use_the_framed_camera() {
        let (mut view, _host, mut sched) = mounted(ViewerConfig::default(), None);
        let req = one_fetch(&mut view);
        let mut wide = asset();
        wide.bounds = Aabb3::new([-200.0, 0.0, -200.0], [200.0, 10.0, 200.0]);
        view.on_fetch_result(req.ticket, Ok(wide), Time(0.0));

        view.set_anchors(vec![anchor("ap1-218", [150.0, 2.0, 150.0])]);
        let reported = view.screen_position("ap1-218").expect("projected");

        let ctx = view.context().expect("mounted");
        assert!((ctx.camera().position - ctx.camera().target).length() > 100.0);
        let expected = project_point(
            &ctx.camera().view_proj(),
            Vec3::new(150.0, 2.0, 150.0),
            ctx.viewport(),
        )
        .expect("in front");
        assert!(expected.visible);
        assert_eq!(reported.state, AnchorState::Visible);
        assert_eq!([reported.x, reported.y], expected.screen);

        // The first frame does not move the camera any further.
        view.tick(0.0, &mut sched);
        assert_eq!(view.screen_position("ap1-218").expect("projected"), reported);
    }

    #[test]
    fn resize_reprojects_immediately() {
        let (mut view, _host, mut sched) = mounted(ViewerConfig::default(), None);
        view.set_anchors(vec![anchor("a", [0.0, 0.0, 0.0])]);
        let req = one_fetch(&mut view);
        view.on_fetch_result(req.ticket, Ok(asset()), Time(0.0));
        view.tick(0.0, &mut sched);
        let small = view.screen_position("a").expect("projected");

        view.resize(Viewport::new(1600, 1200));
        let big = view.screen_position("a").expect("projected");
        assert!((small.x / 800.0 - big.x / 1600.0).abs() < 1e-9);
        assert!((small.y / 600.0 - big.y / 1200.0).abs() < 1e-9);
    }

    #[test]
    fn unmount_cancels_tick_then_disposes() {
        let (mut view, host, mut sched) = mounted(ViewerConfig::default(), None);
        view.tick(0.0, &mut sched);
        view.unmount(&mut sched);

        assert_eq!(sched.cancelled, vec![TickHandle(2)]);
        assert_eq!(view.loop_state(), LoopState::Stopped);
        assert!(!view.is_mounted());
        assert!(host.log.borrow().contains(&"dispose"));
        assert!(!view.tick(16.0, &mut sched));
        assert_eq!(view.load_state(), &LoadState::NotStarted);
    }
}
