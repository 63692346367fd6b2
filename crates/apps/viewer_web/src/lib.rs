use console_error_panic_hook::set_once;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

use formats::{FloorEntry, FloorManifest};
use foundation::time::Time;
use hotspots::{AnchorInput, LecturerRecord, RoomRecord, anchors_for_floor};
use runtime::Event;
use scene::Viewport;
use streaming::{FetchRequest, load_attempt};
use viewer::{FloorView, ViewerConfig, ViewerEvent};

mod dom;
mod fetch;
mod wgpu;

use dom::{DomHost, DomInput, InputSink, RafScheduler, container_viewport};
use fetch::GlooFetcher;
use wgpu::init_surface;

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    set_once();
    tracing_wasm::set_as_global_default();
    Ok(())
}

fn js_err(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn now() -> Time {
    let ms = web_sys::window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or(0.0);
    Time::from_millis(ms)
}

struct Shared {
    view: FloorView,
    scheduler: RafScheduler,
    manifest: FloorManifest,
    floor: FloorEntry,
    container: Option<web_sys::HtmlElement>,
    on_event: Option<js_sys::Function>,
    on_frame: Option<js_sys::Function>,
}

type SharedRef = Rc<RefCell<Shared>>;

/// Run one animation frame, then hand queued work to the browser.
fn on_animation_frame(weak: &Weak<RefCell<Shared>>, now_ms: f64) {
    let Some(shared) = weak.upgrade() else {
        return;
    };
    let ran = {
        let mut guard = shared.borrow_mut();
        let Shared {
            view, scheduler, ..
        } = &mut *guard;
        view.tick(now_ms, scheduler)
    };
    if ran {
        pump(&shared);
        notify_frame(&shared);
    }
}

/// Start queued fetches and deliver queued events to JS.
///
/// Borrows are released before any JS callback runs so callbacks may call
/// back into the viewer.
fn pump(shared: &SharedRef) {
    let (fetches, events, callback, container) = {
        let mut s = shared.borrow_mut();
        (
            s.view.drain_fetches(),
            s.view.drain_events(),
            s.on_event.clone(),
            s.container.clone(),
        )
    };
    for request in fetches {
        spawn_fetch(Rc::downgrade(shared), request);
    }
    if let (Some(anchor), Some(container)) = (scroll_request(&events), container.as_ref()) {
        tracing::debug!(anchor, "scrolling tour into view");
        container.scroll_into_view();
    }
    let Some(callback) = callback else {
        return;
    };
    for event in events {
        match serde_json::to_string(&event.payload) {
            Ok(json) => {
                if let Err(e) = callback.call1(&JsValue::NULL, &JsValue::from_str(&json)) {
                    tracing::warn!(error = ?e, "viewer event callback threw");
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to encode viewer event"),
        }
    }
}

/// The anchor of the last scroll request among `events`, if any.
fn scroll_request(events: &[Event<ViewerEvent>]) -> Option<&str> {
    events.iter().rev().find_map(|e| match &e.payload {
        ViewerEvent::ScrollIntoView { anchor_id } => Some(anchor_id.as_str()),
        _ => None,
    })
}

fn notify_frame(shared: &SharedRef) {
    let (positions, callback) = {
        let s = shared.borrow();
        let Some(callback) = s.on_frame.clone() else {
            return;
        };
        (s.view.screen_positions(), callback)
    };
    match serde_json::to_string(&positions) {
        Ok(json) => {
            if let Err(e) = callback.call1(&JsValue::NULL, &JsValue::from_str(&json)) {
                tracing::warn!(error = ?e, "frame callback threw");
            }
        }
        Err(e) => tracing::warn!(error = %e, "failed to encode screen positions"),
    }
}

fn spawn_fetch(weak: Weak<RefCell<Shared>>, request: FetchRequest) {
    spawn_local(async move {
        let ticket = request.ticket;
        let progress_target = weak.clone();
        let mut on_progress = move |loaded: u64, total: Option<u64>| {
            if let Some(shared) = progress_target.upgrade() {
                shared
                    .borrow_mut()
                    .view
                    .on_fetch_progress(ticket, loaded, total);
            }
        };
        let result = load_attempt(
            &GlooFetcher,
            &request.url,
            &request.fetch_url,
            &mut on_progress,
        )
        .await
        .map_err(|e| e.to_string());

        let Some(shared) = weak.upgrade() else {
            return;
        };
        shared
            .borrow_mut()
            .view
            .on_fetch_result(ticket, result, now());
        pump(&shared);
    });
}

#[derive(Clone)]
struct ViewerSink(Weak<RefCell<Shared>>);

impl ViewerSink {
    fn with_view(&self, f: impl FnOnce(&mut FloorView)) {
        if let Some(shared) = self.0.upgrade() {
            f(&mut shared.borrow_mut().view);
        }
    }
}

impl InputSink for ViewerSink {
    fn pointer_down(&self, pos_px: [f64; 2], button: i16) {
        self.with_view(|v| v.pointer_down(pos_px, button));
    }

    fn pointer_move(&self, pos_px: [f64; 2]) {
        self.with_view(|v| v.pointer_move(pos_px));
    }

    fn pointer_up(&self) {
        self.with_view(FloorView::pointer_up);
    }

    fn wheel(&self, delta_y: f64) {
        self.with_view(|v| v.wheel(delta_y));
    }

    fn container_resized(&self, viewport: Viewport) {
        self.with_view(|v| v.resize(viewport));
    }
}

/// A mounted floor of the tour.
#[wasm_bindgen]
pub struct TourViewer {
    shared: SharedRef,
}

/// Fetch the floor manifest, prepare the canvas inside `container_id` and
/// start loading `floor_id`'s model.
///
/// `target` is the room id to highlight and scroll to once loaded.
#[wasm_bindgen]
pub async fn create_tour_viewer(
    container_id: String,
    manifest_url: String,
    floor_id: String,
    target: Option<String>,
) -> Result<TourViewer, JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("window missing"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("document missing"))?;

    let text = GlooFetcher.fetch_text(&manifest_url).await.map_err(js_err)?;
    let manifest = FloorManifest::from_json(&text).map_err(js_err)?;
    let floor = manifest
        .floor(&floor_id)
        .cloned()
        .ok_or_else(|| JsValue::from_str(&format!("unknown floor: {floor_id}")))?;
    let config = ViewerConfig::from_override(manifest.viewer.as_ref()).map_err(js_err)?;

    let container = document
        .get_element_by_id(&container_id)
        .and_then(|e| e.dyn_into::<web_sys::HtmlElement>().ok());

    let mut host = match container.as_ref() {
        Some(container) => {
            let canvas = document
                .create_element("canvas")?
                .dyn_into::<web_sys::HtmlCanvasElement>()?;
            container.append_child(&canvas)?;
            let surface = init_surface(canvas.clone(), container_viewport(container)).await;
            if surface.is_err() {
                canvas.remove();
            }
            DomHost::new(Some(container.clone()), surface)
        }
        None => {
            tracing::warn!(container = %container_id, "tour container not found");
            DomHost::detached()
        }
    };

    let shared: SharedRef = Rc::new_cyclic(|weak: &Weak<RefCell<Shared>>| {
        let weak = weak.clone();
        let callback = Closure::<dyn FnMut(f64)>::new(move |now_ms: f64| {
            on_animation_frame(&weak, now_ms);
        });
        RefCell::new(Shared {
            view: FloorView::new(config, target.as_deref()),
            scheduler: RafScheduler::new(window.clone(), callback),
            manifest,
            floor,
            container: container.clone(),
            on_event: None,
            on_frame: None,
        })
    });

    {
        let mut guard = shared.borrow_mut();
        let Shared {
            view,
            scheduler,
            floor,
            ..
        } = &mut *guard;
        if view.mount(
            &mut host,
            scheduler,
            &floor.model_src,
            &floor.fallback_sources,
            now(),
        ) {
            if let Some(container) = container.as_ref() {
                let input = DomInput::attach(&window, container, ViewerSink(Rc::downgrade(&shared)))?;
                view.attach_input(Box::new(input));
            }
        }
    }
    pump(&shared);

    Ok(TourViewer { shared })
}

#[wasm_bindgen]
impl TourViewer {
    /// Called with each viewer event as a JSON string (`{"type": ...}`).
    pub fn on_event(&self, callback: Option<js_sys::Function>) {
        self.shared.borrow_mut().on_event = callback;
    }

    /// Called every frame with the anchors' screen positions as JSON.
    pub fn on_frame(&self, callback: Option<js_sys::Function>) {
        self.shared.borrow_mut().on_frame = callback;
    }

    pub fn is_mounted(&self) -> bool {
        self.shared.borrow().view.is_mounted()
    }

    /// `not_started`, `loading`, `loaded` or `failed`.
    pub fn load_state(&self) -> String {
        self.shared.borrow().view.load_state().label().to_string()
    }

    /// Switch to another floor listed in the manifest.
    pub fn set_floor(&self, floor_id: &str) -> Result<(), JsValue> {
        {
            let mut s = self.shared.borrow_mut();
            let floor = s
                .manifest
                .floor(floor_id)
                .cloned()
                .ok_or_else(|| JsValue::from_str(&format!("unknown floor: {floor_id}")))?;
            s.view.set_anchors(Vec::new());
            s.view
                .set_source(&floor.model_src, &floor.fallback_sources, now());
            s.floor = floor;
        }
        pump(&self.shared);
        Ok(())
    }

    /// Load an arbitrary model source, bypassing the manifest.
    pub fn set_source(&self, source: &str) {
        self.shared
            .borrow_mut()
            .view
            .set_source(source, &[], now());
        pump(&self.shared);
    }

    /// Replace the anchors with a JSON list of `{id, position, content}`.
    pub fn set_anchors(&self, anchors_json: &str) -> Result<(), JsValue> {
        let anchors: Vec<AnchorInput> = serde_json::from_str(anchors_json).map_err(js_err)?;
        self.shared.borrow_mut().view.set_anchors(anchors);
        Ok(())
    }

    /// Build the current floor's anchors from room and lecturer records (JSON arrays).
    pub fn set_catalog(&self, rooms_json: &str, lecturers_json: &str) -> Result<usize, JsValue> {
        let rooms: Vec<RoomRecord> = serde_json::from_str(rooms_json).map_err(js_err)?;
        let lecturers: Vec<LecturerRecord> =
            serde_json::from_str(lecturers_json).map_err(js_err)?;
        let mut s = self.shared.borrow_mut();
        let anchors = anchors_for_floor(&s.floor, &rooms, &lecturers);
        let count = anchors.len();
        s.view.set_anchors(anchors);
        Ok(count)
    }

    pub fn set_target(&self, target: Option<String>) {
        self.shared
            .borrow_mut()
            .view
            .set_target(target.as_deref(), now());
    }

    pub fn retry(&self) -> Result<(), JsValue> {
        self.shared
            .borrow_mut()
            .view
            .retry(now())
            .map_err(js_err)?;
        pump(&self.shared);
        Ok(())
    }

    /// Screen positions of every anchor as JSON.
    pub fn screen_positions(&self) -> Result<String, JsValue> {
        let positions = self.shared.borrow().view.screen_positions();
        serde_json::to_string(&positions).map_err(js_err)
    }

    pub fn orbit_by(&self, d_yaw: f64, d_pitch: f64) {
        self.shared.borrow_mut().view.orbit_by(d_yaw, d_pitch);
    }

    /// Re-read the container size. Window resizes are picked up automatically.
    pub fn resize(&self) {
        let mut s = self.shared.borrow_mut();
        if let Some(viewport) = s.container.as_ref().map(container_viewport) {
            s.view.resize(viewport);
        }
    }

    /// Stop the loop and remove the canvas and listeners.
    pub fn dispose(&self) {
        let mut guard = self.shared.borrow_mut();
        let Shared {
            view, scheduler, ..
        } = &mut *guard;
        view.unmount(scheduler);
    }
}

impl Drop for TourViewer {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.shared.try_borrow_mut() {
            let Shared {
                view, scheduler, ..
            } = &mut *guard;
            view.unmount(scheduler);
        }
    }
}
