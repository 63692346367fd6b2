//! Browser side of the scene ports: the container element, the
//! requestAnimationFrame scheduler and the pointer/wheel/resize listeners.

use runtime::{TickHandle, TickScheduler};
use scene::{InputBinding, RenderSurface, SurfaceError, SurfaceHost, Viewport};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{HtmlElement, PointerEvent, WheelEvent, Window};

use crate::wgpu::WgpuSurface;

/// Container size in CSS pixels.
pub fn container_viewport(container: &HtmlElement) -> Viewport {
    Viewport::new(
        container.client_width().max(0) as u32,
        container.client_height().max(0) as u32,
    )
}

/// The DOM container plus the GPU surface prepared for it.
///
/// GPU setup is asynchronous in the browser, so the surface is created
/// before mounting and handed over on `attach_surface`.
pub struct DomHost {
    container: Option<HtmlElement>,
    surface: Option<WgpuSurface>,
    error: Option<SurfaceError>,
}

impl DomHost {
    pub fn new(container: Option<HtmlElement>, surface: Result<WgpuSurface, SurfaceError>) -> Self {
        let (surface, error) = match surface {
            Ok(s) => (Some(s), None),
            Err(e) => (None, Some(e)),
        };
        Self {
            container,
            surface,
            error,
        }
    }

    pub fn detached() -> Self {
        Self {
            container: None,
            surface: None,
            error: Some(SurfaceError::NoContainer),
        }
    }
}

impl SurfaceHost for DomHost {
    fn size(&self) -> Option<Viewport> {
        self.container.as_ref().map(container_viewport)
    }

    fn attach_surface(&mut self, viewport: Viewport) -> Result<Box<dyn RenderSurface>, SurfaceError> {
        match self.surface.take() {
            Some(mut surface) => {
                surface.resize(viewport);
                Ok(Box::new(surface))
            }
            None => Err(self
                .error
                .take()
                .unwrap_or_else(|| SurfaceError::Gpu("surface already attached".to_string()))),
        }
    }
}

/// `requestAnimationFrame` as a tick scheduler. The callback is owned here
/// and lives as long as the viewer.
pub struct RafScheduler {
    window: Window,
    callback: Closure<dyn FnMut(f64)>,
}

impl RafScheduler {
    pub fn new(window: Window, callback: Closure<dyn FnMut(f64)>) -> Self {
        Self { window, callback }
    }
}

impl TickScheduler for RafScheduler {
    fn request_tick(&mut self) -> Option<TickHandle> {
        match self
            .window
            .request_animation_frame(self.callback.as_ref().unchecked_ref())
        {
            Ok(id) => Some(TickHandle(id)),
            Err(e) => {
                tracing::warn!(error = ?e, "requestAnimationFrame failed");
                None
            }
        }
    }

    fn cancel_tick(&mut self, handle: TickHandle) {
        if let Err(e) = self.window.cancel_animation_frame(handle.0) {
            tracing::debug!(error = ?e, "cancelAnimationFrame failed");
        }
    }
}

/// What the listeners forward to the viewer.
pub trait InputSink: 'static {
    fn pointer_down(&self, pos_px: [f64; 2], button: i16);
    fn pointer_move(&self, pos_px: [f64; 2]);
    fn pointer_up(&self);
    fn wheel(&self, delta_y: f64);
    fn container_resized(&self, viewport: Viewport);
}

type Listener = (web_sys::EventTarget, &'static str, Closure<dyn FnMut(web_sys::Event)>);

/// Listeners registered on the container and window; removed on `detach`.
pub struct DomInput {
    listeners: Vec<Listener>,
}

impl DomInput {
    pub fn attach<S: InputSink + Clone>(
        window: &Window,
        container: &HtmlElement,
        sink: S,
    ) -> Result<Self, JsValue> {
        let mut input = Self {
            listeners: Vec::new(),
        };

        let s = sink.clone();
        let target = container.clone();
        input.listen(container.as_ref(), "pointerdown", move |event| {
            if let Some(e) = event.dyn_ref::<PointerEvent>() {
                let _ = target.set_pointer_capture(e.pointer_id());
                s.pointer_down([f64::from(e.offset_x()), f64::from(e.offset_y())], e.button());
            }
        })?;

        let s = sink.clone();
        input.listen(container.as_ref(), "pointermove", move |event| {
            if let Some(e) = event.dyn_ref::<PointerEvent>() {
                s.pointer_move([f64::from(e.offset_x()), f64::from(e.offset_y())]);
            }
        })?;

        for name in ["pointerup", "pointercancel"] {
            let s = sink.clone();
            input.listen(container.as_ref(), name, move |_| s.pointer_up())?;
        }

        let s = sink.clone();
        input.listen(container.as_ref(), "wheel", move |event| {
            if let Some(e) = event.dyn_ref::<WheelEvent>() {
                e.prevent_default();
                s.wheel(e.delta_y());
            }
        })?;

        let s = sink;
        let observed = container.clone();
        input.listen(window.as_ref(), "resize", move |_| {
            s.container_resized(container_viewport(&observed));
        })?;

        Ok(input)
    }

    fn listen(
        &mut self,
        target: &web_sys::EventTarget,
        name: &'static str,
        handler: impl FnMut(web_sys::Event) + 'static,
    ) -> Result<(), JsValue> {
        let closure = Closure::<dyn FnMut(web_sys::Event)>::new(handler);
        target.add_event_listener_with_callback(name, closure.as_ref().unchecked_ref())?;
        self.listeners.push((target.clone(), name, closure));
        Ok(())
    }
}

impl InputBinding for DomInput {
    fn detach(&mut self) {
        for (target, name, closure) in self.listeners.drain(..) {
            let _ = target.remove_event_listener_with_callback(name, closure.as_ref().unchecked_ref());
        }
    }
}

impl Drop for DomInput {
    fn drop(&mut self) {
        self.detach();
    }
}
