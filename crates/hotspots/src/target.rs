use foundation::time::{Deadline, Time};

use crate::projector::HotspotProjector;

/// Normalizes a target id from a URL `room` parameter.
pub fn normalize_target(raw: &str) -> Option<String> {
    let t = raw.trim().to_lowercase();
    (!t.is_empty()).then_some(t)
}

/// Target-anchor navigation: highlight one anchor and ask the host to
/// scroll the viewer into view once, shortly after the model is loaded.
#[derive(Debug, Clone)]
pub struct TargetNavigator {
    target: Option<String>,
    scroll_delay_ms: f64,
    scroll_at: Option<Deadline>,
    scrolled: bool,
}

impl TargetNavigator {
    pub fn new(target: Option<&str>, scroll_delay_ms: f64) -> Self {
        Self {
            target: target.and_then(normalize_target),
            scroll_delay_ms,
            scroll_at: None,
            scrolled: false,
        }
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn set_target(&mut self, target: Option<&str>) {
        let next = target.and_then(normalize_target);
        if next != self.target {
            self.target = next;
            self.scroll_at = None;
            self.scrolled = false;
        }
    }

    pub fn is_target(&self, id: &str) -> bool {
        self.target
            .as_deref()
            .is_some_and(|t| id.to_lowercase() == t)
    }

    /// Mark the target anchor highlighted and clear every other one.
    pub fn apply_highlight(&self, projector: &mut HotspotProjector) {
        for anchor in projector.anchors_mut() {
            anchor.highlighted = self.is_target(&anchor.id);
        }
    }

    /// Arm the scroll timer. Only the first load after a target is set counts.
    pub fn on_loaded(&mut self, now: Time) {
        if self.target.is_none() || self.scrolled || self.scroll_at.is_some() {
            return;
        }
        self.scroll_at = Some(Deadline::in_millis(now, self.scroll_delay_ms));
    }

    /// The model went away before the scroll fired; wait for the next load.
    pub fn on_unloaded(&mut self) {
        self.scroll_at = None;
    }

    /// Returns the target id when the scroll should happen now.
    pub fn poll_scroll(&mut self, now: Time) -> Option<String> {
        let deadline = self.scroll_at?;
        if !deadline.has_passed(now) {
            return None;
        }
        self.scroll_at = None;
        self.scrolled = true;
        self.target.clone()
    }
}
