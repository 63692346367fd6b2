//! World-to-screen projection for hotspot anchors.
//!
//! Runs once per rendered frame against the current camera. Until the model
//! has loaded the projector is not ready and every anchor stays `Pending`.

use foundation::math::{Mat4, Vec3};
use scene::Viewport;

use crate::anchor::{Anchor, AnchorInput, AnchorState, ScreenAnchor};

/// Clip-space `w` at or below this counts as on/behind the camera plane.
const MIN_CLIP_W: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub screen: [f64; 2],
    pub ndc_z: f64,
    pub visible: bool,
}

/// Project one point.
///
/// `screen_x = ndc_x * w/2 + w/2`, `screen_y = -(ndc_y * h/2) + h/2`.
/// Visible iff `ndc_z < 1`. Returns `None` when `w <= 0` (no meaningful
/// screen position); callers treat that as hidden.
pub fn project_point(view_proj: &Mat4, point: Vec3, viewport: Viewport) -> Option<Projection> {
    let [cx, cy, cz, cw] = view_proj.transform_point4(point);
    if cw <= MIN_CLIP_W {
        return None;
    }
    let (ndc_x, ndc_y, ndc_z) = (cx / cw, cy / cw, cz / cw);
    let half_w = f64::from(viewport.width) * 0.5;
    let half_h = f64::from(viewport.height) * 0.5;
    Some(Projection {
        screen: [ndc_x * half_w + half_w, -(ndc_y * half_h) + half_h],
        ndc_z,
        visible: ndc_z < 1.0,
    })
}

#[derive(Debug, Default)]
pub struct HotspotProjector {
    anchors: Vec<Anchor>,
    ready: bool,
}

impl HotspotProjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the registry. Ids are unique; the first record with an id wins.
    ///
    /// Highlight flags carry over for ids that survive the replacement.
    pub fn set_anchors(&mut self, inputs: Vec<AnchorInput>) {
        let previous = std::mem::take(&mut self.anchors);
        for input in inputs {
            if self.anchors.iter().any(|a| a.id == input.id) {
                tracing::warn!(id = %input.id, "duplicate anchor id ignored");
                continue;
            }
            let mut anchor = Anchor::from_input(input);
            anchor.highlighted = previous
                .iter()
                .any(|p| p.id == anchor.id && p.highlighted);
            self.anchors.push(anchor);
        }
    }

    pub fn clear(&mut self) {
        self.anchors.clear();
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Gate projection on the model being loaded. Going un-ready resets
    /// every anchor to `Pending`.
    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
        if !ready {
            for anchor in &mut self.anchors {
                anchor.reset();
            }
        }
    }

    /// One projection pass with the camera as it is now.
    ///
    /// No-op when not ready or the viewport has no area.
    pub fn project(&mut self, view_proj: &Mat4, viewport: Viewport) {
        if !self.ready || viewport.is_empty() {
            return;
        }
        for anchor in &mut self.anchors {
            let Some(position) = anchor.position else {
                continue;
            };
            match project_point(view_proj, position, viewport) {
                Some(p) => {
                    anchor.screen = Some(p.screen);
                    anchor.state = if p.visible {
                        AnchorState::Visible
                    } else {
                        AnchorState::Hidden
                    };
                }
                None => {
                    anchor.screen = None;
                    anchor.state = AnchorState::Hidden;
                }
            }
        }
    }

    pub fn anchors(&self) -> &[Anchor] {
        &self.anchors
    }

    pub fn anchors_mut(&mut self) -> impl Iterator<Item = &mut Anchor> {
        self.anchors.iter_mut()
    }

    pub fn get(&self, id: &str) -> Option<&Anchor> {
        self.anchors.iter().find(|a| a.id == id)
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    /// Current screen position of one anchor, if it has been projected.
    pub fn screen_position(&self, id: &str) -> Option<ScreenAnchor> {
        self.get(id).and_then(to_screen)
    }

    /// Every anchor with a screen position. Pending anchors and anchors
    /// on or behind the camera plane are left out.
    pub fn screen_positions(&self) -> Vec<ScreenAnchor> {
        self.anchors.iter().filter_map(to_screen).collect()
    }
}

fn to_screen(anchor: &Anchor) -> Option<ScreenAnchor> {
    if anchor.state == AnchorState::Pending {
        return None;
    }
    let [x, y] = anchor.screen?;
    Some(ScreenAnchor {
        id: anchor.id.clone(),
        x,
        y,
        state: anchor.state,
        highlighted: anchor.highlighted,
    })
}
