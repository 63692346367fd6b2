use foundation::math::Vec3;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AnchorKind {
    #[default]
    Room,
    Lecturer,
}

/// Display payload for a hotspot. The projector never reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AnchorContent {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub kind: AnchorKind,
}

/// One record from the anchor source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorInput {
    pub id: String,
    #[serde(default)]
    pub position: Option<[f64; 3]>,
    #[serde(default)]
    pub content: AnchorContent,
}

impl AnchorInput {
    pub fn new(id: impl Into<String>, position: Option<[f64; 3]>, content: AnchorContent) -> Self {
        Self {
            id: id.into(),
            position,
            content,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AnchorState {
    /// Not projected yet (model not loaded, or no position).
    #[default]
    Pending,
    Visible,
    /// Behind the camera or beyond the far plane.
    Hidden,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Anchor {
    pub id: String,
    pub position: Option<Vec3>,
    pub content: AnchorContent,
    pub state: AnchorState,
    pub highlighted: bool,
    /// Last projected pixel position; kept for hidden anchors too.
    pub screen: Option<[f64; 2]>,
}

impl Anchor {
    pub fn from_input(input: AnchorInput) -> Self {
        let position = input
            .position
            .map(Vec3::from_array)
            .filter(|p| p.is_finite());
        Self {
            id: input.id,
            position,
            content: input.content,
            state: AnchorState::Pending,
            highlighted: false,
            screen: None,
        }
    }

    pub fn reset(&mut self) {
        self.state = AnchorState::Pending;
        self.screen = None;
    }
}

/// What the overlay needs to place one marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreenAnchor {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub state: AnchorState,
    pub highlighted: bool,
}
