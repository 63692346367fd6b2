use foundation::bounds::Aabb3;
use serde::Serialize;

/// Lifecycle signals a floor view raises for its host.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewerEvent {
    LoadStarted {
        source: String,
        generation: u64,
    },
    LoadProgress {
        percent: u8,
    },
    Loaded {
        url: String,
        min: [f64; 3],
        max: [f64; 3],
    },
    AttemptFailed {
        url: String,
        reason: String,
    },
    LoadFailed {
        reason: String,
        attempted: Vec<String>,
        retries_remaining: u32,
    },
    ScrollIntoView {
        anchor_id: String,
    },
}

impl ViewerEvent {
    pub fn loaded(url: String, bounds: &Aabb3) -> Self {
        ViewerEvent::Loaded {
            url,
            min: bounds.min,
            max: bounds.max,
        }
    }
}
