use foundation::bounds::Aabb3;

/// Lifecycle of one model source in one viewer.
///
/// Transitions only move forward, except `Failed -> Loading` through an
/// explicit retry.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LoadState {
    #[default]
    NotStarted,
    /// `progress` is `None` while the transfer size is unknown.
    Loading { progress: Option<u8> },
    Loaded { bounds: Aabb3 },
    Failed {
        reason: String,
        attempted: Vec<String>,
    },
}

impl LoadState {
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadState::Loaded { .. })
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, LoadState::Failed { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            LoadState::NotStarted => "not_started",
            LoadState::Loading { .. } => "loading",
            LoadState::Loaded { .. } => "loaded",
            LoadState::Failed { .. } => "failed",
        }
    }
}

/// `round(loaded / total * 100)`, or `None` when the total is unknown.
pub fn progress_percent(loaded: u64, total: Option<u64>) -> Option<u8> {
    let total = total.filter(|t| *t > 0)?;
    let pct = (loaded as f64 / total as f64 * 100.0).round();
    Some(pct.clamp(0.0, 100.0) as u8)
}
