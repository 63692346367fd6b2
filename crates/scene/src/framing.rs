use foundation::bounds::Aabb3;
use foundation::math::Vec3;
use serde::{Deserialize, Serialize};

/// Distance used when a model has no extent.
const MIN_FRAMING_DISTANCE: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FramingConfig {
    /// Multiplier on the fit distance so the model doesn't touch the edges.
    pub margin: f64,
    /// Move the model so its bounding-box center sits at the origin.
    pub center_model: bool,
}

impl Default for FramingConfig {
    fn default() -> Self {
        Self {
            margin: 1.5,
            center_model: true,
        }
    }
}

/// How to place the camera for a freshly loaded model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Framing {
    /// Translation applied to the model (negated center when centering).
    pub model_offset: Vec3,
    /// Model bounds after `model_offset`.
    pub bounds: Aabb3,
    /// Where the orbit target goes.
    pub target: Vec3,
    pub distance: f64,
    /// Far plane large enough to keep the whole model in view from `distance`.
    pub far: f64,
}

/// `distance = maxDim / (2 * tan(fov / 2)) * margin`.
pub fn compute_framing(
    bounds: &Aabb3,
    fov_y_rad: f64,
    current_far: f64,
    config: &FramingConfig,
) -> Framing {
    let center = bounds.center();
    let model_offset = if config.center_model {
        center.scale(-1.0)
    } else {
        Vec3::ZERO
    };
    let placed = bounds.translated(model_offset);

    let max_dim = bounds.max_dimension();
    let half_tan = (0.5 * fov_y_rad).tan();
    let distance = if max_dim > 0.0 && half_tan > 0.0 {
        max_dim / (2.0 * half_tan) * config.margin
    } else {
        MIN_FRAMING_DISTANCE
    };

    Framing {
        model_offset,
        bounds: placed,
        target: placed.center(),
        distance,
        far: current_far.max((distance + max_dim) * 2.0),
    }
}
