use scene::{CameraConfig, ControlsConfig, FramingConfig};
use serde::{Deserialize, Serialize};
use streaming::LoaderConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Delay between load completion and the scroll-into-view signal.
    pub scroll_delay_ms: f64,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            scroll_delay_ms: 120.0,
        }
    }
}

/// Every knob of a floor view. All fields default, so a partial JSON object
/// (such as the `viewer` block of `floors.json`) overrides only what it names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ViewerConfig {
    pub camera: CameraConfig,
    pub controls: ControlsConfig,
    pub framing: FramingConfig,
    pub loading: LoaderConfig,
    pub navigation: NavigationConfig,
}

impl ViewerConfig {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Defaults overridden by an optional manifest block.
    pub fn from_override(value: Option<&serde_json::Value>) -> Result<Self, serde_json::Error> {
        match value {
            Some(v) => Self::deserialize(v),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ViewerConfig;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults() {
        let c = ViewerConfig::default();
        assert_eq!(c.camera.fov_deg, 75.0);
        assert_eq!(c.controls.damping_factor, 0.05);
        assert_eq!(c.framing.margin, 1.5);
        assert_eq!(c.loading.max_retries, 3);
        assert_eq!(c.loading.attempt_timeout_ms, 30_000);
        assert_eq!(c.navigation.scroll_delay_ms, 120.0);
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let value = serde_json::json!({
            "navigation": { "scroll_delay_ms": 200 },
            "loading": { "cache_busting": false }
        });
        let c = ViewerConfig::from_override(Some(&value)).expect("config");
        assert_eq!(c.navigation.scroll_delay_ms, 200.0);
        assert!(!c.loading.cache_busting);
        assert_eq!(c.loading.public_prefix, "/public");
        assert_eq!(c.camera, ViewerConfig::default().camera);
    }

    #[test]
    fn unknown_types_are_rejected() {
        assert!(ViewerConfig::from_json(r#"{"loading": {"max_retries": "many"}}"#).is_err());
    }
}
