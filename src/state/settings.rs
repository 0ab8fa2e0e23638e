use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_FPS, DEFAULT_FRAME_MAXIMUM, DEFAULT_ITEM_HEIGHT, DEFAULT_ROW_COUNT, MAX_ROW_COUNT,
};

/// Timeline-level settings used to build a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineSettings {
    /// Frame rate (frames per second)
    #[serde(default = "default_fps")]
    pub fps: f64,
    /// Number of rows (tracks)
    #[serde(default = "default_row_count")]
    pub row_count: usize,
    /// Height of one row in view units
    #[serde(default = "default_item_height")]
    pub item_height: f64,
    /// First legal frame
    #[serde(default)]
    pub frame_minimum: i64,
    /// Last legal frame
    #[serde(default = "default_frame_maximum")]
    pub frame_maximum: i64,
}

fn default_fps() -> f64 {
    DEFAULT_FPS
}

fn default_row_count() -> usize {
    DEFAULT_ROW_COUNT
}

fn default_item_height() -> f64 {
    DEFAULT_ITEM_HEIGHT
}

fn default_frame_maximum() -> i64 {
    DEFAULT_FRAME_MAXIMUM
}

impl Default for TimelineSettings {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            row_count: default_row_count(),
            item_height: default_item_height(),
            frame_minimum: 0,
            frame_maximum: default_frame_maximum(),
        }
    }
}

impl TimelineSettings {
    /// Clamp values into the ranges the model can represent.
    pub fn sanitized(mut self) -> Self {
        if !self.fps.is_finite() || self.fps <= 0.0 {
            self.fps = DEFAULT_FPS;
        }
        self.row_count = self.row_count.clamp(1, MAX_ROW_COUNT);
        if !self.item_height.is_finite() || self.item_height <= 0.0 {
            self.item_height = DEFAULT_ITEM_HEIGHT;
        }
        self.frame_minimum = self.frame_minimum.max(0);
        self.frame_maximum = self.frame_maximum.max(self.frame_minimum);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_use_defaults() {
        let settings: TimelineSettings = serde_json::from_str(r#"{ "row_count": 4 }"#).unwrap();
        assert_eq!(settings.row_count, 4);
        assert_eq!(settings.fps, DEFAULT_FPS);
        assert_eq!(settings.frame_maximum, DEFAULT_FRAME_MAXIMUM);
    }

    #[test]
    fn test_sanitized() {
        let settings = TimelineSettings {
            fps: 0.0,
            row_count: 1000,
            item_height: -2.0,
            frame_minimum: 50,
            frame_maximum: 10,
        }
        .sanitized();
        assert_eq!(settings.fps, DEFAULT_FPS);
        assert_eq!(settings.row_count, MAX_ROW_COUNT);
        assert_eq!(settings.item_height, DEFAULT_ITEM_HEIGHT);
        assert_eq!(settings.frame_maximum, 50);
    }
}
