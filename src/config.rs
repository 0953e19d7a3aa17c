use serde_derive::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::detection::capitalize;
use crate::error::Error;

/// Minimum IoU for a detection to continue an existing track.
pub const MATCH_IOU: f64 = 0.30;
/// Minimum IoU for two objects to count as a potential collision.
pub const COLLISION_IOU: f64 = 0.15;
/// Minimum IoU between a padded pedestrian box and a vehicle.
pub const PROXIMITY_IOU: f64 = 0.10;
pub const PROXIMITY_PADDING: f64 = 50.0;
/// px/s
pub const HIGH_VELOCITY: f64 = 200.0;
pub const HIGH_CONFIDENCE: f64 = 0.90;
pub const DECAY_RATE: u32 = 2;

pub const VEHICLE_CAP: usize = 3;
pub const COLLISION_CAP: usize = 4;
pub const HIGH_CONFIDENCE_CAP: usize = 2;

/// Session settings loaded from a JSON file. Numeric thresholds are fixed and
/// live in the constants above.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub location: String,
    /// Per-source location names used by the multi-source monitor.
    pub locations: HashMap<String, String>,
    pub labels: HashMap<String, String>,
    pub ai_summary: bool,
}

impl Default for Config {
    fn default() -> Self {
        let mut labels = HashMap::new();
        labels.insert("person".to_string(), "Pedestrian".to_string());

        Self {
            location: "Camera 1".to_string(),
            locations: HashMap::new(),
            labels,
            ai_summary: true,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Location reported for incidents from source `src`, falling back to
    /// the configured `location`.
    pub fn location_for(&self, src: &str) -> String {
        self.locations
            .get(src)
            .cloned()
            .unwrap_or_else(|| self.location.clone())
    }

    /// Display label for a class: the label map entry if any, otherwise the
    /// capitalized class name.
    pub fn label_for(&self, class: &str) -> String {
        self.labels
            .get(class)
            .cloned()
            .unwrap_or_else(|| capitalize(class))
    }
}
