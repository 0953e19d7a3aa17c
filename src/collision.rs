use serde_derive::Serialize;
use std::collections::HashMap;
use std::fmt;

use crate::config::{COLLISION_IOU, HIGH_VELOCITY};
use crate::detection::{capitalize, Detection};

/// Addresses a detection within one frame: its class and its index in the
/// frame's detection list. Renders as `"{class}-{index}"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VelocityKey {
    pub class: String,
    pub index: usize,
}

impl VelocityKey {
    pub fn new(class: &str, index: usize) -> Self {
        Self {
            class: class.to_string(),
            index,
        }
    }
}

impl fmt::Display for VelocityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.class, self.index)
    }
}

/// Per-detection speed estimates in px/s.
pub type Velocities = HashMap<VelocityKey, f64>;

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CollisionPair {
    pub pair: String,
    pub iou: f64,
    pub high_velocity: bool,
}

/// Reports every pair of detections in the frame overlapping by more than
/// [`COLLISION_IOU`]. Each unordered pair appears at most once, labelled in
/// list order.
pub fn detect_collisions(detections: &[Detection], velocities: &Velocities) -> Vec<CollisionPair> {
    let speed = |det: &Detection, index: usize| {
        velocities
            .get(&VelocityKey::new(&det.class, index))
            .copied()
            .unwrap_or(0.0)
    };

    let mut collisions = Vec::new();

    for (i, a) in detections.iter().enumerate() {
        for (j, b) in detections.iter().enumerate().skip(i + 1) {
            let iou = a.iou(b);
            if iou <= COLLISION_IOU {
                continue;
            }

            let high_velocity = speed(a, i) > HIGH_VELOCITY || speed(b, j) > HIGH_VELOCITY;

            tracing::trace!(
                "collision {}-{} / {}-{}: iou {:.3}, high velocity {}",
                a.class,
                i,
                b.class,
                j,
                iou,
                high_velocity
            );

            collisions.push(CollisionPair {
                pair: format!("{} & {}", capitalize(&a.class), capitalize(&b.class)),
                iou,
                high_velocity,
            });
        }
    }

    collisions
}
