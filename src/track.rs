use serde_derive::Serialize;
use std::fmt;

use crate::bbox::{BBox, Ltwh};
use crate::detection::ObjectClass;

/// Snapshot of a tracked object, handed out to consumers.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: u32,
    pub label: String,
    pub class: ObjectClass,
    pub bbox: BBox<Ltwh>,

    // last confidence, 0..=100
    pub score: u32,

    // in seconds
    pub created_at: f64,
    pub last_seen: f64,

    // in px/s
    #[serde(skip_serializing_if = "Option::is_none")]
    pub velocity: Option<f64>,
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.label, self.id)
    }
}
