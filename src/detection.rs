use serde_derive::{Deserialize, Serialize};
use std::fmt;

use crate::bbox::{self, BBox, Ltwh};

/// Object categories the tracker follows. Everything else the perception
/// model reports is ignored.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ObjectClass {
    Car,
    Truck,
    Bus,
    Motorcycle,
    Bicycle,
    Person,
}

impl ObjectClass {
    pub fn parse(label: &str) -> Option<Self> {
        Some(match label {
            "car" => ObjectClass::Car,
            "truck" => ObjectClass::Truck,
            "bus" => ObjectClass::Bus,
            "motorcycle" => ObjectClass::Motorcycle,
            "bicycle" => ObjectClass::Bicycle,
            "person" => ObjectClass::Person,
            _ => return None,
        })
    }

    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectClass::Car => "car",
            ObjectClass::Truck => "truck",
            ObjectClass::Bus => "bus",
            ObjectClass::Motorcycle => "motorcycle",
            ObjectClass::Bicycle => "bicycle",
            ObjectClass::Person => "person",
        }
    }

    #[inline]
    pub fn is_vehicle(&self) -> bool {
        !matches!(self, ObjectClass::Person)
    }
}

impl fmt::Display for ObjectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observation of the perception model in one frame.
///
/// `bbox` is `[x, y, width, height]` in frame pixels, `velocity` is a scalar
/// speed in pixels per second when one has been estimated.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Detection {
    pub class: String,
    pub confidence: f64,
    pub bbox: BBox<Ltwh>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub velocity: Option<f64>,
}

impl Detection {
    pub fn new(class: &str, confidence: f64, bbox: BBox<Ltwh>) -> Self {
        Self {
            class: class.to_string(),
            confidence,
            bbox,
            velocity: None,
        }
    }

    #[inline]
    pub fn with_velocity(mut self, velocity: f64) -> Self {
        self.velocity = Some(velocity);
        self
    }

    #[inline]
    pub fn object_class(&self) -> Option<ObjectClass> {
        ObjectClass::parse(&self.class)
    }

    #[inline]
    pub fn is_vehicle(&self) -> bool {
        self.object_class().map_or(false, |c| c.is_vehicle())
    }

    #[inline]
    pub fn is_person(&self) -> bool {
        self.object_class() == Some(ObjectClass::Person)
    }

    #[inline]
    pub fn iou(&self, other: &Detection) -> f64 {
        bbox::iou(&self.bbox, &other.bbox)
    }
}

/// Upper-cases the first character: `"car"` -> `"Car"`.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
