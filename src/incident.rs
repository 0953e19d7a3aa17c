use chrono::{DateTime, Duration, Utc};
use nalgebra as na;
use serde_derive::Serialize;
use tracing::info;

use crate::bbox;
use crate::config::{Config, COLLISION_IOU, HIGH_VELOCITY};
use crate::detection::ObjectClass;
use crate::Track;

// keeps stream offsets within chrono's range
const MAX_OFFSET_MS: f64 = 1.0e12;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IncidentSeverity {
    Low,
    Moderate,
    High,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum IncidentStatus {
    Open,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Evidence {
    Video,
}

/// Record raised when a new object enters the scene.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    pub id: String,
    pub track_id: u32,
    pub severity: IncidentSeverity,
    #[serde(rename = "type")]
    pub kind: String,
    pub icon: String,
    pub location: String,
    pub time: DateTime<Utc>,
    pub timestamp: f64, // in seconds
    pub status: IncidentStatus,
    pub evidence: Vec<Evidence>,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_summary: Option<String>,
}

fn icon(class: ObjectClass) -> &'static str {
    match class {
        ObjectClass::Car => "🚗",
        ObjectClass::Truck => "🚚",
        ObjectClass::Bus => "🚌",
        ObjectClass::Motorcycle => "🏍️",
        ObjectClass::Bicycle => "🚲",
        ObjectClass::Person => "🚶",
    }
}

/// What the new track overlapped in the previous frame, if anything.
struct Narrative<'a> {
    partner: Option<&'a Track>,
    high_velocity: bool,
}

impl<'a> Narrative<'a> {
    fn build(track: &Track, previous: &'a [Track], now: f64) -> Self {
        let mut partner = None;
        let mut high_velocity = false;

        for p in previous {
            if bbox::iou(&track.bbox, &p.bbox) <= COLLISION_IOU {
                continue;
            }

            if partner.is_none() {
                partner = Some(p);
            }

            // a same-class neighbour may be this object seen one frame earlier
            if p.class == track.class {
                let dt = now - p.last_seen;
                if dt > 0.0 {
                    let speed = na::distance(&p.bbox.center(), &track.bbox.center()) / dt;
                    high_velocity |= speed > HIGH_VELOCITY;
                }
            }
        }

        Self {
            partner,
            high_velocity,
        }
    }

    fn severity(&self) -> IncidentSeverity {
        match (self.partner, self.high_velocity) {
            (Some(_), true) => IncidentSeverity::High,
            (Some(_), false) => IncidentSeverity::Moderate,
            (None, _) => IncidentSeverity::Low,
        }
    }
}

/// Turns newly opened tracks into incidents for one monitored location.
#[derive(Debug, Clone)]
pub struct IncidentEmitter {
    location: String,
    started_at: DateTime<Utc>,
    ai_summary: bool,
}

impl IncidentEmitter {
    pub fn new(config: &Config, started_at: DateTime<Utc>) -> Self {
        Self {
            location: config.location.clone(),
            started_at,
            ai_summary: config.ai_summary,
        }
    }

    /// Builds the incident for `track`, created at `now` (stream seconds).
    /// `previous` is the track set as it was before the frame that created it.
    pub fn emit(&self, track: &Track, previous: &[Track], now: f64) -> Incident {
        let narrative = Narrative::build(track, previous, now);
        let severity = narrative.severity();

        let offset_ms = if now.is_finite() {
            (now * 1000.0).round().clamp(-MAX_OFFSET_MS, MAX_OFFSET_MS)
        } else {
            0.0
        };

        let time = self
            .started_at
            .checked_add_signed(Duration::milliseconds(offset_ms as i64))
            .unwrap_or(self.started_at);

        let is_person = track.class == ObjectClass::Person;

        let (kind, description) = match narrative.partner {
            Some(partner) => {
                let kind = if is_person || partner.class == ObjectClass::Person {
                    "Pedestrian Collision"
                } else {
                    "Vehicle Collision"
                };

                (kind, format!("{} entered the scene overlapping {}", track.label, partner.label))
            }
            None if is_person => ("Pedestrian Detected", format!("{} entered the scene", track.label)),
            None => ("Vehicle Detected", format!("{} entered the scene", track.label)),
        };

        let ai_summary = if self.ai_summary {
            Some(summarize(track, previous, &narrative))
        } else {
            None
        };

        let incident = Incident {
            id: format!("#{}-{}", offset_ms as i64, track),
            track_id: track.id,
            severity,
            kind: kind.to_string(),
            icon: icon(track.class).to_string(),
            location: self.location.clone(),
            time,
            timestamp: now,
            status: IncidentStatus::Open,
            evidence: vec![Evidence::Video],
            description,
            ai_summary,
        };

        info!("incident {} ({:?}): {}", incident.id, incident.severity, incident.description);

        incident
    }
}

fn summarize(track: &Track, previous: &[Track], narrative: &Narrative<'_>) -> String {
    if let Some(partner) = narrative.partner {
        let velocity = if narrative.high_velocity {
            " at high velocity"
        } else {
            ""
        };

        return format!(
            "AI analysis: potential collision involving {} & {}{}. Immediate review recommended.",
            track.label, partner.label, velocity
        );
    }

    if track.class == ObjectClass::Person && !previous.iter().any(|t| t.class.is_vehicle()) {
        return format!(
            "AI analysis: {} detected in the scene with no vehicles nearby.",
            track.label
        );
    }

    if previous.is_empty() {
        format!("AI analysis: {} detected in the scene.", track.label)
    } else {
        format!(
            "AI analysis: {} moving in the scene alongside {} tracked object(s).",
            track.label,
            previous.len()
        )
    }
}
