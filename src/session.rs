use chrono::{DateTime, Utc};
use serde_derive::Serialize;
use std::rc::Rc;
use tracing::{debug, warn};

use crate::collision::{detect_collisions, CollisionPair, Velocities, VelocityKey};
use crate::config::Config;
use crate::detection::Detection;
use crate::incident::{Incident, IncidentEmitter};
use crate::severity::{SeverityLabel, SeverityResult, SeverityTracker};
use crate::tracker::Tracker;
use crate::{Frame, Track};

/// Receiver of the pipeline's notifications.
pub trait EventSink {
    /// Called once per processed frame with the smoothed score.
    fn severity_update(&mut self, score: u32, label: SeverityLabel, factors: &[String]);

    /// Called once per newly created track.
    fn incident_detected(&mut self, incident: &Incident);
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum Event {
    Severity {
        score: u32,
        label: SeverityLabel,
        factors: Vec<String>,
    },
    Incident(Incident),
}

impl EventSink for Vec<Event> {
    fn severity_update(&mut self, score: u32, label: SeverityLabel, factors: &[String]) {
        self.push(Event::Severity {
            score,
            label,
            factors: factors.to_vec(),
        });
    }

    fn incident_detected(&mut self, incident: &Incident) {
        self.push(Event::Incident(incident.clone()));
    }
}

#[derive(Debug, Clone)]
pub struct FrameReport {
    pub timestamp: f64,
    pub severity: SeverityResult,
    pub collisions: Vec<CollisionPair>,
    pub tracks: Rc<[Track]>,
    pub incidents: Vec<Incident>,
}

/// The whole per-frame pipeline for one video source. Owns all mutable state
/// of a monitoring session; drive it from a single loop.
pub struct Session {
    tracker: Tracker,
    severity: SeverityTracker,
    emitter: IncidentEmitter,
    last_timestamp: Option<f64>,
}

impl Session {
    pub fn new(config: &Config, started_at: DateTime<Utc>) -> Self {
        Self {
            tracker: Tracker::new(config),
            severity: SeverityTracker::new(),
            emitter: IncidentEmitter::new(config, started_at),
            last_timestamp: None,
        }
    }

    pub fn process(&mut self, frame: &Frame, sink: &mut dyn EventSink) -> FrameReport {
        if let Some(last) = self.last_timestamp {
            if frame.timestamp < last {
                warn!("frame at {:.3}s is older than previous frame at {:.3}s", frame.timestamp, last);
            }
        }
        self.last_timestamp = Some(frame.timestamp);

        let frame = frame.recognized();
        let assoc = self.tracker.update(&frame);

        let mut incidents = Vec::with_capacity(assoc.created.len());
        for track in &assoc.created {
            let incident = self.emitter.emit(track, &assoc.previous, frame.timestamp);
            sink.incident_detected(&incident);
            incidents.push(incident);
        }

        // velocity reported by the perception model wins over our estimate
        let detections: Vec<Detection> = frame
            .iter()
            .enumerate()
            .map(|(index, det)| {
                let mut det = det.clone();
                if det.velocity.is_none() {
                    det.velocity = assoc
                        .velocities
                        .get(&VelocityKey::new(&det.class, index))
                        .copied();
                }
                det
            })
            .collect();

        let velocities: Velocities = detections
            .iter()
            .enumerate()
            .filter_map(|(index, det)| Some((VelocityKey::new(&det.class, index), det.velocity?)))
            .collect();

        let collisions = detect_collisions(&detections, &velocities);
        let severity = self.severity.update(&detections, &collisions);

        debug!(
            "frame {:.3}s: {} detection(s), {} collision(s), severity {} {}",
            frame.timestamp,
            detections.len(),
            collisions.len(),
            severity.score,
            severity.label
        );

        sink.severity_update(severity.score, severity.label, &severity.factors);

        FrameReport {
            timestamp: frame.timestamp,
            severity,
            collisions,
            tracks: self.tracker.tracks(),
            incidents,
        }
    }

    #[inline]
    pub fn tracked_objects(&self) -> Rc<[Track]> {
        self.tracker.tracks()
    }

    #[inline]
    pub fn score(&self) -> u32 {
        self.severity.score()
    }

    pub fn reset(&mut self) {
        self.tracker.reset();
        self.severity.reset();
        self.last_timestamp = None;
    }
}
