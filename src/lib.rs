pub mod bbox;
pub mod collision;
pub mod config;
pub mod detection;
pub mod error;
pub mod frame;
pub mod incident;
pub mod session;
pub mod severity;
pub mod tracker;

mod circular_queue;
mod track;

pub use collision::{detect_collisions, CollisionPair, Velocities, VelocityKey};
pub use config::Config;
pub use detection::{Detection, ObjectClass};
pub use frame::Frame;
pub use incident::{Incident, IncidentEmitter, IncidentSeverity};
pub use session::{Event, EventSink, FrameReport, Session};
pub use severity::{SeverityLabel, SeverityResult, SeverityTracker};
pub use track::Track;
pub use tracker::Tracker;

use chrono::Utc;
use std::collections::HashMap;
use std::rc::Rc;

pub trait Monitoring {
    fn update(&mut self, frame: &Frame, src: &str, sink: &mut dyn EventSink) -> FrameReport;
    fn tracks(&self, src: &str) -> Rc<[Track]>;
    fn reset(&mut self, src: &str);
}

/// Runs one independent [`Session`] per video source.
pub struct IncidentMonitor {
    config: Config,
    sessions: HashMap<String, Session>,
}

impl IncidentMonitor {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            sessions: HashMap::new(),
        }
    }

    #[inline]
    pub fn session(&self, src: &str) -> Option<&Session> {
        self.sessions.get(src)
    }
}

impl Default for IncidentMonitor {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl crate::Monitoring for IncidentMonitor {
    fn update(&mut self, frame: &Frame, src: &str, sink: &mut dyn EventSink) -> FrameReport {
        let config = &self.config;

        let session = self.sessions.entry(src.to_string()).or_insert_with(|| {
            tracing::info!("starting session for {}", src);

            let config = Config {
                location: config.location_for(src),
                ..config.clone()
            };

            Session::new(&config, Utc::now())
        });

        session.process(frame, sink)
    }

    #[inline]
    fn tracks(&self, src: &str) -> Rc<[Track]> {
        if let Some(session) = self.sessions.get(src) {
            return session.tracked_objects();
        }

        Rc::new([])
    }

    fn reset(&mut self, src: &str) {
        if let Some(session) = self.sessions.get_mut(src) {
            session.reset();
        }
    }
}
