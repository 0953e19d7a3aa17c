use nalgebra as na;
use std::rc::Rc;
use tracing::{debug, trace};

use crate::bbox::{self, BBox, Ltwh};
use crate::circular_queue::CircularQueue;
use crate::collision::{Velocities, VelocityKey};
use crate::config::{Config, MATCH_IOU};
use crate::detection::{Detection, ObjectClass};
use crate::{Frame, Track};

const HISTORY_LEN: usize = 8;

#[derive(Debug, Clone)]
struct Participant {
    id: u32,
    label: String,
    class: ObjectClass,
    bbox: BBox<Ltwh>,
    score: u32,
    created_at: f64,
    last_seen: f64,
    history: CircularQueue<(f64, na::Point2<f64>)>,
}

#[inline]
fn confidence_score(confidence: f64) -> u32 {
    (confidence * 100.0).round().clamp(0.0, 100.0) as u32
}

impl Participant {
    fn new(id: u32, label: String, class: ObjectClass, ts: f64, det: &Detection) -> Self {
        let mut history = CircularQueue::with_capacity(HISTORY_LEN);
        history.push((ts, det.bbox.center()));

        Self {
            id,
            label,
            class,
            bbox: det.bbox,
            score: confidence_score(det.confidence),
            created_at: ts,
            last_seen: ts,
            history,
        }
    }

    fn update(&mut self, ts: f64, det: &Detection) {
        self.history.push((ts, det.bbox.center()));
        self.bbox = det.bbox;
        self.score = confidence_score(det.confidence);
        self.last_seen = ts;
    }

    /// Displacement between the two latest centers over the time between them.
    fn velocity(&self) -> Option<f64> {
        let mut iter = self.history.iter();

        let (ts, pos) = iter.next()?;
        let (prev_ts, prev_pos) = iter.next()?;

        let dt = ts - prev_ts;
        if dt > 0.0 {
            Some(na::distance(prev_pos, pos) / dt)
        } else {
            None
        }
    }

    fn snapshot(&self) -> Track {
        Track {
            id: self.id,
            label: self.label.clone(),
            class: self.class,
            bbox: self.bbox,
            score: self.score,
            created_at: self.created_at,
            last_seen: self.last_seen,
            velocity: self.velocity(),
        }
    }
}

/// Outcome of associating one frame with the track set.
#[derive(Debug, Clone)]
pub struct Association {
    /// Tracks active before this frame.
    pub previous: Rc<[Track]>,
    /// Tracks opened by this frame, in detection order.
    pub created: Vec<Track>,
    /// Speed of every detection that continued a track, keyed by its index
    /// in the frame.
    pub velocities: Velocities,
}

/// Frame-to-frame IoU tracker.
///
/// Each recognized detection continues the same-class track it overlaps most
/// (IoU above [`MATCH_IOU`]) or opens a new one. Tracks not matched in a frame
/// are dropped right away.
pub struct Tracker {
    config: Config,
    next_id: u32,
    participants: Vec<Participant>,
}

impl Tracker {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
            next_id: 1,
            participants: Vec::new(),
        }
    }

    pub fn update(&mut self, frame: &Frame) -> Association {
        let previous = self.tracks();

        let mut existing: Vec<Option<Participant>> = std::mem::take(&mut self.participants)
            .into_iter()
            .map(Some)
            .collect();

        let mut active = Vec::with_capacity(frame.len());
        let mut created = Vec::new();
        let mut velocities = Velocities::new();

        for (index, det) in frame.iter().enumerate() {
            let class = match det.object_class() {
                Some(class) => class,
                None => continue,
            };

            // strict maximum, first encountered wins on ties
            let mut best: Option<(usize, f64)> = None;
            for (idx, p) in existing.iter().enumerate() {
                let p = match p {
                    Some(p) if p.class == class => p,
                    _ => continue,
                };

                let iou = bbox::iou(&p.bbox, &det.bbox);
                if iou > MATCH_IOU && best.map_or(true, |(_, b)| iou > b) {
                    best = Some((idx, iou));
                }
            }

            match best.and_then(|(idx, _)| existing[idx].take()) {
                Some(mut p) => {
                    p.update(frame.timestamp, det);

                    let velocity = p.velocity();
                    trace!("{}-{} matched detection {} ({:?} px/s)", p.label, p.id, index, velocity);

                    if let Some(velocity) = velocity {
                        velocities.insert(VelocityKey::new(&det.class, index), velocity);
                    }

                    active.push(p);
                }
                None => {
                    let id = self.next_id;
                    self.next_id += 1;

                    let p = Participant::new(id, self.config.label_for(&det.class), class, frame.timestamp, det);
                    debug!("new track {}-{} at {:?}", p.label, p.id, p.bbox.as_slice());

                    created.push(p.snapshot());
                    active.push(p);
                }
            }
        }

        for p in existing.iter().flatten() {
            debug!("track {}-{} lost", p.label, p.id);
        }

        self.participants = active;

        Association {
            previous,
            created,
            velocities,
        }
    }

    #[inline]
    pub fn tracks(&self) -> Rc<[Track]> {
        self.participants.iter().map(Participant::snapshot).collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn reset(&mut self) {
        self.participants.clear();
        self.next_id = 1;
    }
}

impl Default for Tracker {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}
