use serde_derive::Serialize;
use std::fmt;

use crate::collision::CollisionPair;
use crate::config::{
    COLLISION_CAP, DECAY_RATE, HIGH_CONFIDENCE, HIGH_CONFIDENCE_CAP, HIGH_VELOCITY, PROXIMITY_IOU,
    PROXIMITY_PADDING, VEHICLE_CAP,
};
use crate::detection::Detection;

const BASE_SCORE: u32 = 50;
const SESSION_BASELINE: u32 = 10;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum SeverityLabel {
    Low,
    Moderate,
    Critical,
}

impl SeverityLabel {
    /// Labels a single-frame score.
    pub fn for_frame(score: u32) -> Self {
        if score >= 75 {
            SeverityLabel::Critical
        } else if score >= 50 {
            SeverityLabel::Moderate
        } else {
            SeverityLabel::Low
        }
    }

    /// Labels the smoothed session score, which flips earlier than the
    /// per-frame label.
    pub fn for_session(score: u32) -> Self {
        if score >= 70 {
            SeverityLabel::Critical
        } else if score >= 40 {
            SeverityLabel::Moderate
        } else {
            SeverityLabel::Low
        }
    }
}

impl fmt::Display for SeverityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SeverityLabel::Low => "LOW",
            SeverityLabel::Moderate => "MODERATE",
            SeverityLabel::Critical => "CRITICAL",
        })
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct SeverityResult {
    pub score: u32,
    pub label: SeverityLabel,
    pub factors: Vec<String>,
}

fn pedestrian_near_vehicle(pedestrian: &Detection, vehicles: &[&Detection]) -> bool {
    let zone = pedestrian.bbox.expand(PROXIMITY_PADDING);

    vehicles
        .iter()
        .any(|v| crate::bbox::iou(&zone, &v.bbox) > PROXIMITY_IOU)
}

/// Scores a single frame, 0..=100.
///
/// Starts from 50 and adds, each capped on its own:
/// * +10 per vehicle, up to 3
/// * +15 when a pedestrian is close to any vehicle
/// * +5 per collision, up to 4
/// * +10 when any collision or detection is above the high velocity floor
/// * +5 per detection with confidence above 0.9, up to 2
pub fn score(detections: &[Detection], collisions: &[CollisionPair]) -> SeverityResult {
    let mut factors = Vec::new();
    let mut score = BASE_SCORE;

    let vehicles: Vec<&Detection> = detections.iter().filter(|d| d.is_vehicle()).collect();

    if !vehicles.is_empty() {
        score += 10 * vehicles.len().min(VEHICLE_CAP) as u32;
        factors.push(format!("{} vehicle(s) detected", vehicles.len()));
    }

    let pedestrian_near = detections
        .iter()
        .filter(|d| d.is_person())
        .any(|p| pedestrian_near_vehicle(p, &vehicles));

    if pedestrian_near {
        score += 15;
        factors.push("Pedestrian in proximity to vehicles".to_string());
    }

    if !collisions.is_empty() {
        score += 5 * collisions.len().min(COLLISION_CAP) as u32;
        factors.push(format!("{} potential collision(s) detected", collisions.len()));
    }

    let high_velocity = collisions.iter().any(|c| c.high_velocity)
        || detections
            .iter()
            .any(|d| d.velocity.map_or(false, |v| v > HIGH_VELOCITY));

    if high_velocity {
        score += 10;
        factors.push("High velocity impact detected".to_string());
    }

    let high_confidence = detections
        .iter()
        .filter(|d| d.confidence > HIGH_CONFIDENCE)
        .count()
        .min(HIGH_CONFIDENCE_CAP);

    if high_confidence > 0 {
        score += 5 * high_confidence as u32;
        factors.push(format!("{} high-confidence detection(s)", high_confidence));
    }

    let score = score.min(100);

    SeverityResult {
        score,
        label: SeverityLabel::for_frame(score),
        factors,
    }
}

/// Peak-hold smoother over per-frame scores: rises to a new peak at once,
/// falls back by at most `DECAY_RATE` points per update and never below the
/// current frame's own score.
#[derive(Debug, Clone)]
pub struct SeverityTracker {
    last_score: u32,
    peak_score: u32,
}

impl SeverityTracker {
    pub fn new() -> Self {
        Self {
            last_score: SESSION_BASELINE,
            peak_score: SESSION_BASELINE,
        }
    }

    pub fn update(&mut self, detections: &[Detection], collisions: &[CollisionPair]) -> SeverityResult {
        let current = score(detections, collisions);

        if current.score >= self.peak_score {
            self.peak_score = current.score;
        } else {
            self.peak_score = current
                .score
                .max(self.peak_score.saturating_sub(DECAY_RATE));
        }
        self.last_score = self.peak_score;

        SeverityResult {
            score: self.last_score,
            label: SeverityLabel::for_session(self.last_score),
            factors: current.factors,
        }
    }

    #[inline]
    pub fn score(&self) -> u32 {
        self.last_score
    }

    #[inline]
    pub fn peak(&self) -> u32 {
        self.peak_score
    }

    #[inline]
    pub fn label(&self) -> SeverityLabel {
        SeverityLabel::for_session(self.last_score)
    }

    pub fn reset(&mut self) {
        self.last_score = SESSION_BASELINE;
        self.peak_score = SESSION_BASELINE;
    }
}

impl Default for SeverityTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bbox::BBox;

    fn det(class: &str, confidence: f64, x: f64, y: f64, w: f64, h: f64) -> Detection {
        Detection::new(class, confidence, BBox::ltwh(x, y, w, h))
    }

    fn collision(pair: &str, high_velocity: bool) -> CollisionPair {
        CollisionPair {
            pair: pair.to_string(),
            iou: 0.3,
            high_velocity,
        }
    }

    #[test]
    fn test_empty_frame() {
        let result = score(&[], &[]);

        assert_eq!(result.score, 50);
        assert_eq!(result.label, SeverityLabel::Moderate);
        assert!(result.factors.is_empty());
    }

    #[test]
    fn test_three_vehicles() {
        let dets = vec![
            det("car", 0.9, 0.0, 0.0, 50.0, 50.0),
            det("truck", 0.85, 100.0, 0.0, 60.0, 60.0),
            det("bus", 0.8, 200.0, 0.0, 70.0, 70.0),
        ];
        let result = score(&dets, &[]);

        assert!(result.score >= 80);
        assert_eq!(result.label, SeverityLabel::Critical);
        assert_eq!(result.factors, vec!["3 vehicle(s) detected"]);
    }

    #[test]
    fn test_vehicle_count_capped_but_reported() {
        let dets: Vec<_> = (0..5)
            .map(|i| det("car", 0.5, i as f64 * 100.0, 0.0, 50.0, 50.0))
            .collect();
        let result = score(&dets, &[]);

        assert_eq!(result.score, 80);
        assert_eq!(result.factors, vec!["5 vehicle(s) detected"]);
    }

    #[test]
    fn test_pedestrian_near_vehicle() {
        let dets = vec![
            det("car", 0.9, 100.0, 100.0, 100.0, 100.0),
            det("person", 0.85, 120.0, 120.0, 30.0, 60.0),
        ];
        let result = score(&dets, &[]);

        assert_eq!(result.score, 75);
        assert!(result
            .factors
            .contains(&"Pedestrian in proximity to vehicles".to_string()));
    }

    #[test]
    fn test_pedestrian_far_from_vehicle() {
        let dets = vec![
            det("car", 0.5, 0.0, 0.0, 100.0, 100.0),
            det("person", 0.5, 800.0, 800.0, 30.0, 60.0),
        ];
        let result = score(&dets, &[]);

        assert_eq!(result.score, 60);
        assert_eq!(result.factors, vec!["1 vehicle(s) detected"]);
    }

    #[test]
    fn test_two_collisions() {
        let result = score(&[], &[collision("Car & Truck", false), collision("Car & Bus", false)]);

        assert_eq!(result.score, 60);
        assert_eq!(result.factors, vec!["2 potential collision(s) detected"]);
    }

    #[test]
    fn test_detection_velocity() {
        let dets = vec![det("car", 0.9, 0.0, 0.0, 50.0, 50.0).with_velocity(250.0)];
        let result = score(&dets, &[]);

        assert!(result
            .factors
            .contains(&"High velocity impact detected".to_string()));

        let dets = vec![det("car", 0.9, 0.0, 0.0, 50.0, 50.0).with_velocity(200.0)];
        assert_eq!(score(&dets, &[]).score, 60);
    }

    #[test]
    fn test_high_confidence_capped() {
        let dets = vec![
            det("dog", 0.95, 0.0, 0.0, 10.0, 10.0),
            det("dog", 0.95, 20.0, 0.0, 10.0, 10.0),
            det("dog", 0.95, 40.0, 0.0, 10.0, 10.0),
        ];
        let result = score(&dets, &[]);

        assert_eq!(result.score, 60);
        assert_eq!(result.factors, vec!["2 high-confidence detection(s)"]);
    }

    #[test]
    fn test_factor_order_and_cap() {
        let dets = vec![
            det("car", 0.95, 0.0, 0.0, 100.0, 100.0),
            det("truck", 0.92, 50.0, 50.0, 100.0, 100.0),
            det("bus", 0.91, 100.0, 100.0, 100.0, 100.0),
            det("person", 0.9, 70.0, 70.0, 30.0, 60.0),
        ];
        let collisions = vec![
            collision("Car & Truck", true),
            collision("Car & Bus", true),
            collision("Truck & Bus", false),
            collision("Car & Person", true),
        ];
        let result = score(&dets, &collisions);

        assert_eq!(result.score, 100);
        assert_eq!(result.label, SeverityLabel::Critical);
        assert_eq!(
            result.factors,
            vec![
                "3 vehicle(s) detected",
                "Pedestrian in proximity to vehicles",
                "4 potential collision(s) detected",
                "High velocity impact detected",
                "2 high-confidence detection(s)",
            ]
        );
    }

    #[test]
    fn test_frame_labels() {
        assert_eq!(SeverityLabel::for_frame(75), SeverityLabel::Critical);
        assert_eq!(SeverityLabel::for_frame(74), SeverityLabel::Moderate);
        assert_eq!(SeverityLabel::for_frame(50), SeverityLabel::Moderate);
        assert_eq!(SeverityLabel::for_frame(49), SeverityLabel::Low);
    }

    #[test]
    fn test_session_labels() {
        assert_eq!(SeverityLabel::for_session(70), SeverityLabel::Critical);
        assert_eq!(SeverityLabel::for_session(69), SeverityLabel::Moderate);
        assert_eq!(SeverityLabel::for_session(40), SeverityLabel::Moderate);
        assert_eq!(SeverityLabel::for_session(39), SeverityLabel::Low);
    }

    #[test]
    fn test_tracker_starts_at_baseline() {
        let tracker = SeverityTracker::new();

        assert_eq!(tracker.score(), 10);
        assert_eq!(tracker.label(), SeverityLabel::Low);
    }

    #[test]
    fn test_tracker_rises_immediately() {
        let mut tracker = SeverityTracker::new();
        let dets = vec![
            det("car", 0.9, 0.0, 0.0, 100.0, 100.0),
            det("truck", 0.85, 20.0, 20.0, 100.0, 100.0),
        ];

        // 50 + 20 vehicles + 5 collision + 10 velocity
        let result = tracker.update(&dets, &[collision("Car & Truck", true)]);

        assert_eq!(result.score, 85);
        assert_eq!(result.label, SeverityLabel::Critical);
        assert_eq!(tracker.score(), 85);
    }

    #[test]
    fn test_tracker_decays_slowly() {
        let mut tracker = SeverityTracker::new();
        let dets = vec![
            det("car", 0.9, 0.0, 0.0, 100.0, 100.0),
            det("truck", 0.85, 20.0, 20.0, 100.0, 100.0),
        ];
        tracker.update(&dets, &[collision("Car & Truck", true)]);

        let result = tracker.update(&[], &[]);
        assert_eq!(result.score, 83);
        assert!(result.factors.is_empty());

        for _ in 0..20 {
            tracker.update(&[], &[]);
        }

        // never below the frame's own score
        assert_eq!(tracker.score(), 50);
        assert_eq!(tracker.peak(), 50);
        assert_eq!(tracker.label(), SeverityLabel::Moderate);
    }

    #[test]
    fn test_tracker_decays_then_rises() {
        let mut tracker = SeverityTracker::new();
        tracker.update(&[], &[collision("A & B", false), collision("A & C", false)]);
        assert_eq!(tracker.score(), 60);

        // frame scores 55, decay stops at 58
        let result = tracker.update(&[], &[collision("A & B", false)]);
        assert_eq!(result.score, 58);
        assert_eq!(result.label, SeverityLabel::Moderate);

        let result = tracker.update(
            &[],
            &[collision("A & B", false), collision("A & C", false), collision("B & C", false)],
        );
        assert_eq!(result.score, 65);
        assert_eq!(tracker.peak(), 65);
    }

    #[test]
    fn test_tracker_reset() {
        let mut tracker = SeverityTracker::new();
        tracker.update(&[det("car", 0.9, 0.0, 0.0, 50.0, 50.0)], &[]);
        tracker.reset();

        assert_eq!(tracker.score(), 10);
        assert_eq!(tracker.peak(), 10);
    }
}
