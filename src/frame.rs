use crate::detection::Detection;
use crate::error::Error;

#[derive(Debug, Clone, Default)]
pub struct Frame {
    pub timestamp: f64, // in seconds
    pub detections: Vec<Detection>,
}

impl Frame {
    pub fn new(timestamp: f64, detections: Vec<Detection>) -> Self {
        Self {
            timestamp,
            detections,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.detections.len()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Detection> {
        self.detections.iter()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    /// Copy of the frame holding only the classes the tracker follows.
    pub fn recognized(&self) -> Frame {
        Frame {
            timestamp: self.timestamp,
            detections: self
                .detections
                .iter()
                .filter(|d| d.object_class().is_some())
                .cloned()
                .collect(),
        }
    }

    /// Parses one line of a recorded detection stream:
    /// `{timestamp_ms}:{json array of detections}`.
    pub fn parse_line(line: &str, line_no: usize) -> Result<Frame, Error> {
        let err = |reason: &str| Error::Frame {
            line: line_no,
            reason: reason.to_string(),
        };

        let idx = line.find(':').ok_or_else(|| err("expected `:`"))?;
        let (ts, vector) = line.split_at(idx);

        let ts: f64 = ts
            .trim()
            .parse()
            .map_err(|_| err("parse timestamp failed"))?;

        if !ts.is_finite() {
            return Err(err("timestamp is not finite"));
        }

        let detections: Vec<Detection> = serde_json::from_str(&vector[1..])
            .map_err(|e| err(&format!("parse json failed: {}", e)))?;

        Ok(Frame::new(ts / 1000.0, detections))
    }
}
