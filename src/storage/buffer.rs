//! Bounded per-field point buffer.
//!
//! Points are keyed by timestamp, so pushing an already known timestamp
//! merges into the existing entry instead of growing the buffer. Once the
//! buffer is full, every new timestamp evicts the oldest retained one.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use super::point::Point;

/// Default number of points retained per field.
pub const DEFAULT_CAPACITY: usize = 100;

/// Fixed-capacity set of points with unique timestamps.
#[derive(Debug, Clone)]
pub struct PointBuffer {
    capacity: usize,
    points: HashMap<DateTime<Utc>, f64>,
    /// Eviction candidate. Unset until the buffer first overflows.
    oldest: Option<DateTime<Utc>>,
}

impl PointBuffer {
    /// Creates an empty buffer. A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            points: HashMap::with_capacity(capacity),
            oldest: None,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Adds a point, merging by timestamp and evicting the oldest when full.
    pub fn add(&mut self, point: Point) {
        if let Some(value) = self.points.get_mut(&point.timestamp) {
            *value = point.value;
            return;
        }

        if self.points.len() < self.capacity {
            self.points.insert(point.timestamp, point.value);
            return;
        }

        // First overflow: nothing has been tracked yet.
        let oldest = match self.oldest {
            Some(ts) => ts,
            None => match self.scan_oldest() {
                Some(ts) => ts,
                None => return,
            },
        };

        // Keeps the retained minimum from ever moving backwards.
        if point.timestamp < oldest {
            debug!(
                timestamp = %point.timestamp,
                oldest = %oldest,
                "dropping point older than retention window"
            );
            self.oldest = Some(oldest);
            return;
        }

        self.points.remove(&oldest);
        self.points.insert(point.timestamp, point.value);
        self.oldest = self.scan_oldest();
    }

    /// Returns the retained points sorted by timestamp.
    pub fn points(&self) -> Vec<Point> {
        let mut points: Vec<Point> = self
            .points
            .iter()
            .map(|(ts, value)| Point::new(*ts, *value))
            .collect();
        points.sort_by_key(|p| p.timestamp);
        points
    }

    /// Oldest retained timestamp, if any.
    pub fn oldest(&self) -> Option<DateTime<Utc>> {
        self.scan_oldest()
    }

    fn scan_oldest(&self) -> Option<DateTime<Utc>> {
        self.points.keys().min().copied()
    }
}
