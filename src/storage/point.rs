//! A single timestamped observation.

use chrono::{DateTime, Utc};

/// One sample of a metric.
///
/// Two points are equal when both timestamp and value match. Ordering between
/// points only ever looks at the timestamp, see [`Point::is_before`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl Point {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }

    /// Returns `true` if this point was observed strictly before `other`.
    pub fn is_before(&self, other: &Point) -> bool {
        self.timestamp < other.timestamp
    }
}
