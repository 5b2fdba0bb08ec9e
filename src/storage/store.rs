//! Thread-safe time-series store shared by ingestion and rendering.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::buffer::PointBuffer;
use super::point::Point;

#[derive(Debug, Default)]
struct Inner {
    buffers: HashMap<String, PointBuffer>,
    /// Last raw reading per counter field, before delta conversion.
    last_raw: HashMap<String, Point>,
}

/// Per-field point buffers behind a single lock.
///
/// Buffers and counter state are created lazily on the first push for a
/// field and live as long as the store.
#[derive(Debug)]
pub struct Store {
    capacity: usize,
    inner: Mutex<Inner>,
}

impl Store {
    /// Creates an empty store retaining up to `capacity` points per field.
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Pushes one raw observation.
    ///
    /// Counter fields store the difference to the previous raw reading. The
    /// first reading of a counter (or one following a non-positive reading)
    /// stores `0`.
    pub fn push_single(&self, field_id: &str, raw: Point, is_counter: bool) {
        let mut inner = self.lock();
        inner.push(field_id, raw, is_counter, self.capacity);
    }

    /// Pushes several raw observations in timestamp order.
    ///
    /// Sorting happens before any counter delta is computed, so deltas are
    /// always taken against the chronological predecessor.
    pub fn push_batch(&self, field_id: &str, mut raw: Vec<Point>, is_counter: bool) {
        raw.sort_by_key(|p| p.timestamp);
        let mut inner = self.lock();
        for point in raw {
            inner.push(field_id, point, is_counter, self.capacity);
        }
    }

    /// Returns a copy of the retained points, oldest first.
    pub fn snapshot(&self, field_id: &str) -> Vec<Point> {
        self.lock()
            .buffers
            .get(field_id)
            .map(PointBuffer::points)
            .unwrap_or_default()
    }

    /// Number of points retained for a field.
    pub fn len(&self, field_id: &str) -> usize {
        self.lock().buffers.get(field_id).map_or(0, PointBuffer::len)
    }

    /// Number of fields that received at least one point.
    pub fn field_count(&self) -> usize {
        self.lock().buffers.len()
    }

    // Buffer mutations never leave a half-written entry behind, so a panic in
    // another holder does not invalidate the data.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Inner {
    fn push(&mut self, field_id: &str, raw: Point, is_counter: bool, capacity: usize) {
        let value = if is_counter {
            let delta = match self.last_raw.get(field_id) {
                Some(last) if last.value > 0.0 => raw.value - last.value,
                _ => 0.0,
            };
            self.last_raw.insert(field_id.to_string(), raw);
            delta
        } else {
            raw.value
        };

        self.buffers
            .entry(field_id.to_string())
            .or_insert_with(|| PointBuffer::new(capacity))
            .add(Point::new(raw.timestamp, value));
    }
}
