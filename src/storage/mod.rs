//! In-memory time-series storage.
//!
//! - `point` - timestamped observation
//! - `buffer` - bounded, timestamp-keyed buffer for a single field
//! - `store` - locked map of buffers plus counter-to-delta conversion

mod buffer;
mod point;
mod store;

pub use buffer::{DEFAULT_CAPACITY, PointBuffer};
pub use point::Point;
pub use store::Store;
