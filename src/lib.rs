//! liveplot - live terminal charts for polled metrics.
//!
//! Metrics are pulled from a source (an HTTP JSON endpoint, the Datadog
//! query API or standard input), kept in a bounded in-memory store and
//! redrawn as one chart per display group on a fixed tick.
//!
//! - `liveplot` - the chart viewer
//! - `liveplot-producer` - a demo endpoint serving random metrics

pub mod config;
pub mod field;
pub mod fmt;
pub mod runtime;
pub mod source;
pub mod storage;
pub mod tui;
