//! Metric sources.
//!
//! This module defines the `Source` trait through which the ingestion task
//! pulls data, independent of where it comes from:
//! - `HttpFetcher`: polls an expvar-style JSON endpoint
//! - `DatadogFetcher`: queries the Datadog metrics API
//! - `StreamSource`: reads JSON lines from standard input
//!
//! Fetchers run on a background thread owned by a [`PolledSource`], which
//! hands one result at a time to the consumer.

mod datadog;
mod http;
pub mod json;
pub mod mock;
pub mod poller;
mod stream;

pub use datadog::DatadogFetcher;
pub use http::HttpFetcher;
pub use poller::{Fetch, PolledSource};
pub use stream::StreamSource;

use std::collections::HashMap;
use std::fmt;

use crate::config::{Config, SourceConfig};
use crate::field::GraphSpec;
use crate::runtime::Shutdown;
use crate::storage::Point;

/// Observations from one fetch cycle, keyed by field ID.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchResult {
    points: HashMap<String, Vec<Point>>,
}

impl FetchResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `field_id` was part of this cycle, even with no points.
    pub fn declare(&mut self, field_id: &str) {
        self.points.entry(field_id.to_string()).or_default();
    }

    pub fn push(&mut self, field_id: &str, point: Point) {
        self.points
            .entry(field_id.to_string())
            .or_default()
            .push(point);
    }

    /// Points for a field, or `None` if the cycle did not mention it at all.
    pub fn get(&self, field_id: &str) -> Option<&[Point]> {
        self.points.get(field_id).map(Vec::as_slice)
    }

    pub fn take(&mut self, field_id: &str) -> Option<Vec<Point>> {
        self.points.remove(field_id)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl FromIterator<(String, Vec<Point>)> for FetchResult {
    fn from_iter<I: IntoIterator<Item = (String, Vec<Point>)>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

/// Errors reported by a source. All of them are fatal to the run.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceError {
    /// Transport failure or non-success HTTP status.
    Http(String),
    /// I/O error while reading input.
    Io(String),
    /// Payload could not be decoded, or a value was not numeric.
    Malformed(String),
    /// The background fetch thread went away.
    Disconnected,
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Http(msg) => write!(f, "HTTP error: {}", msg),
            SourceError::Io(msg) => write!(f, "I/O error: {}", msg),
            SourceError::Malformed(msg) => write!(f, "malformed data: {}", msg),
            SourceError::Disconnected => write!(f, "source disconnected"),
        }
    }
}

impl std::error::Error for SourceError {}

impl From<std::io::Error> for SourceError {
    fn from(err: std::io::Error) -> Self {
        SourceError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Malformed(err.to_string())
    }
}

/// A producer of fetch results.
///
/// Implementations are chosen once at startup and never combined.
pub trait Source: Send {
    /// Blocks until the next fetch cycle completes.
    ///
    /// Returns `Ok(None)` when the source has cleanly reached its end.
    fn next_result(&mut self) -> Result<Option<FetchResult>, SourceError>;

    /// Releases resources held by the source. Idempotent.
    fn close(&mut self);
}

/// Builds the source selected by the configuration.
pub fn from_config(
    config: &Config,
    specs: &[GraphSpec],
    shutdown: &Shutdown,
) -> Result<Box<dyn Source>, SourceError> {
    let source: Box<dyn Source> = match &config.source {
        SourceConfig::Http { url } => Box::new(PolledSource::spawn(
            HttpFetcher::new(url, specs),
            config.interval,
            shutdown.clone(),
        )?),
        SourceConfig::Datadog {
            api_key,
            app_key,
            base_url,
            poll_interval,
        } => Box::new(PolledSource::spawn(
            DatadogFetcher::new(api_key, app_key, base_url, specs),
            *poll_interval,
            shutdown.clone(),
        )?),
        SourceConfig::Stdin => Box::new(StreamSource::stdin(specs)),
    };
    Ok(source)
}
