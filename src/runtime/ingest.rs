//! Ingestion task: moves fetch results from a source into the store.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use super::gate::ReadinessGate;
use crate::field::{GraphSpec, all_fields};
use crate::source::{FetchResult, Source, SourceError};
use crate::storage::Store;

/// Fatal ingestion errors.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestError {
    /// The source failed.
    Source(SourceError),
    /// A fetch cycle did not mention a declared field.
    MissingField { id: String, name: String },
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestError::Source(e) => write!(f, "input error: {}", e),
            IngestError::MissingField { id, name } => {
                write!(f, "cannot get {} (field {}) from input", name, id)
            }
        }
    }
}

impl std::error::Error for IngestError {}

impl From<SourceError> for IngestError {
    fn from(err: SourceError) -> Self {
        IngestError::Source(err)
    }
}

/// Pushes every fetch cycle into the store and opens the readiness gate once
/// every declared field has produced data.
pub struct Ingestor {
    store: Arc<Store>,
    specs: Arc<[GraphSpec]>,
    gate: ReadinessGate,
    /// Fields that have not produced a point yet. Empty once ready.
    waiting: HashSet<String>,
    cycles: u64,
}

impl Ingestor {
    pub fn new(store: Arc<Store>, specs: Arc<[GraphSpec]>, gate: ReadinessGate) -> Self {
        let waiting = all_fields(&specs).map(|f| f.id.clone()).collect();
        Self {
            store,
            specs,
            gate,
            waiting,
            cycles: 0,
        }
    }

    /// Runs until the source ends or fails.
    pub fn run(&mut self, source: &mut dyn Source) -> Result<(), IngestError> {
        while let Some(result) = source.next_result()? {
            self.ingest(result)?;
        }
        info!(cycles = self.cycles, "input ended");
        Ok(())
    }

    /// Applies one fetch cycle, in field declaration order.
    pub fn ingest(&mut self, mut result: FetchResult) -> Result<(), IngestError> {
        self.cycles += 1;
        let mut pushed = 0usize;

        for field in all_fields(&self.specs) {
            let Some(mut points) = result.take(&field.id) else {
                return Err(IngestError::MissingField {
                    id: field.id.clone(),
                    name: field.name.clone(),
                });
            };

            match points.len() {
                0 => continue,
                1 => {
                    if let Some(point) = points.pop() {
                        self.store.push_single(&field.id, point, field.counter);
                    }
                    pushed += 1;
                }
                n => {
                    self.store.push_batch(&field.id, points, field.counter);
                    pushed += n;
                }
            }
            self.waiting.remove(&field.id);
        }

        debug!(cycle = self.cycles, points = pushed, "fetch cycle ingested");

        if self.waiting.is_empty() && self.gate.open() {
            info!(
                cycles = self.cycles,
                fields = self.store.field_count(),
                "all fields have data, rendering enabled"
            );
        }
        Ok(())
    }
}
