//! Readiness gate between ingestion and rendering.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// One-way readiness flag: closed until every field has data, then open for
/// the rest of the run.
#[derive(Debug, Clone, Default)]
pub struct ReadinessGate {
    ready: Arc<AtomicBool>,
}

impl ReadinessGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Opens the gate. Returns `true` only for the call that opened it.
    pub fn open(&self) -> bool {
        !self.ready.swap(true, Ordering::AcqRel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_opens_once() {
        let gate = ReadinessGate::new();
        let other = gate.clone();
        assert!(!gate.is_ready());
        assert!(other.open());
        assert!(gate.is_ready());
        assert!(!gate.open());
        assert!(other.is_ready());
    }
}
