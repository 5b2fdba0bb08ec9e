//! Scripted source for tests and demos.

use std::collections::VecDeque;
use std::thread;
use std::time::Duration;

use super::{FetchResult, Source, SourceError};

/// Replays a fixed sequence of fetch outcomes, then reports end of stream.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    steps: VecDeque<Result<FetchResult, SourceError>>,
    delay: Duration,
    closed: bool,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_result(mut self, result: FetchResult) -> Self {
        self.steps.push_back(Ok(result));
        self
    }

    pub fn with_error(mut self, error: SourceError) -> Self {
        self.steps.push_back(Err(error));
        self
    }

    /// Sleeps this long before every step, to let other threads tick.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn remaining(&self) -> usize {
        self.steps.len()
    }
}

impl Source for ScriptedSource {
    fn next_result(&mut self) -> Result<Option<FetchResult>, SourceError> {
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        match self.steps.pop_front() {
            Some(step) => step.map(Some),
            None => Ok(None),
        }
    }

    fn close(&mut self) {
        self.closed = true;
    }
}
