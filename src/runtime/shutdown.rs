//! Process-wide shutdown signal.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Why the process is stopping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// Ctrl-C / SIGTERM.
    Interrupted,
    /// The source reported a clean end of stream.
    EndOfStream,
    /// Ingestion hit a fatal error.
    IngestFailed,
    /// Drawing to the terminal failed.
    RenderFailed,
}

impl ShutdownReason {
    /// Whether the render task should draw one last frame.
    pub fn is_graceful(self) -> bool {
        matches!(
            self,
            ShutdownReason::Interrupted | ShutdownReason::EndOfStream
        )
    }
}

/// Cloneable handle to a one-shot shutdown signal.
///
/// The first trigger wins; later triggers are ignored so the recorded reason
/// always describes what actually started the shutdown.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    inner: Arc<(Mutex<Option<ShutdownReason>>, Condvar)>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires the signal. Returns `false` if it had already fired.
    pub fn trigger(&self, reason: ShutdownReason) -> bool {
        let (_, cvar) = &*self.inner;
        let mut state = self.lock();
        if state.is_some() {
            return false;
        }
        *state = Some(reason);
        cvar.notify_all();
        true
    }

    pub fn reason(&self) -> Option<ShutdownReason> {
        *self.lock()
    }

    /// Blocks until the signal fires.
    pub fn wait(&self) -> ShutdownReason {
        let (_, cvar) = &*self.inner;
        let mut state = self.lock();
        loop {
            if let Some(reason) = *state {
                return reason;
            }
            state = cvar.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Sleeps for `timeout` or until the signal fires.
    ///
    /// Returns `true` if the signal has fired.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (_, cvar) = &*self.inner;
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        while state.is_none() {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = cvar
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            state = guard;
        }
        true
    }

    fn lock(&self) -> MutexGuard<'_, Option<ShutdownReason>> {
        self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
