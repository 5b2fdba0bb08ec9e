//! Background, timer-driven fetching with a single-slot handoff.
//!
//! A [`PolledSource`] owns one thread that calls a [`Fetch`] implementation
//! on a fixed cadence. Results travel over a rendezvous channel, so the fetch
//! thread blocks until the previous result has been taken: at most one
//! fetched-but-unconsumed result exists at any time.

use std::io;
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use super::{FetchResult, Source, SourceError};
use crate::runtime::Shutdown;

/// One fetch cycle against a remote system.
pub trait Fetch: Send + 'static {
    /// Short name used for the thread and in logs.
    fn name(&self) -> &'static str;

    fn fetch(&mut self) -> Result<FetchResult, SourceError>;
}

type Slot = Result<FetchResult, SourceError>;

/// A [`Source`] fed by a background fetch thread.
pub struct PolledSource {
    rx: Option<Receiver<Slot>>,
    name: &'static str,
}

impl PolledSource {
    /// Starts the fetch thread. The first fetch happens immediately.
    ///
    /// The thread stops when `shutdown` fires, when the source is closed or
    /// dropped, or right after it has handed over an error.
    pub fn spawn<F: Fetch>(
        fetcher: F,
        interval: Duration,
        shutdown: Shutdown,
    ) -> Result<Self, SourceError> {
        let (tx, rx) = mpsc::sync_channel(0);
        let name = fetcher.name();

        thread::Builder::new()
            .name(format!("fetch-{}", name))
            .spawn(move || poll_loop(fetcher, interval, tx, shutdown))
            .map_err(|e: io::Error| SourceError::Io(e.to_string()))?;

        debug!(
            source = name,
            interval_ms = interval.as_millis() as u64,
            "poller started"
        );
        Ok(Self { rx: Some(rx), name })
    }
}

fn poll_loop<F: Fetch>(
    mut fetcher: F,
    interval: Duration,
    tx: SyncSender<Slot>,
    shutdown: Shutdown,
) {
    let mut next_tick = Instant::now();

    loop {
        let started = Instant::now();
        let result = fetcher.fetch();
        let failed = result.is_err();
        trace!(
            source = fetcher.name(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            failed,
            "fetch completed"
        );

        if tx.send(result).is_err() {
            debug!(source = fetcher.name(), "consumer gone, poller exiting");
            return;
        }
        if failed {
            return;
        }

        next_tick += interval;
        let now = Instant::now();
        if next_tick < now {
            // Handoff or fetch took longer than the interval; skip missed ticks.
            next_tick = now;
        }
        if shutdown.wait_timeout(next_tick - now) {
            debug!(source = fetcher.name(), "shutdown observed, poller exiting");
            return;
        }
    }
}

impl Source for PolledSource {
    fn next_result(&mut self) -> Result<Option<FetchResult>, SourceError> {
        let Some(rx) = &self.rx else {
            return Err(SourceError::Disconnected);
        };
        match rx.recv() {
            Ok(Ok(result)) => Ok(Some(result)),
            Ok(Err(e)) => Err(e),
            Err(_) => {
                warn!(source = self.name, "fetch thread ended without a result");
                Err(SourceError::Disconnected)
            }
        }
    }

    fn close(&mut self) {
        // Dropping the receiver makes the next handoff fail, which ends the thread.
        if self.rx.take().is_some() {
            debug!(source = self.name, "poller closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::ShutdownReason;
    use crate::storage::Point;
    use chrono::Utc;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        calls: Arc<AtomicUsize>,
        fail_at: Option<usize>,
    }

    impl Fetch for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn fetch(&mut self) -> Result<FetchResult, SourceError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_at == Some(n) {
                return Err(SourceError::Http("boom".to_string()));
            }
            let mut result = FetchResult::new();
            result.push("f", Point::new(Utc::now(), n as f64));
            Ok(result)
        }
    }

    fn counting(fail_at: Option<usize>) -> (Counting, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Counting {
                calls: Arc::clone(&calls),
                fail_at,
            },
            calls,
        )
    }

    #[test]
    fn test_results_delivered_in_order() {
        let (fetcher, _) = counting(None);
        let mut source =
            PolledSource::spawn(fetcher, Duration::from_millis(1), Shutdown::new()).unwrap();

        for expected in 1..=3 {
            let result = source.next_result().unwrap().unwrap();
            assert_eq!(result.get("f").unwrap()[0].value, expected as f64);
        }
        source.close();
    }

    #[test]
    fn test_at_most_one_result_pending() {
        let (fetcher, calls) = counting(None);
        let mut source =
            PolledSource::spawn(fetcher, Duration::from_millis(1), Shutdown::new()).unwrap();

        // Nobody consumes: the thread must block on its first handoff.
        thread::sleep(Duration::from_millis(50));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        source.next_result().unwrap();
        thread::sleep(Duration::from_millis(50));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        source.close();
    }

    #[test]
    fn test_error_is_reported_then_disconnected() {
        let (fetcher, _) = counting(Some(2));
        let mut source =
            PolledSource::spawn(fetcher, Duration::from_millis(1), Shutdown::new()).unwrap();

        assert!(source.next_result().unwrap().is_some());
        assert_eq!(
            source.next_result().unwrap_err(),
            SourceError::Http("boom".to_string())
        );
        assert_eq!(source.next_result().unwrap_err(), SourceError::Disconnected);
    }

    #[test]
    fn test_shutdown_stops_polling() {
        let (fetcher, calls) = counting(None);
        let shutdown = Shutdown::new();
        let mut source =
            PolledSource::spawn(fetcher, Duration::from_secs(60), shutdown.clone()).unwrap();

        source.next_result().unwrap();
        shutdown.trigger(ShutdownReason::Interrupted);
        assert_eq!(source.next_result().unwrap_err(), SourceError::Disconnected);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_closed_source_reports_disconnected() {
        let (fetcher, _) = counting(None);
        let mut source =
            PolledSource::spawn(fetcher, Duration::from_millis(1), Shutdown::new()).unwrap();
        source.close();
        source.close();
        assert_eq!(source.next_result().unwrap_err(), SourceError::Disconnected);
    }
}
