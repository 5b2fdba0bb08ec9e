//! Task orchestration.
//!
//! A run owns two threads: `ingest` pulls fetch results into the store and
//! `render` redraws on a fixed tick. They share only the store and the
//! readiness gate. Whichever side stops first fires the shutdown signal,
//! and the caller's thread waits on it.

mod gate;
mod ingest;
mod render;
mod shutdown;

pub use gate::ReadinessGate;
pub use ingest::{IngestError, Ingestor};
pub use render::{
    Dimensions, GroupSeries, RenderError, RenderTask, Renderer, Series, build_groups,
};
pub use shutdown::{Shutdown, ShutdownReason};

use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, error, info};

use crate::config::Config;
use crate::field::GraphSpec;
use crate::source::Source;
use crate::storage::Store;

/// Why a run ended unsuccessfully.
#[derive(Debug)]
pub enum RunError {
    Ingest(IngestError),
    Render(RenderError),
    /// A worker thread could not be started or panicked.
    Spawn(String),
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::Ingest(e) => write!(f, "{}", e),
            RunError::Render(e) => write!(f, "{}", e),
            RunError::Spawn(msg) => write!(f, "worker thread error: {}", msg),
        }
    }
}

impl std::error::Error for RunError {}

impl From<IngestError> for RunError {
    fn from(err: IngestError) -> Self {
        RunError::Ingest(err)
    }
}

impl From<RenderError> for RunError {
    fn from(err: RenderError) -> Self {
        RunError::Render(err)
    }
}

/// Runs ingestion and rendering until shutdown.
///
/// Returns the shutdown reason on a graceful stop (Ctrl-C or end of input)
/// and the fatal error otherwise.
pub fn run<R: Renderer + 'static>(
    config: &Config,
    specs: Arc<[GraphSpec]>,
    mut source: Box<dyn Source>,
    renderer: R,
    shutdown: Shutdown,
) -> Result<ShutdownReason, RunError> {
    let store = Arc::new(Store::new(config.retention));
    let gate = ReadinessGate::new();

    let mut render = RenderTask::new(
        Arc::clone(&store),
        Arc::clone(&specs),
        gate.clone(),
        shutdown.clone(),
        config.interval,
        renderer,
    );
    let render_shutdown = shutdown.clone();
    let render_handle = thread::Builder::new()
        .name("render".to_string())
        .spawn(move || {
            let result = render.run();
            if let Err(e) = &result {
                error!(error = %e, "render failed");
                render_shutdown.trigger(ShutdownReason::RenderFailed);
            }
            result
        })
        .map_err(|e| RunError::Spawn(e.to_string()))?;

    let mut ingestor = Ingestor::new(store, specs, gate);
    let ingest_shutdown = shutdown.clone();
    let ingest_handle = thread::Builder::new()
        .name("ingest".to_string())
        .spawn(move || {
            let result = ingestor.run(source.as_mut());
            source.close();
            match &result {
                Ok(()) => {
                    ingest_shutdown.trigger(ShutdownReason::EndOfStream);
                }
                Err(e) => {
                    if ingest_shutdown.trigger(ShutdownReason::IngestFailed) {
                        error!(error = %e, "ingestion failed");
                    } else {
                        debug!(error = %e, "ingestion stopped during shutdown");
                    }
                }
            }
            result
        });
    let ingest_handle = match ingest_handle {
        Ok(handle) => handle,
        Err(e) => {
            shutdown.trigger(ShutdownReason::IngestFailed);
            let _ = join(render_handle);
            return Err(RunError::Spawn(e.to_string()));
        }
    };

    let reason = shutdown.wait();
    info!(?reason, "shutting down");

    // The render thread always stops once the signal fires. The ingest
    // thread may be blocked on input, so it is only joined when it is the
    // one that failed.
    let rendered = join(render_handle)?;
    if reason == ShutdownReason::IngestFailed {
        join(ingest_handle)??;
    } else {
        rendered?;
    }
    Ok(reason)
}

fn join<T>(handle: JoinHandle<T>) -> Result<T, RunError> {
    let name = handle.thread().name().unwrap_or("worker").to_string();
    handle
        .join()
        .map_err(|_| RunError::Spawn(format!("{} thread panicked", name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceConfig;
    use crate::field::parse_specs;
    use crate::source::mock::ScriptedSource;
    use crate::source::{FetchResult, SourceError};
    use crate::storage::Point;
    use chrono::Utc;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct Counter {
        frames: Arc<Mutex<usize>>,
    }

    impl Renderer for Counter {
        fn dimensions(&mut self) -> Result<Dimensions, RenderError> {
            Ok(Dimensions {
                width: 80,
                height: 24,
            })
        }

        fn render(&mut self, _: &[GroupSeries], _: Dimensions) -> Result<(), RenderError> {
            *self.frames.lock().unwrap() += 1;
            Ok(())
        }
    }

    fn config() -> Config {
        Config::new(10, Duration::from_millis(5), SourceConfig::Stdin).unwrap()
    }

    fn one_point(id: &str) -> FetchResult {
        let mut result = FetchResult::new();
        result.push(id, Point::new(Utc::now(), 1.0));
        result
    }

    #[test]
    fn test_end_of_stream_is_graceful() {
        let specs: Arc<[GraphSpec]> = parse_specs(&["a"]).unwrap().into();
        let source = ScriptedSource::new().with_result(one_point("0.0.a"));
        let renderer = Counter::default();

        let reason = run(
            &config(),
            specs,
            Box::new(source),
            renderer.clone(),
            Shutdown::new(),
        )
        .unwrap();
        assert_eq!(reason, ShutdownReason::EndOfStream);
        assert!(*renderer.frames.lock().unwrap() >= 1);
    }

    #[test]
    fn test_source_error_is_returned() {
        let specs: Arc<[GraphSpec]> = parse_specs(&["a"]).unwrap().into();
        let source = ScriptedSource::new().with_error(SourceError::Http("refused".to_string()));
        let renderer = Counter::default();

        let err = run(
            &config(),
            specs,
            Box::new(source),
            renderer.clone(),
            Shutdown::new(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RunError::Ingest(IngestError::Source(SourceError::Http(_)))
        ));
        assert_eq!(*renderer.frames.lock().unwrap(), 0);
    }
}
