//! Render task: periodically snapshots the store and hands it to a renderer.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::gate::ReadinessGate;
use super::shutdown::Shutdown;
use crate::field::GraphSpec;
use crate::fmt::format_si;
use crate::storage::{Point, Store};

/// Terminal size in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u16,
    pub height: u16,
}

/// One plotted series.
#[derive(Debug, Clone, PartialEq)]
pub enum Series {
    Line {
        name: String,
        /// Name and latest value, for the legend.
        label: String,
        points: Vec<Point>,
    },
    /// Vertical markers at every retained timestamp with a positive value.
    Marker {
        name: String,
        positions: Vec<DateTime<Utc>>,
    },
}

/// Series of one display group, in field declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupSeries {
    pub series: Vec<Series>,
}

/// Snapshots every declared field and shapes it for drawing.
pub fn build_groups(store: &Store, specs: &[GraphSpec]) -> Vec<GroupSeries> {
    specs
        .iter()
        .map(|spec| GroupSeries {
            series: spec
                .fields
                .iter()
                .map(|field| {
                    let points = store.snapshot(&field.id);
                    if field.marker {
                        Series::Marker {
                            name: field.name.clone(),
                            positions: points
                                .iter()
                                .filter(|p| p.value > 0.0)
                                .map(|p| p.timestamp)
                                .collect(),
                        }
                    } else {
                        let latest = match points.last() {
                            Some(p) => format_si(p.value),
                            None => "-".to_string(),
                        };
                        Series::Line {
                            label: format!("{}: {}", field.name, latest),
                            name: field.name.clone(),
                            points,
                        }
                    }
                })
                .collect(),
        })
        .collect()
}

/// Rendering errors. Always fatal.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderError {
    Terminal(String),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::Terminal(msg) => write!(f, "terminal error: {}", msg),
        }
    }
}

impl std::error::Error for RenderError {}

impl From<std::io::Error> for RenderError {
    fn from(err: std::io::Error) -> Self {
        RenderError::Terminal(err.to_string())
    }
}

/// Drawing backend.
pub trait Renderer: Send {
    /// Current drawable area.
    fn dimensions(&mut self) -> Result<Dimensions, RenderError>;

    /// Draws one frame.
    fn render(&mut self, groups: &[GroupSeries], dims: Dimensions) -> Result<(), RenderError>;
}

/// Periodic redraw loop.
pub struct RenderTask<R> {
    store: Arc<Store>,
    specs: Arc<[GraphSpec]>,
    gate: ReadinessGate,
    shutdown: Shutdown,
    interval: Duration,
    renderer: R,
    frames: u64,
}

impl<R: Renderer> RenderTask<R> {
    pub fn new(
        store: Arc<Store>,
        specs: Arc<[GraphSpec]>,
        gate: ReadinessGate,
        shutdown: Shutdown,
        interval: Duration,
        renderer: R,
    ) -> Self {
        Self {
            store,
            specs,
            gate,
            shutdown,
            interval,
            renderer,
            frames: 0,
        }
    }

    /// Ticks until shutdown. On a graceful shutdown one last frame is drawn
    /// if data was ever ready.
    pub fn run(&mut self) -> Result<(), RenderError> {
        loop {
            let stopping = self.shutdown.wait_timeout(self.interval);
            if stopping {
                let graceful = self.shutdown.reason().is_some_and(|r| r.is_graceful());
                if !graceful {
                    debug!(frames = self.frames, "render stopped without final frame");
                    return Ok(());
                }
            }

            let dims = self.renderer.dimensions()?;
            if self.gate.is_ready() {
                self.draw(dims)?;
            }

            if stopping {
                info!(frames = self.frames, "render finished");
                return Ok(());
            }
        }
    }

    fn draw(&mut self, dims: Dimensions) -> Result<(), RenderError> {
        let groups = build_groups(&self.store, &self.specs);
        self.renderer.render(&groups, dims)?;
        self.frames += 1;
        debug!(
            frame = self.frames,
            width = dims.width,
            height = dims.height,
            "frame rendered"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::parse_specs;
    use crate::runtime::ShutdownReason;
    use chrono::TimeZone;
    use std::sync::Mutex;
    use std::thread;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    /// Records every frame it is asked to draw.
    #[derive(Clone, Default)]
    struct Recorder {
        frames: Arc<Mutex<Vec<Vec<GroupSeries>>>>,
        fail_dimensions: bool,
    }

    impl Recorder {
        fn count(&self) -> usize {
            self.frames.lock().unwrap().len()
        }
    }

    impl Renderer for Recorder {
        fn dimensions(&mut self) -> Result<Dimensions, RenderError> {
            if self.fail_dimensions {
                return Err(RenderError::Terminal("no tty".to_string()));
            }
            Ok(Dimensions {
                width: 80,
                height: 24,
            })
        }

        fn render(&mut self, groups: &[GroupSeries], _: Dimensions) -> Result<(), RenderError> {
            self.frames.lock().unwrap().push(groups.to_vec());
            Ok(())
        }
    }

    fn task(recorder: Recorder, gate: ReadinessGate, shutdown: Shutdown) -> RenderTask<Recorder> {
        let specs: Arc<[GraphSpec]> = parse_specs(&["a"]).unwrap().into();
        RenderTask::new(
            Arc::new(Store::new(10)),
            specs,
            gate,
            shutdown,
            Duration::from_millis(5),
            recorder,
        )
    }

    #[test]
    fn test_build_groups_labels_and_markers() {
        let store = Store::new(10);
        let specs = parse_specs(&["load+marker:deploy", "idle"]).unwrap();
        store.push_single("0.0.load", Point::new(ts(1), 1500.0), false);
        store.push_single("0.1.deploy", Point::new(ts(1), 0.0), false);
        store.push_single("0.1.deploy", Point::new(ts(2), 1.0), false);

        let groups = build_groups(&store, &specs);
        assert_eq!(groups.len(), 2);
        assert_eq!(
            groups[0].series[0],
            Series::Line {
                name: "load".to_string(),
                label: "load: 1.5 k".to_string(),
                points: vec![Point::new(ts(1), 1500.0)],
            }
        );
        assert_eq!(
            groups[0].series[1],
            Series::Marker {
                name: "deploy".to_string(),
                positions: vec![ts(2)],
            }
        );
        assert!(matches!(
            &groups[1].series[0],
            Series::Line { label, points, .. } if label == "idle: -" && points.is_empty()
        ));
    }

    #[test]
    fn test_no_render_before_ready() {
        let recorder = Recorder::default();
        let shutdown = Shutdown::new();
        let mut render = task(recorder.clone(), ReadinessGate::new(), shutdown.clone());

        let stopper = shutdown.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            stopper.trigger(ShutdownReason::Interrupted);
        });
        render.run().unwrap();
        handle.join().unwrap();

        assert_eq!(recorder.count(), 0);
    }

    #[test]
    fn test_final_frame_on_graceful_stop() {
        let recorder = Recorder::default();
        let gate = ReadinessGate::new();
        gate.open();
        let shutdown = Shutdown::new();
        shutdown.trigger(ShutdownReason::EndOfStream);

        task(recorder.clone(), gate, shutdown).run().unwrap();
        assert_eq!(recorder.count(), 1);
    }

    #[test]
    fn test_no_final_frame_after_failure() {
        let recorder = Recorder::default();
        let gate = ReadinessGate::new();
        gate.open();
        let shutdown = Shutdown::new();
        shutdown.trigger(ShutdownReason::IngestFailed);

        task(recorder.clone(), gate, shutdown).run().unwrap();
        assert_eq!(recorder.count(), 0);
    }

    #[test]
    fn test_ticks_while_ready() {
        let recorder = Recorder::default();
        let gate = ReadinessGate::new();
        gate.open();
        let shutdown = Shutdown::new();
        let mut render = task(recorder.clone(), gate, shutdown.clone());

        let stopper = shutdown.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(60));
            stopper.trigger(ShutdownReason::Interrupted);
        });
        render.run().unwrap();
        handle.join().unwrap();

        // Several ticks plus the final frame.
        assert!(recorder.count() >= 2);
    }

    #[test]
    fn test_dimension_failure_is_fatal() {
        let recorder = Recorder {
            fail_dimensions: true,
            ..Recorder::default()
        };
        let err = task(recorder, ReadinessGate::new(), Shutdown::new())
            .run()
            .unwrap_err();
        assert_eq!(err, RenderError::Terminal("no tty".to_string()));
    }
}
