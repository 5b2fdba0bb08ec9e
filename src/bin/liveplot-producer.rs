//! liveplot-producer - demo metrics endpoint.
//!
//! Serves an expvar-style JSON document at `/debug/vars` with random memory
//! gauges, two monotonically increasing CPU counters and a thread count.
//! Useful for trying `liveplot http` without a real service:
//!
//! ```text
//! liveplot-producer &
//! liveplot http --url http://127.0.0.1:8123/debug/vars \
//!     mem.heap+mem.sys+mem.stack counter:cpu.uTime+counter:cpu.sTime threads
//! ```

use std::process;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use clap::Parser;
use rand::Rng;
use serde::Serialize;
use tiny_http::{Header, Response, Server};
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Demo endpoint serving random metrics.
#[derive(Parser)]
#[command(name = "liveplot-producer", about = "Demo metrics endpoint", version)]
struct Args {
    /// Address to listen on.
    #[arg(short, long, default_value = "127.0.0.1:8123")]
    listen: String,

    /// Update period in milliseconds.
    #[arg(short, long, default_value = "250")]
    period_ms: u64,

    /// Increase logging verbosity.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Default, Clone, Serialize)]
struct Memory {
    heap: i64,
    sys: i64,
    stack: i64,
}

#[derive(Debug, Default, Clone, Serialize)]
struct Cpu {
    #[serde(rename = "uTime")]
    user_time: i64,
    #[serde(rename = "sTime")]
    system_time: i64,
}

#[derive(Debug, Clone, Serialize)]
struct Metrics {
    mem: Memory,
    cpu: Cpu,
    threads: i64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self {
            mem: Memory::default(),
            cpu: Cpu::default(),
            threads: 1,
        }
    }
}

impl Metrics {
    /// Moves every metric one random step.
    fn step<R: Rng>(&mut self, rng: &mut R) {
        self.mem.heap = 10_000 + rng.gen_range(0..2_000);
        self.mem.sys = 20_000 + rng.gen_range(0..1_000);
        self.mem.stack = 3_000 + rng.gen_range(0..500);
        self.cpu.user_time += 100 + rng.gen_range(0..100);
        self.cpu.system_time += 100 + rng.gen_range(0..200);
        self.threads = (self.threads + rng.gen_range(-4..6)).max(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = format!("liveplot_producer={}", level).parse() {
        filter = filter.add_directive(directive);
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn update_loop(metrics: Arc<Mutex<Metrics>>, period: Duration) {
    let mut rng = rand::thread_rng();
    loop {
        metrics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .step(&mut rng);
        thread::sleep(period);
    }
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    let server = match Server::http(&args.listen) {
        Ok(server) => server,
        Err(e) => {
            error!("cannot listen on {}: {}", args.listen, e);
            process::exit(1);
        }
    };
    info!(listen = %args.listen, period_ms = args.period_ms, "serving /debug/vars");

    let metrics = Arc::new(Mutex::new(Metrics::default()));
    let period = Duration::from_millis(args.period_ms.max(1));
    let updater = Arc::clone(&metrics);
    if let Err(e) = thread::Builder::new()
        .name("update".to_string())
        .spawn(move || update_loop(updater, period))
    {
        error!("cannot start update thread: {}", e);
        process::exit(1);
    }

    let content_type = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).ok();

    for request in server.incoming_requests() {
        debug!(method = %request.method(), url = %request.url(), "request");

        let result = if request.url() == "/debug/vars" {
            let snapshot = metrics
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone();
            match serde_json::to_string(&snapshot) {
                Ok(body) => {
                    let mut response = Response::from_string(body);
                    if let Some(header) = content_type.clone() {
                        response = response.with_header(header);
                    }
                    request.respond(response)
                }
                Err(e) => {
                    warn!("cannot encode metrics: {}", e);
                    request.respond(Response::from_string("encoding error").with_status_code(500))
                }
            }
        } else {
            request.respond(Response::from_string("not found").with_status_code(404))
        };

        if let Err(e) = result {
            warn!("failed to send response: {}", e);
        }
    }
}
