//! liveplot - live terminal charts for metrics.
//!
//! Polls one source, keeps the last N points of every declared field and
//! redraws one chart per group in the terminal until the input ends or
//! Ctrl-C is pressed.

use std::error::Error;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

use liveplot::config::{Config, DEFAULT_DATADOG_URL, SourceConfig};
use liveplot::field::{GraphSpec, parse_specs};
use liveplot::runtime::{self, Shutdown, ShutdownReason};
use liveplot::source;
use liveplot::storage::DEFAULT_CAPACITY;
use liveplot::tui::{TerminalRenderer, terminal_size};

/// Live terminal charts for polled metrics.
#[derive(Parser)]
#[command(name = "liveplot", about = "Live terminal charts for polled metrics", version)]
struct Args {
    /// Number of points kept and plotted per field.
    #[arg(short = 'n', long, default_value_t = DEFAULT_CAPACITY, env = "LIVEPLOT_POINTS")]
    points: usize,

    /// Render interval in seconds. Also the HTTP poll interval.
    #[arg(short, long, default_value = "1", value_parser = parse_seconds)]
    interval: Duration,

    /// Increase logging verbosity (-v info, -vv debug, -vvv trace). Default is warn.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Write logs to this file instead of stderr.
    #[arg(long, value_name = "PATH", global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    source: SourceArgs,
}

#[derive(Subcommand)]
enum SourceArgs {
    /// Poll an expvar-style JSON endpoint.
    Http {
        /// URL fetched every interval.
        #[arg(long, env = "LIVEPLOT_URL")]
        url: String,

        /// Display groups, e.g. `mem.heap+mem.sys counter:cpu.uTime`.
        #[arg(required = true, value_name = "GROUP")]
        groups: Vec<String>,
    },
    /// Query the Datadog metrics API.
    Datadog {
        /// Datadog API key.
        #[arg(long, env = "DD_API_KEY", hide_env_values = true)]
        api_key: String,

        /// Datadog application key.
        #[arg(long, env = "DD_APP_KEY", hide_env_values = true)]
        app_key: String,

        /// API base URL.
        #[arg(long, env = "DD_SITE_URL", default_value = DEFAULT_DATADOG_URL)]
        base_url: String,

        /// Query interval in seconds.
        #[arg(long, default_value = "10", value_parser = parse_seconds)]
        poll_interval: Duration,

        /// Display groups; field names are Datadog queries.
        #[arg(required = true, value_name = "GROUP")]
        groups: Vec<String>,
    },
    /// Read one JSON object per line from standard input.
    Stdin {
        /// Display groups, e.g. `load+marker:deploy`.
        #[arg(required = true, value_name = "GROUP")]
        groups: Vec<String>,
    },
}

impl SourceArgs {
    fn into_parts(self) -> (SourceConfig, Vec<String>) {
        match self {
            SourceArgs::Http { url, groups } => (SourceConfig::Http { url }, groups),
            SourceArgs::Datadog {
                api_key,
                app_key,
                base_url,
                poll_interval,
                groups,
            } => (
                SourceConfig::Datadog {
                    api_key,
                    app_key,
                    base_url,
                    poll_interval,
                },
                groups,
            ),
            SourceArgs::Stdin { groups } => (SourceConfig::Stdin, groups),
        }
    }
}

/// Parses a non-negative number of seconds, fractions allowed.
fn parse_seconds(s: &str) -> Result<Duration, String> {
    let secs: f64 = s
        .trim()
        .parse()
        .map_err(|e| format!("invalid number of seconds '{}': {}", s, e))?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(format!("invalid number of seconds '{}'", s));
    }
    Ok(Duration::from_secs_f64(secs))
}

/// Initializes the tracing subscriber.
/// Default level is WARN so log lines do not tear the chart.
fn init_logging(
    verbose: u8,
    quiet: bool,
    log_file: Option<&Path>,
) -> Result<(), Box<dyn Error>> {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter =
        EnvFilter::from_default_env().add_directive(format!("liveplot={}", level).parse()?);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}

fn run(args: Args) -> Result<ShutdownReason, Box<dyn Error>> {
    let (source_config, groups) = args.source.into_parts();
    let specs: Arc<[GraphSpec]> = parse_specs(groups.as_slice())?.into();
    let config = Config::new(args.points, args.interval, source_config)?;

    // Fail before touching the screen if there is no terminal to draw on.
    let dims = terminal_size()?;
    info!(
        source = config.source.name(),
        points = config.retention,
        interval_ms = config.interval.as_millis() as u64,
        groups = specs.len(),
        width = dims.width,
        height = dims.height,
        "liveplot {} starting",
        env!("CARGO_PKG_VERSION")
    );

    let shutdown = Shutdown::new();
    let signal = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("received shutdown signal");
        signal.trigger(ShutdownReason::Interrupted);
    }) {
        warn!("failed to set Ctrl-C handler: {}", e);
    }

    let source = source::from_config(&config, &specs, &shutdown)?;
    let renderer = TerminalRenderer::new()?;
    Ok(runtime::run(&config, specs, source, renderer, shutdown)?)
}

fn main() {
    let args = Args::parse();

    if let Err(e) = init_logging(args.verbose, args.quiet, args.log_file.as_deref()) {
        eprintln!("liveplot: cannot initialize logging: {}", e);
        process::exit(1);
    }

    match run(args) {
        Ok(reason) => info!(?reason, "exiting"),
        Err(e) => {
            error!(error = %e, "fatal");
            eprintln!("liveplot: {}", e);
            process::exit(1);
        }
    }
}
