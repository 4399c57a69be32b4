//! xdpb daemon entry point.
//!
//! Fences every monitor of the running X11 session with pointer barriers and
//! lets the pointer through only after a deliberate push.
//!
//! # Usage
//!
//! ```text
//! xdpb [OPTIONS]
//!
//! Options:
//!   -s, --speed <PX>          Release when one motion event pushes more than PX pixels
//!   -d, --distance <PX>       Release after pushing PX pixels in total [default mode: 50]
//!   -t, --double-tap <SECS>   Release when the barrier is tapped twice within SECS seconds
//!   -c, --config <PATH>       Read configuration from PATH
//!   -v, --verbose             Log at debug level
//!       --display <NAME>      X display to connect to [default: $DISPLAY]
//! ```
//!
//! At most one of `--speed`, `--distance`, and `--double-tap` may be given.
//! A mode on the command line replaces the `[release]` table of the config
//! file.
//!
//! # Log level precedence
//!
//! `RUST_LOG` > `--verbose` (debug) > `[logging] level` > `info`.
//!
//! # Exit status
//!
//! - `0` after a termination signal, once every barrier has been removed.
//! - `1` if the display, an extension, the configuration, or barrier setup
//!   fails.
//! - `2` for command-line usage errors (reported by `clap`).

use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgGroup, Parser};
use tracing::info;
use tracing_subscriber::EnvFilter;
use xdpb::infrastructure::storage::config::{load_config, AppConfig, ConfigError};
use xdpb_core::ReleaseMode;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Sticky pointer barriers between X11 monitors.
///
/// The `#[derive(Parser)]` macro from `clap` generates the argument parser
/// from the struct fields; the `mode` group makes the three release modes
/// mutually exclusive.
#[derive(Debug, Parser)]
#[command(
    name = "xdpb",
    about = "Pointer barriers on every monitor edge, released by a deliberate push",
    version,
    group(ArgGroup::new("mode").args(["speed", "distance", "double_tap"]).multiple(false))
)]
struct Cli {
    /// Release when a single motion event pushes more than PX pixels into the barrier.
    #[arg(short, long, value_name = "PX", value_parser = parse_threshold)]
    speed: Option<f64>,

    /// Release once the pointer has pushed PX pixels into the barrier in total.
    #[arg(short, long, value_name = "PX", value_parser = parse_threshold)]
    distance: Option<f64>,

    /// Release when the barrier is tapped twice within SECONDS.
    #[arg(short = 't', long, value_name = "SECONDS", value_parser = parse_threshold)]
    double_tap: Option<f64>,

    /// Configuration file (default: $XDG_CONFIG_HOME/xdpb/config.toml).
    #[arg(short, long, value_name = "PATH", env = "XDPB_CONFIG")]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG is set.
    #[arg(short, long)]
    verbose: bool,

    /// X display to connect to instead of $DISPLAY.
    #[arg(long, value_name = "NAME")]
    display: Option<String>,
}

/// Accepts finite, non-negative real numbers.
fn parse_threshold(value: &str) -> Result<f64, String> {
    let threshold: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("'{value}' is not a number"))?;
    if threshold.is_finite() && threshold >= 0.0 {
        Ok(threshold)
    } else {
        Err(format!("'{value}' must be a finite non-negative number"))
    }
}

impl Cli {
    /// The release mode selected on the command line, else by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the config file's `[release]` table is
    /// invalid and no mode was given on the command line.
    fn release_mode(&self, config: &AppConfig) -> Result<ReleaseMode, ConfigError> {
        let mode = match (self.speed, self.distance, self.double_tap) {
            (Some(px), _, _) => ReleaseMode::speed(px)?,
            (_, Some(px), _) => ReleaseMode::distance(px)?,
            (_, _, Some(seconds)) => ReleaseMode::double_tap(seconds)?,
            (None, None, None) => config.release.to_release_mode()?,
        };
        Ok(mode)
    }

    /// Builds the log filter: `RUST_LOG`, then `--verbose`, then the config.
    fn log_filter(&self, config: &AppConfig) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let level = if self.verbose { "debug" } else { config.logging.level.as_str() };
            EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
        })
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Program entry point.
///
/// The daemon is single-threaded: a current-thread Tokio runtime drives the
/// signal tasks and the runtime loop on the main thread.
///
/// # What happens at startup
///
/// 1. CLI arguments are parsed; usage errors exit with status 2.
/// 2. The config file is loaded and the log subscriber is installed.
/// 3. SIGINT/SIGTERM/SIGHUP are routed into the shutdown channel.
/// 4. The X server is opened and XFixes, XInput, and RandR are checked.
/// 5. Barriers are placed around every output and the loop runs until a
///    termination signal arrives.
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref()).context("failed to load configuration")?;
    tracing_subscriber::fmt().with_env_filter(cli.log_filter(&config)).init();

    let mode = cli.release_mode(&config).context("invalid release mode")?;
    info!(%mode, "xdpb starting");

    run(cli.display.as_deref(), mode).await?;

    info!("xdpb stopped");
    Ok(())
}

#[cfg(target_os = "linux")]
async fn run(display: Option<&str>, mode: ReleaseMode) -> anyhow::Result<()> {
    use xdpb::application::dispatch_events::EventDispatcher;
    use xdpb::application::run_loop::run_until_terminated;
    use xdpb::infrastructure::shutdown::install_termination_signals;
    use xdpb::infrastructure::x11::X11BarrierService;
    use xdpb_core::MonotonicClock;

    let mut shutdown =
        install_termination_signals().context("failed to install signal handlers")?;
    let service = X11BarrierService::connect(display).context("failed to initialise X11")?;

    let mut dispatcher = EventDispatcher::new(service, mode, Box::new(MonotonicClock::new()));
    if let Err(e) = dispatcher.start() {
        // Remove whatever part of the layout was already fenced.
        dispatcher.shutdown(None);
        return Err(e).context("failed to set up barriers");
    }

    let signal = run_until_terminated(&mut dispatcher, &mut shutdown)
        .await
        .context("lost the X11 connection")?;
    info!(?signal, "barriers removed");
    Ok(())
}

#[cfg(not(target_os = "linux"))]
async fn run(_display: Option<&str>, _mode: ReleaseMode) -> anyhow::Result<()> {
    anyhow::bail!("xdpb needs an X11 session on Linux")
}

// ── Tests ─────────────────────────────────────────────────────────────────────
