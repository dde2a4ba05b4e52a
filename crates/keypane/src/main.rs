//! Binary entrypoint for the KeyPane overlay driver.
//!
//! Wires a raw keyboard event source (privileged tap or permission-free
//! NSEvent monitors) into the engine, and logs the UI event stream the
//! rendering layer would consume.

use std::{path::PathBuf, process, sync::Arc, thread};

use clap::{Parser, Subcommand};
use crossbeam_channel::{Receiver, Sender};
use tokio::{runtime::Runtime, sync::mpsc::unbounded_channel};
use tracing::{debug, error, info, warn};

use config::Settings;
use keycode::Keymap;
use keypane_engine::{Engine, Options};
use keypane_protocol::RawEvent;
use mac_tap::{RunLoopControl, Source};

#[derive(Parser, Debug)]
#[command(name = "keypane", about = "A visual keyboard overlay for macOS", version)]
/// Command-line interface for the `keypane` binary.
struct Cli {
    /// Optional subcommand.
    #[command(subcommand)]
    command: Option<Command>,

    /// Optional path to the settings file (defaults to ~/.keypane/settings.ron)
    #[arg(long, value_name = "PATH")]
    settings: Option<PathBuf>,

    /// Optional path to the keymap file (defaults to ~/.keypane/keymap.json)
    #[arg(long, value_name = "PATH")]
    keymap: Option<PathBuf>,

    /// Logging controls
    #[command(flatten)]
    log: logging::LogArgs,
}

#[derive(Subcommand, Debug)]
/// Top-level CLI subcommands.
enum Command {
    /// Print the current permission status as JSON and exit.
    Permissions,
}

fn main() {
    let cli = Cli::parse();

    let spec = logging::compute_spec(
        cli.log.trace,
        cli.log.debug,
        cli.log.log_level.as_deref(),
        cli.log.log_filter.as_deref(),
    );
    tracing_subscriber::fmt()
        .with_env_filter(logging::env_filter_from_spec(&spec))
        .without_time()
        .init();

    if let Some(Command::Permissions) = cli.command {
        let status = permissions::check_permissions();
        match serde_json::to_string_pretty(&status) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Failed to serialize status: {e}");
                process::exit(1);
            }
        }
        return;
    }

    let settings = match config::load_settings(cli.settings.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}", e.pretty());
            process::exit(1);
        }
    };
    debug!(?settings, "settings_loaded");

    let keymap = match config::load_keymap(cli.keymap.as_deref(), &settings.layout) {
        Ok(km) => km,
        Err(e) => {
            warn!("{}; continuing with key(<code>) placeholders", e.pretty());
            Keymap::default()
        }
    };

    let runtime = match Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "failed to start runtime");
            process::exit(1);
        }
    };

    let (ui_tx, mut ui_rx) = unbounded_channel();
    let engine = Engine::new(
        Options {
            toggle_mode: settings.toggle_mode,
            keep_panel_open: settings.keep_panel_open,
            ..Options::default()
        },
        keymap,
        ui_tx,
    );

    // Rendering is a separate collaborator; here the UI event stream is
    // surfaced as structured logs.
    runtime.spawn(async move {
        while let Some(ev) = ui_rx.recv().await {
            info!(event = ?ev, "ui_event");
        }
    });

    let (raw_tx, raw_rx) = crossbeam_channel::unbounded::<RawEvent>();
    pump_raw_events(&runtime, engine, raw_rx);

    if settings.privacy_mode {
        info!("privacy mode on; using permission-free monitors");
        run_monitor_strategy(&runtime, raw_tx);
        return;
    }

    if !permissions::check_permissions().tap_available() {
        warn!("Input Monitoring not granted; falling back to permission-free monitors");
        run_monitor_strategy(&runtime, raw_tx);
        return;
    }

    match Source::spawn_tap(raw_tx.clone()) {
        Ok(mut source) => {
            info!("event tap running");
            wait_for_shutdown(&runtime);
            source.stop();
        }
        Err(e) => {
            warn!(error = %e, "event tap unavailable; falling back to permission-free monitors");
            run_monitor_strategy(&runtime, raw_tx);
        }
    }
}

/// Drain raw events off the capture channel into the engine.
///
/// Runs on a blocking runtime thread so `Engine::handle_raw` executes inside
/// the runtime context it needs for arming hold timers.
fn pump_raw_events(runtime: &Runtime, engine: Engine, raw_rx: Receiver<RawEvent>) {
    runtime.spawn_blocking(move || {
        while let Ok(ev) = raw_rx.recv() {
            if let Err(e) = engine.handle_raw(ev) {
                warn!(error = %e, "engine stopped");
                break;
            }
        }
        debug!("raw_pump_exited");
    });
}

/// Run the NSEvent monitor capture on the main thread until Ctrl-C.
///
/// The monitors must be installed from the thread whose run loop services
/// them, so this call does not return until shutdown.
fn run_monitor_strategy(runtime: &Runtime, raw_tx: Sender<RawEvent>) {
    let ctrl = Arc::new(RunLoopControl::new());
    let (ready_tx, ready_rx) = crossbeam_channel::bounded::<mac_tap::Result<()>>(1);

    thread::spawn(move || match ready_rx.recv() {
        Ok(Ok(())) => info!("monitor capture ready"),
        Ok(Err(e)) => error!(error = %e, "monitor capture failed to start"),
        Err(_) => {}
    });

    let stop_ctrl = ctrl.clone();
    runtime.spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutting down");
            stop_ctrl.stop();
        }
    });

    if let Err(e) = mac_tap::run_monitor_loop(raw_tx, ready_tx, ctrl) {
        error!("{}", e);
        process::exit(1);
    }
}

/// Block the main thread until Ctrl-C.
fn wait_for_shutdown(runtime: &Runtime) {
    let _ = runtime.block_on(tokio::signal::ctrl_c());
    info!("shutting down");
}
