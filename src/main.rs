mod app;
mod collectors;
mod config;
mod error;
mod input;
mod logging;
mod models;
mod raid;
mod sampler;
mod scheduler;
mod ui;
mod util;

use app::App;
use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use clap::Parser;
use crossterm::{
    cursor::MoveTo,
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use scheduler::{Scheduler, SchedulerConfig};
use std::io::{self, Write};
use std::panic;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "xdmon", about = "External disk temperature and throughput monitor", version)]
struct Cli {
    /// Refresh interval in seconds, e.g. 1.5 (overrides the config file)
    #[arg(short, long, value_name = "SECONDS", value_parser = parse_interval)]
    interval: Option<u64>,

    /// Disable SMART temperature probing
    #[arg(long)]
    no_temp: bool,

    /// Print a JSON snapshot (two samples one interval apart) and exit
    #[arg(long)]
    json: bool,

    /// Print a refreshing plain-text view instead of the dashboard
    #[arg(long)]
    plain: bool,

    /// Print config file path and current values, then exit
    #[arg(long)]
    config: bool,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let dashboard = !(cli.json || cli.plain || cli.config);
    if dashboard {
        if let Err(e) = logging::init(logging::Target::File, cli.verbose) {
            eprintln!("xdmon: logging disabled: {:#}", e);
        }
    } else {
        logging::init(logging::Target::Stderr, cli.verbose)?;
    }

    if cli.config {
        return run_print_config();
    }

    let mut cfg = config::Config::load();
    if let Some(ms) = cli.interval {
        cfg.general.refresh_interval_ms = ms;
    }
    let mut sched_cfg = SchedulerConfig::from_config(&cfg);
    sched_cfg.temperatures = !cli.no_temp;
    let probes = collectors::system_probes(cfg.general.probe_timeout());
    let scheduler = Scheduler::new(sched_cfg, probes);

    if cli.json {
        return run_json(scheduler);
    }
    if cli.plain {
        return run_plain(scheduler);
    }

    // Restore terminal on panic. Refresh-thread panics are caught per tick,
    // so they go to the log and the dashboard stays up.
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        if thread::current().name() == Some(scheduler::REFRESH_THREAD) {
            error!(%info, "panic in refresh thread");
            return;
        }
        let _ = restore_terminal();
        original_hook(info);
    }));

    let shutdown = Arc::new(AtomicBool::new(false));
    let (rx, _handle) = scheduler.spawn(shutdown.clone()).context("starting refresh thread")?;

    let result = run(App::new(rx));
    restore_terminal()?;
    // A tick still in flight ends with the process.
    shutdown.store(true, Ordering::Relaxed);
    result
}

fn run(mut app: App) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    let backend = CrosstermBackend::new(stdout);
    let mut term = Terminal::new(backend)?;

    app.run(&mut term)
}

fn restore_terminal() -> Result<()> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture)?;
    Ok(())
}

/// Two ticks one interval apart, so the rates are real measurements.
fn run_json(mut scheduler: Scheduler) -> Result<()> {
    scheduler.tick(Utc::now());
    thread::sleep(scheduler.interval());
    let snapshot = scheduler.tick(Utc::now());
    println!("{}", serde_json::to_string_pretty(&*snapshot)?);
    Ok(())
}

fn run_plain(scheduler: Scheduler) -> Result<()> {
    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let flag = shutdown.clone();
        ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
            .context("installing Ctrl+C handler")?;
    }

    let interval = scheduler.interval();
    let (rx, handle) = scheduler.spawn(shutdown.clone()).context("starting refresh thread")?;
    let mut stdout = io::stdout();

    // The sender drops once the loop sees the shutdown flag.
    for snapshot in rx.iter() {
        execute!(stdout, Clear(ClearType::All), MoveTo(0, 0))?;
        write!(stdout, "{}", ui::plain::render(&snapshot, interval))?;
        stdout.flush()?;
    }

    handle.join().map_err(|_| anyhow!("refresh thread panicked"))?;
    if shutdown.load(Ordering::Relaxed) {
        info!("interrupted");
    } else {
        warn!("refresh loop ended unexpectedly");
    }
    println!("\nStopped.");
    Ok(())
}

/// Seconds on the command line, milliseconds in the config file.
fn parse_interval(arg: &str) -> std::result::Result<u64, String> {
    let secs: f64 = arg.trim().parse().map_err(|_| format!("`{}` is not a number of seconds", arg))?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err(format!("interval must be a positive number of seconds, got `{}`", arg));
    }
    Ok((secs * 1000.0).round() as u64)
}

fn run_print_config() -> Result<()> {
    let cfg = config::Config::load();
    let path = config::Config::config_path()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| "(unknown)".to_string());
    let g = &cfg.general;
    println!("Config: {}", path);
    println!();
    println!("[general]");
    println!("  refresh_interval_ms = {}", g.refresh_interval().as_millis());
    println!("  temperature_every   = {}", g.temperature_every());
    println!("  min_elapsed_ms      = {}", g.min_elapsed().as_millis());
    println!("  probe_timeout_ms    = {}", g.probe_timeout().as_millis());
    println!("  smoothing           = {}", g.smoothing);
    println!();
    println!("[devices]");
    if cfg.devices.exclude.is_empty() {
        println!("  exclude = (none)");
    } else {
        println!("  exclude = {}", cfg.devices.exclude.join(", "));
    }
    let mut aliases: Vec<_> = cfg.devices.aliases.iter().collect();
    aliases.sort();
    for (id, name) in aliases {
        println!("  alias   {} = {}", id, name);
    }
    if let Some(log) = logging::log_path() {
        println!();
        println!("Dashboard log: {}", log.display());
    }
    Ok(())
}
