//! # progress-demo
//!
//! Floods a rolling progress log with a running counter, the way an indexer
//! reports "file N done", and renders the window to the terminal at the
//! drainer's cadence. Runs for `--duration-secs` or until Ctrl-C.

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use lib_progress::loggers::setup_logging;
use lib_progress::{ProgressConfig, ProgressLog, ProgressOverrides, RollingWindow, TableView};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[clap(about = "Rolling progress log demo", version)]
struct Args {
    #[clap(long, env = "PROGRESS_CONFIG_PATH", help = "Path to a JSON configuration file.")]
    config_path: Option<PathBuf>,

    #[clap(long, env = "PROGRESS_ITEM_LIMIT", help = "Rows kept in the rolling window (minimum 2).")]
    item_limit: Option<usize>,

    #[clap(long, env = "PROGRESS_FLUSH_INTERVAL_MS", help = "Milliseconds between display updates.")]
    flush_interval_ms: Option<u64>,

    #[clap(long, env = "PROGRESS_SENTINEL", help = "Row text marking truncated history.")]
    sentinel: Option<String>,

    #[clap(long, env = "PROGRESS_PRODUCERS", default_value_t = 1, help = "Number of producer threads.")]
    producers: usize,

    #[clap(long, env = "PROGRESS_PRODUCER_DELAY_MICROS", default_value_t = 0, help = "Pause after each message, in microseconds.")]
    producer_delay_micros: u64,

    #[clap(long, env = "PROGRESS_DURATION_SECS", default_value_t = 5, help = "How long to run before disposing the display.")]
    duration_secs: u64,

    #[clap(long, env = "PROGRESS_LOG_DIR", help = "Directory for log files.")]
    log_dir: Option<PathBuf>,

    #[clap(long, env = "PROGRESS_LOG_LEVEL", default_value = "info", help = "Logging level (trace, debug, info, warn, error).")]
    log_level: String,
}

/// Repaints a one-line status with the newest row each time the drainer reveals it.
#[derive(Default)]
struct TerminalView {
    item_count: usize,
    repaints: u64,
    rebuilds: u64,
}

impl TableView for TerminalView {
    fn set_item_count(&mut self, count: usize) {
        self.item_count = count;
    }

    fn clear_all(&mut self) {
        self.rebuilds += 1;
    }

    fn show_item(&mut self, index: usize, rows: &RollingWindow) {
        self.repaints += 1;
        let first = rows.get(0).unwrap_or("");
        let last = rows.get(index).unwrap_or("");
        let head = if rows.is_truncated() { first.truecolor(128, 128, 128) } else { first.normal() };
        print!(
            "\r{} {:>6} rows | first {:<8} | last {:<12}",
            "[progress]".truecolor(128, 128, 128),
            self.item_count,
            head,
            last.bright_green()
        );
        let _ = std::io::stdout().flush();
    }
}

fn load_config(args: &Args) -> Result<ProgressConfig> {
    let base = match &args.config_path {
        Some(path) => ProgressConfig::load(path)
            .with_context(|| format!("Failed to load config file {}", path.display()))?,
        None => ProgressConfig::default(),
    };
    Ok(base.merge(ProgressOverrides {
        item_limit: args.item_limit,
        flush_interval_ms: args.flush_interval_ms,
        sentinel: args.sentinel.clone(),
    }))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(path) = setup_logging(args.log_dir.as_deref(), "progress_demo", &args.log_level)? {
        log::info!("Writing logs to {}", path.display());
    }

    let config = load_config(&args)?;
    log::debug!("{}", config);

    let view = Arc::new(Mutex::new(TerminalView::default()));
    let disposed = CancellationToken::new();
    let progress = ProgressLog::spawn_with_parent(&config, Arc::clone(&view), &disposed)?;

    // Producers append as fast as they can until the display goes away.
    let producers: Vec<_> = (0..args.producers.max(1))
        .map(|p| {
            let handle = progress.handle();
            let disposed = disposed.clone();
            let delay = Duration::from_micros(args.producer_delay_micros);
            thread::Builder::new()
                .name(format!("progress-producer-{p}"))
                .spawn(move || {
                    let mut i: u64 = 0;
                    while !disposed.is_cancelled() {
                        handle.append(if p == 0 { i.to_string() } else { format!("{p}:{i}") });
                        i += 1;
                        if !delay.is_zero() {
                            thread::sleep(delay);
                        }
                    }
                    i
                })
        })
        .collect::<std::io::Result<_>>()
        .context("Failed to spawn producer threads")?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => log::info!("Interrupted, disposing display."),
        _ = tokio::time::sleep(Duration::from_secs(args.duration_secs)) => {}
    }
    disposed.cancel();

    let pending = progress.pending();
    let report = progress.close().await?;
    let produced: u64 = producers.into_iter().map(|h| h.join().unwrap_or(0)).sum();

    let view = view.lock().unwrap_or_else(|e| e.into_inner());
    println!();
    println!(
        "{} produced {} messages, delivered {} in {} batches ({:.1} per batch), dropped {}, left pending {}",
        "[progress]".truecolor(128, 128, 128),
        produced.to_string().bright_white(),
        report.messages_delivered.to_string().bright_green(),
        report.batches_delivered,
        report.messages_delivered as f64 / report.batches_delivered.max(1) as f64,
        report.messages_dropped.to_string().bright_yellow(),
        pending
    );
    println!(
        "{} window rebuilt {} times, view repainted {} times",
        "[progress]".truecolor(128, 128, 128),
        view.rebuilds,
        view.repaints
    );
    Ok(())
}
