use anyhow::{Result, ensure};
use clap::Parser;
use lib_progress::loggers::setup_logging;
use lib_progress::{ProgressConfig, ProgressLog, RollingWindow, TableView};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Number of producer threads
    #[clap(short, long, default_value_t = 4)]
    producers: usize,

    /// Messages appended by each producer
    #[clap(short, long, default_value_t = 250_000)]
    messages: usize,

    /// Rows kept in the rolling window
    #[clap(short, long, default_value_t = 1000)]
    item_limit: usize,

    /// Milliseconds between drain cycles
    #[clap(short, long, default_value_t = 40)]
    flush_interval_ms: u64,
}

/// Counts updates and checks the window bound on every reveal.
#[derive(Default)]
struct CheckingView {
    reveals: u64,
    max_rows: usize,
    last_row: String,
}

impl TableView for CheckingView {
    fn set_item_count(&mut self, _count: usize) {}

    fn clear_all(&mut self) {}

    fn show_item(&mut self, index: usize, rows: &RollingWindow) {
        self.reveals += 1;
        self.max_rows = self.max_rows.max(rows.len());
        self.last_row = rows.get(index).unwrap_or_default().to_string();
    }
}

#[tokio::main]
/// # Progress Log Throughput Test
///
/// 1.  Starts a `ProgressLog` backed by a checking view.
/// 2.  Floods it from several producer threads.
/// 3.  Waits for the final message to be revealed, then disposes the log.
/// 4.  Reports batches per second, the average batch size and drops, and
///     asserts the window never exceeded its capacity.
async fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(None, "test_progress_throughput", "info")?;

    let config = ProgressConfig {
        item_limit: args.item_limit,
        flush_interval_ms: args.flush_interval_ms,
        ..ProgressConfig::default()
    };
    let view = Arc::new(Mutex::new(CheckingView::default()));
    let progress = ProgressLog::spawn(&config, Arc::clone(&view))?;
    log::info!(
        "Starting {} producers x {} messages against {}",
        args.producers.max(1),
        args.messages,
        config
    );

    let started = Instant::now();
    let go = Arc::new(AtomicBool::new(false));
    let producers: Vec<_> = (0..args.producers.max(1))
        .map(|p| {
            let handle = progress.handle();
            let go = Arc::clone(&go);
            let messages = args.messages;
            thread::spawn(move || {
                while !go.load(Ordering::Acquire) {
                    thread::yield_now();
                }
                for i in 0..messages {
                    handle.append(format!("producer {p} item {i}"));
                }
            })
        })
        .collect();
    go.store(true, Ordering::Release);
    for producer in producers {
        producer.join().map_err(|_| anyhow::anyhow!("producer thread panicked"))?;
    }
    let produced_in = started.elapsed();
    log::info!("Producers joined after {:.2?}, {} messages pending", produced_in, progress.pending());

    // Let the drainer catch up with whatever the producers left queued.
    while progress.pending() > 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    tokio::time::sleep(config.flush_interval() * 2).await;

    let report = progress.close().await?;
    let elapsed = started.elapsed();
    log::info!(
        "Drainer stopped: {} batches, {} delivered, {} dropped",
        report.batches_delivered,
        report.messages_delivered,
        report.messages_dropped
    );
    let view = view.lock().unwrap_or_else(|e| e.into_inner());

    let total = (args.producers.max(1) * args.messages) as u64;
    println!("Produced {} messages in {:.2?}", total, produced_in);
    println!(
        "Delivered {} messages in {} batches over {:.2?} ({:.1} batches/s, {:.1} messages/batch)",
        report.messages_delivered,
        report.batches_delivered,
        elapsed,
        report.batches_delivered as f64 / elapsed.as_secs_f64(),
        report.messages_delivered as f64 / report.batches_delivered.max(1) as f64
    );
    println!("Dropped {} messages, {} window rebuilds", report.messages_dropped, report.evictions);
    println!("Last row: {}", view.last_row);

    ensure!(view.max_rows <= config.effective_item_limit(), "window exceeded its capacity");
    ensure!(
        report.messages_delivered + report.messages_dropped == total,
        "every drained message must be either delivered or dropped"
    );
    ensure!(view.reveals == report.batches_delivered, "one reveal per delivered batch");
    Ok(())
}
