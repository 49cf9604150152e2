use anyhow::Result;
use clap::{error::ErrorKind, Parser};
use multithreaded_downloader::{
    args::{self, Args},
    BlockingQueue, Config, ThreadPool,
};
use std::{ops::Range, sync::Arc, time::Instant};
use tracing::{debug, info};

/// Размер буфера в памяти, по которому считается контрольная сумма в демо.
const DEMO_PAYLOAD_LEN: usize = 8 * 1024 * 1024;

struct Progress {
    segment: usize,
    bytes: usize,
}

fn main() -> Result<()> {
    // Парсим до инициализации tracing, чтобы --help работал без логов
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => return Err(args::invalid_argument(err).into()),
    };

    // RUST_LOG важнее флагов -q / -v
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let options = args.options();
    info!(
        url = %options.url,
        file = %options.file_path.display(),
        threads = options.num_threads,
        resumable = options.resumable,
        "download options"
    );

    let pool = ThreadPool::with_config(
        Config::default()
            .num_threads(options.num_threads)
            .thread_name_prefix("segment"),
    )?;

    let now = Instant::now();
    let payload: Arc<Vec<u8>> = Arc::new((0..DEMO_PAYLOAD_LEN).map(|i| (i % 251) as u8).collect());
    let progress = Arc::new(BlockingQueue::new());

    let ranges = segments(payload.len(), options.num_threads);
    let handles = ranges
        .into_iter()
        .enumerate()
        .map(|(segment, range)| {
            let payload = payload.clone();
            let progress = progress.clone();
            pool.enqueue_with(
                move |range: Range<usize>| {
                    let bytes = range.len();
                    let sum = payload[range].iter().map(|&b| b as u64).sum::<u64>();
                    progress.push(Progress { segment, bytes });
                    sum
                },
                range,
            )
        })
        .collect::<multithreaded_downloader::Result<Vec<_>>>()?;

    for _ in 0..handles.len() {
        let event = progress.pop();
        debug!(segment = event.segment, bytes = event.bytes, "segment finished");
    }

    let mut checksum = 0u64;
    for handle in handles {
        checksum += handle.join()?;
    }

    pool.join_all();
    let metrics = pool.metrics();
    pool.shutdown();

    info!(
        checksum,
        completed = metrics.completed_tasks,
        failed = metrics.failed_tasks,
        elapsed = ?now.elapsed(),
        "all segments processed"
    );
    Ok(())
}

/// Делит `len` байт на `parts` смежных диапазонов, остаток уходит в последний.
fn segments(len: usize, parts: usize) -> Vec<Range<usize>> {
    let parts = parts.max(1);
    let chunk = len / parts;
    (0..parts)
        .map(|i| {
            let start = i * chunk;
            let end = if i + 1 == parts { len } else { start + chunk };
            start..end
        })
        .collect()
}
