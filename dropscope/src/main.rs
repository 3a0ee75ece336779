//! # dropscope - Main Entry Point
//!
//! Loads the kernel symbol cache, attaches the `skb/kfree_skb` tracepoint and
//! prints a symbolized stack for every dropped packet until interrupted.

use anyhow::{Context, Result};
use aya::maps::RingBuf;
use clap::Parser;
use log::{info, warn};
use std::io::{self, BufWriter};
use std::time::{Duration, Instant};

use dropscope::capture::{
    attach_kfree_skb, configure_netns, display_summary, init_ebpf_logger, load_ebpf_program,
    read_kernel_counters, EventProcessor, NetnsConfig, ShutdownSignal,
};
use dropscope::cli::Args;
use dropscope::preflight::run_preflight_checks;
use dropscope::symbolization::{StackSymbolizer, SymbolCache};

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_NOPERM: i32 = 77;

/// Ring buffer poll interval when no records are pending
const POLL_INTERVAL: Duration = Duration::from_millis(100);

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e:#}");
            code
        }
    });
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    let msg = err.to_string().to_lowercase();
    if msg.contains("permission denied") || msg.contains("requires root") {
        EXIT_NOPERM
    } else {
        EXIT_ERROR
    }
}

#[tokio::main]
async fn run() -> Result<()> {
    let args = Args::parse();
    let quiet = args.quiet;

    run_preflight_checks(&args.kallsyms)?;

    // Symbols first: no point attaching if frames can't be resolved
    let cache = SymbolCache::from_kallsyms(&args.kallsyms)
        .with_context(|| format!("Failed to build symbol cache from {}", args.kallsyms.display()))?;

    if !quiet {
        eprintln!("dropscope v{}", env!("CARGO_PKG_VERSION"));
        eprintln!("symbols: {}", cache.len());
        match args.netns_filter() {
            Some(ns) => eprintln!("netns: {ns}"),
            None => eprintln!("netns: all"),
        }
    }

    // ── Load eBPF, configure, attach ────────────────────────────────────
    let mut bpf = load_ebpf_program()?;
    init_ebpf_logger(&mut bpf);

    let netns = NetnsConfig::detect(args.netns_filter())
        .context("Failed to prepare network namespace configuration")?;
    configure_netns(&mut bpf, &netns)?;
    attach_kfree_skb(&mut bpf)?;

    let mut ring_buf =
        RingBuf::try_from(bpf.take_map("EVENTS").context("EVENTS map not found")?)?;

    // ── Event loop ──────────────────────────────────────────────────────
    let shutdown = ShutdownSignal::new();
    shutdown.listen_for_signals();

    let symbolizer = StackSymbolizer::new(&cache);
    let mut processor = EventProcessor::new(symbolizer, BufWriter::new(io::stdout().lock()));

    let start = Instant::now();
    let duration_limit = (args.duration > 0).then(|| Duration::from_secs(args.duration));
    if let Some(limit) = duration_limit {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(limit).await;
            shutdown.trigger();
        });
    }
    let mut last_status_time = Instant::now();

    info!("Waiting for packet drops...");

    loop {
        processor.drain(&mut ring_buf, &shutdown).context("Failed to write stack")?;
        processor.flush().context("Failed to flush output")?;

        if shutdown.is_triggered() {
            break;
        }

        if processor.stats.records == 0 && last_status_time.elapsed() > Duration::from_secs(10) {
            info!("Still waiting for drops... (no records received yet)");
            last_status_time = Instant::now();
        }

        tokio::time::sleep(POLL_INTERVAL).await;
    }

    let exit_reason = if duration_limit.is_some_and(|limit| start.elapsed() >= limit) {
        "duration limit reached"
    } else {
        "interrupted"
    };

    if !quiet {
        let kernel = match read_kernel_counters(&bpf) {
            Ok(counters) => {
                if counters.lost > 0 {
                    warn!("{} drop records lost to a full ring buffer", counters.lost);
                }
                Some(counters)
            }
            Err(e) => {
                warn!("Failed to read kernel counters: {e}");
                None
            }
        };
        display_summary(exit_reason, start.elapsed(), &processor.stats, kernel);
    }

    Ok(())
}
