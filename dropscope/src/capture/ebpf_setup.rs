//! # eBPF Program Loading and Attachment
//!
//! Loads compiled eBPF bytecode and attaches the drop tracepoint.
//!
//! ## Functions
//!
//! - [`load_ebpf_program()`] - Load eBPF bytecode from embedded binary
//! - [`configure_netns()`] - One-shot write of the `CONFIG` map
//! - [`attach_kfree_skb()`] - Attach the `skb/kfree_skb` tracepoint
//!
//! Configuration must be written before attaching: the program reads `CONFIG`
//! on every drop and is never reconfigured afterwards.

use anyhow::{Context, Result};
use aya::{include_bytes_aligned, maps::Array, programs::TracePoint, Ebpf};
use aya_log::EbpfLogger;
use log::{info, warn};

use super::NetnsConfig;

/// Load the eBPF program binary
///
/// Always uses the release build; debug eBPF builds don't link.
///
/// # Errors
/// Returns an error if the eBPF program binary cannot be loaded
pub fn load_ebpf_program() -> Result<Ebpf> {
    let bpf = Ebpf::load(include_bytes_aligned!(
        "../../../target/bpfel-unknown-none/release/dropscope"
    ))
    .context("Failed to load eBPF program")?;
    Ok(bpf)
}

/// Initialize eBPF logger
pub fn init_ebpf_logger(bpf: &mut Ebpf) {
    if let Err(e) = EbpfLogger::init(bpf) {
        warn!("Failed to initialize eBPF logger: {e}");
    }
}

/// Write the namespace filter, init namespace and struct offsets into `CONFIG`
///
/// # Errors
/// Returns an error if the `CONFIG` map is missing or a write fails
pub fn configure_netns(bpf: &mut Ebpf, config: &NetnsConfig) -> Result<()> {
    let mut config_map: Array<_, u64> =
        Array::try_from(bpf.map_mut("CONFIG").context("CONFIG map not found")?)?;

    for (key, value) in config.map_entries() {
        config_map.set(key, value, 0).with_context(|| format!("Failed to set CONFIG[{key}]"))?;
    }

    match config.filter {
        Some(ns) => info!("✓ Filtering drops to netns {ns}"),
        None => info!("✓ Reporting drops from all namespaces"),
    }
    Ok(())
}

/// Attach the `skb/kfree_skb` tracepoint
///
/// # Errors
/// Returns an error if the program is missing, fails verification, or can't attach
pub fn attach_kfree_skb(bpf: &mut Ebpf) -> Result<()> {
    let program: &mut TracePoint = bpf
        .program_mut("kfree_skb_hook")
        .context("kfree_skb_hook program not found")?
        .try_into()?;
    program.load().context("Failed to load kfree_skb_hook")?;
    program.attach("skb", "kfree_skb").context("Failed to attach skb/kfree_skb")?;
    info!("✓ Attached tracepoint: skb/kfree_skb");
    Ok(())
}
