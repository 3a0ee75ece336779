use anyhow::{Context, Result};
use aya::maps::PerCpuArray;
use aya::Ebpf;
use dropscope_common::{COUNTER_EMITTED, COUNTER_LOST};

/// Kernel-side delivery counters, summed over all CPUs
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct KernelCounters {
    /// Records written to the ring buffer
    pub emitted: u64,
    /// Records dropped because the ring buffer was full
    pub lost: u64,
}

/// Read the `DROP_COUNTERS` per-CPU map
///
/// # Errors
/// Returns an error if the map is missing or can't be read
pub fn read_kernel_counters(bpf: &Ebpf) -> Result<KernelCounters> {
    let counters: PerCpuArray<_, u64> = PerCpuArray::try_from(
        bpf.map("DROP_COUNTERS").context("DROP_COUNTERS map not found")?,
    )?;

    let sum = |key: u32| -> Result<u64> {
        let values = counters.get(&key, 0).with_context(|| format!("DROP_COUNTERS[{key}]"))?;
        Ok(values.iter().sum())
    };

    Ok(KernelCounters { emitted: sum(COUNTER_EMITTED)?, lost: sum(COUNTER_LOST)? })
}
