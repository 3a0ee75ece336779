//! # eBPF Kernel-Side Instrumentation
//!
//! Tracepoint program that fires whenever the kernel frees an skb because it
//! was dropped, and ships the namespace plus kernel stack to userspace.
//!
//! ## Programs
//!
//! - **Tracepoint**: `kfree_skb_hook` on `skb/kfree_skb`
//!
//! ## Maps (Shared with Userspace)
//!
//! - `EVENTS` - Ring buffer (256KB) of [`DropEvent`] records
//! - `CONFIG` - Namespace filter, init namespace, struct offsets
//! - `DROP_COUNTERS` - Per-CPU emitted / lost counters
//!
//! ## Build
//!
//! Always compiled in release mode (debug includes incompatible formatting code):
//! ```bash
//! cargo xtask build-ebpf
//! ```

#![no_std]
#![no_main]
#![allow(unused_unsafe)]

use aya_ebpf::{
    helpers::{bpf_probe_read_kernel, gen::bpf_get_stack},
    macros::{map, tracepoint},
    maps::{Array, PerCpuArray, RingBuf},
    programs::TracePointContext,
    EbpfContext,
};
use aya_log_ebpf::warn;
use dropscope_common::{
    DropEvent, KfreeSkbArgs, CONFIG_ENTRIES, CONFIG_INIT_NETNS, CONFIG_NETNS_FILTER,
    CONFIG_NETNS_OFFSETS_VALID, CONFIG_OFF_DEV_NET, CONFIG_OFF_NET_NS, CONFIG_OFF_NS_INUM,
    CONFIG_OFF_SKB_DEV, COUNTER_EMITTED, COUNTER_ENTRIES, COUNTER_LOST, MAX_STACK_DEPTH,
};

// ============================================================================
// eBPF Maps - Shared data structures between kernel and userspace
// ============================================================================

/// Ring buffer for sending drop records to userspace
///
/// - **Size**: 256KB (~1500 records)
/// - **Usage**: Kernel writes with `EVENTS.output()`, userspace drains with `ring_buf.next()`
#[map]
static EVENTS: RingBuf = RingBuf::with_byte_size(256 * 1024, 0);

/// Map: Config key → Config value
///
/// Written once by userspace before the tracepoint is attached.
/// See the `CONFIG_*` constants in `dropscope-common` for the key layout.
#[map]
static CONFIG: Array<u64> = Array::with_max_entries(CONFIG_ENTRIES, 0);

/// Per-CPU counters: records emitted and records lost to a full ring buffer
#[map]
static DROP_COUNTERS: PerCpuArray<u64> = PerCpuArray::with_max_entries(COUNTER_ENTRIES, 0);

// ============================================================================
// eBPF Program Hooks
// ============================================================================

/// Hook: skb/kfree_skb tracepoint
/// Called every time the kernel frees a dropped packet
#[tracepoint]
pub fn kfree_skb_hook(ctx: TracePointContext) -> u32 {
    match try_kfree_skb(&ctx) {
        Ok(()) => 0,
        Err(_) => 1,
    }
}

fn try_kfree_skb(ctx: &TracePointContext) -> Result<(), i64> {
    let args: *const KfreeSkbArgs = ctx.as_ptr() as *const KfreeSkbArgs;
    let skb = unsafe { (*args).skbaddr };

    let netns = skb_netns(skb);

    let filter = config(CONFIG_NETNS_FILTER);
    if filter != 0 && filter != u64::from(netns) {
        return Ok(());
    }

    let mut event = DropEvent::zeroed();
    event.netns = netns;

    // Negative errno is kept as-is; userspace rejects it as an oversized stack.
    let written = unsafe {
        bpf_get_stack(
            ctx.as_ptr(),
            event.stack.as_mut_ptr() as *mut _,
            (MAX_STACK_DEPTH * core::mem::size_of::<u64>()) as u32,
            0,
        )
    };
    event.stack_size = written as u32;

    let output_result = unsafe { EVENTS.output(&event, 0) };

    if output_result.is_ok() {
        bump(COUNTER_EMITTED);
    } else {
        bump(COUNTER_LOST);
        warn!(ctx, "ring buffer full, lost drop in netns {}", netns);
    }

    output_result.map_err(|_| 1i64)?;
    Ok(())
}

/// Namespace inode of the skb's device, or the init namespace when it can't be read
fn skb_netns(skb: u64) -> u32 {
    let init = config(CONFIG_INIT_NETNS) as u32;
    if config(CONFIG_NETNS_OFFSETS_VALID) != 1 {
        return init;
    }
    read_netns(skb).unwrap_or(init)
}

fn read_netns(skb: u64) -> Result<u32, i64> {
    let dev: u64 =
        unsafe { bpf_probe_read_kernel((skb + config(CONFIG_OFF_SKB_DEV)) as *const u64)? };
    if dev == 0 {
        return Err(1);
    }

    let net: u64 =
        unsafe { bpf_probe_read_kernel((dev + config(CONFIG_OFF_DEV_NET)) as *const u64)? };
    if net == 0 {
        return Err(1);
    }

    let inum_addr = net + config(CONFIG_OFF_NET_NS) + config(CONFIG_OFF_NS_INUM);
    let inum: u32 = unsafe { bpf_probe_read_kernel(inum_addr as *const u32)? };
    Ok(inum)
}

// Helper: Read a CONFIG slot (0 if unset)
fn config(key: u32) -> u64 {
    CONFIG.get(key).copied().unwrap_or(0)
}

// Helper: Increment a per-CPU counter
fn bump(key: u32) {
    if let Some(counter) = DROP_COUNTERS.get_ptr_mut(key) {
        unsafe { *counter += 1 };
    }
}

#[cfg(all(not(test), target_os = "none"))]
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    unsafe { core::hint::unreachable_unchecked() }
}
