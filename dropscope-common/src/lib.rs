//! # Shared Data Structures (eBPF ↔ Userspace)
//!
//! Defines the drop record and the configuration-map layout shared between the
//! kernel-side `kfree_skb` program and userspace. All types use `#[repr(C)]`
//! for a fixed layout across the kernel/userspace boundary.
//!
//! ## Key Types
//!
//! - [`DropEvent`] - One captured drop: namespace id plus raw kernel stack
//! - [`KfreeSkbArgs`] - Tracepoint arguments from `skb/kfree_skb`

#![no_std]

// ============================================================================
// Limits
// ============================================================================

/// Maximum number of kernel stack frames captured per drop
///
/// Keeps [`DropEvent`] at 168 bytes, well inside the 512-byte eBPF stack.
pub const MAX_STACK_DEPTH: usize = 20;

/// Size in bytes of one serialized [`DropEvent`]
pub const DROP_EVENT_SIZE: usize = 8 + MAX_STACK_DEPTH * 8;

// ============================================================================
// CONFIG map keys (Array<u64>, written once by userspace before attach)
// ============================================================================

/// Inode of the init network namespace, used when the skb namespace can't be read
pub const CONFIG_INIT_NETNS: u32 = 0;

/// Namespace filter: 0 reports every namespace, otherwise only this inode
pub const CONFIG_NETNS_FILTER: u32 = 1;

/// Byte offset of `dev` in `struct sk_buff`
pub const CONFIG_OFF_SKB_DEV: u32 = 2;

/// Byte offset of `nd_net.net` in `struct net_device`
pub const CONFIG_OFF_DEV_NET: u32 = 3;

/// Byte offset of `ns` in `struct net`
pub const CONFIG_OFF_NET_NS: u32 = 4;

/// Byte offset of `inum` in `struct ns_common`
pub const CONFIG_OFF_NS_INUM: u32 = 5;

/// 1 when the offsets above were resolved from BTF
pub const CONFIG_NETNS_OFFSETS_VALID: u32 = 6;

/// Number of slots in the CONFIG map
pub const CONFIG_ENTRIES: u32 = 7;

// ============================================================================
// DROP_COUNTERS map keys (PerCpuArray<u64>, summed by userspace)
// ============================================================================

/// Events successfully written to the ring buffer
pub const COUNTER_EMITTED: u32 = 0;

/// Events lost because the ring buffer was full
pub const COUNTER_LOST: u32 = 1;

/// Number of slots in the DROP_COUNTERS map
pub const COUNTER_ENTRIES: u32 = 2;

// ============================================================================
// Shared Data Structures
// ============================================================================

/// Drop record sent from eBPF to userspace via ring buffer
///
/// **Memory Layout** (little-endian on every supported BPF target):
///
/// ```text
/// offset 0 : netns       u32
/// offset 4 : stack_size  u32   bytes written by bpf_get_stack (negative on error)
/// offset 8 : stack       [u64; 20]
/// ```
#[repr(C)]
#[derive(Clone, Copy)]
pub struct DropEvent {
    /// Network namespace inode the skb belonged to
    pub netns: u32,

    /// Number of bytes of `stack` filled by `bpf_get_stack`
    ///
    /// Only `stack_size / 8` entries of `stack` are meaningful. The helper's
    /// negative error codes arrive here reinterpreted as large values.
    pub stack_size: u32,

    /// Kernel return addresses, innermost first
    pub stack: [u64; MAX_STACK_DEPTH],
}

impl DropEvent {
    #[must_use]
    pub const fn zeroed() -> Self {
        Self { netns: 0, stack_size: 0, stack: [0; MAX_STACK_DEPTH] }
    }
}

/// Tracepoint arguments for `skb/kfree_skb`
///
/// Layout from `/sys/kernel/tracing/events/skb/kfree_skb/format`. Only the
/// leading fields are declared; later kernels append `reason` and
/// `rx_sk`, which this program doesn't read.
#[repr(C)]
pub struct KfreeSkbArgs {
    /// Common tracepoint header
    #[allow(clippy::pub_underscore_fields)]
    pub __unused__: u64,

    /// `struct sk_buff *` being freed
    pub skbaddr: u64,

    /// Return address of the caller that dropped the skb
    pub location: u64,
}
