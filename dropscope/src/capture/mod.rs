//! Drop capture modules
//!
//! Everything between the kernel tracepoint and the printed stack:
//! - eBPF program loading, configuration and attachment
//! - Namespace field offsets from BTF
//! - Drop record decoding
//! - Event processing and display
//! - Kernel-side delivery counters
//! - Cooperative shutdown

pub mod diagnostics;
pub mod ebpf_setup;
pub mod event_display;
pub mod event_processor;
pub mod netns;
pub mod record;
pub mod shutdown;

// Re-export common types
pub use diagnostics::{read_kernel_counters, KernelCounters};
pub use ebpf_setup::{attach_kfree_skb, configure_netns, init_ebpf_logger, load_ebpf_program};
pub use event_display::{display_summary, write_stack, ProcessingStats, STACK_SEPARATOR};
pub use event_processor::{EventProcessor, RecordSource};
pub use netns::{NetnsConfig, NetnsOffsets};
pub use record::{StackFrames, StackRecord, STACK_RECORD_SIZE};
pub use shutdown::ShutdownSignal;
