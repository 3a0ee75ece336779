//! # dropscope - Kernel Packet Drop Tracer
//!
//! dropscope attaches an eBPF program to the `skb/kfree_skb` tracepoint and
//! prints the kernel call stack of every dropped packet, symbolized against
//! `/proc/kallsyms`.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                   eBPF Program (Kernel)                         │
//! │  • Tracepoint: skb/kfree_skb                                    │
//! │  • Namespace filter from CONFIG map                             │
//! │  • bpf_get_stack() into a 168-byte DropEvent                    │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ ring buffer
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                  dropscope (This Crate)                         │
//! │                                                                 │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐         │
//! │  │   Capture    │──▶│    Event     │──▶│    stdout    │         │
//! │  │  (decode)    │   │  Processor   │   │  (frames)    │         │
//! │  └──────────────┘   └──────┬───────┘   └──────────────┘         │
//! │                            ▼                                    │
//! │                    ┌──────────────┐                             │
//! │                    │ Symbolizer   │                             │
//! │                    │ (kallsyms)   │                             │
//! │                    └──────────────┘                             │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`capture`]: eBPF loading, namespace config, record decoding, event loop pieces
//! - [`symbolization`]: kallsyms parsing, the sorted symbol cache, frame resolution
//! - [`cli`]: Command-line argument parsing
//! - [`domain`]: Core domain types and errors
//! - [`preflight`]: System requirement checks run before loading eBPF
//!
//! ## Typical Usage
//!
//! ```bash
//! # Every drop on the host
//! sudo ./dropscope
//!
//! # Only drops in one network namespace
//! sudo ./dropscope --netns $(readlink /proc/<pid>/ns/net | tr -dc 0-9)
//! ```

pub mod capture;
pub mod cli;
pub mod domain;
pub mod preflight;
pub mod symbolization;
