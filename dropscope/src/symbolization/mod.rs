//! # Kernel Symbol Resolution
//!
//! Converts raw kernel return addresses captured at `kfree_skb` into
//! `function+offset` strings, using the symbol table the kernel exports in
//! `/proc/kallsyms`.
//!
//! ## Why a floor lookup
//!
//! A captured address points somewhere inside a function body, not at its
//! entry. kallsyms only lists entry addresses, so the enclosing function is the
//! symbol with the largest address not above the captured one:
//!
//! ```text
//! kallsyms:   ffffffff81a3c000 T ip_rcv_core
//!             ffffffff81a3c500 T ip_rcv
//! captured:   ffffffff81a3c1f4
//! result:     ip_rcv_core+0x1f4
//! ```
//!
//! An address below the first known symbol has no enclosing function and is
//! reported unresolved.
//!
//! ## Lifecycle
//!
//! 1. **Load** (`kallsyms`): parse the listing into an unsorted `Vec<Symbol>`
//! 2. **Build** (`cache`): sort once by address; the cache is immutable from here on
//! 3. **Resolve** (`symbolizer`): O(log n) binary search per frame
//!
//! The cache is built before the tracepoint is attached, so every record that
//! reaches userspace can be resolved. Module loads after startup are not
//! tracked; their frames may resolve to the nearest preceding core symbol.
//!
//! ## Example
//!
//! ```rust,ignore
//! let cache = SymbolCache::from_kallsyms("/proc/kallsyms")?;
//! let symbolizer = StackSymbolizer::new(&cache);
//! for frame in symbolizer.symbolize(&record) {
//!     println!("{frame}");
//! }
//! ```

pub mod cache;
pub mod kallsyms;
pub mod symbolizer;

pub use cache::SymbolCache;
pub use kallsyms::{load_kallsyms, parse_kallsyms, parse_line, Symbol, KALLSYMS_PATH};
pub use symbolizer::{ResolvedFrame, Resolution, StackSymbolizer};
