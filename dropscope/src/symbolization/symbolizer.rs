use std::fmt;

use super::SymbolCache;
use crate::capture::StackRecord;
use crate::domain::NetnsId;

/// Resolves captured kernel stacks against a shared [`SymbolCache`]
///
/// Holds only a shared reference, so any number of symbolizers can read the
/// same cache concurrently.
#[derive(Clone, Copy)]
pub struct StackSymbolizer<'a> {
    cache: &'a SymbolCache,
}

impl<'a> StackSymbolizer<'a> {
    #[must_use]
    pub fn new(cache: &'a SymbolCache) -> Self {
        Self { cache }
    }

    /// Resolve one return address to `name+offset`
    #[must_use]
    pub fn resolve(&self, netns: NetnsId, address: u64) -> ResolvedFrame {
        let resolution = match self.cache.lookup(address) {
            Some(symbol) => {
                Resolution::Symbol { name: symbol.name.clone(), offset: address - symbol.address }
            }
            None => Resolution::Unresolved,
        };

        ResolvedFrame { netns, address, resolution }
    }

    /// Resolve every valid frame of a record, innermost first
    #[must_use]
    pub fn symbolize(&self, record: &StackRecord) -> Vec<ResolvedFrame> {
        record.frames().iter().map(|&addr| self.resolve(record.netns(), addr)).collect()
    }
}

/// Outcome of looking up one address
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Symbol { name: String, offset: u64 },
    Unresolved,
}

/// A single stack frame after symbol lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFrame {
    pub netns: NetnsId,
    pub address: u64,
    pub resolution: Resolution,
}

impl ResolvedFrame {
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self.resolution, Resolution::Symbol { .. })
    }
}

impl fmt::Display for ResolvedFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.resolution {
            Resolution::Symbol { name, offset } => {
                write!(f, "\t{} {name}+0x{offset:x}", self.netns)
            }
            Resolution::Unresolved => write!(f, "\t{} {:x} <unresolved>", self.netns, self.address),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolization::kallsyms::{Symbol, SYSTEM_OWNER};

    fn cache() -> SymbolCache {
        SymbolCache::build(vec![
            Symbol { name: "foo".into(), address: 0x1000, owner: SYSTEM_OWNER.into() },
            Symbol { name: "bar".into(), address: 0x2000, owner: SYSTEM_OWNER.into() },
        ])
        .unwrap()
    }

    #[test]
    fn test_offset_arithmetic() {
        let cache = cache();
        let frame = StackSymbolizer::new(&cache).resolve(NetnsId(1), 0x1010);
        assert_eq!(frame.resolution, Resolution::Symbol { name: "foo".into(), offset: 0x10 });
        assert_eq!(frame.to_string(), "\t1 foo+0x10");
    }

    #[test]
    fn test_unresolved_frame() {
        let cache = cache();
        let frame = StackSymbolizer::new(&cache).resolve(NetnsId(4_026_531_840), 0x500);
        assert_eq!(frame.resolution, Resolution::Unresolved);
        assert!(!frame.is_resolved());
        assert_eq!(frame.to_string(), "\t4026531840 500 <unresolved>");
    }

    #[test]
    fn test_symbolize_preserves_order_and_count() {
        let cache = cache();
        let record = StackRecord::new(NetnsId(7), &[0x2004, 0x10, 0x1000]).unwrap();
        let frames = StackSymbolizer::new(&cache).symbolize(&record);

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].to_string(), "\t7 bar+0x4");
        assert!(!frames[1].is_resolved());
        assert_eq!(frames[2].to_string(), "\t7 foo+0x0");
        assert!(frames.iter().all(|f| f.netns == NetnsId(7)));
    }

    #[test]
    fn test_symbolize_empty_stack() {
        let cache = cache();
        let record = StackRecord::new(NetnsId(7), &[]).unwrap();
        assert!(StackSymbolizer::new(&cache).symbolize(&record).is_empty());
    }
}
