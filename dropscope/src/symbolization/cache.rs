//! Sorted kernel symbol cache with floor lookup
//!
//! Built once at startup, then shared read-only (`&SymbolCache`) with every
//! consumer. A cache value only exists in its sorted form.

use std::path::Path;

use super::kallsyms::{load_kallsyms, Symbol};
use crate::domain::SymbolError;

/// Kernel symbols sorted ascending by address
#[derive(Debug)]
pub struct SymbolCache {
    symbols: Vec<Symbol>,
}

impl SymbolCache {
    /// Sort the symbols by address and take ownership of them
    ///
    /// The sort is stable, so symbols sharing an address keep their parse order
    /// and [`lookup`](Self::lookup) returns the last one parsed.
    ///
    /// # Errors
    /// Returns [`SymbolError::Empty`] if `symbols` is empty
    pub fn build(mut symbols: Vec<Symbol>) -> Result<Self, SymbolError> {
        if symbols.is_empty() {
            return Err(SymbolError::Empty);
        }

        symbols.sort_by_key(|s| s.address);
        symbols.shrink_to_fit();

        Ok(Self { symbols })
    }

    /// Load a kallsyms file and build the cache from it
    ///
    /// # Errors
    /// Returns an error if the file can't be read or holds no usable symbols
    pub fn from_kallsyms<P: AsRef<Path>>(path: P) -> Result<Self, SymbolError> {
        Self::build(load_kallsyms(path)?)
    }

    /// Find the symbol with the largest address `<= address`
    ///
    /// Returns `None` when `address` lies below every known symbol.
    #[must_use]
    pub fn lookup(&self, address: u64) -> Option<&Symbol> {
        let above = self.symbols.partition_point(|s| s.address <= address);
        above.checked_sub(1).map(|idx| &self.symbols[idx])
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Symbols in ascending address order
    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolization::kallsyms::SYSTEM_OWNER;

    fn sym(name: &str, address: u64) -> Symbol {
        Symbol { name: name.to_string(), address, owner: SYSTEM_OWNER.to_string() }
    }

    fn three() -> SymbolCache {
        SymbolCache::build(vec![sym("c", 300), sym("a", 100), sym("b", 200)]).unwrap()
    }

    #[test]
    fn test_build_sorts_ascending() {
        let cache = SymbolCache::build(vec![
            sym("z", 0xffff_ffff_8200_0000),
            sym("a", 0x10),
            sym("m", 0x1000),
            sym("m2", 0x1000),
            sym("b", 0x20),
        ])
        .unwrap();

        let addrs: Vec<u64> = cache.iter().map(|s| s.address).collect();
        assert!(addrs.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(cache.len(), 5);
    }

    #[test]
    fn test_build_empty_fails() {
        assert!(matches!(SymbolCache::build(Vec::new()), Err(SymbolError::Empty)));
    }

    #[test]
    fn test_floor_lookup_between_symbols() {
        assert_eq!(three().lookup(250).unwrap().name, "b");
    }

    #[test]
    fn test_floor_lookup_inclusive() {
        let cache = three();
        assert_eq!(cache.lookup(300).unwrap().name, "c");
        assert_eq!(cache.lookup(100).unwrap().name, "a");
    }

    #[test]
    fn test_lookup_below_minimum_is_none() {
        let cache = three();
        assert!(cache.lookup(50).is_none());
        assert!(cache.lookup(0).is_none());
        assert!(cache.lookup(99).is_none());
    }

    #[test]
    fn test_lookup_past_last_symbol() {
        assert_eq!(three().lookup(u64::MAX).unwrap().name, "c");
    }

    #[test]
    fn test_lookup_single_symbol() {
        let cache = SymbolCache::build(vec![sym("only", 0x1000)]).unwrap();
        assert!(cache.lookup(0xfff).is_none());
        assert_eq!(cache.lookup(0x1000).unwrap().name, "only");
        assert_eq!(cache.lookup(0x2000).unwrap().name, "only");
    }

    #[test]
    fn test_duplicate_addresses_last_parsed_wins() {
        let cache =
            SymbolCache::build(vec![sym("first", 0x1000), sym("x", 0x500), sym("second", 0x1000)])
                .unwrap();
        assert_eq!(cache.lookup(0x1004).unwrap().name, "second");
    }

    #[test]
    fn test_lookup_is_idempotent() {
        let cache = three();
        for addr in [0, 50, 100, 150, 250, 300, 10_000] {
            assert_eq!(cache.lookup(addr), cache.lookup(addr));
        }
    }

    #[test]
    fn test_lookup_matches_linear_floor() {
        let cache = SymbolCache::build(
            (0..64u64).map(|i| sym(&format!("f{i}"), 0x1000 + i * 0x40 + (i % 3) * 8)).collect(),
        )
        .unwrap();

        for addr in (0xf00..0x2200).step_by(7) {
            let expected = cache.iter().filter(|s| s.address <= addr).last();
            assert_eq!(cache.lookup(addr), expected, "address 0x{addr:x}");
        }
    }

    #[test]
    fn test_concurrent_lookups() {
        let cache = three();
        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..1000 {
                        assert_eq!(cache.lookup(250).unwrap().name, "b");
                    }
                });
            }
        });
    }
}
