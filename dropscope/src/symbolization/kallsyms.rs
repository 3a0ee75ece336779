//! Kernel symbol table parsing
//!
//! Reads the `/proc/kallsyms` listing, one symbol per line:
//!
//! ```text
//! ffffffff81000000 T _stext
//! ffffffffc0a01010 t nf_hook_slow	[nf_tables]
//! ```
//!
//! Fields are whitespace separated: hex address, type character, name, and an
//! optional bracketed module. Lines that don't fit are skipped, never fatal.

use log::{debug, info, warn};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::domain::SymbolError;

/// Default location of the kernel symbol listing
pub const KALLSYMS_PATH: &str = "/proc/kallsyms";

/// Owner recorded for symbols that aren't part of a loadable module
pub const SYSTEM_OWNER: &str = "system";

/// One named kernel entry point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub address: u64,
    /// Module the symbol lives in, or [`SYSTEM_OWNER`]. Informational only.
    pub owner: String,
}

/// Parse a single kallsyms line
///
/// Returns `None` for lines with fewer than three fields or a first field
/// that isn't a 64-bit hexadecimal number.
#[must_use]
pub fn parse_line(line: &str) -> Option<Symbol> {
    let mut fields = line.split_whitespace();
    let address = fields.next()?;
    let _kind = fields.next()?;
    let name = fields.next()?;

    let address = u64::from_str_radix(address, 16).ok()?;

    let owner = fields.next().map_or_else(
        || SYSTEM_OWNER.to_string(),
        |module| {
            let module = module.strip_prefix('[').unwrap_or(module);
            module.strip_suffix(']').unwrap_or(module).to_string()
        },
    );

    Some(Symbol { name: name.to_string(), address, owner })
}

/// Parse a whole kallsyms listing into an unsorted symbol list
///
/// # Errors
/// Returns [`SymbolError::Read`] if the reader fails mid-stream; `source_path`
/// is only used to label that error.
pub fn parse_kallsyms<R: BufRead>(
    reader: R,
    source_path: &Path,
) -> Result<Vec<Symbol>, SymbolError> {
    let mut symbols = Vec::new();
    let mut skipped = 0usize;

    // Split on raw bytes: a line that isn't UTF-8 is malformed, not a read failure
    for line in reader.split(b'\n') {
        let line =
            line.map_err(|source| SymbolError::Read { path: source_path.to_path_buf(), source })?;

        match std::str::from_utf8(&line).ok().and_then(parse_line) {
            Some(symbol) => symbols.push(symbol),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        debug!("Skipped {skipped} malformed lines in {}", source_path.display());
    }

    Ok(symbols)
}

/// Load and parse a kallsyms file
///
/// The file is read once, fully, then closed.
///
/// # Errors
/// Returns [`SymbolError::Read`] if the file can't be opened or read
pub fn load_kallsyms<P: AsRef<Path>>(path: P) -> Result<Vec<Symbol>, SymbolError> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|source| SymbolError::Read { path: path.to_path_buf(), source })?;

    let symbols = parse_kallsyms(BufReader::new(file), path)?;

    info!("Loaded {} kernel symbols from {}", symbols.len(), path.display());
    if !symbols.is_empty() && symbols.iter().all(|s| s.address == 0) {
        warn!(
            "All symbol addresses in {} are zero (kptr_restrict?); frames will not resolve meaningfully",
            path.display()
        );
    }

    Ok(symbols)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_system_symbol() {
        let sym = parse_line("ffffffff81000000 T _stext").unwrap();
        assert_eq!(sym.name, "_stext");
        assert_eq!(sym.address, 0xffff_ffff_8100_0000);
        assert_eq!(sym.owner, SYSTEM_OWNER);
    }

    #[test]
    fn test_parse_module_symbol_strips_brackets() {
        let sym = parse_line("ffffffffc0a01010 t nf_hook_slow\t[nf_tables]").unwrap();
        assert_eq!(sym.name, "nf_hook_slow");
        assert_eq!(sym.owner, "nf_tables");
    }

    #[test]
    fn test_two_fields_skipped() {
        assert!(parse_line("ffffffff81000000 T").is_none());
        assert!(parse_line("").is_none());
    }

    #[test]
    fn test_bad_hex_skipped() {
        assert!(parse_line("zzzz T foo").is_none());
        assert!(parse_line("0x1000 T foo").is_none());
        // 17 hex digits overflow u64
        assert!(parse_line("1ffffffffffffffff T foo").is_none());
    }

    #[test]
    fn test_parse_listing_keeps_order_and_skips_junk() {
        let listing = "\
0000000000002000 T bar
garbage
0000000000001000 t foo
nothex T baz
";
        let symbols = parse_kallsyms(listing.as_bytes(), Path::new("test")).unwrap();
        let names: Vec<_> = symbols.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["bar", "foo"]);
    }

    #[test]
    fn test_non_utf8_line_skipped() {
        let listing: &[u8] = b"0000000000001000 T foo\n\
0000000000001800 T bad\xff\xfename\n\
0000000000002000 T bar\n";
        let symbols = parse_kallsyms(listing, Path::new("test")).unwrap();
        let names: Vec<_> = symbols.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["foo", "bar"]);
    }

    #[test]
    fn test_load_missing_file_is_read_error() {
        let err = load_kallsyms("/nonexistent/kallsyms").unwrap_err();
        assert!(matches!(err, SymbolError::Read { .. }));
    }
}
