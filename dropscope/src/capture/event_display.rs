use std::io::{self, Write};
use std::time::Duration;

use super::KernelCounters;
use crate::symbolization::ResolvedFrame;

/// Line printed after every stack
pub const STACK_SEPARATOR: &str = "=======";

/// Write one symbolized stack, one frame per line, followed by the separator
///
/// # Errors
/// Returns an error if the writer fails
pub fn write_stack<W: Write>(out: &mut W, frames: &[ResolvedFrame]) -> io::Result<()> {
    for frame in frames {
        writeln!(out, "{frame}")?;
    }
    writeln!(out, "{STACK_SEPARATOR}")
}

/// Userspace processing counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProcessingStats {
    /// Ring-buffer items received
    pub records: usize,
    /// Items rejected by the decoder
    pub decode_errors: usize,
    /// Stacks printed
    pub stacks: usize,
    pub frames_resolved: usize,
    pub frames_unresolved: usize,
}

/// Display the end-of-run summary on stderr
pub fn display_summary(
    exit_reason: &str,
    elapsed: Duration,
    stats: &ProcessingStats,
    kernel: Option<KernelCounters>,
) {
    eprintln!("\n{}", format_summary(exit_reason, elapsed, stats, kernel));
}

fn format_summary(
    exit_reason: &str,
    elapsed: Duration,
    stats: &ProcessingStats,
    kernel: Option<KernelCounters>,
) -> String {
    let mut line = format!(
        "{exit_reason}: {:.1}s, {} records (decode_errors: {}, frames resolved: {}, unresolved: {})",
        elapsed.as_secs_f64(),
        stats.records,
        stats.decode_errors,
        stats.frames_resolved,
        stats.frames_unresolved,
    );
    if let Some(kernel) = kernel {
        line.push_str(&format!(", kernel emitted: {}, lost: {}", kernel.emitted, kernel.lost));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_empty_stack_prints_separator() {
        let mut out = Vec::new();
        write_stack(&mut out, &[]).unwrap();
        assert_eq!(out, b"=======\n");
    }

    #[test]
    fn test_summary_includes_lost_events() {
        let stats = ProcessingStats { records: 5, decode_errors: 1, ..Default::default() };
        let summary = format_summary(
            "interrupted",
            Duration::from_millis(2500),
            &stats,
            Some(KernelCounters { emitted: 4, lost: 3 }),
        );
        assert!(summary.starts_with("interrupted: 2.5s, 5 records (decode_errors: 1"));
        assert!(summary.ends_with("kernel emitted: 4, lost: 3"));
    }

    #[test]
    fn test_summary_without_kernel_counters() {
        let summary =
            format_summary("duration limit reached", Duration::ZERO, &ProcessingStats::default(), None);
        assert!(!summary.contains("kernel"));
    }
}
