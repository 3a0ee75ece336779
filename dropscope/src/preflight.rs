//! Pre-flight checks for dropscope
//!
//! Validates system requirements before attempting to load eBPF programs.
//! Provides clear, actionable error messages when requirements aren't met.

#![allow(unsafe_code)] // geteuid() requires unsafe

use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::capture::netns::VMLINUX_BTF_PATH;

/// Minimum kernel version required for the eBPF ring buffer
const MIN_KERNEL_VERSION: (u32, u32) = (5, 8);

/// Run all pre-flight checks before eBPF loading
///
/// # Errors
/// Returns the first failed requirement with a hint on how to fix it
pub fn run_preflight_checks(kallsyms_path: &Path) -> Result<()> {
    check_privileges()?;
    check_kernel_version()?;
    check_btf(Path::new(VMLINUX_BTF_PATH))?;
    check_kallsyms_readable(kallsyms_path)?;
    Ok(())
}

/// Check if running with sufficient privileges for eBPF
fn check_privileges() -> Result<()> {
    if unsafe { libc::geteuid() } == 0 {
        return Ok(());
    }

    // CAP_BPF + CAP_PERFMON would do, but kallsyms addresses are also
    // zeroed for non-root readers, so root is the simple requirement
    bail!(
        "Permission denied: dropscope requires root privileges to load eBPF programs.\n\n\
         Run with: sudo dropscope ..."
    );
}

/// Check if the kernel version is sufficient for eBPF features
fn check_kernel_version() -> Result<()> {
    let version_str = std::fs::read_to_string("/proc/version")
        .context("Failed to read kernel version from /proc/version")?;

    // "Linux version 6.1.0-arch1-1 ..."
    let release = version_str.split_whitespace().nth(2).unwrap_or("unknown");

    let Some((major, minor)) = parse_release(release) else {
        // Can't parse, assume it's fine
        return Ok(());
    };

    if (major, minor) < MIN_KERNEL_VERSION {
        bail!(
            "Kernel version {}.{} is too old.\n\n\
             dropscope requires Linux {}.{} or newer for eBPF ring buffer support.\n\
             Current kernel: {}",
            major,
            minor,
            MIN_KERNEL_VERSION.0,
            MIN_KERNEL_VERSION.1,
            release
        );
    }

    Ok(())
}

/// `"5.15.0-generic"` → `(5, 15)`
fn parse_release(release: &str) -> Option<(u32, u32)> {
    let mut parts = release.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor: String = parts.next()?.chars().take_while(char::is_ascii_digit).collect();
    Some((major, minor.parse().ok()?))
}

/// Check that the kernel exposes BTF, needed to locate namespace fields
fn check_btf(path: &Path) -> Result<()> {
    if !path.exists() {
        bail!(
            "Kernel BTF not found at {}\n\n\
             dropscope needs a kernel built with CONFIG_DEBUG_INFO_BTF=y.",
            path.display()
        );
    }
    Ok(())
}

/// Check that the symbol source can be opened and read
fn check_kallsyms_readable(path: &Path) -> Result<()> {
    let file = File::open(path).with_context(|| {
        format!(
            "Cannot read {}\n\n\
             This usually means:\n\
             - The path is wrong (see --kallsyms)\n\
             - Permission denied (run with sudo)\n\
             - /proc is not mounted",
            path.display()
        )
    })?;

    let mut first = String::new();
    BufReader::new(file)
        .read_line(&mut first)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    if first.is_empty() {
        bail!("Symbol source {} is empty", path.display());
    }
    Ok(())
}
