//! Structured error types for dropscope
//!
//! Using thiserror for automatic Display implementation and error chaining.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from loading the kernel symbol table and building the cache
///
/// Both variants are fatal at startup: without symbols every frame would be
/// reported unresolved.
#[derive(Error, Debug)]
pub enum SymbolError {
    #[error("Failed to read symbol source {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Symbol source contained no usable symbols")]
    Empty,
}

/// Errors from decoding one raw drop record
///
/// Recoverable: the record is dropped and the next one is processed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Record too short: {len} bytes, need {expected}")]
    Truncated { len: usize, expected: usize },

    #[error("Record length {len} is not a multiple of 8 bytes")]
    Misaligned { len: usize },

    #[error("Stack of {frames} frames exceeds capacity of {capacity}")]
    StackTooDeep { frames: usize, capacity: usize },
}

/// Errors from preparing and attaching the kernel-side program
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Kernel BTF not available at {0}")]
    BtfUnavailable(PathBuf),

    #[error("Kernel type {0} not found in BTF")]
    TypeNotFound(String),

    #[error("Member {member} not found in {type}")]
    MemberNotFound { r#type: String, member: String },

    #[error("Member {member} of {type} is a bitfield")]
    BitfieldMember { r#type: String, member: String },

    #[error("Cannot determine init network namespace: {0}")]
    InitNetns(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to parse kernel BTF: {0}")]
    Btf(String),
}
