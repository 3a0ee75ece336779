//! Drop record decoding
//!
//! Turns the raw bytes the `kfree_skb` program writes into the ring buffer into
//! a [`StackRecord`]. The wire layout is fixed little-endian:
//!
//! ```text
//! offset 0 : netns        u32
//! offset 4 : stack_size   u32  (bytes; stack_size / 8 frames are valid)
//! offset 8 : stack        20 x u64
//! ```
//!
//! Slots past the valid frame count may hold stale data and are never exposed.

use byteorder::{LittleEndian, ReadBytesExt};
use dropscope_common::{DROP_EVENT_SIZE, MAX_STACK_DEPTH};
use std::io::Cursor;

use crate::domain::{DecodeError, NetnsId};

/// Size of one encoded record
pub const STACK_RECORD_SIZE: usize = DROP_EVENT_SIZE;

const FRAME_SIZE: usize = std::mem::size_of::<u64>();

/// Kernel return addresses with a length checked against [`MAX_STACK_DEPTH`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackFrames {
    addrs: [u64; MAX_STACK_DEPTH],
    len: usize,
}

impl StackFrames {
    /// # Errors
    /// Returns [`DecodeError::StackTooDeep`] if `frames` exceeds the capacity
    pub fn new(frames: &[u64]) -> Result<Self, DecodeError> {
        if frames.len() > MAX_STACK_DEPTH {
            return Err(DecodeError::StackTooDeep {
                frames: frames.len(),
                capacity: MAX_STACK_DEPTH,
            });
        }

        let mut addrs = [0u64; MAX_STACK_DEPTH];
        addrs[..frames.len()].copy_from_slice(frames);
        Ok(Self { addrs, len: frames.len() })
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u64] {
        &self.addrs[..self.len]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// One captured drop: the namespace it happened in and its kernel stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackRecord {
    netns: NetnsId,
    frames: StackFrames,
}

impl StackRecord {
    /// # Errors
    /// Returns [`DecodeError::StackTooDeep`] if more than [`MAX_STACK_DEPTH`] frames are given
    pub fn new(netns: NetnsId, frames: &[u64]) -> Result<Self, DecodeError> {
        Ok(Self { netns, frames: StackFrames::new(frames)? })
    }

    /// Decode a record from ring-buffer bytes
    ///
    /// Trailing bytes past [`STACK_RECORD_SIZE`] are ignored as long as the
    /// buffer stays 8-byte aligned.
    ///
    /// # Errors
    /// - [`DecodeError::Truncated`] if `bytes` is shorter than one record
    /// - [`DecodeError::Misaligned`] if its length isn't a multiple of 8
    /// - [`DecodeError::StackTooDeep`] if the stack size claims more than 20 frames
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() < STACK_RECORD_SIZE {
            return Err(DecodeError::Truncated { len: bytes.len(), expected: STACK_RECORD_SIZE });
        }
        if bytes.len() % FRAME_SIZE != 0 {
            return Err(DecodeError::Misaligned { len: bytes.len() });
        }

        // Length was checked above, so these reads can't run short.
        let mut cursor = Cursor::new(&bytes[..STACK_RECORD_SIZE]);
        let truncated = |_| DecodeError::Truncated { len: bytes.len(), expected: STACK_RECORD_SIZE };

        let netns = cursor.read_u32::<LittleEndian>().map_err(truncated)?;
        let stack_size = cursor.read_u32::<LittleEndian>().map_err(truncated)?;

        let count = stack_size as usize / FRAME_SIZE;
        if count > MAX_STACK_DEPTH {
            return Err(DecodeError::StackTooDeep { frames: count, capacity: MAX_STACK_DEPTH });
        }

        let mut addrs = [0u64; MAX_STACK_DEPTH];
        for slot in addrs.iter_mut().take(count) {
            *slot = cursor.read_u64::<LittleEndian>().map_err(truncated)?;
        }

        Self::new(NetnsId(netns), &addrs[..count])
    }

    #[must_use]
    pub fn netns(&self) -> NetnsId {
        self.netns
    }

    /// Valid return addresses, innermost first
    #[must_use]
    pub fn frames(&self) -> &[u64] {
        self.frames.as_slice()
    }

    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}
