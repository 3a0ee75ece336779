//! # Event Processing
//!
//! Consumes raw drop records from the eBPF ring buffer:
//!
//! ```text
//! bytes ──decode──▶ StackRecord ──symbolize──▶ [ResolvedFrame] ──▶ output
//! ```
//!
//! Decode failures only drop the offending record. Unresolved frames are
//! printed inline like resolved ones.
//!
//! [`EventProcessor::drain`] checks the shutdown flag before dequeuing each
//! record, so a record that was taken off the queue is always written out in
//! full and nothing new starts once the flag is raised.

use aya::maps::{MapData, RingBuf};
use log::warn;
use std::collections::VecDeque;
use std::io::{self, Write};

use super::event_display::{write_stack, ProcessingStats};
use super::{ShutdownSignal, StackRecord};
use crate::symbolization::StackSymbolizer;

/// A queue of raw drop records
///
/// Ring-buffer items borrow the map, so records are lent to a callback rather
/// than returned.
pub trait RecordSource {
    /// Dequeue one record and pass its bytes to `f`; `None` when empty
    fn next_record<F, R>(&mut self, f: F) -> Option<R>
    where
        F: FnOnce(&[u8]) -> R;
}

impl RecordSource for RingBuf<MapData> {
    fn next_record<F, R>(&mut self, f: F) -> Option<R>
    where
        F: FnOnce(&[u8]) -> R,
    {
        let item = self.next()?;
        Some(f(&item))
    }
}

impl<B: AsRef<[u8]>> RecordSource for VecDeque<B> {
    fn next_record<F, R>(&mut self, f: F) -> Option<R>
    where
        F: FnOnce(&[u8]) -> R,
    {
        let item = self.pop_front()?;
        Some(f(item.as_ref()))
    }
}

/// Encapsulates event processing logic and state
pub struct EventProcessor<'a, W: Write> {
    symbolizer: StackSymbolizer<'a>,
    out: W,
    pub stats: ProcessingStats,
}

impl<'a, W: Write> EventProcessor<'a, W> {
    #[must_use]
    pub fn new(symbolizer: StackSymbolizer<'a>, out: W) -> Self {
        Self { symbolizer, out, stats: ProcessingStats::default() }
    }

    /// Process one ring-buffer item
    ///
    /// # Errors
    /// Returns an error only if writing to the output fails; malformed
    /// records are logged, counted and skipped.
    pub fn process_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.stats.records += 1;

        let record = match StackRecord::decode(bytes) {
            Ok(record) => record,
            Err(e) => {
                self.stats.decode_errors += 1;
                warn!("Dropping malformed record: {e}");
                return Ok(());
            }
        };

        self.process_record(&record)
    }

    /// Symbolize a decoded record and write it out
    ///
    /// # Errors
    /// Returns an error if writing to the output fails
    pub fn process_record(&mut self, record: &StackRecord) -> io::Result<()> {
        let frames = self.symbolizer.symbolize(record);

        let resolved = frames.iter().filter(|f| f.is_resolved()).count();
        self.stats.frames_resolved += resolved;
        self.stats.frames_unresolved += frames.len() - resolved;
        self.stats.stacks += 1;

        write_stack(&mut self.out, &frames)
    }

    /// Process records until the source is empty or shutdown is requested
    ///
    /// Returns the number of records dequeued.
    ///
    /// # Errors
    /// Returns an error if writing to the output fails
    pub fn drain<S: RecordSource>(
        &mut self,
        source: &mut S,
        shutdown: &ShutdownSignal,
    ) -> io::Result<usize> {
        let mut drained = 0;
        while !shutdown.is_triggered() {
            match source.next_record(|bytes| self.process_bytes(bytes)) {
                Some(result) => {
                    result?;
                    drained += 1;
                }
                None => break,
            }
        }
        Ok(drained)
    }

    /// Flush buffered output, called once per drained batch
    ///
    /// # Errors
    /// Returns an error if the underlying writer fails
    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    /// Give back the output sink
    #[must_use]
    pub fn into_inner(self) -> W {
        self.out
    }
}
