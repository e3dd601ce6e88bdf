//! Datastream record framing
//!
//! Socket reads do not respect record boundaries. [`RecordFramer`] collects
//! chunks until the accumulated bytes end with an unescaped `IAC EOR`, then
//! hands the whole lot to the decoder in one piece.

use log::trace;

use super::codes::{END_OF_RECORD, END_OF_STREAM};

#[derive(Debug, Default)]
pub struct RecordFramer {
    buffer: Vec<u8>,
}

impl RecordFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk. Returns the accumulated datastream once it ends with
    /// a record terminator, leaving the framer empty.
    pub fn push(&mut self, chunk: &[u8]) -> Option<Vec<u8>> {
        self.buffer.extend_from_slice(chunk);
        if ends_with_terminator(&self.buffer) {
            trace!("Framed datastream of {} bytes", self.buffer.len());
            Some(std::mem::take(&mut self.buffer))
        } else {
            trace!("Holding {} bytes of partial record", self.buffer.len());
            None
        }
    }

    /// True when no partial record is being held
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Drop any partial record
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

/// `... IAC EOR` where the IAC is not itself the second half of an `IAC IAC`
fn ends_with_terminator(data: &[u8]) -> bool {
    let Some((&last, rest)) = data.split_last() else {
        return false;
    };
    if last != END_OF_STREAM {
        return false;
    }
    let iac_run = rest.iter().rev().take_while(|&&b| b == END_OF_RECORD).count();
    iac_run % 2 == 1
}
