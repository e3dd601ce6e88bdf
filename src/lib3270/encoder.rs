//! Outbound 3270 records
//!
//! Inbound (terminal to host) records are built here: attention-key
//! submissions carrying any staged text, and the replies to host read
//! commands. Every record is IAC-escaped and terminated with `IAC EOR`.

use log::trace;

use super::codes::{AID_NO_AID, ORDER_SBA};
use super::display::{addressing, Display3270, BUFFER_SIZE};
use crate::error::ProtocolResult;
use crate::protocol_common::ebcdic::{char_to_ebcdic, encode_ebcdic};
use crate::protocol_common::telnet_base::{escape_iac, END_OF_RECORD_SEQUENCE};

/// Buffer writes staged by the caller, flushed with the next attention key
#[derive(Debug, Default, Clone)]
pub struct PendingWrites {
    bytes: Vec<u8>,
}

impl PendingWrites {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `SBA <position> <text>` to the pending sequence
    pub fn stage(&mut self, position: usize, text: &str) -> ProtocolResult<()> {
        let address = addressing::encode_12bit(position)?;
        self.bytes.push(ORDER_SBA);
        self.bytes.extend_from_slice(&address);
        self.bytes.extend(encode_ebcdic(text));
        trace!("Staged {} characters at {position}", text.chars().count());
        Ok(())
    }

    /// Take the staged bytes, leaving the buffer empty
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

fn finish_record(payload: Vec<u8>) -> Vec<u8> {
    let mut record = escape_iac(&payload);
    record.extend_from_slice(&END_OF_RECORD_SEQUENCE);
    record
}

/// `[aid][cursor][pending writes] IAC EOR`
pub fn encode_attention(aid: u8, cursor_position: usize, pending: &[u8]) -> ProtocolResult<Vec<u8>> {
    let address = addressing::encode_12bit(cursor_position)?;
    let mut payload = Vec::with_capacity(3 + pending.len());
    payload.push(aid);
    payload.extend_from_slice(&address);
    payload.extend_from_slice(pending);
    Ok(finish_record(payload))
}

/// Reply to Read Buffer: `[no-aid][cursor][every cell] IAC EOR`
pub fn encode_read_buffer(display: &Display3270) -> ProtocolResult<Vec<u8>> {
    let address = addressing::encode_12bit(display.cursor_address())?;
    let mut payload = Vec::with_capacity(3 + BUFFER_SIZE);
    payload.push(AID_NO_AID);
    payload.extend_from_slice(&address);
    payload.extend(display.text().chars().map(char_to_ebcdic));
    Ok(finish_record(payload))
}

/// Short-form reply to Read Modified / Read Modified All
pub fn encode_read_modified(cursor_position: usize) -> ProtocolResult<Vec<u8>> {
    encode_attention(AID_NO_AID, cursor_position, &[])
}
