//! 3270 Datastream Decoder
//!
//! A framed datastream holds one or more records. Each record may open with a
//! command byte (plus WCC for the write family), followed by orders and
//! character data, and ends with `IAC EOR` (0xFF 0xEF). The decoder applies
//! every record to a [`Display3270`] in order within a single pass.

use log::{debug, trace, warn};

use super::codes::*;
use super::display::{addressing, Display3270};
use super::field::{FieldAttributes, WriteControl};
use crate::protocol_common::ebcdic::ebcdic_to_char;

/// Host read the session still has to answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingRead {
    ReadBuffer,
    ReadModified,
    ReadModifiedAll,
}

/// 3270 Protocol Processor
///
/// Stateless apart from the last read command seen; all screen state lives
/// in the [`Display3270`] passed to each call.
#[derive(Debug, Default)]
pub struct ProtocolProcessor3270 {
    pending_read: Option<PendingRead>,
}

impl ProtocolProcessor3270 {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode every record in `data` against `display`
    pub fn process_datastream(&mut self, data: &[u8], display: &mut Display3270) {
        trace!("Decoding {} bytes: {:02X?}", data.len(), data);
        let mut index = 0;
        while index < data.len() {
            let orders_start = self.process_command(data, index, display).unwrap_or(index);
            match self.process_orders(data, orders_start, display) {
                Some(next) => index = next,
                None => break,
            }
        }
    }

    /// Recognise a command at `index` and apply it.
    ///
    /// Returns the index just past the command (and its WCC), or `None` when
    /// the byte is not a command and the record starts directly with orders.
    pub fn process_command(
        &mut self,
        data: &[u8],
        index: usize,
        display: &mut Display3270,
    ) -> Option<usize> {
        let command = CommandCode::from_u8(*data.get(index)?)?;
        debug!("Command: {command:?}");

        if command.has_wcc() {
            let erase = command != CommandCode::Write;
            if erase {
                display.erase_write();
            }
            display.lock_keyboard();

            return match data.get(index + 1) {
                Some(&wcc) => {
                    apply_wcc(WriteControl::from_byte(wcc), erase, display);
                    Some(index + 2)
                }
                None => {
                    debug!("{command:?} without WCC byte");
                    Some(index + 1)
                }
            };
        }

        match command {
            CommandCode::EraseAllUnprotected => {
                display.erase_all_unprotected();
                Some(index + 1)
            }
            CommandCode::ReadBuffer => {
                self.pending_read = Some(PendingRead::ReadBuffer);
                Some(index + 1)
            }
            CommandCode::ReadModified => {
                self.pending_read = Some(PendingRead::ReadModified);
                Some(index + 1)
            }
            CommandCode::ReadModifiedAll => {
                self.pending_read = Some(PendingRead::ReadModifiedAll);
                Some(index + 1)
            }
            // No Operation; the write family returned above
            _ => Some(index + 1),
        }
    }

    /// Walk orders from `start` until end of stream.
    ///
    /// Returns the index of the next record, or `None` if the buffer is
    /// exhausted.
    pub fn process_orders(
        &mut self,
        data: &[u8],
        start: usize,
        display: &mut Display3270,
    ) -> Option<usize> {
        let mut i = start;
        while i < data.len() {
            let byte = data[i];

            if byte == END_OF_RECORD {
                match data.get(i + 1) {
                    Some(&END_OF_STREAM) => {
                        display.end_of_record();
                        trace!("End of record/stream at {i}");
                        let next = i + 2;
                        return if next < data.len() { Some(next) } else { None };
                    }
                    Some(&END_OF_RECORD) => {
                        display.write_byte(END_OF_RECORD);
                        i += 2;
                    }
                    _ => {
                        display.end_of_record();
                        trace!("End of record at {i}");
                        i += 1;
                    }
                }
                continue;
            }

            let Some(order) = OrderCode::from_u8(byte) else {
                display.write_byte(byte);
                i += 1;
                continue;
            };

            let operands = &data[i + 1..];
            let needed = operand_length(order, operands);
            if operands.len() < needed {
                debug!(
                    "{} order at {i} truncated: needs {needed} bytes, {} left",
                    order.mnemonic(),
                    operands.len()
                );
                return None;
            }
            self.apply_order(order, &operands[..needed], display);
            i += 1 + needed;
        }
        None
    }

    fn apply_order(&mut self, order: OrderCode, operands: &[u8], display: &mut Display3270) {
        match order {
            OrderCode::StartField => {
                display.start_field(FieldAttributes::from_byte(operands[0]));
            }
            OrderCode::StartFieldExtended => {
                let pairs: Vec<(u8, u8)> = operands[1..]
                    .chunks_exact(2)
                    .map(|pair| (pair[0], pair[1]))
                    .collect();
                display.start_field_extended(&pairs);
            }
            OrderCode::SetBufferAddress => {
                let position = addressing::decode_address(operands[0], operands[1]);
                match display.set_buffer_address(position) {
                    Ok(()) => trace!("SBA {position}"),
                    Err(err) => warn!("SBA ignored: {err}"),
                }
            }
            OrderCode::InsertCursor => {
                display.insert_cursor();
                trace!("IC {}", display.cursor_address());
            }
            OrderCode::RepeatToAddress => {
                let end = addressing::decode_address(operands[0], operands[1]);
                let ch = ebcdic_to_char(operands[2]);
                trace!("RA from {} to {end} with '{ch}'", display.buffer_address());
                if let Err(err) = display.repeat_to_address(end, ch) {
                    warn!("RA ignored: {err}");
                }
            }
            OrderCode::EraseUnprotectedToAddress => {
                let end = addressing::decode_address(operands[0], operands[1]);
                if let Err(err) = display.erase_unprotected_to_address(end) {
                    warn!("{err}");
                }
            }
            OrderCode::ProgramTab => {
                display.program_tab();
                trace!("PT to {}", display.buffer_address());
            }
            OrderCode::GraphicEscape => {
                trace!("GE code point 0x{:02X} skipped", operands[0]);
            }
            OrderCode::SetAttribute => {
                if let Err(err) = display.set_attribute(operands[0], operands[1]) {
                    warn!("{err}");
                }
            }
        }
    }

    /// Take the read command the host issued, if any
    pub fn take_pending_read(&mut self) -> Option<PendingRead> {
        self.pending_read.take()
    }
}

/// Operand bytes an order consumes after the order byte itself
fn operand_length(order: OrderCode, operands: &[u8]) -> usize {
    match order {
        OrderCode::StartField | OrderCode::GraphicEscape => 1,
        OrderCode::SetBufferAddress
        | OrderCode::EraseUnprotectedToAddress
        | OrderCode::SetAttribute => 2,
        OrderCode::RepeatToAddress => 3,
        OrderCode::InsertCursor | OrderCode::ProgramTab => 0,
        OrderCode::StartFieldExtended => match operands.first() {
            Some(&count) => 1 + 2 * count as usize,
            None => 1,
        },
    }
}

fn apply_wcc(wcc: WriteControl, erase: bool, display: &mut Display3270) {
    if wcc.reset && erase {
        debug!("WCC: Reset");
        display.reset();
    }
    if wcc.reset_mdt {
        debug!("WCC: Reset MDT");
        display.reset_mdt();
    }
    if wcc.sound_alarm {
        debug!("WCC: Sound Alarm");
        display.set_alarm(true);
    }
    if wcc.start_printer {
        debug!("WCC: Start Printer (ignored)");
    }
    if wcc.keyboard_restore {
        debug!("WCC: Restore Keyboard");
        display.unlock_keyboard();
    }
}
