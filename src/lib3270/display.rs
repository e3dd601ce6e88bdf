//! TN3270 Display Buffer Management
//!
//! [`Display3270`] owns the 24x80 character grid, the write cursor (buffer
//! address), the display cursor, the fields discovered since the last erase
//! and the keyboard lock. The datastream decoder mutates it one order at a
//! time; the session reads it to answer queries and render the screen.

use std::fmt;

use log::{debug, trace};

use super::codes::{ORDER_EUA, ORDER_SA, XA_3270, XA_FOREGROUND, XA_HIGHLIGHTING};
use super::field::{Field, FieldAttributes, Highlighting};
use crate::error::{ProtocolError, ProtocolResult, TerminalError};
use crate::protocol_common::ebcdic::ebcdic_to_char;

/// Screen rows (Model 2)
pub const ROWS: usize = 24;
/// Screen columns (Model 2)
pub const COLS: usize = 80;
/// Number of cells on the screen
pub const BUFFER_SIZE: usize = ROWS * COLS;
/// Last addressable cell
pub const LAST_POSITION: usize = BUFFER_SIZE - 1;

const BLANK: char = ' ';

/// 3270 Display Buffer
#[derive(Debug, Clone)]
pub struct Display3270 {
    /// One display character per cell
    buffer: Vec<char>,

    /// Write cursor: next cell the decoder writes to
    buffer_address: usize,

    /// Display cursor, set by Insert Cursor
    cursor_address: usize,

    /// Finalized fields in creation order
    fields: Vec<Field>,

    /// Field opened by the last start-field order, not yet finalized
    current_field: Option<Field>,

    keyboard_locked: bool,

    alarm: bool,
}

impl Display3270 {
    /// Create a blank screen with the keyboard locked
    pub fn new() -> Self {
        Self {
            buffer: vec![BLANK; BUFFER_SIZE],
            buffer_address: 0,
            cursor_address: 0,
            fields: Vec::new(),
            current_field: None,
            keyboard_locked: true,
            alarm: false,
        }
    }

    pub fn rows(&self) -> usize {
        ROWS
    }

    pub fn cols(&self) -> usize {
        COLS
    }

    /// Read the character at a linear position
    pub fn cell(&self, position: usize) -> Option<char> {
        self.buffer.get(position).copied()
    }

    /// Overwrite the character at a linear position
    pub fn set_cell(&mut self, position: usize, ch: char) -> ProtocolResult<()> {
        let cell = self
            .buffer
            .get_mut(position)
            .ok_or(ProtocolError::AddressOutOfRange { position })?;
        *cell = ch;
        Ok(())
    }

    /// Current write cursor
    pub fn buffer_address(&self) -> usize {
        self.buffer_address
    }

    pub fn set_buffer_address(&mut self, position: usize) -> ProtocolResult<()> {
        if position >= BUFFER_SIZE {
            return Err(ProtocolError::AddressOutOfRange { position });
        }
        self.buffer_address = position;
        Ok(())
    }

    /// Current display cursor
    pub fn cursor_address(&self) -> usize {
        self.cursor_address
    }

    pub fn set_cursor(&mut self, position: usize) -> ProtocolResult<()> {
        if position >= BUFFER_SIZE {
            return Err(ProtocolError::AddressOutOfRange { position });
        }
        self.cursor_address = position;
        Ok(())
    }

    /// Display cursor as 1-based (row, col)
    pub fn cursor_coordinates(&self) -> (usize, usize) {
        (self.cursor_address / COLS + 1, self.cursor_address % COLS + 1)
    }

    /// Blank every cell and forget all fields
    pub fn erase_write(&mut self) {
        self.buffer.fill(BLANK);
        self.reset();
    }

    /// Reset both cursors and the field list, keeping the cells
    pub fn reset(&mut self) {
        self.buffer_address = 0;
        self.cursor_address = 0;
        self.current_field = None;
        self.fields.clear();
    }

    /// Clear the modified data tag of every field
    pub fn reset_mdt(&mut self) {
        for field in self.fields.iter_mut().chain(self.current_field.iter_mut()) {
            field.attributes.modified = false;
        }
    }

    /// Write one EBCDIC byte at the write cursor
    pub fn write_byte(&mut self, byte: u8) {
        self.write_char(ebcdic_to_char(byte));
    }

    /// Write a character at the write cursor and advance it, wrapping at the
    /// end of the screen
    pub fn write_char(&mut self, ch: char) {
        self.buffer[self.buffer_address] = ch;
        self.buffer_address = (self.buffer_address + 1) % BUFFER_SIZE;
    }

    /// Finalize the open field at the write cursor and open a new one there.
    ///
    /// The attribute cell is written as a blank. A field that would start on
    /// the last cell starts at the top-left corner instead.
    pub fn start_field(&mut self, attributes: FieldAttributes) {
        self.close_current_field();

        if self.buffer_address >= LAST_POSITION {
            self.buffer_address = 0;
        }
        let field = Field::open(self.buffer_address, attributes);
        trace!(
            "StartField({},{}) {:?}",
            field.start_row,
            field.start_col,
            field.attributes
        );
        self.current_field = Some(field);
        self.write_char(BLANK);
    }

    /// Start a field from SFE (type, value) pairs.
    ///
    /// The 0xC0 pair supplies the base attribute (0x00 when absent); 0x41 sets
    /// highlighting and 0x42 the foreground colour. Other types are skipped.
    pub fn start_field_extended(&mut self, pairs: &[(u8, u8)]) {
        let base = pairs
            .iter()
            .find(|(kind, _)| *kind == XA_3270)
            .map(|(_, value)| *value)
            .unwrap_or(0x00);
        self.start_field(FieldAttributes::from_byte(base));

        if let Some(field) = self.current_field.as_mut() {
            for &(kind, value) in pairs {
                match kind {
                    XA_3270 => {}
                    XA_HIGHLIGHTING => {
                        if let Some(highlighting) = Highlighting::from_u8(value) {
                            field.highlighting = highlighting;
                        }
                    }
                    XA_FOREGROUND => field.foreground = Some(value),
                    other => trace!("SFE attribute type 0x{other:02X} ignored"),
                }
            }
        }
    }

    /// Fill from the write cursor up to (not including) `end` with `ch`.
    ///
    /// An end of 0 means the last cell. An end before the write cursor wraps
    /// around the bottom of the screen.
    pub fn repeat_to_address(&mut self, end: usize, ch: char) -> ProtocolResult<()> {
        if end >= BUFFER_SIZE {
            return Err(ProtocolError::AddressOutOfRange { position: end });
        }
        let end = if end == 0 { LAST_POSITION } else { end };
        let start = self.buffer_address;
        if start <= end {
            self.buffer[start..end].fill(ch);
        } else {
            self.buffer[start..].fill(ch);
            self.buffer[..end].fill(ch);
        }
        self.buffer_address = end;
        Ok(())
    }

    /// Place the display cursor at the write cursor
    pub fn insert_cursor(&mut self) {
        self.cursor_address = self.buffer_address;
    }

    /// Move the write cursor to the start of the next unprotected field after
    /// it, or to 0 when there is none
    pub fn program_tab(&mut self) {
        for position in self.buffer_address + 1..BUFFER_SIZE {
            if let Some(field) = self.input_field_at(position) {
                if field.start_position > self.buffer_address {
                    self.buffer_address = field.start_position;
                    return;
                }
            }
        }
        self.buffer_address = 0;
    }

    /// Set Attribute is recognised but has no screen effect yet
    pub fn set_attribute(&mut self, kind: u8, value: u8) -> ProtocolResult<()> {
        trace!("SA type 0x{kind:02X} value 0x{value:02X}");
        Err(ProtocolError::UnimplementedOrder {
            order: ORDER_SA,
            name: "SA",
        })
    }

    /// Erase Unprotected to Address is recognised but has no screen effect yet
    pub fn erase_unprotected_to_address(&mut self, end: usize) -> ProtocolResult<()> {
        trace!("EUA to {end}");
        Err(ProtocolError::UnimplementedOrder {
            order: ORDER_EUA,
            name: "EUA",
        })
    }

    /// Blank every unprotected data cell, clear the modified tags, put the
    /// cursor on the first input cell and restore the keyboard
    pub fn erase_all_unprotected(&mut self) {
        let mut first_input = None;
        for position in 0..BUFFER_SIZE {
            let is_data_cell = self
                .input_field_at(position)
                .map(|field| field.start_position != position)
                .unwrap_or(false);
            if is_data_cell {
                self.buffer[position] = BLANK;
                first_input.get_or_insert(position);
            }
        }
        for field in self.fields.iter_mut().filter(|f| f.is_input()) {
            field.attributes.modified = false;
        }
        self.cursor_address = first_input.unwrap_or(0);
        self.buffer_address = self.cursor_address;
        self.keyboard_locked = false;
        debug!("Erase All Unprotected, cursor at {}", self.cursor_address);
    }

    /// Finalize the open field to the end of the screen and reset both cursors
    pub fn end_of_record(&mut self) {
        if let Some(mut field) = self.current_field.take() {
            field.close_at(LAST_POSITION);
            field.has_cursor = field.start_position <= self.cursor_address
                && self.cursor_address <= field.end_position;
            self.fields.push(field);
        }
        self.buffer_address = 0;
        self.cursor_address = 0;
    }

    fn close_current_field(&mut self) {
        if let Some(mut field) = self.current_field.take() {
            let end = if self.buffer_address < field.start_position {
                LAST_POSITION
            } else {
                self.buffer_address
            };
            field.close_at(end);
            self.fields.push(field);
        }
    }

    /// Finalized fields in creation order
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Field still waiting for its end position
    pub fn current_field(&self) -> Option<&Field> {
        self.current_field.as_ref()
    }

    /// Most recently created field covering `position`
    pub fn field_at(&self, position: usize) -> Option<&Field> {
        self.fields.iter().rev().find(|field| field.contains(position))
    }

    /// The field covering `position` if it accepts input.
    ///
    /// A newer protected field hides any older input field beneath it.
    pub fn input_field_at(&self, position: usize) -> Option<&Field> {
        self.field_at(position).filter(|field| field.is_input())
    }

    /// Live text of the cells a field covers
    pub fn field_text(&self, field: &Field) -> String {
        let end = field.end_position.min(BUFFER_SIZE);
        let start = field.start_position.min(end);
        self.buffer[start..end].iter().collect()
    }

    /// Whole screen as one 1920 character string
    pub fn text(&self) -> String {
        self.buffer.iter().collect()
    }

    /// Text of one 1-based row
    pub fn row_text(&self, row: usize) -> Option<String> {
        if row == 0 || row > ROWS {
            return None;
        }
        let start = (row - 1) * COLS;
        Some(self.buffer[start..start + COLS].iter().collect())
    }

    /// Up to `length` characters starting at 1-based (row, col), continuing
    /// across row ends
    pub fn text_at(&self, row: usize, col: usize, length: usize) -> Result<String, TerminalError> {
        let start = addressing::coordinates_to_position(row, col)?;
        let end = start.saturating_add(length).min(BUFFER_SIZE);
        Ok(self.buffer[start..end].iter().collect())
    }

    /// First 1-based row containing `text`
    pub fn row_containing(&self, text: &str, ignore_case: bool) -> Option<usize> {
        let needle = normalize(text, ignore_case);
        (1..=ROWS).find(|&row| {
            self.row_text(row)
                .map(|line| normalize(&line, ignore_case).contains(&needle))
                .unwrap_or(false)
        })
    }

    /// True if `text` appears anywhere on the flattened screen
    pub fn contains_text(&self, text: &str, ignore_case: bool) -> bool {
        normalize(&self.text(), ignore_case).contains(&normalize(text, ignore_case))
    }

    /// Render as 24 lines of 80 characters. Hidden field cells render blank.
    pub fn render_text(&self, bordered: bool) -> String {
        let mut out = String::with_capacity(BUFFER_SIZE + ROWS * 3);
        for row in 0..ROWS {
            if row > 0 {
                out.push('\n');
            }
            if bordered {
                out.push('|');
            }
            for position in row * COLS..(row + 1) * COLS {
                out.push(self.visible_char(position));
            }
            if bordered {
                out.push('|');
            }
        }
        out
    }

    /// Render as markup where each row segment of an unprotected field
    /// becomes an `<input>` element
    pub fn render_html(&self) -> String {
        let mut out = String::new();
        for row in 0..ROWS {
            if row > 0 {
                out.push('\n');
            }
            let row_end = (row + 1) * COLS;
            let mut position = row * COLS;
            while position < row_end {
                match self.field_at(position) {
                    Some(field) if field.is_input() => {
                        let end = field.end_position.min(row_end);
                        out.push_str(&self.render_input(field, position, end));
                        position = end;
                    }
                    _ => {
                        push_escaped(&mut out, self.visible_char(position));
                        position += 1;
                    }
                }
            }
        }
        out
    }

    fn render_input(&self, field: &Field, start: usize, end: usize) -> String {
        let width = end - start;
        let value: String = if field.attributes.hidden {
            String::new()
        } else {
            self.buffer[start..end].iter().collect()
        };
        let mut escaped = String::with_capacity(value.len());
        for ch in value.chars() {
            push_escaped(&mut escaped, ch);
        }
        format!(
            "<input type='text' name='field_{}' style='width: {}ch; color: {}' maxlength='{}' value='{}'{}>",
            field.start_position,
            width,
            field.attributes.color.name(),
            width,
            escaped,
            if field.has_cursor { " autofocus" } else { "" },
        )
    }

    fn visible_char(&self, position: usize) -> char {
        match self.field_at(position) {
            Some(field) if field.attributes.hidden => BLANK,
            _ => self.buffer[position],
        }
    }

    /// Lock the keyboard
    pub fn lock_keyboard(&mut self) {
        self.keyboard_locked = true;
    }

    /// Unlock the keyboard
    pub fn unlock_keyboard(&mut self) {
        self.keyboard_locked = false;
    }

    pub fn is_keyboard_locked(&self) -> bool {
        self.keyboard_locked
    }

    pub fn set_alarm(&mut self, alarm: bool) {
        self.alarm = alarm;
    }

    /// Read and clear the alarm flag
    pub fn take_alarm(&mut self) -> bool {
        std::mem::take(&mut self.alarm)
    }
}

fn normalize(text: &str, ignore_case: bool) -> String {
    if ignore_case {
        text.to_lowercase()
    } else {
        text.to_string()
    }
}

fn push_escaped(out: &mut String, ch: char) {
    match ch {
        '<' => out.push_str("&lt;"),
        '>' => out.push_str("&gt;"),
        '&' => out.push_str("&amp;"),
        '\'' => out.push_str("&#39;"),
        '"' => out.push_str("&quot;"),
        _ => out.push(ch),
    }
}

impl fmt::Display for Display3270 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_text(false))
    }
}

impl Default for Display3270 {
    fn default() -> Self {
        Self::new()
    }
}

/// Buffer addressing utilities for 3270
pub mod addressing {
    use super::{BUFFER_SIZE, COLS, ROWS};
    use crate::error::{ProtocolError, ProtocolResult, TerminalError};

    /// The 64 graphic code points used for 12-bit addresses, indexed by the
    /// 6-bit value they carry
    const ADDRESS_CODES: [u8; 64] = [
        0x40, 0xC1, 0xC2, 0xC3, 0xC4, 0xC5, 0xC6, 0xC7,
        0xC8, 0xC9, 0x4A, 0x4B, 0x4C, 0x4D, 0x4E, 0x4F,
        0x50, 0xD1, 0xD2, 0xD3, 0xD4, 0xD5, 0xD6, 0xD7,
        0xD8, 0xD9, 0x5A, 0x5B, 0x5C, 0x5D, 0x5E, 0x5F,
        0x60, 0x61, 0xE2, 0xE3, 0xE4, 0xE5, 0xE6, 0xE7,
        0xE8, 0xE9, 0x6A, 0x6B, 0x6C, 0x6D, 0x6E, 0x6F,
        0xF0, 0xF1, 0xF2, 0xF3, 0xF4, 0xF5, 0xF6, 0xF7,
        0xF8, 0xF9, 0x7A, 0x7B, 0x7C, 0x7D, 0x7E, 0x7F,
    ];

    /// Decode a two byte buffer address.
    ///
    /// When the top two bits of the first byte are clear the pair is a 14-bit
    /// binary address; otherwise each byte carries 6 bits.
    ///
    /// ```
    /// use tn3270r::lib3270::display::addressing::decode_address;
    ///
    /// assert_eq!(decode_address(0xC1, 0x50), 80);
    /// assert_eq!(decode_address(0x00, 0x50), 80);
    /// ```
    pub fn decode_address(byte1: u8, byte2: u8) -> usize {
        if byte1 & 0xC0 == 0 {
            (((byte1 & 0x3F) as usize) << 8) | byte2 as usize
        } else {
            (((byte1 & 0x3F) as usize) << 6) | (byte2 & 0x3F) as usize
        }
    }

    /// Encode a position as a 12-bit address
    pub fn encode_12bit(position: usize) -> ProtocolResult<[u8; 2]> {
        if position >= BUFFER_SIZE {
            return Err(ProtocolError::AddressOutOfRange { position });
        }
        Ok([
            ADDRESS_CODES[(position >> 6) & 0x3F],
            ADDRESS_CODES[position & 0x3F],
        ])
    }

    /// Encode a position as a 14-bit address
    pub fn encode_14bit(position: usize) -> [u8; 2] {
        [((position >> 8) & 0x3F) as u8, (position & 0xFF) as u8]
    }

    /// Linear position to 1-based (row, col)
    pub fn position_to_coordinates(position: usize) -> ProtocolResult<(usize, usize)> {
        if position >= BUFFER_SIZE {
            return Err(ProtocolError::AddressOutOfRange { position });
        }
        Ok((position / COLS + 1, position % COLS + 1))
    }

    /// 1-based (row, col) to linear position
    pub fn coordinates_to_position(row: usize, col: usize) -> Result<usize, TerminalError> {
        if !(1..=ROWS).contains(&row) || !(1..=COLS).contains(&col) {
            return Err(TerminalError::InvalidCoordinates { row, col });
        }
        Ok((row - 1) * COLS + (col - 1))
    }
}

#[cfg(test)]
mod tests {
    use super::addressing::*;
    use super::*;
    use proptest::prelude::*;

    fn unprotected() -> FieldAttributes {
        FieldAttributes::from_byte(0x00)
    }

    fn protected() -> FieldAttributes {
        FieldAttributes::from_byte(0x20)
    }

    #[test]
    fn test_display_creation() {
        let display = Display3270::new();
        assert_eq!(display.rows(), 24);
        assert_eq!(display.cols(), 80);
        assert_eq!(display.buffer_address(), 0);
        assert!(display.is_keyboard_locked());
        assert_eq!(display.text().chars().count(), BUFFER_SIZE);
    }

    #[test]
    fn test_write_advances_and_wraps() {
        let mut display = Display3270::new();
        display.write_byte(0xC1);
        assert_eq!(display.buffer_address(), 1);
        assert_eq!(display.cell(0), Some('A'));

        display.set_buffer_address(LAST_POSITION).unwrap();
        display.write_char('Z');
        assert_eq!(display.buffer_address(), 0);
        assert_eq!(display.cell(LAST_POSITION), Some('Z'));
    }

    #[test]
    fn test_out_of_range_addresses_rejected() {
        let mut display = Display3270::new();
        assert!(display.set_buffer_address(BUFFER_SIZE).is_err());
        assert!(display.set_cursor(5000).is_err());
        assert!(display.set_cell(BUFFER_SIZE, 'x').is_err());
        assert_eq!(display.cell(BUFFER_SIZE), None);
    }

    #[test]
    fn test_erase_write_clears_state() {
        let mut display = Display3270::new();
        display.set_buffer_address(100).unwrap();
        display.start_field(unprotected());
        display.write_char('X');
        display.end_of_record();
        assert_eq!(display.fields().len(), 1);

        display.erase_write();
        assert!(display.fields().is_empty());
        assert!(display.current_field().is_none());
        assert!(display.text().chars().all(|c| c == ' '));
        assert_eq!(display.buffer_address(), 0);
        assert_eq!(display.cursor_address(), 0);
    }

    #[test]
    fn test_reset_keeps_cells() {
        let mut display = Display3270::new();
        display.write_char('Q');
        display.start_field(unprotected());
        display.reset();
        assert_eq!(display.cell(0), Some('Q'));
        assert!(display.current_field().is_none());
        assert_eq!(display.buffer_address(), 0);
    }

    #[test]
    fn test_start_field_closes_previous() {
        let mut display = Display3270::new();
        display.set_buffer_address(10).unwrap();
        display.start_field(protected());
        for ch in "Name".chars() {
            display.write_char(ch);
        }
        display.start_field(unprotected());

        let first = &display.fields()[0];
        assert_eq!(first.start_position, 10);
        assert_eq!(first.end_position, 15);
        assert_eq!(display.current_field().map(|f| f.start_position), Some(15));
        assert_eq!(display.buffer_address(), 16);
        assert_eq!(display.cell(15), Some(' '));
    }

    #[test]
    fn test_wrapped_field_ends_at_last_cell() {
        let mut display = Display3270::new();
        display.set_buffer_address(1900).unwrap();
        display.start_field(unprotected());
        display.set_buffer_address(5).unwrap();
        display.start_field(protected());
        assert_eq!(display.fields()[0].end_position, LAST_POSITION);
    }

    #[test]
    fn test_field_on_last_cell_moves_to_origin() {
        let mut display = Display3270::new();
        display.set_buffer_address(LAST_POSITION).unwrap();
        display.start_field(unprotected());
        assert_eq!(display.current_field().map(|f| f.start_position), Some(0));
    }

    #[test]
    fn test_end_of_record_finalizes_to_last_cell() {
        let mut display = Display3270::new();
        display.set_buffer_address(100).unwrap();
        display.start_field(unprotected());
        display.end_of_record();

        let field = &display.fields()[0];
        assert_eq!(field.end_position, LAST_POSITION);
        assert_eq!(display.buffer_address(), 0);
        assert_eq!(display.cursor_address(), 0);
        assert!(display.current_field().is_none());
    }

    #[test]
    fn test_end_of_record_marks_cursor_field() {
        let mut display = Display3270::new();
        display.set_buffer_address(200).unwrap();
        display.start_field(unprotected());
        display.insert_cursor();
        display.end_of_record();
        assert!(display.fields()[0].has_cursor);
    }

    #[test]
    fn test_newer_field_shadows_older() {
        let mut display = Display3270::new();
        display.set_buffer_address(100).unwrap();
        display.start_field(unprotected());
        display.end_of_record();

        display.set_buffer_address(100).unwrap();
        display.start_field(protected());
        display.end_of_record();

        let field = display.field_at(150).unwrap();
        assert!(field.attributes.protected);
        assert_eq!(display.fields().len(), 2);
        assert!(std::ptr::eq(field, &display.fields()[1]));
    }

    #[test]
    fn test_protected_overlay_hides_input_field() {
        let mut display = Display3270::new();
        display.set_buffer_address(100).unwrap();
        display.start_field(unprotected());
        display.end_of_record();
        assert!(display.input_field_at(100).is_some());

        display.set_buffer_address(100).unwrap();
        display.start_field(protected());
        display.end_of_record();
        assert!(display.input_field_at(100).is_none());
    }

    #[test]
    fn test_repeat_to_address_zero_means_screen_end() {
        let mut display = Display3270::new();
        display.set_buffer_address(10).unwrap();
        display.repeat_to_address(0, 'X').unwrap();

        assert_eq!(display.cell(9), Some(' '));
        assert!((10..LAST_POSITION).all(|p| display.cell(p) == Some('X')));
        assert_eq!(display.cell(LAST_POSITION), Some(' '));
        assert_eq!(display.buffer_address(), LAST_POSITION);
    }

    #[test]
    fn test_repeat_to_address_wraps() {
        let mut display = Display3270::new();
        display.set_buffer_address(1910).unwrap();
        display.repeat_to_address(5, '-').unwrap();
        assert_eq!(display.cell(1910), Some('-'));
        assert_eq!(display.cell(LAST_POSITION), Some('-'));
        assert_eq!(display.cell(4), Some('-'));
        assert_eq!(display.cell(5), Some(' '));
        assert_eq!(display.buffer_address(), 5);
    }

    #[test]
    fn test_program_tab() {
        let mut display = Display3270::new();
        display.set_buffer_address(0).unwrap();
        display.start_field(protected());
        display.set_buffer_address(40).unwrap();
        display.start_field(unprotected());
        display.set_buffer_address(60).unwrap();
        display.start_field(protected());
        display.end_of_record();

        display.set_buffer_address(5).unwrap();
        display.program_tab();
        assert_eq!(display.buffer_address(), 40);

        display.program_tab();
        assert_eq!(display.buffer_address(), 0);
    }

    #[test]
    fn test_unimplemented_orders() {
        let mut display = Display3270::new();
        assert!(display.set_attribute(0x41, 0xF1).is_err());
        assert!(display.erase_unprotected_to_address(100).is_err());
    }

    #[test]
    fn test_erase_all_unprotected() {
        let mut display = Display3270::new();
        display.start_field(protected());
        for ch in "User".chars() {
            display.write_char(ch);
        }
        display.start_field(FieldAttributes::from_byte(0x01));
        for ch in "bob".chars() {
            display.write_char(ch);
        }
        display.set_buffer_address(20).unwrap();
        display.start_field(protected());
        display.end_of_record();

        display.erase_all_unprotected();
        assert_eq!(display.text_at(1, 1, 9).unwrap(), " User    ");
        assert!(!display.fields()[1].attributes.modified);
        assert_eq!(display.cursor_address(), 6);
        assert!(!display.is_keyboard_locked());
    }

    #[test]
    fn test_reset_mdt() {
        let mut display = Display3270::new();
        display.start_field(FieldAttributes::from_byte(0x01));
        display.end_of_record();
        assert!(display.fields()[0].attributes.modified);
        display.reset_mdt();
        assert!(!display.fields()[0].attributes.modified);
    }

    #[test]
    fn test_start_field_extended() {
        let mut display = Display3270::new();
        display.start_field_extended(&[(0xC0, 0x20), (0x41, 0xF2), (0x42, 0xF4)]);
        let field = display.current_field().unwrap();
        assert!(field.attributes.protected);
        assert_eq!(field.highlighting, Highlighting::ReverseVideo);
        assert_eq!(field.foreground, Some(0xF4));

        display.start_field_extended(&[(0x41, 0xF1)]);
        let field = display.current_field().unwrap();
        assert!(!field.attributes.protected);
        assert_eq!(field.highlighting, Highlighting::Blink);
    }

    #[test]
    fn test_text_queries() {
        let mut display = Display3270::new();
        display.set_buffer_address(85).unwrap();
        for ch in "Welcome".chars() {
            display.write_char(ch);
        }
        assert_eq!(display.text_at(2, 6, 7).unwrap(), "Welcome");
        assert_eq!(display.row_containing("Welcome", false), Some(2));
        assert_eq!(display.row_containing("welcome", false), None);
        assert_eq!(display.row_containing("welcome", true), Some(2));
        assert!(display.contains_text("WELCOME", true));
        assert!(!display.contains_text("WELCOME", false));
        assert!(display.text_at(0, 1, 1).is_err());
        assert!(display.text_at(1, 81, 1).is_err());
        assert_eq!(display.text_at(24, 80, 10).unwrap().len(), 1);
    }

    #[test]
    fn test_text_at_huge_length_clamps_to_screen_end() {
        let display = Display3270::new();
        assert_eq!(display.text_at(1, 2, usize::MAX).unwrap().chars().count(), BUFFER_SIZE - 1);
        assert_eq!(display.text_at(24, 80, usize::MAX).unwrap(), " ");
    }

    #[test]
    fn test_field_text() {
        let mut display = Display3270::new();
        display.start_field(unprotected());
        for ch in "abc".chars() {
            display.write_char(ch);
        }
        display.start_field(protected());
        let field = display.fields()[0].clone();
        assert_eq!(display.field_text(&field), " abc");
    }

    #[test]
    fn test_render_text_hides_hidden_fields() {
        let mut display = Display3270::new();
        display.start_field(FieldAttributes::from_byte(0x0C));
        for ch in "secret".chars() {
            display.write_char(ch);
        }
        display.start_field(protected());
        for ch in "shown".chars() {
            display.write_char(ch);
        }
        display.end_of_record();

        let plain = display.render_text(false);
        let lines: Vec<&str> = plain.split('\n').collect();
        assert_eq!(lines.len(), 24);
        assert!(lines.iter().all(|l| l.chars().count() == 80));
        assert!(!plain.contains("secret"));
        assert!(plain.contains("shown"));

        let bordered = display.render_text(true);
        assert!(bordered.split('\n').all(|l| l.starts_with('|') && l.ends_with('|')));
        assert_eq!(bordered.split('\n').next().map(|l| l.chars().count()), Some(82));
    }

    #[test]
    fn test_render_html_inputs() {
        let mut display = Display3270::new();
        display.start_field(protected());
        for ch in "Id<".chars() {
            display.write_char(ch);
        }
        display.start_field(unprotected());
        for ch in "val".chars() {
            display.write_char(ch);
        }
        display.set_buffer_address(20).unwrap();
        display.start_field(protected());
        display.end_of_record();

        let html = display.render_html();
        assert!(html.contains("Id&lt;"));
        assert!(html.contains("name='field_4'"));
        assert!(html.contains("value=' val            '"));
        assert!(html.contains("maxlength='16'"));
        assert_eq!(html.split('\n').count(), 24);
    }

    #[test]
    fn test_address_decode() {
        assert_eq!(decode_address(0x40, 0x40), 0);
        assert_eq!(decode_address(0x5D, 0x7F), 1919);
        assert_eq!(decode_address(0x07, 0x7F), 1919);
    }

    #[test]
    fn test_encode_12bit_known_values() {
        assert_eq!(encode_12bit(0).unwrap(), [0x40, 0x40]);
        assert_eq!(encode_12bit(83).unwrap(), [0xC1, 0xD3]);
        assert_eq!(encode_12bit(1919).unwrap(), [0x5D, 0x7F]);
        assert!(encode_12bit(1920).is_err());
    }

    #[test]
    fn test_coordinate_bounds() {
        assert_eq!(coordinates_to_position(1, 1).unwrap(), 0);
        assert_eq!(coordinates_to_position(24, 80).unwrap(), 1919);
        assert!(coordinates_to_position(25, 1).is_err());
        assert!(coordinates_to_position(1, 0).is_err());
        assert!(position_to_coordinates(1920).is_err());
    }

    proptest! {
        #[test]
        fn prop_coordinates_round_trip(row in 1usize..=24, col in 1usize..=80) {
            let position = coordinates_to_position(row, col).unwrap();
            prop_assert_eq!(position_to_coordinates(position).unwrap(), (row, col));
        }

        #[test]
        fn prop_14bit_address_round_trip(position in 0usize..BUFFER_SIZE) {
            let [b1, b2] = encode_14bit(position);
            prop_assert_eq!(decode_address(b1, b2), position);
        }

        #[test]
        fn prop_12bit_address_round_trip(position in 0usize..BUFFER_SIZE) {
            let [b1, b2] = encode_12bit(position).unwrap();
            prop_assert_eq!(decode_address(b1, b2), position);
        }
    }
}
