//! Field attribute and write-control decoding for 3270
//!
//! A field attribute byte (from SF, or the 0xC0 pair of SFE) is decoded into
//! [`FieldAttributes`]. The Write Control Character that follows the
//! write-family commands is decoded into [`WriteControl`]. [`Field`] is the
//! screen region a start-field order opens.

use serde::{Deserialize, Serialize};

use super::codes::*;

/// Display colour of a field, derived from its protection and intensity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldColor {
    /// Protected, normal intensity
    Blue,
    /// Protected, intensified
    White,
    /// Unprotected, normal intensity
    Green,
    /// Unprotected, intensified
    Red,
}

impl FieldColor {
    pub fn name(&self) -> &'static str {
        match self {
            FieldColor::Blue => "blue",
            FieldColor::White => "white",
            FieldColor::Green => "green",
            FieldColor::Red => "red",
        }
    }
}

/// Extended highlighting set through SFE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Highlighting {
    #[default]
    Default,
    Normal,
    Blink,
    ReverseVideo,
    Underscore,
}

impl Highlighting {
    /// Unknown values yield `None` and leave the current highlighting alone
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            HIGHLIGHT_DEFAULT => Some(Self::Default),
            HIGHLIGHT_NORMAL => Some(Self::Normal),
            HIGHLIGHT_BLINK => Some(Self::Blink),
            HIGHLIGHT_REVERSE => Some(Self::ReverseVideo),
            HIGHLIGHT_UNDERSCORE => Some(Self::Underscore),
            _ => None,
        }
    }
}

/// Decoded 3270 field attribute byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldAttributes {
    pub protected: bool,
    pub numeric: bool,
    pub printable: bool,
    pub hidden: bool,
    pub intensified: bool,
    pub modified: bool,
    pub auto_skip: bool,
    pub color: FieldColor,
}

impl FieldAttributes {
    /// Decode an attribute byte.
    ///
    /// The bit tests run first; a byte of exactly 0x40 then forces the field
    /// protected and auto-skip regardless of what the tests produced.
    pub fn from_byte(attr: u8) -> Self {
        let mut protected = attr & ATTR_PROTECTED == ATTR_PROTECTED;
        let numeric = attr & ATTR_NUMERIC == ATTR_NUMERIC;
        let printable = attr & ATTR_PRINTABLE == ATTR_PRINTABLE;
        let hidden = attr & ATTR_DISPLAY == ATTR_DISPLAY;
        let intensified = attr & ATTR_INTENSIFIED == ATTR_INTENSIFIED;
        let modified = attr & ATTR_MDT == ATTR_MDT;
        let mut auto_skip = attr & ATTR_AUTO_SKIP == ATTR_AUTO_SKIP;

        if attr == ATTR_PROTECTED_SKIP_OVERRIDE {
            protected = true;
            auto_skip = true;
        }

        let color = match (protected, intensified) {
            (true, true) => FieldColor::White,
            (true, false) => FieldColor::Blue,
            (false, true) => FieldColor::Red,
            (false, false) => FieldColor::Green,
        };

        Self {
            protected,
            numeric,
            printable,
            hidden,
            intensified,
            modified,
            auto_skip,
            color,
        }
    }
}

/// Decoded Write Control Character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteControl {
    pub reset: bool,
    pub start_printer: bool,
    pub sound_alarm: bool,
    pub keyboard_restore: bool,
    pub reset_mdt: bool,
}

impl WriteControl {
    pub fn from_byte(wcc: u8) -> Self {
        Self {
            reset: wcc & WCC_RESET != 0,
            start_printer: wcc & WCC_START_PRINTER != 0,
            sound_alarm: wcc & WCC_ALARM != 0,
            keyboard_restore: wcc & WCC_RESTORE != 0,
            reset_mdt: wcc & WCC_RESET_MDT != 0,
        }
    }
}

/// One field on the screen.
///
/// `end_position` is exclusive. While a field is still open (the decoder has
/// not yet seen the next start-field or end-of-record) it equals
/// `start_position`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub start_position: usize,
    pub end_position: usize,
    pub start_row: usize,
    pub start_col: usize,
    pub end_row: usize,
    pub end_col: usize,
    pub attributes: FieldAttributes,
    pub highlighting: Highlighting,
    /// Raw foreground colour value from SFE, if one was sent
    pub foreground: Option<u8>,
    /// The display cursor was inside this field when it was finalized
    pub has_cursor: bool,
}

impl Field {
    pub(crate) fn open(start_position: usize, attributes: FieldAttributes) -> Self {
        let (start_row, start_col) = position_coords(start_position);
        Self {
            start_position,
            end_position: start_position,
            start_row,
            start_col,
            end_row: start_row,
            end_col: start_col,
            attributes,
            highlighting: Highlighting::Default,
            foreground: None,
            has_cursor: false,
        }
    }

    pub(crate) fn close_at(&mut self, end_position: usize) {
        self.end_position = end_position;
        let (end_row, end_col) = position_coords(end_position);
        self.end_row = end_row;
        self.end_col = end_col;
    }

    /// True if `position` lies in `[start_position, end_position)`
    pub fn contains(&self, position: usize) -> bool {
        self.start_position <= position && position < self.end_position
    }

    pub fn is_input(&self) -> bool {
        !self.attributes.protected
    }

    /// Number of cells covered, including the attribute cell
    pub fn len(&self) -> usize {
        self.end_position - self.start_position
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn position_coords(position: usize) -> (usize, usize) {
    let cols = super::display::COLS;
    (position / cols + 1, position % cols + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unprotected_normal() {
        let attrs = FieldAttributes::from_byte(0x00);
        assert!(!attrs.protected);
        assert!(!attrs.numeric);
        assert!(!attrs.hidden);
        assert!(!attrs.auto_skip);
        assert_eq!(attrs.color, FieldColor::Green);
    }

    #[test]
    fn test_protected_intensified() {
        let attrs = FieldAttributes::from_byte(0x28);
        assert!(attrs.protected);
        assert!(attrs.intensified);
        assert!(!attrs.hidden);
        assert_eq!(attrs.color, FieldColor::White);
    }

    #[test]
    fn test_hidden_implies_intensified_bit() {
        let attrs = FieldAttributes::from_byte(0x0C);
        assert!(attrs.hidden);
        assert!(attrs.intensified);
        assert_eq!(attrs.color, FieldColor::Red);
    }

    #[test]
    fn test_auto_skip_and_printable() {
        let attrs = FieldAttributes::from_byte(0xF0);
        assert!(attrs.protected);
        assert!(attrs.numeric);
        assert!(attrs.auto_skip);
        assert!(attrs.printable);
        assert_eq!(attrs.color, FieldColor::Blue);
    }

    #[test]
    fn test_0x40_override() {
        let attrs = FieldAttributes::from_byte(0x40);
        assert!(attrs.protected);
        assert!(attrs.auto_skip);
        assert!(!attrs.numeric);
        assert!(!attrs.printable);
        assert_eq!(attrs.color, FieldColor::Blue);
    }

    #[test]
    fn test_modified_flag() {
        assert!(FieldAttributes::from_byte(0xC1).modified);
        assert!(!FieldAttributes::from_byte(0xC0).modified);
    }

    #[test]
    fn test_wcc_decode() {
        let wcc = WriteControl::from_byte(0xC3);
        assert!(wcc.reset);
        assert!(wcc.keyboard_restore);
        assert!(wcc.reset_mdt);
        assert!(!wcc.sound_alarm);
        assert!(!wcc.start_printer);

        let wcc = WriteControl::from_byte(0x0C);
        assert!(wcc.start_printer);
        assert!(wcc.sound_alarm);
        assert!(!wcc.reset);
    }

    #[test]
    fn test_highlighting_values() {
        assert_eq!(Highlighting::from_u8(0xF1), Some(Highlighting::Blink));
        assert_eq!(Highlighting::from_u8(0xF2), Some(Highlighting::ReverseVideo));
        assert_eq!(Highlighting::from_u8(0xF3), None);
    }

    #[test]
    fn test_field_bounds() {
        let mut field = Field::open(100, FieldAttributes::from_byte(0x00));
        assert!(field.is_empty());
        assert!(!field.contains(100));

        field.close_at(1919);
        assert!(field.contains(100));
        assert!(field.contains(1918));
        assert!(!field.contains(1919));
        assert_eq!((field.start_row, field.start_col), (2, 21));
        assert_eq!((field.end_row, field.end_col), (24, 80));
        assert_eq!(field.len(), 1819);
    }
}
