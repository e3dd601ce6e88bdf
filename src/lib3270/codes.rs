//! TN3270 Protocol Constants and Codes
//!
//! Command codes (plain and SNA), order codes, AID (Attention Identifier)
//! bytes, field and extended attribute values, and the symbolic key table
//! used by scripting callers.
//!
//! # References
//! - RFC 1576: TN3270 Current Practices
//! - IBM 3270 Data Stream Programmer's Reference (GA23-0059)

use std::collections::HashMap;

use once_cell::sync::Lazy;

/// 3270 Command Codes (local, non-SNA)
pub const CMD_WRITE: u8 = 0x01;              // Write
pub const CMD_READ_BUFFER: u8 = 0x02;        // Read Buffer
pub const CMD_NOP: u8 = 0x03;                // No Operation
pub const CMD_ERASE_WRITE: u8 = 0x05;        // Erase/Write
pub const CMD_READ_MODIFIED: u8 = 0x06;      // Read Modified
pub const CMD_ERASE_WRITE_ALTERNATE: u8 = 0x0D; // Erase/Write Alternate
pub const CMD_READ_MODIFIED_ALL: u8 = 0x0E;  // Read Modified All
pub const CMD_ERASE_ALL_UNPROTECTED: u8 = 0x0F; // Erase All Unprotected

/// 3270 Command Codes as sent over SNA
pub const SNA_CMD_READ_MODIFIED_ALL: u8 = 0x6E;
pub const SNA_CMD_ERASE_ALL_UNPROTECTED: u8 = 0x6F;
pub const SNA_CMD_ERASE_WRITE_ALTERNATE: u8 = 0x7E;
pub const SNA_CMD_WRITE: u8 = 0xF1;
pub const SNA_CMD_READ_BUFFER: u8 = 0xF2;
pub const SNA_CMD_ERASE_WRITE: u8 = 0xF5;
pub const SNA_CMD_READ_MODIFIED: u8 = 0xF6;

/// 3270 Order Codes
pub const ORDER_PT: u8 = 0x05;    // Program Tab
pub const ORDER_GE: u8 = 0x08;    // Graphic Escape
pub const ORDER_SBA: u8 = 0x11;   // Set Buffer Address
pub const ORDER_EUA: u8 = 0x12;   // Erase Unprotected to Address
pub const ORDER_IC: u8 = 0x13;    // Insert Cursor
pub const ORDER_SF: u8 = 0x1D;    // Start Field
pub const ORDER_SA: u8 = 0x28;    // Set Attribute
pub const ORDER_SFE: u8 = 0x29;   // Start Field Extended
pub const ORDER_RA: u8 = 0x3C;    // Repeat to Address

/// Record delimiters inside a datastream
pub const END_OF_RECORD: u8 = 0xFF;
pub const END_OF_STREAM: u8 = 0xEF;

/// Write Control Character (WCC) Bits
pub const WCC_RESET: u8 = 0x40;
pub const WCC_START_PRINTER: u8 = 0x08;
pub const WCC_ALARM: u8 = 0x04;
pub const WCC_RESTORE: u8 = 0x02;
pub const WCC_RESET_MDT: u8 = 0x01;

/// Field Attribute Byte Bits
pub const ATTR_PRINTABLE: u8 = 0xC0;      // Bits 6-7: graphic code point
pub const ATTR_PROTECTED: u8 = 0x20;
pub const ATTR_NUMERIC: u8 = 0x10;
pub const ATTR_AUTO_SKIP: u8 = 0x30;      // Protected + numeric
pub const ATTR_DISPLAY: u8 = 0x0C;        // Bits 2-3: display attributes
pub const ATTR_INTENSIFIED: u8 = 0x08;
pub const ATTR_MDT: u8 = 0x01;            // Modified Data Tag

/// Attribute byte that forces a protected, auto-skip field
pub const ATTR_PROTECTED_SKIP_OVERRIDE: u8 = 0x40;

/// Extended Field Attribute Types (SFE pairs)
pub const XA_3270: u8 = 0xC0;
pub const XA_HIGHLIGHTING: u8 = 0x41;
pub const XA_FOREGROUND: u8 = 0x42;

/// Highlighting Attribute Values
pub const HIGHLIGHT_DEFAULT: u8 = 0x00;
pub const HIGHLIGHT_NORMAL: u8 = 0xF0;
pub const HIGHLIGHT_BLINK: u8 = 0xF1;
pub const HIGHLIGHT_REVERSE: u8 = 0xF2;
pub const HIGHLIGHT_UNDERSCORE: u8 = 0xF4;

/// AID (Attention Identifier) bytes
pub const AID_NO_AID: u8 = 0x60;
pub const AID_CLEAR: u8 = 0x6D;
pub const AID_CLEAR_PARTITION: u8 = 0x6A;
pub const AID_ENTER: u8 = 0x7D;
pub const AID_SYSREQ: u8 = 0xF0;

// Program attention keys
pub const AID_PA1: u8 = 0x6C;
pub const AID_PA2: u8 = 0x6E;
pub const AID_PA3: u8 = 0x6B;

// Function keys
pub const AID_PF1: u8 = 0xF1;
pub const AID_PF2: u8 = 0xF2;
pub const AID_PF3: u8 = 0xF3;
pub const AID_PF4: u8 = 0xF4;
pub const AID_PF5: u8 = 0xF5;
pub const AID_PF6: u8 = 0xF6;
pub const AID_PF7: u8 = 0xF7;
pub const AID_PF8: u8 = 0xF8;
pub const AID_PF9: u8 = 0xF9;
pub const AID_PF10: u8 = 0x7A;
pub const AID_PF11: u8 = 0x7B;
pub const AID_PF12: u8 = 0x7C;
pub const AID_PF13: u8 = 0xC1;
pub const AID_PF14: u8 = 0xC2;
pub const AID_PF15: u8 = 0xC3;
pub const AID_PF16: u8 = 0xC4;
pub const AID_PF17: u8 = 0xC5;
pub const AID_PF18: u8 = 0xC6;
pub const AID_PF19: u8 = 0xC7;
pub const AID_PF20: u8 = 0xC8;
pub const AID_PF21: u8 = 0xC9;
pub const AID_PF22: u8 = 0x4A;
pub const AID_PF23: u8 = 0x4B;
pub const AID_PF24: u8 = 0x4C;

/// 3270 commands, with the local and SNA byte codes folded together
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandCode {
    Write,
    EraseWrite,
    EraseWriteAlternate,
    ReadBuffer,
    ReadModified,
    ReadModifiedAll,
    EraseAllUnprotected,
    NoOperation,
}

impl CommandCode {
    /// Convert a byte value to a CommandCode enum
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            CMD_WRITE | SNA_CMD_WRITE => Some(Self::Write),
            CMD_ERASE_WRITE | SNA_CMD_ERASE_WRITE => Some(Self::EraseWrite),
            CMD_ERASE_WRITE_ALTERNATE | SNA_CMD_ERASE_WRITE_ALTERNATE => {
                Some(Self::EraseWriteAlternate)
            }
            CMD_READ_BUFFER | SNA_CMD_READ_BUFFER => Some(Self::ReadBuffer),
            CMD_READ_MODIFIED | SNA_CMD_READ_MODIFIED => Some(Self::ReadModified),
            CMD_READ_MODIFIED_ALL | SNA_CMD_READ_MODIFIED_ALL => Some(Self::ReadModifiedAll),
            CMD_ERASE_ALL_UNPROTECTED | SNA_CMD_ERASE_ALL_UNPROTECTED => {
                Some(Self::EraseAllUnprotected)
            }
            CMD_NOP => Some(Self::NoOperation),
            _ => None,
        }
    }

    /// Local (non-SNA) byte value
    pub fn to_u8(self) -> u8 {
        match self {
            Self::Write => CMD_WRITE,
            Self::EraseWrite => CMD_ERASE_WRITE,
            Self::EraseWriteAlternate => CMD_ERASE_WRITE_ALTERNATE,
            Self::ReadBuffer => CMD_READ_BUFFER,
            Self::ReadModified => CMD_READ_MODIFIED,
            Self::ReadModifiedAll => CMD_READ_MODIFIED_ALL,
            Self::EraseAllUnprotected => CMD_ERASE_ALL_UNPROTECTED,
            Self::NoOperation => CMD_NOP,
        }
    }

    /// Write-family commands are followed by a WCC byte
    pub fn has_wcc(self) -> bool {
        matches!(self, Self::Write | Self::EraseWrite | Self::EraseWriteAlternate)
    }
}

/// Enum representation of 3270 order codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderCode {
    StartField = ORDER_SF as isize,
    StartFieldExtended = ORDER_SFE as isize,
    SetBufferAddress = ORDER_SBA as isize,
    SetAttribute = ORDER_SA as isize,
    InsertCursor = ORDER_IC as isize,
    ProgramTab = ORDER_PT as isize,
    RepeatToAddress = ORDER_RA as isize,
    EraseUnprotectedToAddress = ORDER_EUA as isize,
    GraphicEscape = ORDER_GE as isize,
}

impl OrderCode {
    /// Convert a byte value to an OrderCode enum
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            ORDER_SF => Some(Self::StartField),
            ORDER_SFE => Some(Self::StartFieldExtended),
            ORDER_SBA => Some(Self::SetBufferAddress),
            ORDER_SA => Some(Self::SetAttribute),
            ORDER_IC => Some(Self::InsertCursor),
            ORDER_PT => Some(Self::ProgramTab),
            ORDER_RA => Some(Self::RepeatToAddress),
            ORDER_EUA => Some(Self::EraseUnprotectedToAddress),
            ORDER_GE => Some(Self::GraphicEscape),
            _ => None,
        }
    }

    /// Convert OrderCode enum to byte value
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Short mnemonic used in logs and errors
    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::StartField => "SF",
            Self::StartFieldExtended => "SFE",
            Self::SetBufferAddress => "SBA",
            Self::SetAttribute => "SA",
            Self::InsertCursor => "IC",
            Self::ProgramTab => "PT",
            Self::RepeatToAddress => "RA",
            Self::EraseUnprotectedToAddress => "EUA",
            Self::GraphicEscape => "GE",
        }
    }
}

/// Symbolic key name to AID byte. Names are stored lower-case with brackets.
static KEY_TABLE: Lazy<HashMap<&'static str, u8>> = Lazy::new(|| {
    HashMap::from([
        ("[noaid]", AID_NO_AID),
        ("[clear]", AID_CLEAR),
        ("[clear_partition]", AID_CLEAR_PARTITION),
        ("[enter]", AID_ENTER),
        ("[sysreq]", AID_SYSREQ),
        ("[pf1]", AID_PF1),
        ("[pf2]", AID_PF2),
        ("[pf3]", AID_PF3),
        ("[pf4]", AID_PF4),
        ("[pf5]", AID_PF5),
        ("[pf6]", AID_PF6),
        ("[pf7]", AID_PF7),
        ("[pf8]", AID_PF8),
        ("[pf9]", AID_PF9),
        ("[pf10]", AID_PF10),
        ("[pf11]", AID_PF11),
        ("[pf12]", AID_PF12),
        ("[pf13]", AID_PF13),
        ("[pf14]", AID_PF14),
        ("[pf15]", AID_PF15),
        ("[pf16]", AID_PF16),
        ("[pf17]", AID_PF17),
        ("[pf18]", AID_PF18),
        ("[pf19]", AID_PF19),
        ("[pf20]", AID_PF20),
        ("[pf21]", AID_PF21),
        ("[pf22]", AID_PF22),
        ("[pf23]", AID_PF23),
        ("[pf24]", AID_PF24),
        ("[pa1]", AID_PA1),
        ("[pa2]", AID_PA2),
        ("[pa3]", AID_PA3),
    ])
});

/// Look up the AID byte for a bracketed key name such as `[enter]` or `[PF3]`.
///
/// Matching is case-insensitive. Names without the surrounding brackets are
/// not keys and return `None`.
///
/// ```
/// use tn3270r::lib3270::codes::{aid_for_key_name, AID_ENTER, AID_PF3};
///
/// assert_eq!(aid_for_key_name("[enter]"), Some(AID_ENTER));
/// assert_eq!(aid_for_key_name("[PF3]"), Some(AID_PF3));
/// assert_eq!(aid_for_key_name("enter"), None);
/// ```
pub fn aid_for_key_name(name: &str) -> Option<u8> {
    if !(name.starts_with('[') && name.ends_with(']')) {
        return None;
    }
    KEY_TABLE.get(name.to_ascii_lowercase().as_str()).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_code_conversion() {
        assert_eq!(CommandCode::from_u8(CMD_WRITE), Some(CommandCode::Write));
        assert_eq!(CommandCode::Write.to_u8(), CMD_WRITE);
        assert_eq!(CommandCode::from_u8(0xFF), None);
        assert_eq!(CommandCode::from_u8(ORDER_SBA), None);
        assert_eq!(CommandCode::from_u8(CMD_NOP), Some(CommandCode::NoOperation));
    }

    #[test]
    fn test_sna_command_codes() {
        assert_eq!(CommandCode::from_u8(SNA_CMD_ERASE_WRITE), Some(CommandCode::EraseWrite));
        assert_eq!(CommandCode::from_u8(SNA_CMD_ERASE_WRITE_ALTERNATE), Some(CommandCode::EraseWriteAlternate));
        assert_eq!(CommandCode::from_u8(SNA_CMD_READ_MODIFIED), Some(CommandCode::ReadModified));
        assert_eq!(CommandCode::from_u8(SNA_CMD_ERASE_ALL_UNPROTECTED), Some(CommandCode::EraseAllUnprotected));
        assert!(CommandCode::EraseWrite.has_wcc());
        assert!(!CommandCode::ReadBuffer.has_wcc());
    }

    #[test]
    fn test_order_code_conversion() {
        assert_eq!(OrderCode::from_u8(ORDER_SF), Some(OrderCode::StartField));
        assert_eq!(OrderCode::StartField.to_u8(), ORDER_SF);
        assert_eq!(OrderCode::from_u8(0xC1), None);
        assert_eq!(OrderCode::EraseUnprotectedToAddress.mnemonic(), "EUA");
    }

    #[test]
    fn test_key_names() {
        assert_eq!(aid_for_key_name("[enter]"), Some(AID_ENTER));
        assert_eq!(aid_for_key_name("[Enter]"), Some(AID_ENTER));
        assert_eq!(aid_for_key_name("[pf12]"), Some(AID_PF12));
        assert_eq!(aid_for_key_name("[pf24]"), Some(AID_PF24));
        assert_eq!(aid_for_key_name("[pa2]"), Some(AID_PA2));
        assert_eq!(aid_for_key_name("[clear]"), Some(AID_CLEAR));
    }

    #[test]
    fn test_unknown_key_names() {
        assert_eq!(aid_for_key_name("[pf25]"), None);
        assert_eq!(aid_for_key_name("enter"), None);
        assert_eq!(aid_for_key_name("[enter"), None);
        assert_eq!(aid_for_key_name(""), None);
    }
}
