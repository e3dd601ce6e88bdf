//! EBCDIC character codec
//!
//! Bidirectional mapping between the host's single-byte EBCDIC encoding
//! (code page 037, US/Canada) and Rust `char`s. Every byte value has a
//! display character: control code points render as [`PLACEHOLDER`].
//!
//! All functions are pure and the reverse table is built once, so the codec
//! can be shared between sessions without synchronization.

use std::collections::HashMap;

use once_cell::sync::Lazy;

/// Character shown for code points with no printable mapping.
pub const PLACEHOLDER: char = ' ';

/// EBCDIC space (0x40).
pub const EBCDIC_SPACE: u8 = 0x40;

/// CP037 code points, 16 per row, indexed by EBCDIC byte.
const CP037: [char; 256] = [
    /* 0x00 */ '\x00', '\x01', '\x02', '\x03', '\u{9C}', '\t', '\u{86}', '\x7F', '\u{97}', '\u{8D}', '\u{8E}', '\x0B', '\x0C', '\r', '\x0E', '\x0F',
    /* 0x10 */ '\x10', '\x11', '\x12', '\x13', '\u{9D}', '\u{85}', '\x08', '\u{87}', '\x18', '\x19', '\u{92}', '\u{8F}', '\x1C', '\x1D', '\x1E', '\x1F',
    /* 0x20 */ '\u{80}', '\u{81}', '\u{82}', '\u{83}', '\u{84}', '\n', '\x17', '\x1B', '\u{88}', '\u{89}', '\u{8A}', '\u{8B}', '\u{8C}', '\x05', '\x06', '\x07',
    /* 0x30 */ '\u{90}', '\u{91}', '\x16', '\u{93}', '\u{94}', '\u{95}', '\u{96}', '\x04', '\u{98}', '\u{99}', '\u{9A}', '\u{9B}', '\x14', '\x15', '\u{9E}', '\x1A',
    /* 0x40 */ ' ', '\u{A0}', 'â', 'ä', 'à', 'á', 'ã', 'å', 'ç', 'ñ', '¢', '.', '<', '(', '+', '|',
    /* 0x50 */ '&', 'é', 'ê', 'ë', 'è', 'í', 'î', 'ï', 'ì', 'ß', '!', '$', '*', ')', ';', '¬',
    /* 0x60 */ '-', '/', 'Â', 'Ä', 'À', 'Á', 'Ã', 'Å', 'Ç', 'Ñ', '¦', ',', '%', '_', '>', '?',
    /* 0x70 */ 'ø', 'É', 'Ê', 'Ë', 'È', 'Í', 'Î', 'Ï', 'Ì', '`', ':', '#', '@', '\'', '=', '"',
    /* 0x80 */ 'Ø', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', '«', '»', 'ð', 'ý', 'þ', '±',
    /* 0x90 */ '°', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 'ª', 'º', 'æ', '¸', 'Æ', '¤',
    /* 0xA0 */ 'µ', '~', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z', '¡', '¿', 'Ð', 'Ý', 'Þ', '®',
    /* 0xB0 */ '^', '£', '¥', '·', '©', '§', '¶', '¼', '½', '¾', '[', ']', '¯', '¨', '´', '×',
    /* 0xC0 */ '{', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', '\u{AD}', 'ô', 'ö', 'ò', 'ó', 'õ',
    /* 0xD0 */ '}', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R', '¹', 'û', 'ü', 'ù', 'ú', 'ÿ',
    /* 0xE0 */ '\\', '÷', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', '²', 'Ô', 'Ö', 'Ò', 'Ó', 'Õ',
    /* 0xF0 */ '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', '³', 'Û', 'Ü', 'Ù', 'Ú', '\u{9F}',
];

static CHAR_TO_CP037: Lazy<HashMap<char, u8>> = Lazy::new(|| {
    let mut map = HashMap::with_capacity(256);
    for (byte, &ch) in CP037.iter().enumerate() {
        map.entry(ch).or_insert(byte as u8);
    }
    map
});

/// Convert an EBCDIC byte to its display character.
///
/// ```
/// use tn3270r::protocol_common::ebcdic::ebcdic_to_char;
///
/// assert_eq!(ebcdic_to_char(0xC1), 'A');
/// assert_eq!(ebcdic_to_char(0x81), 'a');
/// assert_eq!(ebcdic_to_char(0xF0), '0');
/// assert_eq!(ebcdic_to_char(0x00), ' ');
/// ```
pub fn ebcdic_to_char(byte: u8) -> char {
    let ch = CP037[byte as usize];
    if ch.is_control() {
        PLACEHOLDER
    } else {
        ch
    }
}

/// Convert a character to its EBCDIC byte, falling back to an EBCDIC space
/// for characters outside the code page.
///
/// ```
/// use tn3270r::protocol_common::ebcdic::char_to_ebcdic;
///
/// assert_eq!(char_to_ebcdic('A'), 0xC1);
/// assert_eq!(char_to_ebcdic('€'), 0x40);
/// ```
pub fn char_to_ebcdic(ch: char) -> u8 {
    CHAR_TO_CP037.get(&ch).copied().unwrap_or(EBCDIC_SPACE)
}

/// Decode a run of EBCDIC bytes into display text.
pub fn decode_ebcdic(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| ebcdic_to_char(b)).collect()
}

/// Encode text into EBCDIC bytes.
///
/// ```
/// use tn3270r::protocol_common::ebcdic::encode_ebcdic;
///
/// assert_eq!(encode_ebcdic("HELLO"), vec![0xC8, 0xC5, 0xD3, 0xD3, 0xD6]);
/// ```
pub fn encode_ebcdic(text: &str) -> Vec<u8> {
    text.chars().map(char_to_ebcdic).collect()
}
