//! Protocol building blocks shared by the telnet and 3270 layers
//!
//! - [`ebcdic`] - EBCDIC (CP037) character codec
//! - [`telnet_base`] - telnet command/option codes and IAC sequence builders
//!
//! # Examples
//!
//! ```
//! use tn3270r::protocol_common::{char_to_ebcdic, ebcdic_to_char};
//!
//! assert_eq!(ebcdic_to_char(0xC1), 'A');
//! assert_eq!(char_to_ebcdic('A'), 0xC1);
//! ```

pub mod ebcdic;
pub mod telnet_base;

pub use ebcdic::{char_to_ebcdic, decode_ebcdic, ebcdic_to_char, encode_ebcdic};
pub use telnet_base::{
    build_negotiation, build_subnegotiation, escape_iac, TelnetCommand, TelnetOption,
    END_OF_RECORD_SEQUENCE,
};
