//! IBM 3270 datastream support (TN3270)
//!
//! # Overview
//!
//! A 3270 host paints a 24x80 screen with buffer-addressed records: a command
//! (Write, Erase/Write, ...), a Write Control Character, then a run of orders
//! (SBA, SF, RA, ...) and EBCDIC text. The terminal answers with attention
//! records carrying an AID byte, the cursor address and any modified text.
//!
//! # Architecture
//!
//! - [`codes`] - command codes, order codes, AID keys and the key name table
//! - [`field`] - field attribute and WCC decoding
//! - [`display`] - screen buffer, field list, addressing and rendering
//! - [`protocol`] - datastream decoder
//! - [`framer`] - reassembles records split across socket reads
//! - [`encoder`] - outbound attention and read-reply records
//!
//! # Example Usage
//!
//! ```rust
//! use tn3270r::lib3270::{Display3270, ProtocolProcessor3270};
//!
//! let mut display = Display3270::new();
//! let mut processor = ProtocolProcessor3270::new();
//!
//! // Erase/Write, keyboard restore, "HI", end of record
//! processor.process_datastream(&[0x05, 0x02, 0xC8, 0xC9, 0xFF, 0xEF], &mut display);
//! assert_eq!(display.text_at(1, 1, 2).unwrap(), "HI");
//! assert!(!display.is_keyboard_locked());
//! ```

pub mod codes;
pub mod display;
pub mod encoder;
pub mod field;
pub mod framer;
pub mod protocol;

pub use codes::{aid_for_key_name, CommandCode, OrderCode};
pub use display::{addressing, Display3270, BUFFER_SIZE, COLS, ROWS};
pub use encoder::PendingWrites;
pub use field::{Field, FieldAttributes, FieldColor, Highlighting, WriteControl};
pub use framer::RecordFramer;
pub use protocol::{PendingRead, ProtocolProcessor3270};
