//! TN3270R: a scriptable TN3270 client library
//!
//! Connects to an IBM mainframe over telnet, keeps a 24x80 model of the
//! host's screen and exposes a small scripting surface (stage text, press
//! attention keys, read and wait on screen text, render the screen).

/// PROTOCOL COMMON: EBCDIC codec and telnet byte handling
pub mod protocol_common;

/// LIB3270: IBM 3270 datastream implementation
pub mod lib3270;

pub mod config;
pub mod error;
pub mod network;
pub mod telnet_negotiation;

/// Active session and scripting surface
pub mod session;

pub use config::SessionConfig;
pub use error::{ErrorKind, Tn3270Error, Tn3270Result};
pub use session::Session;
