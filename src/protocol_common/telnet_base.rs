//! Telnet byte codes and IAC sequence builders
//!
//! Shared by the negotiator (inbound IAC handling) and the 3270 layers,
//! which need the IAC/EOR pair that terminates every record.

/// Telnet command codes (RFC 854, RFC 885)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelnetCommand {
    /// Interpret As Command - 255 (0xFF)
    IAC = 255,
    /// Don't - 254 (0xFE)
    DONT = 254,
    /// Do - 253 (0xFD)
    DO = 253,
    /// Won't - 252 (0xFC)
    WONT = 252,
    /// Will - 251 (0xFB)
    WILL = 251,
    /// Subnegotiation Begin - 250 (0xFA)
    SB = 250,
    /// Subnegotiation End - 240 (0xF0)
    SE = 240,
    /// End of Record - 239 (0xEF)
    EOR = 239,
}

impl TelnetCommand {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            255 => Some(TelnetCommand::IAC),
            254 => Some(TelnetCommand::DONT),
            253 => Some(TelnetCommand::DO),
            252 => Some(TelnetCommand::WONT),
            251 => Some(TelnetCommand::WILL),
            250 => Some(TelnetCommand::SB),
            240 => Some(TelnetCommand::SE),
            239 => Some(TelnetCommand::EOR),
            _ => None,
        }
    }

    /// True for the four option-negotiation verbs
    pub fn is_option_verb(self) -> bool {
        matches!(
            self,
            TelnetCommand::DO | TelnetCommand::DONT | TelnetCommand::WILL | TelnetCommand::WONT
        )
    }
}

/// Telnet options recognised during a TN3270 handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TelnetOption {
    /// Binary Transmission - 0
    Binary = 0,
    /// Timing Mark - 6
    TimingMark = 6,
    /// Terminal Type - 24
    TerminalType = 24,
    /// End of Record - 25
    EndOfRecord = 25,
    /// Negotiate About Window Size - 31
    WindowSize = 31,
    /// TN3270 Enhancements - 40
    TN3270E = 40,
}

impl TelnetOption {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(TelnetOption::Binary),
            6 => Some(TelnetOption::TimingMark),
            24 => Some(TelnetOption::TerminalType),
            25 => Some(TelnetOption::EndOfRecord),
            31 => Some(TelnetOption::WindowSize),
            40 => Some(TelnetOption::TN3270E),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TelnetOption::Binary => "Binary",
            TelnetOption::TimingMark => "Timing Mark",
            TelnetOption::TerminalType => "Terminal Type",
            TelnetOption::EndOfRecord => "End of Record",
            TelnetOption::WindowSize => "Window Size",
            TelnetOption::TN3270E => "TN3270E",
        }
    }
}

/// The two-byte terminator of every 3270 record: IAC EOR
pub const END_OF_RECORD_SEQUENCE: [u8; 2] = [TelnetCommand::IAC as u8, TelnetCommand::EOR as u8];

/// Build a three-byte option negotiation sequence.
///
/// ```
/// use tn3270r::protocol_common::telnet_base::{build_negotiation, TelnetCommand, TelnetOption};
///
/// let seq = build_negotiation(TelnetCommand::WILL, TelnetOption::Binary);
/// assert_eq!(seq, vec![255, 251, 0]);
/// ```
pub fn build_negotiation(command: TelnetCommand, option: TelnetOption) -> Vec<u8> {
    vec![TelnetCommand::IAC as u8, command as u8, option as u8]
}

/// Build `IAC SB <option> <payload> IAC SE`, doubling any IAC in the payload.
pub fn build_subnegotiation(option: TelnetOption, payload: &[u8]) -> Vec<u8> {
    let mut result = vec![TelnetCommand::IAC as u8, TelnetCommand::SB as u8, option as u8];
    result.extend(escape_iac(payload));
    result.push(TelnetCommand::IAC as u8);
    result.push(TelnetCommand::SE as u8);
    result
}

/// Double every IAC byte so data can travel inside a telnet stream.
pub fn escape_iac(data: &[u8]) -> Vec<u8> {
    let mut escaped = Vec::with_capacity(data.len());
    for &byte in data {
        escaped.push(byte);
        if byte == TelnetCommand::IAC as u8 {
            escaped.push(TelnetCommand::IAC as u8);
        }
    }
    escaped
}
