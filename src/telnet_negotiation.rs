//! Telnet Option Negotiation for TN3270
//!
//! Before any 3270 record flows the host negotiates BINARY, END-OF-RECORD and
//! TERMINAL-TYPE, and may probe TN3270E, window size and timing mark. The
//! negotiator answers each IAC command from a fixed response table. It never
//! fails the stream: a malformed command is logged and produces no reply.

use log::{debug, trace, warn};

use crate::error::{TelnetError, TelnetResult};
use crate::protocol_common::telnet_base::{
    build_negotiation, build_subnegotiation, TelnetCommand, TelnetOption,
};

/// TN3270E subnegotiation codes (RFC 2355)
pub mod tn3270e {
    pub const CONNECT: u8 = 1;
    pub const DEVICE_TYPE: u8 = 2;
    pub const FUNCTIONS: u8 = 3;
    pub const IS: u8 = 4;
    pub const REJECT: u8 = 6;
    pub const REQUEST: u8 = 7;
    pub const SEND: u8 = 8;

    /// FUNCTIONS values
    pub const RESPONSES: u8 = 2;
    pub const SYSREQ: u8 = 4;
}

/// TERMINAL-TYPE / NAWS "IS" code
const IS: u8 = 0x00;

/// NAWS payload: the text "8024" (80 columns, 24 rows)
const WINDOW_SIZE_PAYLOAD: [u8; 5] = [IS, b'8', b'0', b'2', b'4'];

pub const DEFAULT_TERMINAL_TYPE: &str = "IBM-3278-2";

/// Result of feeding one inbound chunk to the negotiator
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NegotiationOutcome {
    /// Leading bytes of the chunk that were telnet commands
    pub consumed: usize,
    /// Concatenated replies, to be written in one go
    pub reply: Option<Vec<u8>>,
}

impl NegotiationOutcome {
    /// True if the chunk started with negotiation and must not be framed
    /// as 3270 data (apart from any bytes after `consumed`)
    pub fn handled(&self) -> bool {
        self.consumed > 0
    }
}

#[derive(Debug, Clone)]
pub struct TelnetNegotiator {
    terminal_type: String,
    binary: bool,
    end_of_record: bool,
    terminal_type_sent: bool,
}

impl TelnetNegotiator {
    pub fn new() -> Self {
        Self::with_terminal_type(DEFAULT_TERMINAL_TYPE)
    }

    pub fn with_terminal_type(terminal_type: &str) -> Self {
        Self {
            terminal_type: terminal_type.to_string(),
            binary: false,
            end_of_record: false,
            terminal_type_sent: false,
        }
    }

    pub fn terminal_type(&self) -> &str {
        &self.terminal_type
    }

    /// True if `data` opens with IAC followed by DO, DONT, WILL, WONT or SB.
    ///
    /// `IAC EOR` and other IAC commands are not negotiation.
    pub fn is_negotiation(data: &[u8]) -> bool {
        data.len() > 1 && data[0] == TelnetCommand::IAC as u8 && is_negotiation_verb(data[1])
    }

    /// Answer every telnet command at the front of `data`.
    pub fn negotiate(&mut self, data: &[u8]) -> NegotiationOutcome {
        let mut pos = 0;
        let mut reply = Vec::new();

        while Self::is_negotiation(&data[pos..]) {
            let len = command_length(&data[pos..]);
            let command = &data[pos..pos + len];
            trace!("Telnet command: {command:02X?}");
            match self.handle_command(command) {
                Ok(Some(response)) => reply.extend_from_slice(&response),
                Ok(None) => {}
                Err(err) => warn!("Negotiation degraded, no reply sent: {err}"),
            }
            pos += len;
        }

        NegotiationOutcome {
            consumed: pos,
            reply: if reply.is_empty() { None } else { Some(reply) },
        }
    }

    /// Build the reply to a single telnet command, if it needs one
    pub fn handle_command(&mut self, data: &[u8]) -> TelnetResult<Option<Vec<u8>>> {
        if data.len() <= 1 {
            return Err(TelnetError::TruncatedCommand { data: data.to_vec() });
        }

        match TelnetCommand::from_u8(data[1]) {
            Some(TelnetCommand::DO) => self.handle_do(option_byte(data)?),
            Some(TelnetCommand::WILL) => Ok(self.handle_will(option_byte(data)?)),
            Some(TelnetCommand::SB) => self.handle_subnegotiation(data),
            Some(TelnetCommand::DONT) => {
                debug!("Host sent DONT {:?}", data.get(2));
                Ok(None)
            }
            Some(TelnetCommand::WONT) => {
                debug!("Host sent WONT {:?}", data.get(2));
                Ok(None)
            }
            _ => {
                debug!("Unable to handle IAC command 0x{:02X}", data[1]);
                Ok(None)
            }
        }
    }

    fn handle_do(&mut self, option: u8) -> TelnetResult<Option<Vec<u8>>> {
        let reply = match TelnetOption::from_u8(option) {
            Some(TelnetOption::TerminalType) => {
                build_negotiation(TelnetCommand::WILL, TelnetOption::TerminalType)
            }
            Some(TelnetOption::EndOfRecord) => {
                self.end_of_record = true;
                build_negotiation(TelnetCommand::WILL, TelnetOption::EndOfRecord)
            }
            Some(TelnetOption::Binary) => {
                self.binary = true;
                build_negotiation(TelnetCommand::WILL, TelnetOption::Binary)
            }
            Some(TelnetOption::TN3270E) => {
                build_negotiation(TelnetCommand::WONT, TelnetOption::TN3270E)
            }
            Some(TelnetOption::TimingMark) => {
                build_negotiation(TelnetCommand::WONT, TelnetOption::TimingMark)
            }
            _ => {
                debug!("Cannot handle DO {}", option_label(option));
                return Ok(None);
            }
        };
        debug!("DO {} answered with {reply:02X?}", option_label(option));
        Ok(Some(reply))
    }

    fn handle_will(&mut self, option: u8) -> Option<Vec<u8>> {
        match TelnetOption::from_u8(option) {
            Some(TelnetOption::EndOfRecord) => {
                self.end_of_record = true;
                Some(build_negotiation(TelnetCommand::DO, TelnetOption::EndOfRecord))
            }
            Some(TelnetOption::Binary) => {
                self.binary = true;
                Some(build_negotiation(TelnetCommand::DO, TelnetOption::Binary))
            }
            _ => {
                debug!("Host sent WILL {}, no reply", option_label(option));
                None
            }
        }
    }

    fn handle_subnegotiation(&mut self, data: &[u8]) -> TelnetResult<Option<Vec<u8>>> {
        let option = option_byte(data)?;
        let payload = subnegotiation_payload(data);

        match TelnetOption::from_u8(option) {
            Some(TelnetOption::WindowSize) => {
                debug!("Negotiating window size");
                Ok(Some(build_subnegotiation(
                    TelnetOption::WindowSize,
                    &WINDOW_SIZE_PAYLOAD,
                )))
            }
            Some(TelnetOption::TerminalType) => {
                debug!("Sending terminal type {}", self.terminal_type);
                self.terminal_type_sent = true;
                let mut body = vec![IS];
                body.extend_from_slice(self.terminal_type.as_bytes());
                Ok(Some(build_subnegotiation(TelnetOption::TerminalType, &body)))
            }
            Some(TelnetOption::TN3270E) => self.handle_tn3270e(payload),
            _ => {
                debug!("Subnegotiation for {} not handled", option_label(option));
                Ok(None)
            }
        }
    }

    fn handle_tn3270e(&mut self, payload: &[u8]) -> TelnetResult<Option<Vec<u8>>> {
        if payload.len() < 2 {
            return Err(TelnetError::MalformedSubnegotiation {
                option: TelnetOption::TN3270E as u8,
                data: payload.to_vec(),
            });
        }

        match (payload[0], payload[1]) {
            (tn3270e::SEND, tn3270e::DEVICE_TYPE) => {
                debug!("TN3270E: requesting device type {}", self.terminal_type);
                let mut body = vec![tn3270e::DEVICE_TYPE, tn3270e::REQUEST];
                body.extend_from_slice(self.terminal_type.as_bytes());
                Ok(Some(build_subnegotiation(TelnetOption::TN3270E, &body)))
            }
            (tn3270e::DEVICE_TYPE, tn3270e::IS) => {
                debug!("TN3270E: device type accepted, requesting functions");
                Ok(Some(build_subnegotiation(
                    TelnetOption::TN3270E,
                    &[
                        tn3270e::FUNCTIONS,
                        tn3270e::REQUEST,
                        tn3270e::RESPONSES,
                        tn3270e::SYSREQ,
                    ],
                )))
            }
            (tn3270e::FUNCTIONS, tn3270e::IS) => {
                debug!("TN3270E: functions agreed {:02X?}", &payload[2..]);
                Ok(None)
            }
            (code, _) => {
                debug!("TN3270E command 0x{code:02X} is not implemented");
                Ok(None)
            }
        }
    }

    /// Both BINARY and END-OF-RECORD have been agreed
    pub fn is_3270_mode(&self) -> bool {
        self.binary && self.end_of_record
    }

    pub fn is_binary(&self) -> bool {
        self.binary
    }

    pub fn is_end_of_record(&self) -> bool {
        self.end_of_record
    }

    pub fn is_terminal_type_sent(&self) -> bool {
        self.terminal_type_sent
    }
}

impl Default for TelnetNegotiator {
    fn default() -> Self {
        Self::new()
    }
}

fn is_negotiation_verb(byte: u8) -> bool {
    match TelnetCommand::from_u8(byte) {
        Some(TelnetCommand::SB) => true,
        Some(command) => command.is_option_verb(),
        None => false,
    }
}

fn option_byte(data: &[u8]) -> TelnetResult<u8> {
    data.get(2)
        .copied()
        .ok_or_else(|| TelnetError::TruncatedCommand { data: data.to_vec() })
}

/// Length of the command at the front of `data`: three bytes for an option
/// verb, through `IAC SE` for a subnegotiation (or the rest of the buffer if
/// SE is missing)
fn command_length(data: &[u8]) -> usize {
    if data[1] == TelnetCommand::SB as u8 {
        data.windows(2)
            .skip(2)
            .position(|pair| pair == [TelnetCommand::IAC as u8, TelnetCommand::SE as u8])
            .map(|offset| offset + 2 + 2)
            .unwrap_or(data.len())
    } else {
        data.len().min(3)
    }
}

/// Option name for logs, or its code when unknown
fn option_label(option: u8) -> String {
    match TelnetOption::from_u8(option) {
        Some(known) => known.name().to_string(),
        None => format!("option 0x{option:02X}"),
    }
}

/// Bytes between the option and the closing `IAC SE`
fn subnegotiation_payload(data: &[u8]) -> &[u8] {
    let body = data.get(3..).unwrap_or(&[]);
    match body {
        [rest @ .., 0xFF, 0xF0] => rest,
        _ => body,
    }
}
