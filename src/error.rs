//! Error handling for TN3270R
//!
//! Errors are grouped by the component that raises them and collected under
//! [`Tn3270Error`]. Callers that only care about the broad category can match
//! on [`Tn3270Error::kind`].

use std::error::Error as StdError;
use std::fmt;
use std::io;

/// Top-level error type for TN3270R operations
#[derive(Debug)]
pub enum Tn3270Error {
    /// Transport errors
    Network(NetworkError),
    /// Telnet negotiation errors
    Telnet(TelnetError),
    /// 3270 datastream errors
    Protocol(ProtocolError),
    /// Screen and scripting surface errors
    Terminal(TerminalError),
    /// Field lookup errors
    Field(FieldError),
    /// Configuration errors
    Config(ConfigError),
}

/// Broad error category, one per failure mode a caller can react to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ProtocolFraming,
    OutOfBoundsCoordinate,
    UnknownAttentionKey,
    ProtectedFieldWrite,
    Timeout,
    Unimplemented,
    TransportFailure,
    Configuration,
}

/// Transport related errors
#[derive(Debug)]
pub enum NetworkError {
    /// Connection could not be established
    ConnectFailed { host: String, port: u16, reason: String },
    /// Connect did not complete in time
    ConnectTimeout { host: String, port: u16, timeout_ms: u64 },
    /// Connection closed or failed while in use
    ConnectionLost { reason: String },
    /// TLS setup or handshake with the host failed
    TlsFailed { host: String, reason: String },
    /// Operation needs a live connection but the session is disconnected
    NotConnected,
}

/// Telnet negotiation errors
#[derive(Debug)]
pub enum TelnetError {
    /// Negotiation buffer too short to hold a command
    TruncatedCommand { data: Vec<u8> },
    /// Subnegotiation payload is missing required bytes
    MalformedSubnegotiation { option: u8, data: Vec<u8> },
}

/// 3270 datastream errors
#[derive(Debug)]
pub enum ProtocolError {
    /// Order is recognised but its screen effect is not implemented
    UnimplementedOrder { order: u8, name: &'static str },
    /// Buffer address outside the screen
    AddressOutOfRange { position: usize },
}

/// Screen and scripting surface errors
#[derive(Debug)]
pub enum TerminalError {
    /// Row or column outside the 24x80 screen
    InvalidCoordinates { row: usize, col: usize },
    /// Attention key name is not a bracketed known key
    UnknownAttentionKey { key: String },
    /// Wait expired before the condition was met
    WaitTimeout { text: String, timeout_ms: u64 },
}

/// Field lookup errors
#[derive(Debug)]
pub enum FieldError {
    /// No unprotected field covers the position
    NotInputField { row: usize, col: usize },
}

/// Configuration errors
#[derive(Debug)]
pub enum ConfigError {
    /// Invalid configuration parameter
    InvalidParameter { parameter: String, value: String, reason: String },
    /// Configuration file error
    FileError { path: String, error: String },
    /// No platform configuration directory
    NoConfigDir,
}

impl Tn3270Error {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Tn3270Error::Network(_) => ErrorKind::TransportFailure,
            Tn3270Error::Telnet(_) => ErrorKind::ProtocolFraming,
            Tn3270Error::Protocol(ProtocolError::UnimplementedOrder { .. }) => ErrorKind::Unimplemented,
            Tn3270Error::Protocol(ProtocolError::AddressOutOfRange { .. }) => {
                ErrorKind::OutOfBoundsCoordinate
            }
            Tn3270Error::Terminal(TerminalError::InvalidCoordinates { .. }) => {
                ErrorKind::OutOfBoundsCoordinate
            }
            Tn3270Error::Terminal(TerminalError::UnknownAttentionKey { .. }) => {
                ErrorKind::UnknownAttentionKey
            }
            Tn3270Error::Terminal(TerminalError::WaitTimeout { .. }) => ErrorKind::Timeout,
            Tn3270Error::Field(FieldError::NotInputField { .. }) => ErrorKind::ProtectedFieldWrite,
            Tn3270Error::Config(_) => ErrorKind::Configuration,
        }
    }
}

impl fmt::Display for Tn3270Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tn3270Error::Network(err) => write!(f, "Network error: {err}"),
            Tn3270Error::Telnet(err) => write!(f, "Telnet error: {err}"),
            Tn3270Error::Protocol(err) => write!(f, "Protocol error: {err}"),
            Tn3270Error::Terminal(err) => write!(f, "Terminal error: {err}"),
            Tn3270Error::Field(err) => write!(f, "Field error: {err}"),
            Tn3270Error::Config(err) => write!(f, "Configuration error: {err}"),
        }
    }
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkError::ConnectFailed { host, port, reason } =>
                write!(f, "Connection to {host}:{port} failed: {reason}"),
            NetworkError::ConnectTimeout { host, port, timeout_ms } =>
                write!(f, "Connection timeout to {host}:{port} after {timeout_ms}ms"),
            NetworkError::ConnectionLost { reason } =>
                write!(f, "Connection lost: {reason}"),
            NetworkError::TlsFailed { host, reason } =>
                write!(f, "TLS with {host} failed: {reason}"),
            NetworkError::NotConnected =>
                write!(f, "Session is not connected"),
        }
    }
}

impl fmt::Display for TelnetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelnetError::TruncatedCommand { data } =>
                write!(f, "Telnet command too short: {data:02X?}"),
            TelnetError::MalformedSubnegotiation { option, data } =>
                write!(f, "Malformed subnegotiation for option {option}: {data:02X?}"),
        }
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::UnimplementedOrder { order, name } =>
                write!(f, "Order {name} (0x{order:02X}) is not implemented"),
            ProtocolError::AddressOutOfRange { position } =>
                write!(f, "Buffer address {position} is outside the screen"),
        }
    }
}

impl fmt::Display for TerminalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminalError::InvalidCoordinates { row, col } =>
                write!(f, "Invalid screen coordinates: row {row}, col {col}"),
            TerminalError::UnknownAttentionKey { key } =>
                write!(f, "Unknown attention key '{key}'"),
            TerminalError::WaitTimeout { text, timeout_ms } =>
                write!(f, "Timed out after {timeout_ms}ms waiting on '{text}'"),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldError::NotInputField { row, col } =>
                write!(f, "No unprotected field at position ({row}, {col})"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidParameter { parameter, value, reason } =>
                write!(f, "Invalid configuration parameter '{parameter}' = '{value}': {reason}"),
            ConfigError::FileError { path, error } =>
                write!(f, "Configuration file error '{path}': {error}"),
            ConfigError::NoConfigDir =>
                write!(f, "No configuration directory available on this platform"),
        }
    }
}

impl StdError for Tn3270Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Tn3270Error::Network(err) => Some(err),
            Tn3270Error::Telnet(err) => Some(err),
            Tn3270Error::Protocol(err) => Some(err),
            Tn3270Error::Terminal(err) => Some(err),
            Tn3270Error::Field(err) => Some(err),
            Tn3270Error::Config(err) => Some(err),
        }
    }
}

impl StdError for NetworkError {}
impl StdError for TelnetError {}
impl StdError for ProtocolError {}
impl StdError for TerminalError {}
impl StdError for FieldError {}
impl StdError for ConfigError {}

impl From<NetworkError> for Tn3270Error {
    fn from(err: NetworkError) -> Self {
        Tn3270Error::Network(err)
    }
}

impl From<TelnetError> for Tn3270Error {
    fn from(err: TelnetError) -> Self {
        Tn3270Error::Telnet(err)
    }
}

impl From<ProtocolError> for Tn3270Error {
    fn from(err: ProtocolError) -> Self {
        Tn3270Error::Protocol(err)
    }
}

impl From<TerminalError> for Tn3270Error {
    fn from(err: TerminalError) -> Self {
        Tn3270Error::Terminal(err)
    }
}

impl From<FieldError> for Tn3270Error {
    fn from(err: FieldError) -> Self {
        Tn3270Error::Field(err)
    }
}

impl From<ConfigError> for Tn3270Error {
    fn from(err: ConfigError) -> Self {
        Tn3270Error::Config(err)
    }
}

impl From<io::Error> for Tn3270Error {
    fn from(err: io::Error) -> Self {
        Tn3270Error::Network(NetworkError::ConnectionLost {
            reason: format!("IO Error: {err}"),
        })
    }
}

/// Result type alias for TN3270R operations
pub type Tn3270Result<T> = Result<T, Tn3270Error>;

/// Specialized result types for different components
pub type TelnetResult<T> = Result<T, TelnetError>;
pub type ProtocolResult<T> = Result<T, ProtocolError>;
pub type ConfigResult<T> = Result<T, ConfigError>;
