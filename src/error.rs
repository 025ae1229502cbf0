//! Error types for the audio fan-out core

use std::net::SocketAddr;
use thiserror::Error;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum Error {
    #[error("Wire format error: {0}")]
    Wire(#[from] WireError),

    #[error("Channel map error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Malformed, corrupt or foreign datagrams.
///
/// Always recoverable: the datagram is dropped and no state changes.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireError {
    #[error("Datagram too short: {actual} bytes, need {needed}")]
    TooShort { needed: usize, actual: usize },

    #[error("Bad magic: {0:#010x}")]
    BadMagic(u32),

    #[error("Checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    Checksum { expected: u32, actual: u32 },

    #[error("Invalid frame parameters: {0}")]
    InvalidParams(&'static str),
}

/// Channel map compilation errors, raised at configuration time only
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    #[error("Syntax error in channel map {spec:?} at offset {offset}")]
    Syntax { spec: String, offset: usize },

    #[error("Constant out of range in channel map {spec:?} at offset {offset}")]
    ConstantOverflow { spec: String, offset: usize },

    #[error("Source channel {index} out of range for {channels} source channels")]
    SourceOutOfRange { index: u8, channels: usize },

    #[error("Channel map needs at least one source channel")]
    NoSourceChannels,

    #[error("Output channel count {0} exceeds the maximum")]
    TooManyOutputs(usize),
}

/// Client registry errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Client capacity reached ({0} slots)")]
    CapacityExceeded(usize),
}

/// Network errors
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Socket setup failed: {0}")]
    SocketSetup(String),

    #[error("Send to {addr} failed: {source}")]
    SendFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Receive failed: {0}")]
    ReceiveFailed(std::io::Error),

    #[error("Packet too large: {0} bytes")]
    PacketTooLarge(usize),

    #[error("Plan for {addr} reads {needs} source channels, block has {have}")]
    ChannelMismatch {
        addr: SocketAddr,
        needs: usize,
        have: usize,
    },
}

/// Frame source / sink errors
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Source read failed: {0}")]
    ReadFailed(std::io::Error),

    #[error("Sink write failed: {0}")]
    WriteFailed(std::io::Error),
}

/// Result type alias for the crate
pub type Result<T> = std::result::Result<T, Error>;
