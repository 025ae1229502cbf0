//! # LAN Audio Caster
//!
//! Real-time multi-channel audio fan-out over LAN, with per-client channel
//! selection and mixing and a lightweight subscribe protocol.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────────┐
//! │                                SENDER                                    │
//! │  ┌──────────────┐     ┌───────────────────┐     ┌────────────────────┐   │
//! │  │ FrameSource  │────▶│ FramePacer        │────▶│ ClientRegistry     │   │
//! │  │ (audio::io)  │     │ (timing)          │     │ (registry)         │   │
//! │  └──────────────┘     │ absolute schedule │     │ ┌────────────────┐ │   │
//! │                       │ sleep, then spin  │     │ │ default entry  │ │   │
//! │                       └───────────────────┘     │ │ client 1..8    │ │   │
//! │                                                 │ └───────┬────────┘ │   │
//! │  ┌──────────────┐   ControlMessage              │         ▼          │   │
//! │  │ control port │──────────────────────────────▶│ RoutingPlan/client │   │
//! │  └──────────────┘   (protocol::control)         │ audio::dispatch    │   │
//! │                                                 └─────────┬──────────┘   │
//! │                                                           │              │
//! │                     DataPacketHeader + samples (protocol::packet)        │
//! └───────────────────────────────────────────────────────────┼──────────────┘
//!                                                             │ UDP over LAN
//!                                                             ▼
//! ┌──────────────────────────────────────────────────────────────────────────┐
//! │                               RECEIVER                                   │
//! │  ┌──────────────┐     ┌───────────────────┐     ┌────────────────────┐   │
//! │  │ data socket  │────▶│ decode + validate │────▶│ RoutingPlan        │   │
//! │  │ (network)    │     │ (protocol)        │     │ (channel, dispatch)│   │
//! │  └──────────────┘     └───────────────────┘     └─────────┬──────────┘   │
//! │  ┌──────────────┐                                         ▼              │
//! │  │ Subscription │── resubscribe ──▶ sender      ┌────────────────────┐   │
//! │  └──────────────┘                               │ FrameSink          │   │
//! │                                                 └────────────────────┘   │
//! └──────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod audio;
pub mod channel;
pub mod config;
pub mod error;
pub mod network;
pub mod protocol;
pub mod registry;
pub mod timing;

pub use error::{Error, Result};

/// Application-wide constants
pub mod constants {
    /// Default sample rate for audio processing
    pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

    /// Default channel count (stereo)
    pub const DEFAULT_CHANNELS: u8 = 2;

    /// Maximum channels per frame
    pub const MAX_CHANNELS: usize = 16;

    /// Maximum ops in one channel map
    pub const MAX_CHANNEL_OPS: usize = 16;

    /// Largest plan reducible to a permutation table
    pub const MAX_PERMUTE_CHANNELS: usize = 8;

    /// Registry slots, default entry included
    pub const MAX_CLIENTS: usize = 9;

    /// Default UDP port for audio data
    pub const DEFAULT_DATA_PORT: u16 = 22402;

    /// Default UDP port for subscribe messages
    pub const DEFAULT_CONTROL_PORT: u16 = 22403;

    /// Default multicast group
    pub const DEFAULT_MULTICAST_ADDR: &str = "224.0.0.223";

    /// Client subscription lifetime in microseconds
    pub const CLIENT_TIMEOUT_US: u64 = 5_000_000;

    /// Default receiver resubscribe interval in milliseconds
    pub const DEFAULT_RESUBSCRIBE_MS: u64 = 1000;

    /// Below this many microseconds the pacer spins instead of sleeping
    pub const SPIN_THRESHOLD_US: u64 = 1000;

    /// Maximum packet size for UDP
    pub const MAX_PACKET_SIZE: usize = 1472; // MTU - IP/UDP headers
}
