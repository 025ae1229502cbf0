//! Configuration management (`config.toml` in the platform config directory)

use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use crate::channel::{ChannelSpec, RoutingPlan};
use crate::constants::*;
use crate::error::{Error, Result};
use crate::protocol::{FrameParams, SampleFormat};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
}

/// Addressing and socket options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Group the default stream is sent to
    pub multicast_addr: Ipv4Addr,
    /// Local interface for multicast; unspecified lets the OS choose
    pub interface: Ipv4Addr,
    pub data_port: u16,
    pub control_port: u16,
    pub multicast_ttl: u32,
    pub multicast_loop: bool,
    /// Kernel socket buffer size in bytes
    pub socket_buffer_size: usize,
    /// Send the default stream here instead of the multicast group
    pub unicast_target: Option<SocketAddr>,
}

/// Audio format and default channel routing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Channel map of the default stream (`auto`, `10`, `+01,z`, ...)
    pub channel_map: String,
    /// Output channels of the default stream, 0 derives it from the map
    pub output_channels: usize,
    pub sample_rate: u32,
    pub format: SampleFormat,
    /// Channels per frame delivered by the source
    pub source_channels: u8,
}

/// Subscriber bookkeeping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub client_timeout_ms: u64,
    /// Slots including the default destination
    pub capacity: usize,
    /// How often a receiver renews its subscription
    pub resubscribe_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            multicast_addr: DEFAULT_MULTICAST_ADDR
                .parse()
                .unwrap_or(Ipv4Addr::new(224, 0, 0, 223)),
            interface: Ipv4Addr::UNSPECIFIED,
            data_port: DEFAULT_DATA_PORT,
            control_port: DEFAULT_CONTROL_PORT,
            multicast_ttl: 1,
            multicast_loop: true,
            socket_buffer_size: 256 * 1024,
            unicast_target: None,
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            channel_map: "auto".to_string(),
            output_channels: 0,
            sample_rate: DEFAULT_SAMPLE_RATE,
            format: SampleFormat::S16Le,
            source_channels: DEFAULT_CHANNELS,
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            client_timeout_ms: CLIENT_TIMEOUT_US / 1000,
            capacity: MAX_CLIENTS,
            resubscribe_ms: DEFAULT_RESUBSCRIBE_MS,
        }
    }
}

impl NetworkConfig {
    /// Where the default stream goes
    pub fn default_destination(&self) -> SocketAddr {
        self.unicast_target
            .unwrap_or_else(|| SocketAddr::from((self.multicast_addr, self.data_port)))
    }
}

impl StreamConfig {
    /// Parameters of the frames the source produces
    pub fn frame_params(&self) -> FrameParams {
        FrameParams::new(self.format, self.source_channels, self.sample_rate)
    }

    /// The default stream's channel map, syntax-checked
    pub fn channel_spec(&self) -> Result<ChannelSpec> {
        Ok(ChannelSpec::parse(&self.channel_map)?)
    }

    /// Compile the default stream's channel map against the source
    pub fn compile_channel_map(&self) -> Result<RoutingPlan> {
        Ok(self
            .channel_spec()?
            .compile(self.source_channels as usize, self.output_channels)?)
    }
}

impl RegistryConfig {
    pub fn client_timeout_us(&self) -> u64 {
        self.client_timeout_ms * 1000
    }
}

impl AppConfig {
    /// Load from `path`, or from the platform config file when `None`.
    ///
    /// A missing platform file yields the defaults; a missing explicit file
    /// is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match config_dir().map(|dir| dir.join("config.toml")) {
                Some(path) if path.exists() => path,
                _ => {
                    tracing::debug!("no config file, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let content = std::fs::read_to_string(&path)?;
        let config = Self::from_toml(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        tracing::info!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        let net = &self.network;
        if net.unicast_target.is_none() && !net.multicast_addr.is_multicast() {
            return Err(Error::Config(format!(
                "{} is not a multicast address",
                net.multicast_addr
            )));
        }
        if net.data_port == 0 || net.control_port == 0 {
            return Err(Error::Config("ports must be non-zero".into()));
        }
        if net.data_port == net.control_port {
            return Err(Error::Config("data and control ports must differ".into()));
        }

        let stream = &self.stream;
        if stream.sample_rate == 0 {
            return Err(Error::Config("sample rate must be non-zero".into()));
        }
        if stream.source_channels == 0 || stream.source_channels as usize > MAX_CHANNELS {
            return Err(Error::Config(format!(
                "source channels must be 1..={}, got {}",
                MAX_CHANNELS, stream.source_channels
            )));
        }
        if stream.frame_params().sample_width().is_none() {
            return Err(Error::Config(format!(
                "format {} has no 8, 16 or 32-bit routing",
                stream.format
            )));
        }
        stream.compile_channel_map()?;

        let registry = &self.registry;
        if registry.capacity == 0 || registry.capacity > MAX_CLIENTS {
            return Err(Error::Config(format!(
                "registry capacity must be 1..={}, got {}",
                MAX_CLIENTS, registry.capacity
            )));
        }
        if registry.client_timeout_ms == 0 {
            return Err(Error::Config("client timeout must be non-zero".into()));
        }
        if registry.resubscribe_ms == 0 || registry.resubscribe_ms >= registry.client_timeout_ms {
            return Err(Error::Config(
                "resubscribe interval must be non-zero and shorter than the client timeout".into(),
            ));
        }

        Ok(())
    }
}

pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("net", "lan-audio", "lan-audio-caster")
        .map(|dirs| dirs.config_dir().to_path_buf())
}
