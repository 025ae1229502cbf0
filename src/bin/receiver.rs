//! Audio Receiver Application
//!
//! Receives the fan-out stream (the multicast default stream, or a
//! subscribed unicast stream), routes it through a local channel map and
//! writes raw PCM to stdout or a file.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lan_audio_caster::{
    audio::{FrameSink, RawPcmSink},
    channel::ChannelSpec,
    config::AppConfig,
    constants::MAX_PACKET_SIZE,
    error::NetworkError,
    network::{
        create_multicast_receiver, create_unicast_socket, StreamReceiver, Subscription, Transport,
        UdpTransport,
    },
    protocol::ControlMessage,
    timing::{Clock, MonotonicClock},
};

#[derive(Parser, Debug)]
#[command(name = "receiver", about = "Receive and route a LAN audio stream")]
struct Args {
    /// Config file (default: config.toml in the platform config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output: `-` for stdout or a file path
    #[arg(short, long, default_value = "-")]
    output: String,

    /// Local channel map applied to the received stream
    #[arg(short, long, default_value = "auto")]
    map: String,

    /// Output channels (0 derives from the map)
    #[arg(long, default_value_t = 0)]
    outputs: usize,

    /// Subscribe to these source channels (bit n = channel n) instead of
    /// listening to the multicast group
    #[arg(long, value_parser = parse_mask)]
    mask: Option<u32>,

    /// Stable client id for the subscription (0 = identified by address)
    #[arg(long, default_value_t = 0)]
    client_id: u32,

    /// Sender host, required with --mask
    #[arg(long)]
    sender: Option<Ipv4Addr>,

    /// Local address for the subscribed stream
    #[arg(long, default_value = "0.0.0.0:0")]
    listen: SocketAddr,

    #[arg(long)]
    group: Option<Ipv4Addr>,

    #[arg(long)]
    data_port: Option<u16>,

    #[arg(long)]
    control_port: Option<u16>,

    /// Seconds between statistics reports
    #[arg(long, default_value_t = 10)]
    stats_interval: u64,
}

/// Decimal or 0x-prefixed hex
fn parse_mask(text: &str) -> std::result::Result<u32, String> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.map_err(|e| format!("invalid mask {}: {}", text, e))
}

fn open_output(output: &str) -> Result<Box<dyn Write>> {
    match output {
        "-" => Ok(Box::new(std::io::stdout().lock())),
        path => {
            let file = File::create(path).with_context(|| format!("creating output {}", path))?;
            Ok(Box::new(BufWriter::new(file)))
        }
    }
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let mut config = AppConfig::load(args.config.as_deref()).context("loading config")?;
    if let Some(group) = args.group {
        config.network.multicast_addr = group;
    }
    if let Some(port) = args.data_port {
        config.network.data_port = port;
    }
    if let Some(port) = args.control_port {
        config.network.control_port = port;
    }
    config.validate().context("invalid configuration")?;

    let spec = ChannelSpec::parse(&args.map).context("parsing channel map")?;

    let (socket, mut subscription): (UdpTransport, Option<Subscription>) = match args.mask {
        Some(mask) => {
            let Some(host) = args.sender else {
                bail!("--mask needs --sender");
            };
            let socket = create_unicast_socket(args.listen, config.network.socket_buffer_size)
                .context("opening data socket")?;
            let target = SocketAddr::from((host, config.network.control_port));
            let message = ControlMessage::new(args.client_id, mask);
            let interval_us = config.registry.resubscribe_ms * 1000;
            (socket.into(), Some(Subscription::new(message, target, interval_us)))
        }
        None => {
            let socket =
                create_multicast_receiver(&config.network).context("joining multicast group")?;
            (socket.into(), None)
        }
    };

    tracing::info!(
        map = %args.map,
        subscribed = subscription.is_some(),
        "Starting LAN Audio Receiver"
    );

    let mut sink = RawPcmSink::new(open_output(&args.output)?);
    let mut receiver = StreamReceiver::new(spec, args.outputs);
    let clock = MonotonicClock::new();
    let idle_timeout = Duration::from_millis(config.registry.resubscribe_ms);
    let stats_interval_us = args.stats_interval.max(1) * 1_000_000;
    let mut last_report = clock.now();
    let mut buf = vec![0u8; MAX_PACKET_SIZE * 2];

    let result = loop {
        let now = clock.now();
        if let Some(sub) = subscription.as_mut() {
            if let Err(e) = sub.poll(now, &socket) {
                tracing::warn!(error = %e, "subscribe failed");
            }
        }

        let timeout = receiver
            .packet_period_us()
            .map(Duration::from_micros)
            .unwrap_or(idle_timeout)
            .max(Duration::from_millis(1));

        let written = match socket.recv_timeout(&mut buf, timeout) {
            Ok(Some((len, from))) => match receiver.handle_datagram(&buf[..len]) {
                Some(block) => sink.write_frames(&block.params, block.data, block.frames),
                None => {
                    tracing::trace!(%from, "datagram not played");
                    Ok(())
                }
            },
            Ok(None) => match receiver.silence() {
                Some(block) => sink.write_frames(&block.params, block.data, block.frames),
                None => Ok(()),
            },
            Err(e) => break Err(anyhow::Error::new(NetworkError::ReceiveFailed(e))),
        };
        if let Err(e) = written {
            break Err(anyhow::Error::new(e).context("writing output"));
        }

        if now.micros_since(last_report) >= stats_interval_us {
            last_report = now;
            let stats = receiver.stats();
            tracing::info!(
                packets = stats.packets,
                bytes = stats.bytes,
                invalid = stats.invalid,
                lost = stats.lost,
                reordered = stats.reordered,
                format_changes = stats.format_changes,
                silence = stats.silence_blocks,
                frames_written = sink.frames_written(),
                "receiver stats"
            );
        }
    };

    if let Some(sub) = &subscription {
        if let Err(e) = sub.unsubscribe(&socket) {
            tracing::warn!(error = %e, "unsubscribe failed");
        }
    }
    result
}
