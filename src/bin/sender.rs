//! Audio Sender Application
//!
//! Reads raw PCM (or a test tone) and fans it out over UDP: the default
//! stream to the multicast group, plus one routed stream per subscriber.

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::BufReader;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lan_audio_caster::{
    audio::{FrameSource, RawPcmSource, ToneSource},
    config::AppConfig,
    network::{create_control_listener, create_sender_socket, StreamSender, UdpTransport},
    protocol::{FrameParams, SampleFormat},
    registry::ClientRegistry,
};

#[derive(Parser, Debug)]
#[command(name = "sender", about = "Fan out multi-channel PCM over the LAN")]
struct Args {
    /// Config file (default: config.toml in the platform config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Input: `-` for stdin, `tone` for a test tone, or a raw PCM file
    #[arg(short, long, default_value = "tone")]
    input: String,

    /// Channels per input frame
    #[arg(long)]
    channels: Option<u8>,

    #[arg(long)]
    rate: Option<u32>,

    /// Input sample format (s16le, s32le, u8, ...)
    #[arg(long)]
    format: Option<SampleFormat>,

    /// Channel map of the default stream
    #[arg(short, long)]
    map: Option<String>,

    /// Output channels of the default stream (0 derives from the map)
    #[arg(long)]
    outputs: Option<usize>,

    /// Multicast group of the default stream
    #[arg(long)]
    group: Option<Ipv4Addr>,

    /// Send the default stream to this address instead of the group
    #[arg(long)]
    unicast: Option<SocketAddr>,

    #[arg(long)]
    data_port: Option<u16>,

    #[arg(long)]
    control_port: Option<u16>,

    /// Seconds between statistics reports
    #[arg(long, default_value_t = 10)]
    stats_interval: u64,
}

impl Args {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(channels) = self.channels {
            config.stream.source_channels = channels;
        }
        if let Some(rate) = self.rate {
            config.stream.sample_rate = rate;
        }
        if let Some(format) = self.format {
            config.stream.format = format;
        }
        if let Some(map) = &self.map {
            config.stream.channel_map = map.clone();
        }
        if let Some(outputs) = self.outputs {
            config.stream.output_channels = outputs;
        }
        if let Some(group) = self.group {
            config.network.multicast_addr = group;
        }
        if self.unicast.is_some() {
            config.network.unicast_target = self.unicast;
        }
        if let Some(port) = self.data_port {
            config.network.data_port = port;
        }
        if let Some(port) = self.control_port {
            config.network.control_port = port;
        }
    }
}

fn open_input(input: &str, params: FrameParams) -> Result<Box<dyn FrameSource>> {
    match input {
        "tone" => {
            if params.format != SampleFormat::S16Le {
                tracing::warn!(format = %params.format, "test tone is always s16le");
            }
            Ok(Box::new(ToneSource::new(
                params.channels_per_frame,
                params.sample_rate,
                220.0,
            )))
        }
        "-" => Ok(Box::new(RawPcmSource::new(std::io::stdin(), params))),
        path => {
            let file = File::open(path).with_context(|| format!("opening input {}", path))?;
            Ok(Box::new(RawPcmSource::new(BufReader::new(file), params)))
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
    args.apply(&mut config);
    config.validate().context("invalid configuration")?;

    let default_spec = config.stream.channel_spec().context("parsing channel map")?;
    let mut source = open_input(&args.input, config.stream.frame_params())?;
    let params = source.params();

    tracing::info!(
        input = %args.input,
        %params,
        map = %config.stream.channel_map,
        "Starting LAN Audio Sender"
    );

    let data = create_sender_socket(&config.network).context("opening data socket")?;
    let control = create_control_listener(&config.network).context("opening control socket")?;
    let (data, control) = (UdpTransport::new(data), UdpTransport::new(control));

    let registry = ClientRegistry::new(
        config.registry.capacity,
        config.registry.client_timeout_us(),
        params.channels_per_frame as usize,
    )
    .with_default_spec(
        config.network.default_destination(),
        default_spec,
        config.stream.output_channels,
    )
    .context("compiling channel map")?;

    let mut sender = StreamSender::new(registry, data, control, params);
    let stats_interval_us = args.stats_interval.max(1) * 1_000_000;
    let mut last_report = sender.now();

    loop {
        let now = sender.now();
        sender.poll_control(now);

        let Some(report) = sender.pump(source.as_mut())? else {
            tracing::info!("end of input");
            break;
        };
        for failure in &report.failures {
            tracing::debug!(error = %failure, "fan-out failure");
        }

        if now.micros_since(last_report) >= stats_interval_us {
            last_report = now;
            let evicted = sender.registry_mut().evict_expired(now);
            let stats = sender.stats();
            let pacer = sender.pacer().stats();
            tracing::info!(
                blocks = stats.blocks,
                packets = stats.packets,
                bytes = stats.bytes,
                send_failures = stats.send_failures,
                control = stats.control_received,
                control_dropped = stats.control_dropped,
                clients = sender.registry().list_active(now).count(),
                evicted,
                late = pacer.late,
                max_late_us = pacer.max_late_us,
                "sender stats"
            );
        }
    }

    let stats = sender.stats();
    tracing::info!(blocks = stats.blocks, packets = stats.packets, bytes = stats.bytes, "sender stopped");
    Ok(())
}
