//! Stream receiver
//!
//! Validates data datagrams, follows format changes, routes each payload
//! through the local channel map and keeps the subscription alive.

use std::net::SocketAddr;

use crate::audio::{apply, fill_silence, DestBuffer, SourceBuffer};
use crate::channel::{ChannelSpec, RoutingPlan};
use crate::error::NetworkError;
use crate::protocol::{decode_data_packet, frames_per_packet, ControlMessage, FrameParams};
use crate::timing::Tick;

use super::Transport;

/// Receiver statistics
#[derive(Debug, Clone, Default)]
pub struct ReceiverStats {
    /// Valid data packets
    pub packets: u64,
    /// Payload bytes of valid packets
    pub bytes: u64,
    /// Datagrams that failed validation
    pub invalid: u64,
    /// Packets missing from the sequence
    pub lost: u64,
    /// Packets older than one already seen
    pub reordered: u64,
    pub format_changes: u64,
    /// Packets dropped because the channel map does not fit the stream
    pub unroutable: u64,
    /// Blocks of silence produced on timeout
    pub silence_blocks: u64,
}

/// One routed block, borrowed from the receiver's output buffer
#[derive(Debug)]
pub struct RoutedBlock<'a> {
    pub seqno: u32,
    /// Format of `data`, channel count as routed
    pub params: FrameParams,
    pub frames: usize,
    pub data: &'a [u8],
}

/// Receive side of one stream
pub struct StreamReceiver {
    spec: ChannelSpec,
    requested_outputs: usize,
    params: FrameParams,
    plan: Option<RoutingPlan>,
    next_seqno: Option<u32>,
    last_frames: usize,
    output: Vec<u8>,
    stats: ReceiverStats,
}

impl StreamReceiver {
    /// Receiver routing through `spec`; the plan is compiled once the
    /// stream's channel count is known
    pub fn new(spec: ChannelSpec, requested_outputs: usize) -> Self {
        Self {
            spec,
            requested_outputs,
            params: FrameParams::cleared(),
            plan: None,
            next_seqno: None,
            last_frames: 0,
            output: Vec::new(),
            stats: ReceiverStats::default(),
        }
    }

    /// Format of the incoming stream, cleared until the first packet
    pub fn params(&self) -> FrameParams {
        self.params
    }

    pub fn plan(&self) -> Option<&RoutingPlan> {
        self.plan.as_ref()
    }

    /// Format of routed blocks
    pub fn output_params(&self) -> Option<FrameParams> {
        let plan = self.plan.as_ref()?;
        Some(self.params.with_channels(plan.output_channels() as u8))
    }

    /// Expected time between packets, once the stream format is known
    pub fn packet_period_us(&self) -> Option<u64> {
        let frames = match self.last_frames {
            0 => frames_per_packet(&self.params),
            n => n,
        };
        if frames == 0 || self.params.sample_rate == 0 {
            return None;
        }
        Some(self.params.frames_to_micros(frames))
    }

    /// Validate and route one data datagram.
    ///
    /// Returns `None` when the datagram is dropped.
    pub fn handle_datagram(&mut self, bytes: &[u8]) -> Option<RoutedBlock<'_>> {
        let packet = match decode_data_packet(bytes) {
            Ok(packet) => packet,
            Err(e) => {
                self.stats.invalid += 1;
                tracing::debug!(error = %e, len = bytes.len(), "dropping data datagram");
                return None;
            }
        };
        let header = packet.header;

        if header.params != self.params {
            self.switch_format(header.params);
        }
        self.track_sequence(header.seqno);

        self.stats.packets += 1;
        self.stats.bytes += packet.payload.len() as u64;

        let Some(plan) = self.plan.as_ref() else {
            self.stats.unroutable += 1;
            return None;
        };
        let Some(width) = self.params.sample_width() else {
            self.stats.unroutable += 1;
            return None;
        };

        let frames = header.num_frames as usize;
        let outputs = plan.output_channels();
        let out_params = self.params.with_channels(outputs as u8);
        let len = frames * out_params.bytes_per_frame();

        self.output.clear();
        self.output.resize(len, 0);
        apply(
            plan,
            &SourceBuffer::interleaved(packet.payload, self.params.channels_per_frame as usize),
            &mut DestBuffer::interleaved(&mut self.output, outputs),
            width,
            frames,
        );
        self.last_frames = frames;

        Some(RoutedBlock {
            seqno: header.seqno,
            params: out_params,
            frames,
            data: &self.output,
        })
    }

    /// One packet period of silence in the routed format.
    ///
    /// `None` until a stream format is known.
    pub fn silence(&mut self) -> Option<RoutedBlock<'_>> {
        let out_params = self.output_params()?;
        let frames = match self.last_frames {
            0 => frames_per_packet(&self.params),
            n => n,
        };

        self.output.clear();
        self.output.resize(frames * out_params.bytes_per_frame(), 0);
        fill_silence(&out_params, &mut self.output);
        self.stats.silence_blocks += 1;

        Some(RoutedBlock {
            seqno: self.next_seqno.unwrap_or(0),
            params: out_params,
            frames,
            data: &self.output,
        })
    }

    pub fn stats(&self) -> ReceiverStats {
        self.stats.clone()
    }

    fn switch_format(&mut self, params: FrameParams) {
        self.stats.format_changes += 1;
        self.params = params;
        self.last_frames = 0;

        match self
            .spec
            .compile(params.channels_per_frame as usize, self.requested_outputs)
        {
            Ok(plan) => {
                tracing::info!(%params, plan = %plan, kind = ?plan.kind(), "stream format");
                self.plan = Some(plan);
            }
            Err(e) => {
                tracing::warn!(%params, error = %e, "channel map does not fit stream");
                self.plan = None;
            }
        }
    }

    fn track_sequence(&mut self, seqno: u32) {
        if let Some(expected) = self.next_seqno {
            let gap = seqno.wrapping_sub(expected);
            if gap >= u32::MAX / 2 {
                self.stats.reordered += 1;
                return;
            }
            if gap > 0 {
                self.stats.lost += gap as u64;
                tracing::debug!(expected, got = seqno, "packets lost");
            }
        }
        self.next_seqno = Some(seqno.wrapping_add(1));
    }
}

/// Periodic subscribe message to a sender's control port
#[derive(Debug, Clone)]
pub struct Subscription {
    message: ControlMessage,
    target: SocketAddr,
    interval_us: u64,
    last_sent: Option<Tick>,
}

impl Subscription {
    pub fn new(message: ControlMessage, target: SocketAddr, interval_us: u64) -> Self {
        Self {
            message,
            target,
            interval_us,
            last_sent: None,
        }
    }

    pub fn message(&self) -> &ControlMessage {
        &self.message
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    pub fn is_due(&self, now: Tick) -> bool {
        self.last_sent
            .map_or(true, |last| now.micros_since(last) >= self.interval_us)
    }

    /// Send the subscribe message if the interval has passed; returns whether it was sent
    pub fn poll<T: Transport + ?Sized>(&mut self, now: Tick, transport: &T) -> Result<bool, NetworkError> {
        if !self.is_due(now) {
            return Ok(false);
        }
        // a failed attempt still waits a full interval before retrying
        self.last_sent = Some(now);
        self.send(&self.message, transport)?;
        tracing::trace!(sender = %self.target, mask = self.message.channel_mask, "subscribed");
        Ok(true)
    }

    /// Tell the sender to stop sending to us
    pub fn unsubscribe<T: Transport + ?Sized>(&self, transport: &T) -> Result<(), NetworkError> {
        let message = ControlMessage {
            channel_mask: 0,
            ..self.message
        };
        self.send(&message, transport)?;
        tracing::info!(sender = %self.target, "unsubscribed");
        Ok(())
    }

    fn send<T: Transport + ?Sized>(&self, message: &ControlMessage, transport: &T) -> Result<(), NetworkError> {
        transport
            .send_to(&message.encode(), self.target)
            .map(|_| ())
            .map_err(|source| NetworkError::SendFailed {
                addr: self.target,
                source,
            })
    }
}
