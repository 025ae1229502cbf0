//! Stream sender
//!
//! Pulls blocks from a frame source, paces them onto the wire and fans
//! each one out through the client registry. Subscribe messages are
//! drained from the control transport between packets.

use std::net::SocketAddr;

use crate::audio::{FrameSource, SourceBuffer};
use crate::error::Result;
use crate::protocol::{frames_per_packet, FrameParams};
use crate::registry::{ClientRegistry, ControlOutcome, FanoutReport};
use crate::timing::{Clock, FramePacer, MonotonicClock, Tick};

use super::Transport;

/// Largest control datagram we bother reading
const CONTROL_BUF_LEN: usize = 64;

/// Sender statistics
#[derive(Debug, Clone, Default)]
pub struct SenderStats {
    /// Blocks fanned out
    pub blocks: u64,
    /// Packets handed to the transport
    pub packets: u64,
    pub bytes: u64,
    pub send_failures: u64,
    /// Control datagrams applied to the registry
    pub control_received: u64,
    /// Control datagrams that failed validation or were refused
    pub control_dropped: u64,
}

/// Paced fan-out of one audio stream
pub struct StreamSender<T, C = MonotonicClock> {
    registry: ClientRegistry,
    pacer: FramePacer<C>,
    data: T,
    control: T,
    params: FrameParams,
    frames_per_block: usize,
    seqno: u32,
    block: Vec<u8>,
    stats: SenderStats,
}

impl<T: Transport> StreamSender<T, MonotonicClock> {
    pub fn new(registry: ClientRegistry, data: T, control: T, params: FrameParams) -> Self {
        Self::with_clock(registry, data, control, params, MonotonicClock::new())
    }
}

impl<T: Transport, C: Clock> StreamSender<T, C> {
    pub fn with_clock(
        mut registry: ClientRegistry,
        data: T,
        control: T,
        params: FrameParams,
        clock: C,
    ) -> Self {
        registry.set_source_channels(params.channels_per_frame as usize);
        let frames_per_block = block_frames(&registry, &params);
        tracing::info!(%params, frames_per_block, "stream sender ready");

        Self {
            pacer: FramePacer::new(frames_per_block, params.sample_rate, clock),
            registry,
            data,
            control,
            params,
            frames_per_block,
            seqno: 0,
            block: Vec::new(),
            stats: SenderStats::default(),
        }
    }

    pub fn registry(&self) -> &ClientRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ClientRegistry {
        &mut self.registry
    }

    pub fn pacer(&self) -> &FramePacer<C> {
        &self.pacer
    }

    pub fn params(&self) -> FrameParams {
        self.params
    }

    /// Frames per packet at the current format and routing
    pub fn frames_per_block(&self) -> usize {
        self.frames_per_block
    }

    /// Sequence number the next block will carry
    pub fn seqno(&self) -> u32 {
        self.seqno
    }

    pub fn now(&self) -> Tick {
        self.pacer.now()
    }

    /// Switch to a new source format.
    ///
    /// Routing plans are rebuilt for the new channel count and the packet
    /// interval follows the new block size and rate.
    pub fn set_params(&mut self, params: FrameParams) {
        if params == self.params {
            return;
        }
        tracing::info!(from = %self.params, to = %params, "source format changed");
        self.params = params;
        self.registry
            .set_source_channels(params.channels_per_frame as usize);
        self.frames_per_block = block_frames(&self.registry, &params);
        self.pacer.set_rate(self.frames_per_block, params.sample_rate);
    }

    /// Apply every control datagram that is ready; returns how many were applied
    pub fn poll_control(&mut self, now: Tick) -> usize {
        let mut buf = [0u8; CONTROL_BUF_LEN];
        let mut applied = 0;

        loop {
            let (len, from) = match self.control.try_recv_from(&mut buf) {
                Ok(Some(received)) => received,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "control receive failed");
                    break;
                }
            };

            match self.registry.handle_control_datagram(&buf[..len], from, now) {
                Ok(outcome) => {
                    self.stats.control_received += 1;
                    applied += 1;
                    log_outcome(outcome, from);
                }
                Err(e) => {
                    self.stats.control_dropped += 1;
                    tracing::debug!(%from, error = %e, "control datagram dropped");
                }
            }
        }

        if applied > 0 {
            self.refresh_block_size();
        }
        applied
    }

    /// Wait for the next packet slot, then fan out `frames` frames of `block`
    pub fn emit(&mut self, block: &[u8], frames: usize) -> FanoutReport {
        let channels = self.params.channels_per_frame as usize;
        let frames = frames.min(block.len() / self.params.bytes_per_frame().max(1));

        let now = self.pacer.next();
        let source = SourceBuffer::interleaved(block, channels);
        let data = &self.data;
        let report = self.registry.route_and_send(
            self.seqno,
            frames,
            &source,
            &self.params,
            now,
            |bytes, addr| data.send_to(bytes, addr).map(|_| ()),
        );

        self.seqno = self.seqno.wrapping_add(1);
        self.stats.blocks += 1;
        self.stats.packets += report.sent as u64;
        self.stats.bytes += report.bytes as u64;
        self.stats.send_failures += report.failures.len() as u64;
        report
    }

    /// Read one block from `source` and emit it.
    ///
    /// Returns `None` at end of stream.
    pub fn pump<S: FrameSource + ?Sized>(&mut self, source: &mut S) -> Result<Option<FanoutReport>> {
        self.set_params(source.params());

        let mut block = std::mem::take(&mut self.block);
        block.resize(self.frames_per_block * self.params.bytes_per_frame(), 0);

        let result = match source.read_frames(&mut block, self.frames_per_block) {
            Ok(0) => Ok(None),
            Ok(frames) => Ok(Some(self.emit(&block, frames))),
            Err(e) => Err(e.into()),
        };
        self.block = block;
        result
    }

    pub fn stats(&self) -> SenderStats {
        self.stats.clone()
    }

    /// Shrink the block when a new subscriber needs more channels than any before
    fn refresh_block_size(&mut self) {
        let frames = block_frames(&self.registry, &self.params);
        if frames != self.frames_per_block {
            tracing::debug!(from = self.frames_per_block, to = frames, "block size changed");
            self.frames_per_block = frames;
            self.pacer.set_rate(frames, self.params.sample_rate);
        }
    }
}

/// Frames that fit one packet for the widest destination
fn block_frames(registry: &ClientRegistry, params: &FrameParams) -> usize {
    let widest = registry
        .entries()
        .iter()
        .map(|e| e.output_channels())
        .chain(std::iter::once(params.channels_per_frame as usize))
        .max()
        .unwrap_or(1);
    frames_per_packet(&params.with_channels(widest as u8)).max(1)
}

fn log_outcome(outcome: ControlOutcome, from: SocketAddr) {
    match outcome {
        ControlOutcome::Refreshed => tracing::trace!(%from, "subscription refreshed"),
        ControlOutcome::Ignored => tracing::debug!(%from, "unsubscribe from unknown client"),
        _ => {}
    }
}
