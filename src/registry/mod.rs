//! Client registry
//!
//! Tracks the fan-out destinations: one default entry for the group
//! address, configured from the start-up channel map, plus up to
//! `capacity - 1` subscribers created by control messages. Each
//! subscriber carries the routing plan derived from its channel mask and
//! an expiry time that every control message pushes forward.
//!
//! Expired subscribers receive nothing. Their slots are reclaimed when a
//! new subscriber needs room, or explicitly by [`ClientRegistry::evict_expired`].

pub mod entry;

pub use entry::{ClientEntry, ClientIdentity};

use bytes::BytesMut;
use std::io;
use std::net::SocketAddr;

use crate::audio::{apply, DestBuffer, SourceBuffer};
use crate::channel::{ChannelSpec, RoutingPlan};
use crate::constants::{CLIENT_TIMEOUT_US, MAX_CLIENTS, MAX_PACKET_SIZE};
use crate::error::{ChannelError, NetworkError, RegistryError};
use crate::protocol::{ControlMessage, DataPacketHeader, FrameParams, DATA_HEADER_LEN};
use crate::timing::Tick;

/// What a control message did to the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlOutcome {
    /// New subscriber added
    Created,
    /// Known subscriber, same mask, expiry extended
    Refreshed,
    /// Known subscriber with a new mask, plan rebuilt
    Remapped,
    /// Empty mask, subscriber removed
    Unsubscribed,
    /// Empty mask from an unknown client
    Ignored,
}

/// Result of one fan-out pass
#[derive(Debug, Default)]
pub struct FanoutReport {
    /// Packets handed to the transport
    pub sent: usize,
    /// Bytes handed to the transport
    pub bytes: usize,
    /// Per-destination failures; the pass continues past each
    pub failures: Vec<NetworkError>,
}

impl FanoutReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Registry statistics
#[derive(Debug, Clone, Default)]
pub struct RegistryStats {
    pub created: u64,
    pub refreshed: u64,
    pub remapped: u64,
    pub unsubscribed: u64,
    pub evicted: u64,
    /// Subscriptions refused for lack of capacity
    pub rejected: u64,
}

/// Capacity-bounded set of fan-out destinations
pub struct ClientRegistry {
    entries: Vec<ClientEntry>,
    capacity: usize,
    timeout_us: u64,
    source_channels: usize,
    /// Channel map and requested outputs the default plan is compiled from
    default_spec: Option<(ChannelSpec, usize)>,
    /// Reused per-destination packet buffer
    packet: BytesMut,
    stats: RegistryStats,
}

impl ClientRegistry {
    /// Empty registry.
    ///
    /// `capacity` counts every slot including the default entry and is
    /// clamped to `1..=MAX_CLIENTS`.
    pub fn new(capacity: usize, timeout_us: u64, source_channels: usize) -> Self {
        let capacity = capacity.clamp(1, MAX_CLIENTS);
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
            timeout_us,
            source_channels,
            default_spec: None,
            packet: BytesMut::with_capacity(MAX_PACKET_SIZE),
            stats: RegistryStats::default(),
        }
    }

    /// Registry with the default timeout and full capacity
    pub fn with_defaults(source_channels: usize) -> Self {
        Self::new(MAX_CLIENTS, CLIENT_TIMEOUT_US, source_channels)
    }

    /// Install or replace the default entry with a fixed plan.
    ///
    /// The plan is kept as is across source channel changes.
    pub fn set_default(&mut self, address: SocketAddr, plan: RoutingPlan) {
        self.default_spec = None;
        self.install_default(address, plan);
    }

    pub fn with_default(mut self, address: SocketAddr, plan: RoutingPlan) -> Self {
        self.set_default(address, plan);
        self
    }

    /// Install or replace the default entry from a channel map.
    ///
    /// The map is compiled against the current source channel count and
    /// compiled again whenever that count changes.
    pub fn set_default_spec(
        &mut self,
        address: SocketAddr,
        spec: ChannelSpec,
        requested_outputs: usize,
    ) -> Result<(), ChannelError> {
        let plan = spec.compile(self.source_channels, requested_outputs)?;
        self.install_default(address, plan);
        self.default_spec = Some((spec, requested_outputs));
        Ok(())
    }

    pub fn with_default_spec(
        mut self,
        address: SocketAddr,
        spec: ChannelSpec,
        requested_outputs: usize,
    ) -> Result<Self, ChannelError> {
        self.set_default_spec(address, spec, requested_outputs)?;
        Ok(self)
    }

    fn install_default(&mut self, address: SocketAddr, plan: RoutingPlan) {
        tracing::info!(%address, plan = %plan, outputs = plan.output_channels(), "default destination");
        let entry = ClientEntry::default_entry(address, plan);
        match self.entries.iter_mut().find(|e| e.is_default()) {
            Some(existing) => *existing = entry,
            None => {
                if self.entries.len() == self.capacity {
                    // make room by dropping the oldest subscriber
                    if let Some(pos) = self.entries.iter().position(|e| !e.is_default()) {
                        let dropped = self.entries.remove(pos);
                        tracing::warn!(client = %dropped.identity, "dropped subscriber for default entry");
                    }
                }
                self.entries.insert(0, entry);
            }
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn timeout_us(&self) -> u64 {
        self.timeout_us
    }

    pub fn source_channels(&self) -> usize {
        self.source_channels
    }

    /// Every tracked entry, expired ones included
    pub fn entries(&self) -> &[ClientEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries that currently receive packets: the default entry and every
    /// unexpired subscriber
    pub fn list_active(&self, now: Tick) -> impl Iterator<Item = &ClientEntry> + '_ {
        self.entries.iter().filter(move |e| !e.is_expired(now))
    }

    /// Apply a validated control message from `from`
    pub fn handle_control(
        &mut self,
        msg: &ControlMessage,
        from: SocketAddr,
        now: Tick,
    ) -> Result<ControlOutcome, RegistryError> {
        let identity = match msg.client_id {
            Some(id) => ClientIdentity::Id(id),
            None => ClientIdentity::Address(from),
        };
        let expires_at = now + self.timeout_us;
        let found = self.entries.iter().position(|e| e.identity == identity);

        if msg.channel_mask == 0 {
            return Ok(match found {
                Some(pos) => {
                    self.entries.remove(pos);
                    self.stats.unsubscribed += 1;
                    tracing::info!(client = %identity, "client unsubscribed");
                    ControlOutcome::Unsubscribed
                }
                None => ControlOutcome::Ignored,
            });
        }

        if let Some(pos) = found {
            let entry = &mut self.entries[pos];
            entry.expires_at = Some(expires_at);
            if entry.address != from {
                tracing::info!(client = %identity, old = %entry.address, new = %from, "client moved");
                entry.address = from;
            }
            if entry.mask == msg.channel_mask {
                self.stats.refreshed += 1;
                return Ok(ControlOutcome::Refreshed);
            }

            entry.mask = msg.channel_mask;
            entry.plan = RoutingPlan::from_mask(msg.channel_mask, self.source_channels);
            self.stats.remapped += 1;
            tracing::info!(
                client = %identity,
                mask = msg.channel_mask,
                plan = %entry.plan,
                "client remapped"
            );
            return Ok(ControlOutcome::Remapped);
        }

        let entry = ClientEntry::subscriber(
            identity,
            from,
            msg.channel_mask,
            self.source_channels,
            expires_at,
        );
        let outputs = entry.output_channels();

        if self.entries.len() < self.capacity {
            self.entries.push(entry);
        } else if let Some(pos) = self.entries.iter().position(|e| e.is_expired(now)) {
            let stale = std::mem::replace(&mut self.entries[pos], entry);
            self.stats.evicted += 1;
            tracing::info!(client = %stale.identity, "reclaimed expired slot");
        } else {
            self.stats.rejected += 1;
            tracing::warn!(client = %identity, capacity = self.capacity, "client table full");
            return Err(RegistryError::CapacityExceeded(self.capacity));
        }

        self.stats.created += 1;
        tracing::info!(
            client = %identity,
            address = %from,
            mask = msg.channel_mask,
            outputs,
            "client subscribed"
        );
        Ok(ControlOutcome::Created)
    }

    /// Decode a raw control datagram and apply it.
    ///
    /// Datagrams that fail validation change nothing.
    pub fn handle_control_datagram(
        &mut self,
        bytes: &[u8],
        from: SocketAddr,
        now: Tick,
    ) -> crate::Result<ControlOutcome> {
        let msg = ControlMessage::decode(bytes).map_err(|e| {
            tracing::debug!(%from, error = %e, "dropping control datagram");
            e
        })?;
        Ok(self.handle_control(&msg, from, now)?)
    }

    /// Remove expired subscribers; returns how many were removed
    pub fn evict_expired(&mut self, now: Tick) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| {
            let expired = e.is_expired(now);
            if expired {
                tracing::info!(client = %e.identity, "client expired");
            }
            !expired
        });
        let removed = before - self.entries.len();
        self.stats.evicted += removed as u64;
        removed
    }

    /// Rebuild plans for a new source channel count.
    ///
    /// Subscriber plans follow their masks. A default entry installed from a
    /// channel map is compiled again; one that no longer compiles keeps its
    /// old plan and is reported by [`route_and_send`](Self::route_and_send)
    /// until the count changes back.
    pub fn set_source_channels(&mut self, source_channels: usize) {
        if source_channels == self.source_channels {
            return;
        }
        tracing::info!(from = self.source_channels, to = source_channels, "source channel count changed");
        self.source_channels = source_channels;
        for entry in self.entries.iter_mut() {
            if !entry.is_default() {
                entry.plan = RoutingPlan::from_mask(entry.mask, source_channels);
                continue;
            }
            let Some((spec, requested)) = &self.default_spec else {
                continue;
            };
            match spec.compile(source_channels, *requested) {
                Ok(plan) => {
                    tracing::info!(plan = %plan, outputs = plan.output_channels(), "default plan rebuilt");
                    entry.plan = plan;
                }
                Err(e) => tracing::warn!(
                    error = %e,
                    source_channels,
                    "default channel map does not fit the new source"
                ),
            }
        }
    }

    /// Route one block to every active entry and hand each packet to `raw_send`.
    ///
    /// Every entry gets its own payload, produced by its plan, under a header
    /// carrying the block's `seqno` and frame count and the entry's channel
    /// count. A failure for one entry is recorded and the pass continues.
    pub fn route_and_send<F>(
        &mut self,
        seqno: u32,
        frames: usize,
        source: &SourceBuffer<'_>,
        params: &FrameParams,
        now: Tick,
        mut raw_send: F,
    ) -> FanoutReport
    where
        F: FnMut(&[u8], SocketAddr) -> io::Result<()>,
    {
        let mut report = FanoutReport::default();
        let Some(width) = params.sample_width() else {
            tracing::warn!(%params, "cannot route unsupported sample width");
            return report;
        };

        let Self { entries, packet, .. } = self;
        for entry in entries.iter().filter(|e| !e.is_expired(now)) {
            let outputs = entry.output_channels();
            if outputs == 0 {
                continue;
            }
            if entry.plan.source_channels() > source.channels() {
                tracing::debug!(client = %entry.identity, "plan needs more source channels than the block has");
                report.failures.push(NetworkError::ChannelMismatch {
                    addr: entry.address,
                    needs: entry.plan.source_channels(),
                    have: source.channels(),
                });
                continue;
            }

            let entry_params = params.with_channels(outputs as u8);
            let payload_len = frames * entry_params.bytes_per_frame();
            let total = DATA_HEADER_LEN + payload_len;
            if total > MAX_PACKET_SIZE {
                report.failures.push(NetworkError::PacketTooLarge(total));
                continue;
            }

            packet.clear();
            DataPacketHeader::new(seqno, frames as u32, entry_params).write_to(packet);
            packet.resize(total, 0);
            apply(
                &entry.plan,
                source,
                &mut DestBuffer::interleaved(&mut packet[DATA_HEADER_LEN..], outputs),
                width,
                frames,
            );

            match raw_send(&packet[..], entry.address) {
                Ok(()) => {
                    report.sent += 1;
                    report.bytes += total;
                }
                Err(err) => {
                    tracing::warn!(client = %entry.identity, address = %entry.address, error = %err, "send failed");
                    report.failures.push(NetworkError::SendFailed {
                        addr: entry.address,
                        source: err,
                    });
                }
            }
        }

        report
    }

    pub fn stats(&self) -> RegistryStats {
        self.stats.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{parse_spec, PlanKind};
    use crate::protocol::{decode_data_packet, SampleFormat};

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([192, 168, 1, 10], port))
    }

    fn group() -> SocketAddr {
        "224.0.0.223:22402".parse().unwrap()
    }

    fn registry() -> ClientRegistry {
        ClientRegistry::new(4, 1_000, 3).with_default(group(), RoutingPlan::identity(3))
    }

    #[test]
    fn test_create_and_refresh() {
        let mut reg = registry();
        let msg = ControlMessage::new(7, 0b101);

        assert_eq!(
            reg.handle_control(&msg, addr(1), Tick::ZERO),
            Ok(ControlOutcome::Created)
        );
        let entry = &reg.entries()[1];
        assert_eq!(entry.plan.kind(), PlanKind::Permute);
        assert_eq!(entry.plan.permutation(), Some(&[0u8, 2][..]));
        assert_eq!(entry.expires_at, Some(Tick::from_micros(1_000)));

        assert_eq!(
            reg.handle_control(&msg, addr(1), Tick::from_micros(500)),
            Ok(ControlOutcome::Refreshed)
        );
        assert_eq!(reg.entries()[1].expires_at, Some(Tick::from_micros(1_500)));
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn test_remap_rebuilds_plan() {
        let mut reg = registry();
        reg.handle_control(&ControlMessage::new(7, 0b011), addr(1), Tick::ZERO)
            .unwrap();
        assert_eq!(
            reg.handle_control(&ControlMessage::new(7, 0b100), addr(2), Tick::ZERO),
            Ok(ControlOutcome::Remapped)
        );
        let entry = &reg.entries()[1];
        assert_eq!(entry.address, addr(2));
        assert_eq!(entry.plan.permutation(), Some(&[2u8][..]));
    }

    #[test]
    fn test_anonymous_clients_keyed_by_address() {
        let mut reg = registry();
        let msg = ControlMessage::new(0, 0b1);
        reg.handle_control(&msg, addr(1), Tick::ZERO).unwrap();
        reg.handle_control(&msg, addr(2), Tick::ZERO).unwrap();
        assert_eq!(reg.len(), 3);
        assert_eq!(
            reg.handle_control(&msg, addr(1), Tick::ZERO),
            Ok(ControlOutcome::Refreshed)
        );
    }

    #[test]
    fn test_zero_mask_unsubscribes() {
        let mut reg = registry();
        reg.handle_control(&ControlMessage::new(3, 0b1), addr(1), Tick::ZERO)
            .unwrap();
        assert_eq!(
            reg.handle_control(&ControlMessage::new(3, 0), addr(1), Tick::ZERO),
            Ok(ControlOutcome::Unsubscribed)
        );
        assert_eq!(reg.len(), 1);
        assert_eq!(
            reg.handle_control(&ControlMessage::new(3, 0), addr(1), Tick::ZERO),
            Ok(ControlOutcome::Ignored)
        );
    }

    #[test]
    fn test_capacity_and_reclaim() {
        let mut reg = registry();
        for id in 1..=3 {
            reg.handle_control(&ControlMessage::new(id, 1), addr(id as u16), Tick::ZERO)
                .unwrap();
        }
        assert_eq!(
            reg.handle_control(&ControlMessage::new(9, 1), addr(9), Tick::from_micros(10)),
            Err(RegistryError::CapacityExceeded(4))
        );
        assert_eq!(reg.stats().rejected, 1);

        // everyone but the default entry has expired by now
        assert_eq!(
            reg.handle_control(&ControlMessage::new(9, 1), addr(9), Tick::from_micros(5_000)),
            Ok(ControlOutcome::Created)
        );
        assert_eq!(reg.len(), 4);
        assert_eq!(reg.stats().evicted, 1);
    }

    #[test]
    fn test_list_active_skips_expired() {
        let mut reg = registry();
        reg.handle_control(&ControlMessage::new(1, 1), addr(1), Tick::ZERO)
            .unwrap();
        reg.handle_control(&ControlMessage::new(2, 1), addr(2), Tick::from_micros(800))
            .unwrap();

        let active: Vec<_> = reg
            .list_active(Tick::from_micros(1_200))
            .map(|e| e.identity)
            .collect();
        assert_eq!(active.len(), 2);
        assert_eq!(active[0], ClientIdentity::Default);

        assert_eq!(reg.evict_expired(Tick::from_micros(1_200)), 1);
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.evict_expired(Tick::from_micros(u64::MAX)), 1);
        assert_eq!(reg.entries()[0].identity, ClientIdentity::Default);
    }

    #[test]
    fn test_bad_datagram_changes_nothing() {
        let mut reg = registry();
        let mut bytes = ControlMessage::new(1, 1).encode();
        bytes[5] ^= 0xff;
        assert!(reg.handle_control_datagram(&bytes, addr(1), Tick::ZERO).is_err());
        assert!(reg.handle_control_datagram(&bytes[..8], addr(1), Tick::ZERO).is_err());
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_source_channel_change_rebuilds_masks() {
        let mut reg = registry();
        reg.handle_control(&ControlMessage::new(1, 0b110), addr(1), Tick::ZERO)
            .unwrap();
        assert_eq!(reg.entries()[1].output_channels(), 2);

        reg.set_source_channels(2);
        assert_eq!(reg.entries()[1].output_channels(), 1);
        assert_eq!(reg.entries()[1].plan.permutation(), Some(&[1u8][..]));
    }

    #[test]
    fn test_default_map_follows_source_channels() {
        let mut reg = ClientRegistry::new(4, 1_000, 2)
            .with_default_spec(group(), ChannelSpec::Auto, 0)
            .unwrap();
        assert_eq!(reg.entries()[0].output_channels(), 2);

        reg.set_source_channels(1);
        assert_eq!(reg.entries()[0].output_channels(), 1);
        assert_eq!(reg.entries()[0].plan.source_channels(), 1);

        reg.set_source_channels(4);
        assert_eq!(reg.entries()[0].output_channels(), 4);
        assert!(reg.entries()[0].plan.is_identity());
    }

    #[test]
    fn test_default_map_that_stops_fitting_keeps_plan() {
        let spec = ChannelSpec::parse("10").unwrap();
        let mut reg = ClientRegistry::new(4, 1_000, 2)
            .with_default_spec(group(), spec, 0)
            .unwrap();
        reg.set_source_channels(1);
        assert_eq!(reg.entries()[0].plan.source_channels(), 2);

        reg.set_source_channels(2);
        assert_eq!(reg.entries()[0].plan.permutation(), Some(&[1u8, 0][..]));
    }

    #[test]
    fn test_default_spec_rejected_for_source() {
        let mut reg = ClientRegistry::new(4, 1_000, 2);
        let spec = ChannelSpec::parse("3").unwrap();
        assert!(reg.set_default_spec(group(), spec, 0).is_err());
        assert!(reg.is_empty());
    }

    #[test]
    fn test_channel_mismatch_reported() {
        let params = FrameParams::new(SampleFormat::S16Le, 1, 48000);
        let mut reg = registry();
        reg.set_source_channels(1);
        reg.handle_control(&ControlMessage::new(1, 0b1), addr(1), Tick::ZERO)
            .unwrap();

        let samples = [7u8, 0];
        let mut delivered = Vec::new();
        let report = reg.route_and_send(
            1,
            1,
            &SourceBuffer::interleaved(&samples, 1),
            &params,
            Tick::ZERO,
            |_, to| {
                delivered.push(to);
                Ok(())
            },
        );

        // the fixed three-channel default plan cannot be served from one channel
        assert_eq!(delivered, vec![addr(1)]);
        assert_eq!(report.sent, 1);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(
            report.failures[0],
            NetworkError::ChannelMismatch { addr: a, needs: 3, have: 1 } if a == group()
        ));
    }

    #[test]
    fn test_route_and_send() {
        let params = FrameParams::new(SampleFormat::S16Le, 3, 48000);
        let mut reg = registry();
        reg.handle_control(&ControlMessage::new(5, 0b100), addr(5), Tick::ZERO)
            .unwrap();

        let samples: Vec<u8> = [1i16, 2, 3, 4, 5, 6]
            .iter()
            .flat_map(|s| s.to_le_bytes())
            .collect();
        let mut sent = Vec::new();
        let report = reg.route_and_send(
            77,
            2,
            &SourceBuffer::interleaved(&samples, 3),
            &params,
            Tick::ZERO,
            |bytes, to| {
                sent.push((bytes.to_vec(), to));
                Ok(())
            },
        );

        assert!(report.is_clean());
        assert_eq!(report.sent, 2);
        assert_eq!(sent[0].1, group());
        assert_eq!(sent[1].1, addr(5));

        let full = decode_data_packet(&sent[0].0).unwrap();
        assert_eq!(full.header.seqno, 77);
        assert_eq!(full.header.params.channels_per_frame, 3);
        assert_eq!(full.payload, &samples[..]);

        let one = decode_data_packet(&sent[1].0).unwrap();
        assert_eq!(one.header.num_frames, 2);
        assert_eq!(one.header.params.channels_per_frame, 1);
        assert_eq!(one.payload, &[3, 0, 6, 0]);
    }

    #[test]
    fn test_send_failure_does_not_stop_fanout() {
        let params = FrameParams::new(SampleFormat::S16Le, 3, 48000);
        let mut reg = registry();
        reg.handle_control(&ControlMessage::new(1, 0b1), addr(1), Tick::ZERO)
            .unwrap();
        reg.handle_control(&ControlMessage::new(2, 0b10), addr(2), Tick::ZERO)
            .unwrap();

        let samples = [0u8; 6];
        let mut delivered = Vec::new();
        let report = reg.route_and_send(
            1,
            1,
            &SourceBuffer::interleaved(&samples, 3),
            &params,
            Tick::ZERO,
            |_, to| {
                if to == addr(1) {
                    Err(io::Error::new(io::ErrorKind::Other, "unreachable"))
                } else {
                    delivered.push(to);
                    Ok(())
                }
            },
        );

        assert_eq!(delivered, vec![group(), addr(2)]);
        assert_eq!(report.sent, 2);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(
            report.failures[0],
            NetworkError::SendFailed { addr: a, .. } if a == addr(1)
        ));
    }

    #[test]
    fn test_expired_clients_not_sent() {
        let params = FrameParams::new(SampleFormat::U8, 3, 8000);
        let mut reg = registry();
        reg.handle_control(&ControlMessage::new(1, 0b1), addr(1), Tick::ZERO)
            .unwrap();

        let samples = [1u8, 2, 3];
        let mut count = 0;
        reg.route_and_send(
            1,
            1,
            &SourceBuffer::interleaved(&samples, 3),
            &params,
            Tick::from_micros(2_000),
            |_, _| {
                count += 1;
                Ok(())
            },
        );
        assert_eq!(count, 1);
    }

    #[test]
    fn test_oversized_block_reported() {
        let params = FrameParams::new(SampleFormat::S16Le, 3, 48000);
        let mut reg = registry();
        let frames = 400;
        let samples = vec![0u8; frames * 6];
        let report = reg.route_and_send(
            1,
            frames,
            &SourceBuffer::interleaved(&samples, 3),
            &params,
            Tick::ZERO,
            |_, _| Ok(()),
        );
        assert_eq!(report.sent, 0);
        assert!(matches!(report.failures[0], NetworkError::PacketTooLarge(_)));
    }

    #[test]
    fn test_general_default_plan() {
        let plan = parse_spec("+01", 2, 0).unwrap();
        let mut reg = ClientRegistry::new(2, 1_000, 2).with_default(group(), plan);
        let params = FrameParams::new(SampleFormat::S16Le, 2, 48000);
        let samples: Vec<u8> = [30000i16, 20000]
            .iter()
            .flat_map(|s| s.to_le_bytes())
            .collect();

        let mut payload = Vec::new();
        reg.route_and_send(
            0,
            1,
            &SourceBuffer::interleaved(&samples, 2),
            &params,
            Tick::ZERO,
            |bytes, _| {
                payload = decode_data_packet(bytes).unwrap().payload.to_vec();
                Ok(())
            },
        );
        assert_eq!(payload, i16::MAX.to_le_bytes().to_vec());
    }
}
