//! Subscribe control message
//!
//! ```text
//!  0         4           8              12         16
//!  +---------+-----------+--------------+----------+
//!  |  magic  | client id | channel mask |  crc32   |
//!  +---------+-----------+--------------+----------+
//! ```
//!
//! Sent by a consumer to (re-)subscribe. Stateless and idempotent.

use bytes::{Buf, BufMut, BytesMut};
use std::num::NonZeroU32;

use crate::error::WireError;
use crate::protocol::{header_checksum, CONTROL_MAGIC};

/// Encoded control message size in bytes
pub const CONTROL_LEN: usize = 16;

const CHECKSUM_OFFSET: usize = 12;

/// A consumer's subscription request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlMessage {
    /// Stable opaque id, or `None` to be identified by network address
    pub client_id: Option<NonZeroU32>,
    /// Requested source channels, bit `n` selects channel `n`
    pub channel_mask: u32,
}

impl ControlMessage {
    pub fn new(client_id: u32, channel_mask: u32) -> Self {
        Self {
            client_id: NonZeroU32::new(client_id),
            channel_mask,
        }
    }

    /// Raw id as carried on the wire (0 = by address)
    pub fn raw_client_id(&self) -> u32 {
        self.client_id.map_or(0, NonZeroU32::get)
    }

    pub fn encode(&self) -> [u8; CONTROL_LEN] {
        let mut buf = BytesMut::with_capacity(CONTROL_LEN);
        buf.put_u32(CONTROL_MAGIC);
        buf.put_u32(self.raw_client_id());
        buf.put_u32(self.channel_mask);
        buf.put_u32(0);

        let crc = header_checksum(&buf, CHECKSUM_OFFSET);
        buf[CHECKSUM_OFFSET..].copy_from_slice(&crc.to_be_bytes());

        let mut out = [0u8; CONTROL_LEN];
        out.copy_from_slice(&buf);
        out
    }

    /// Validate and decode a control datagram
    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        if bytes.len() < CONTROL_LEN {
            return Err(WireError::TooShort {
                needed: CONTROL_LEN,
                actual: bytes.len(),
            });
        }

        let mut buf = &bytes[..CONTROL_LEN];
        let magic = buf.get_u32();
        if magic != CONTROL_MAGIC {
            return Err(WireError::BadMagic(magic));
        }
        let client_id = buf.get_u32();
        let channel_mask = buf.get_u32();
        let received = buf.get_u32();

        let expected = header_checksum(&bytes[..CONTROL_LEN], CHECKSUM_OFFSET);
        if received != expected {
            return Err(WireError::Checksum {
                expected,
                actual: received,
            });
        }

        Ok(Self::new(client_id, channel_mask))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_roundtrip() {
        let msg = ControlMessage::new(0xdeadbeef, 0b101);
        assert_eq!(ControlMessage::decode(&msg.encode()).unwrap(), msg);

        let anonymous = ControlMessage::new(0, 0b11);
        let decoded = ControlMessage::decode(&anonymous.encode()).unwrap();
        assert!(decoded.client_id.is_none());
        assert_eq!(decoded.channel_mask, 0b11);
    }

    #[test]
    fn test_control_rejects_corruption() {
        let mut bytes = ControlMessage::new(5, 0xff).encode();
        bytes[8] ^= 1;
        assert!(matches!(
            ControlMessage::decode(&bytes),
            Err(WireError::Checksum { .. })
        ));
    }

    #[test]
    fn test_control_rejects_data_magic() {
        let mut bytes = ControlMessage::new(5, 0xff).encode();
        bytes[..4].copy_from_slice(&crate::protocol::DATA_MAGIC.to_be_bytes());
        assert!(matches!(
            ControlMessage::decode(&bytes),
            Err(WireError::BadMagic(_))
        ));
    }

    #[test]
    fn test_control_too_short() {
        let bytes = ControlMessage::new(5, 0xff).encode();
        assert!(matches!(
            ControlMessage::decode(&bytes[..15]),
            Err(WireError::TooShort { .. })
        ));
    }
}
