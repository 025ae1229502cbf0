//! Data packet header
//!
//! ```text
//!  0       4       8       12  13  14  15  16      20      24
//!  +-------+-------+-------+---+---+---+---+-------+-------+-----------
//!  | magic | seqno | frames|fmt|ch |bit|byt| rate  | crc32 | samples...
//!  +-------+-------+-------+---+---+---+---+-------+-------+-----------
//! ```
//!
//! Multi-byte fields are big-endian. The CRC covers the 24 header bytes
//! with the checksum field zeroed; sample data is not covered.

use bytes::{Buf, BufMut, BytesMut};

use crate::constants::MAX_CHANNELS;
use crate::error::WireError;
use crate::protocol::params::{FrameParams, SampleFormat};
use crate::protocol::{header_checksum, DATA_MAGIC};

/// Encoded header size in bytes
pub const DATA_HEADER_LEN: usize = 24;

const CHECKSUM_OFFSET: usize = 20;

/// Header of one data datagram
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataPacketHeader {
    pub seqno: u32,
    pub num_frames: u32,
    pub params: FrameParams,
}

impl DataPacketHeader {
    pub fn new(seqno: u32, num_frames: u32, params: FrameParams) -> Self {
        Self {
            seqno,
            num_frames,
            params,
        }
    }

    /// Number of payload bytes this header announces
    pub fn payload_len(&self) -> usize {
        self.num_frames as usize * self.params.bytes_per_frame()
    }

    /// Append the encoded header, checksum included, to `buf`
    pub fn write_to(&self, buf: &mut BytesMut) {
        let start = buf.len();
        buf.reserve(DATA_HEADER_LEN);
        buf.put_u32(DATA_MAGIC);
        buf.put_u32(self.seqno);
        buf.put_u32(self.num_frames);
        buf.put_i8(self.params.format.tag());
        buf.put_u8(self.params.channels_per_frame);
        buf.put_u8(self.params.bits_per_channel);
        buf.put_u8(self.params.bytes_per_channel);
        buf.put_u32(self.params.sample_rate);
        buf.put_u32(0);

        let header = &mut buf[start..start + DATA_HEADER_LEN];
        let crc = header_checksum(header, CHECKSUM_OFFSET);
        header[CHECKSUM_OFFSET..].copy_from_slice(&crc.to_be_bytes());
    }

    /// Encode into a fixed-size array
    pub fn encode(&self) -> [u8; DATA_HEADER_LEN] {
        let mut buf = BytesMut::with_capacity(DATA_HEADER_LEN);
        self.write_to(&mut buf);
        let mut out = [0u8; DATA_HEADER_LEN];
        out.copy_from_slice(&buf);
        out
    }
}

/// Encode a data packet header
pub fn encode_data_header(seqno: u32, num_frames: u32, params: &FrameParams) -> [u8; DATA_HEADER_LEN] {
    DataPacketHeader::new(seqno, num_frames, *params).encode()
}

/// A validated data datagram, borrowing its sample bytes
#[derive(Debug, Clone, Copy)]
pub struct DataPacket<'a> {
    pub header: DataPacketHeader,
    pub payload: &'a [u8],
}

/// Validate and decode a data datagram.
///
/// Fails closed: any error means the datagram must be discarded.
pub fn decode_data_packet(bytes: &[u8]) -> Result<DataPacket<'_>, WireError> {
    let header = decode_data_header(bytes)?;

    let needed = DATA_HEADER_LEN + header.payload_len();
    if bytes.len() < needed {
        return Err(WireError::TooShort {
            needed,
            actual: bytes.len(),
        });
    }

    Ok(DataPacket {
        header,
        payload: &bytes[DATA_HEADER_LEN..needed],
    })
}

/// Validate and decode only the header of a data datagram
pub fn decode_data_header(bytes: &[u8]) -> Result<DataPacketHeader, WireError> {
    if bytes.len() < DATA_HEADER_LEN {
        return Err(WireError::TooShort {
            needed: DATA_HEADER_LEN,
            actual: bytes.len(),
        });
    }

    let mut buf = &bytes[..DATA_HEADER_LEN];
    let magic = buf.get_u32();
    if magic != DATA_MAGIC {
        return Err(WireError::BadMagic(magic));
    }

    let seqno = buf.get_u32();
    let num_frames = buf.get_u32();
    let format = SampleFormat::from_tag(buf.get_i8());
    let channels_per_frame = buf.get_u8();
    let bits_per_channel = buf.get_u8();
    let bytes_per_channel = buf.get_u8();
    let sample_rate = buf.get_u32();
    let received = buf.get_u32();

    let expected = header_checksum(&bytes[..DATA_HEADER_LEN], CHECKSUM_OFFSET);
    if received != expected {
        return Err(WireError::Checksum {
            expected,
            actual: received,
        });
    }

    if channels_per_frame == 0 || channels_per_frame as usize > MAX_CHANNELS {
        return Err(WireError::InvalidParams("channel count out of range"));
    }
    if !matches!(bytes_per_channel, 1 | 2 | 4) {
        return Err(WireError::InvalidParams("unsupported sample width"));
    }

    Ok(DataPacketHeader {
        seqno,
        num_frames,
        params: FrameParams {
            format,
            channels_per_frame,
            bits_per_channel,
            bytes_per_channel,
            sample_rate,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stereo() -> FrameParams {
        FrameParams::new(SampleFormat::S16Le, 2, 44100)
    }

    #[test]
    fn test_header_roundtrip() {
        let header = DataPacketHeader::new(7, 3, stereo());
        let mut packet = header.encode().to_vec();
        packet.extend_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);

        let decoded = decode_data_packet(&packet).unwrap();
        assert_eq!(decoded.header, header);
        assert_eq!(decoded.payload.len(), 12);
    }

    #[test]
    fn test_layout_is_big_endian() {
        let bytes = encode_data_header(0x01020304, 5, &stereo());
        assert_eq!(&bytes[0..4], &DATA_MAGIC.to_be_bytes());
        assert_eq!(&bytes[4..8], &[1, 2, 3, 4]);
        assert_eq!(&bytes[8..12], &[0, 0, 0, 5]);
        assert_eq!(bytes[12], 2); // S16_LE tag
        assert_eq!(bytes[13], 2);
        assert_eq!(&bytes[16..20], &44100u32.to_be_bytes());
    }

    #[test]
    fn test_payload_not_covered_by_checksum() {
        let header = DataPacketHeader::new(1, 1, stereo());
        let mut packet = header.encode().to_vec();
        packet.extend_from_slice(&[0, 0, 0, 0]);
        assert!(decode_data_packet(&packet).is_ok());

        packet[DATA_HEADER_LEN] = 0xff;
        assert!(decode_data_packet(&packet).is_ok());
    }

    #[test]
    fn test_corrupt_header_byte() {
        let mut bytes = encode_data_header(42, 0, &stereo());
        bytes[9] ^= 0x10;
        assert!(matches!(
            decode_data_header(&bytes),
            Err(WireError::Checksum { .. })
        ));
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = encode_data_header(42, 0, &stereo());
        bytes[0] = b'X';
        assert!(matches!(decode_data_header(&bytes), Err(WireError::BadMagic(_))));
    }

    #[test]
    fn test_too_short() {
        let bytes = encode_data_header(42, 0, &stereo());
        assert!(matches!(
            decode_data_header(&bytes[..10]),
            Err(WireError::TooShort { needed: 24, actual: 10 })
        ));

        // header announces 4 frames but carries only 2
        let mut packet = encode_data_header(42, 4, &stereo()).to_vec();
        packet.extend_from_slice(&[0u8; 8]);
        assert!(matches!(
            decode_data_packet(&packet),
            Err(WireError::TooShort { needed: 40, actual: 32 })
        ));
    }

    #[test]
    fn test_invalid_params_rejected() {
        let params = FrameParams {
            channels_per_frame: 0,
            ..stereo()
        };
        let bytes = encode_data_header(1, 0, &params);
        assert!(matches!(
            decode_data_header(&bytes),
            Err(WireError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        let mut packet = encode_data_header(1, 1, &stereo()).to_vec();
        packet.extend_from_slice(&[9u8; 10]);
        let decoded = decode_data_packet(&packet).unwrap();
        assert_eq!(decoded.payload, &[9, 9, 9, 9]);
    }
}
