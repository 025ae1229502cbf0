//! Wire formats for data and control datagrams
//!
//! Both datagram kinds carry a fixed magic number and a CRC-32 computed
//! over the fixed-size header with the checksum field zeroed. Decoding
//! fails closed: a datagram that does not validate is noise.

pub mod control;
pub mod packet;
pub mod params;

pub use control::{ControlMessage, CONTROL_LEN};
pub use packet::{
    decode_data_header, decode_data_packet, encode_data_header, DataPacket, DataPacketHeader,
    DATA_HEADER_LEN,
};
pub use params::{frames_per_packet, FrameParams, SampleFormat};

/// Magic of data datagrams ("ACAD")
pub const DATA_MAGIC: u32 = 0x4143_4144;

/// Magic of control datagrams ("ACAC")
pub const CONTROL_MAGIC: u32 = 0x4143_4143;

/// CRC-32 of `header` as if its 4-byte checksum field at `offset` were zero
pub(crate) fn header_checksum(header: &[u8], offset: usize) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&header[..offset]);
    hasher.update(&[0u8; 4]);
    hasher.update(&header[offset + 4..]);
    hasher.finalize()
}
