//! Silence patterns per sample format

use crate::protocol::{FrameParams, SampleFormat};

/// Bytes of one silent sample of `format`, padded to its physical width
pub fn silence_pattern(format: SampleFormat) -> Vec<u8> {
    let width = format.physical_bytes() as usize;
    let mut sample = vec![0u8; width];

    match format {
        SampleFormat::U8 => sample[0] = 0x80,
        SampleFormat::MuLaw => sample[0] = 0x7f,
        SampleFormat::ALaw => sample[0] = 0x55,
        SampleFormat::U16Le => sample[1] = 0x80,
        SampleFormat::U16Be => sample[0] = 0x80,
        // 24 bits in a 4-byte container, low-aligned
        SampleFormat::U24Le => sample[2] = 0x80,
        SampleFormat::U24Be => sample[1] = 0x80,
        SampleFormat::U32Le => sample[3] = 0x80,
        SampleFormat::U32Be => sample[0] = 0x80,
        _ => {}
    }

    sample
}

/// Overwrite `buf` with silence in the format of `params`
pub fn fill_silence(params: &FrameParams, buf: &mut [u8]) {
    let pattern = silence_pattern(params.format);
    if pattern.is_empty() || pattern.iter().all(|&b| b == 0) {
        buf.fill(0);
        return;
    }

    for chunk in buf.chunks_mut(pattern.len()) {
        chunk.copy_from_slice(&pattern[..chunk.len()]);
    }
}
