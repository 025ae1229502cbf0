//! Frame sources and sinks
//!
//! The fan-out core never touches hardware or files; it pulls blocks of
//! interleaved frames from a [`FrameSource`] and pushes received blocks
//! into a [`FrameSink`].

use std::f64::consts::TAU;
use std::io::{ErrorKind, Read, Write};

use crate::error::AudioError;
use crate::protocol::{FrameParams, SampleFormat};

/// Producer of interleaved frames
pub trait FrameSource {
    /// Format of every frame this source produces
    fn params(&self) -> FrameParams;

    /// Fill `buf` with up to `max_frames` frames.
    ///
    /// Returns the number of whole frames written; 0 means end of stream.
    fn read_frames(&mut self, buf: &mut [u8], max_frames: usize) -> Result<usize, AudioError>;
}

/// Consumer of interleaved frames
pub trait FrameSink {
    fn write_frames(&mut self, params: &FrameParams, data: &[u8], frames: usize) -> Result<(), AudioError>;
}

/// Raw interleaved PCM read from any byte stream (stdin, a file)
pub struct RawPcmSource<R> {
    reader: R,
    params: FrameParams,
    /// Bytes of a partial frame carried over from the previous read
    pending: Vec<u8>,
    eof: bool,
}

impl<R: Read> RawPcmSource<R> {
    pub fn new(reader: R, params: FrameParams) -> Self {
        Self {
            reader,
            params,
            pending: Vec::new(),
            eof: false,
        }
    }
}

impl<R: Read> FrameSource for RawPcmSource<R> {
    fn params(&self) -> FrameParams {
        self.params
    }

    fn read_frames(&mut self, buf: &mut [u8], max_frames: usize) -> Result<usize, AudioError> {
        let bpf = self.params.bytes_per_frame();
        if bpf == 0 || self.eof {
            return Ok(0);
        }

        let want = (max_frames * bpf).min(buf.len() / bpf * bpf);
        let carried = self.pending.len().min(want);
        buf[..carried].copy_from_slice(&self.pending[..carried]);
        self.pending.drain(..carried);
        let mut filled = carried;

        // return once a whole frame is in; a trailing partial frame waits
        // for the next call
        while filled < want {
            match self.reader.read(&mut buf[filled..want]) {
                Ok(0) => {
                    self.eof = true;
                    break;
                }
                Ok(n) => {
                    filled += n;
                    if filled >= bpf {
                        break;
                    }
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(AudioError::ReadFailed(e)),
            }
        }

        let whole = filled / bpf * bpf;
        self.pending.extend_from_slice(&buf[whole..filled]);
        if self.eof && !self.pending.is_empty() {
            tracing::debug!(bytes = self.pending.len(), "dropping partial frame at end of input");
            self.pending.clear();
        }

        Ok(whole / bpf)
    }
}

/// Endless test tone, one frequency per channel, S16LE
pub struct ToneSource {
    params: FrameParams,
    frequencies: Vec<f64>,
    amplitude: f64,
    frame_index: u64,
}

impl ToneSource {
    /// Channel `n` plays `base_hz * (n + 1)`
    pub fn new(channels: u8, sample_rate: u32, base_hz: f64) -> Self {
        Self {
            params: FrameParams::new(SampleFormat::S16Le, channels, sample_rate),
            frequencies: (0..channels).map(|c| base_hz * (c as f64 + 1.0)).collect(),
            amplitude: 0.25 * i16::MAX as f64,
            frame_index: 0,
        }
    }

    pub fn with_amplitude(mut self, amplitude: f64) -> Self {
        self.amplitude = amplitude.clamp(0.0, 1.0) * i16::MAX as f64;
        self
    }
}

impl FrameSource for ToneSource {
    fn params(&self) -> FrameParams {
        self.params
    }

    fn read_frames(&mut self, buf: &mut [u8], max_frames: usize) -> Result<usize, AudioError> {
        let bpf = self.params.bytes_per_frame();
        if bpf == 0 || self.params.sample_rate == 0 {
            return Ok(0);
        }
        let frames = max_frames.min(buf.len() / bpf);
        let rate = self.params.sample_rate as f64;

        for (i, frame) in buf[..frames * bpf].chunks_exact_mut(bpf).enumerate() {
            let t = (self.frame_index + i as u64) as f64 / rate;
            for (sample, freq) in frame.chunks_exact_mut(2).zip(&self.frequencies) {
                let value = (self.amplitude * (TAU * freq * t).sin()) as i16;
                sample.copy_from_slice(&value.to_le_bytes());
            }
        }

        self.frame_index += frames as u64;
        Ok(frames)
    }
}

/// Raw interleaved PCM written to any byte stream (stdout, a file)
pub struct RawPcmSink<W> {
    writer: W,
    params: Option<FrameParams>,
    frames_written: u64,
}

impl<W: Write> RawPcmSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            params: None,
            frames_written: 0,
        }
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> FrameSink for RawPcmSink<W> {
    fn write_frames(&mut self, params: &FrameParams, data: &[u8], frames: usize) -> Result<(), AudioError> {
        if self.params.as_ref() != Some(params) {
            tracing::info!(%params, "sink format");
            self.params = Some(*params);
        }

        let len = (frames * params.bytes_per_frame()).min(data.len());
        self.writer
            .write_all(&data[..len])
            .and_then(|_| self.writer.flush())
            .map_err(AudioError::WriteFailed)?;
        self.frames_written += frames as u64;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Reader that hands out at most `chunk` bytes per call
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
        chunk: usize,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = self.chunk.min(buf.len()).min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    fn stereo() -> FrameParams {
        FrameParams::new(SampleFormat::S16Le, 2, 48000)
    }

    #[test]
    fn test_raw_source_whole_frames() {
        let data: Vec<u8> = (0..18).collect();
        let mut source = RawPcmSource::new(Cursor::new(data), stereo());
        let mut buf = [0u8; 64];

        assert_eq!(source.read_frames(&mut buf, 3).unwrap(), 3);
        assert_eq!(&buf[..12], &(0..12).collect::<Vec<u8>>()[..]);

        // 6 bytes left: one frame, the trailing 2 bytes are dropped
        assert_eq!(source.read_frames(&mut buf, 3).unwrap(), 1);
        assert_eq!(&buf[..4], &[12, 13, 14, 15]);
        assert_eq!(source.read_frames(&mut buf, 3).unwrap(), 0);
    }

    #[test]
    fn test_raw_source_short_reads() {
        let data: Vec<u8> = (0..16).collect();
        let reader = Trickle {
            data,
            pos: 0,
            chunk: 3,
        };
        let mut source = RawPcmSource::new(reader, stereo());
        let mut buf = [0u8; 16];

        // 3 + 3 bytes in: one frame out, two bytes carried
        assert_eq!(source.read_frames(&mut buf, 4).unwrap(), 1);
        assert_eq!(&buf[..4], &[0, 1, 2, 3]);
        assert_eq!(source.pending, vec![4, 5]);

        let mut frames = vec![buf[..4].to_vec()];
        loop {
            let n = source.read_frames(&mut buf, 4).unwrap();
            if n == 0 {
                break;
            }
            frames.push(buf[..n * 4].to_vec());
        }
        assert_eq!(frames.concat(), (0..16).collect::<Vec<u8>>());
        assert!(source.pending.is_empty());
    }

    #[test]
    fn test_raw_source_frame_split_across_reads() {
        // 5-byte chunks never line up with 4-byte frames
        let data: Vec<u8> = (0..20).collect();
        let reader = Trickle {
            data,
            pos: 0,
            chunk: 5,
        };
        let mut source = RawPcmSource::new(reader, stereo());
        let mut buf = [0u8; 8];

        assert_eq!(source.read_frames(&mut buf, 2).unwrap(), 1);
        assert_eq!(source.pending, vec![4]);
        assert_eq!(source.read_frames(&mut buf, 2).unwrap(), 1);
        assert_eq!(&buf[..4], &[4, 5, 6, 7]);
        assert_eq!(source.pending, vec![8, 9]);
    }

    #[test]
    fn test_tone_source() {
        let mut tone = ToneSource::new(2, 8000, 1000.0);
        let mut buf = [0u8; 40];
        assert_eq!(tone.read_frames(&mut buf, 100).unwrap(), 10);

        // t = 0 is silent on every channel
        assert_eq!(&buf[..4], &[0, 0, 0, 0]);
        // channel 0 at 1 kHz, frame 2 is a quarter period in
        let peak = i16::from_le_bytes([buf[8], buf[9]]);
        assert!(peak > 8000, "{}", peak);
    }

    #[test]
    fn test_raw_sink() {
        let mut sink = RawPcmSink::new(Vec::new());
        sink.write_frames(&stereo(), &[1, 2, 3, 4, 5, 6, 7, 8, 9], 2).unwrap();
        assert_eq!(sink.frames_written(), 2);
        assert_eq!(sink.into_inner(), vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }
}
