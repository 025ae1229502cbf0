//! Bounds-checked views over raw sample buffers
//!
//! A channel is addressed as (bytes, stride): sample `f` of a channel with
//! sample width `w` lives at `bytes[f * stride * w..][..w]`. Interleaved
//! buffers are one byte slice holding every channel of a frame back to
//! back; non-interleaved buffers are one view per channel.

use crate::audio::sample::SampleWidth;

/// Read-only view of one channel
#[derive(Debug, Clone, Copy)]
pub struct ChannelView<'a> {
    data: &'a [u8],
    stride: usize,
}

impl<'a> ChannelView<'a> {
    /// View with `stride` samples between consecutive frames
    pub fn new(data: &'a [u8], stride: usize) -> Self {
        assert!(stride > 0, "stride must be non-zero");
        Self { data, stride }
    }

    /// Densely packed channel (stride 1)
    pub fn packed(data: &'a [u8]) -> Self {
        Self::new(data, 1)
    }

    /// Split a channel-major buffer into one packed view per channel
    pub fn split(data: &'a [u8], channels: usize) -> Vec<ChannelView<'a>> {
        if channels == 0 {
            return Vec::new();
        }
        let per_channel = data.len() / channels;
        data.chunks_exact(per_channel.max(1))
            .take(channels)
            .map(ChannelView::packed)
            .collect()
    }

    /// Bytes of the sample at `frame`
    #[inline]
    pub fn sample(&self, frame: usize, width: usize) -> &'a [u8] {
        let start = frame * self.stride * width;
        &self.data[start..start + width]
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Number of whole frames this view can address at `width`
    pub fn frames(&self, width: SampleWidth) -> usize {
        frames_in(self.data.len(), self.stride, width.bytes())
    }
}

/// Writable view of one channel
#[derive(Debug)]
pub struct ChannelViewMut<'a> {
    data: &'a mut [u8],
    stride: usize,
}

impl<'a> ChannelViewMut<'a> {
    pub fn new(data: &'a mut [u8], stride: usize) -> Self {
        assert!(stride > 0, "stride must be non-zero");
        Self { data, stride }
    }

    pub fn packed(data: &'a mut [u8]) -> Self {
        Self::new(data, 1)
    }

    /// Split a channel-major buffer into one packed writable view per channel
    pub fn split(data: &'a mut [u8], channels: usize) -> Vec<ChannelViewMut<'a>> {
        if channels == 0 {
            return Vec::new();
        }
        let per_channel = data.len() / channels;
        data.chunks_exact_mut(per_channel.max(1))
            .take(channels)
            .map(ChannelViewMut::packed)
            .collect()
    }

    #[inline]
    pub fn sample_mut(&mut self, frame: usize, width: usize) -> &mut [u8] {
        let start = frame * self.stride * width;
        &mut self.data[start..start + width]
    }

    /// Read back the sample at `frame`
    #[inline]
    pub fn sample(&self, frame: usize, width: usize) -> &[u8] {
        let start = frame * self.stride * width;
        &self.data[start..start + width]
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn frames(&self, width: SampleWidth) -> usize {
        frames_in(self.data.len(), self.stride, width.bytes())
    }
}

fn frames_in(len: usize, stride: usize, width: usize) -> usize {
    if len < width {
        0
    } else {
        (len - width) / (stride * width) + 1
    }
}

/// Where the dispatch engine reads samples from
#[derive(Debug, Clone, Copy)]
pub enum SourceBuffer<'a> {
    /// One buffer, `channels` samples per frame
    Interleaved { data: &'a [u8], channels: usize },
    /// One view per source channel
    Planar(&'a [ChannelView<'a>]),
}

impl<'a> SourceBuffer<'a> {
    pub fn interleaved(data: &'a [u8], channels: usize) -> Self {
        SourceBuffer::Interleaved { data, channels }
    }

    pub fn channels(&self) -> usize {
        match self {
            SourceBuffer::Interleaved { channels, .. } => *channels,
            SourceBuffer::Planar(views) => views.len(),
        }
    }

    /// Number of whole frames every channel can supply
    pub fn frames(&self, width: SampleWidth) -> usize {
        match self {
            SourceBuffer::Interleaved { data, channels } => {
                if *channels == 0 {
                    0
                } else {
                    data.len() / (channels * width.bytes())
                }
            }
            SourceBuffer::Planar(views) => views.iter().map(|v| v.frames(width)).min().unwrap_or(0),
        }
    }
}

/// Where the dispatch engine writes samples to
#[derive(Debug)]
pub enum DestBuffer<'a> {
    /// One buffer, `channels` samples per frame
    Interleaved { data: &'a mut [u8], channels: usize },
    /// One view per destination channel
    Planar(Vec<ChannelViewMut<'a>>),
}

impl<'a> DestBuffer<'a> {
    pub fn interleaved(data: &'a mut [u8], channels: usize) -> Self {
        DestBuffer::Interleaved { data, channels }
    }

    pub fn channels(&self) -> usize {
        match self {
            DestBuffer::Interleaved { channels, .. } => *channels,
            DestBuffer::Planar(views) => views.len(),
        }
    }
}
