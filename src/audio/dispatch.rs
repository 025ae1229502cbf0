//! Sample dispatch engine
//!
//! Applies a [`RoutingPlan`] to a block of frames. The sample width and
//! buffer layout are matched once per call; the per-frame loops below are
//! monomorphised for each (width, source layout, destination layout).
//!
//! Out-of-range channels or frames are caller bugs and panic.

use crate::audio::buffer::{ChannelView, ChannelViewMut, DestBuffer, SourceBuffer};
use crate::audio::sample::{Sample, SampleWidth};
use crate::channel::{OpKind, PlanKind, RoutingPlan};

/// Transform `frames` frames from `source` into `dest` according to `plan`.
///
/// Only destination channels produced by the plan are written. `source`
/// is never modified.
///
/// # Panics
///
/// If the buffers hold fewer channels than the plan uses, or fewer than
/// `frames` frames.
pub fn apply(
    plan: &RoutingPlan,
    source: &SourceBuffer<'_>,
    dest: &mut DestBuffer<'_>,
    width: SampleWidth,
    frames: usize,
) {
    assert!(
        source.channels() >= plan.source_channels(),
        "source has {} channels, plan needs {}",
        source.channels(),
        plan.source_channels()
    );
    assert!(
        dest.channels() >= plan.output_channels(),
        "destination has {} channels, plan writes {}",
        dest.channels(),
        plan.output_channels()
    );

    match width {
        SampleWidth::W8 => apply_width::<u8>(plan, source, dest, frames),
        SampleWidth::W16 => apply_width::<i16>(plan, source, dest, frames),
        SampleWidth::W32 => apply_width::<i32>(plan, source, dest, frames),
    }
}

fn apply_width<S: Sample>(
    plan: &RoutingPlan,
    source: &SourceBuffer<'_>,
    dest: &mut DestBuffer<'_>,
    frames: usize,
) {
    match (source, dest) {
        (
            SourceBuffer::Interleaved { data, channels },
            DestBuffer::Interleaved {
                data: out,
                channels: out_channels,
            },
        ) => {
            if plan.kind() == PlanKind::Identity && *channels == *out_channels {
                let len = frames * *channels * S::BYTES;
                out[..len].copy_from_slice(&data[..len]);
                return;
            }
            let src = Interleaved::new(data, *channels, frames, S::BYTES);
            let mut dst = InterleavedMut::new(out, *out_channels, frames, S::BYTES);
            run::<S, _, _>(plan, &src, &mut dst, frames);
        }
        (SourceBuffer::Interleaved { data, channels }, DestBuffer::Planar(views)) => {
            let src = Interleaved::new(data, *channels, frames, S::BYTES);
            run::<S, _, _>(plan, &src, &mut PlanarMut(views.as_mut_slice()), frames);
        }
        (
            SourceBuffer::Planar(views),
            DestBuffer::Interleaved {
                data: out,
                channels: out_channels,
            },
        ) => {
            let mut dst = InterleavedMut::new(out, *out_channels, frames, S::BYTES);
            run::<S, _, _>(plan, &Planar(*views), &mut dst, frames);
        }
        (SourceBuffer::Planar(views), DestBuffer::Planar(out)) => {
            run::<S, _, _>(plan, &Planar(*views), &mut PlanarMut(out.as_mut_slice()), frames);
        }
    }
}

fn run<S, R, W>(plan: &RoutingPlan, src: &R, dst: &mut W, frames: usize)
where
    S: Sample,
    R: SampleRead,
    W: SampleWrite,
{
    if let Some(map) = plan.permutation() {
        for frame in 0..frames {
            for (channel, &from) in map.iter().enumerate() {
                dst.raw_mut(frame, channel, S::BYTES)
                    .copy_from_slice(src.raw(frame, from as usize, S::BYTES));
            }
        }
        return;
    }

    for frame in 0..frames {
        for op in plan.ops() {
            let get = |channel: u8| S::read(src.raw(frame, channel as usize, S::BYTES));
            let value = match op.kind {
                OpKind::Select(a) => get(a),
                OpKind::Constant(v) => S::from_constant(v),
                OpKind::Add(a, b) => get(a).mix_add(get(b)),
                OpKind::AddConstant(a, v) => get(a).add_constant(v),
                OpKind::Subtract(a, b) => get(a).mix_sub(get(b)),
                OpKind::SubtractConstant(a, v) => get(a).sub_constant(v),
            };
            value.write(dst.raw_mut(frame, op.dst as usize, S::BYTES));
        }
    }
}

trait SampleRead {
    fn raw(&self, frame: usize, channel: usize, width: usize) -> &[u8];
}

trait SampleWrite {
    fn raw_mut(&mut self, frame: usize, channel: usize, width: usize) -> &mut [u8];
}

struct Interleaved<'a> {
    data: &'a [u8],
    frame_bytes: usize,
}

impl<'a> Interleaved<'a> {
    fn new(data: &'a [u8], channels: usize, frames: usize, width: usize) -> Self {
        let frame_bytes = channels * width;
        assert!(
            data.len() >= frames * frame_bytes,
            "source holds {} bytes, {} frames need {}",
            data.len(),
            frames,
            frames * frame_bytes
        );
        Self { data, frame_bytes }
    }
}

impl SampleRead for Interleaved<'_> {
    #[inline]
    fn raw(&self, frame: usize, channel: usize, width: usize) -> &[u8] {
        let start = frame * self.frame_bytes + channel * width;
        &self.data[start..start + width]
    }
}

struct InterleavedMut<'a> {
    data: &'a mut [u8],
    frame_bytes: usize,
}

impl<'a> InterleavedMut<'a> {
    fn new(data: &'a mut [u8], channels: usize, frames: usize, width: usize) -> Self {
        let frame_bytes = channels * width;
        assert!(
            data.len() >= frames * frame_bytes,
            "destination holds {} bytes, {} frames need {}",
            data.len(),
            frames,
            frames * frame_bytes
        );
        Self { data, frame_bytes }
    }
}

impl SampleWrite for InterleavedMut<'_> {
    #[inline]
    fn raw_mut(&mut self, frame: usize, channel: usize, width: usize) -> &mut [u8] {
        let start = frame * self.frame_bytes + channel * width;
        &mut self.data[start..start + width]
    }
}

struct Planar<'a, 'b>(&'b [ChannelView<'a>]);

impl SampleRead for Planar<'_, '_> {
    #[inline]
    fn raw(&self, frame: usize, channel: usize, width: usize) -> &[u8] {
        self.0[channel].sample(frame, width)
    }
}

struct PlanarMut<'a, 'b>(&'b mut [ChannelViewMut<'a>]);

impl SampleWrite for PlanarMut<'_, '_> {
    #[inline]
    fn raw_mut(&mut self, frame: usize, channel: usize, width: usize) -> &mut [u8] {
        self.0[channel].sample_mut(frame, width)
    }
}
