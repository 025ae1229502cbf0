//! Audio subsystem module

pub mod buffer;
pub mod dispatch;
pub mod io;
pub mod sample;
pub mod silence;

pub use buffer::{ChannelView, ChannelViewMut, DestBuffer, SourceBuffer};
pub use dispatch::apply;
pub use io::{FrameSink, FrameSource, RawPcmSink, RawPcmSource, ToneSource};
pub use sample::{Sample, SampleWidth};
pub use silence::fill_silence;
