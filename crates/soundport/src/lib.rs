//! Cross-platform audio output on top of pluggable backends.
//!
//! A [`Context`] connects to one backend and lists its [`Device`]s. A device
//! creates [`OutStream`]s, whose write callback runs on the backend's audio
//! thread and fills buffers through [`OutStreamWriter`] and [`ChannelAreas`].

pub mod backend;
pub mod callbacks;
pub mod context;
pub mod device;
pub mod error;
mod handle;
pub mod outstream;
mod registry;

pub use backend::{available_backends, Backend, BackendKind, BackendStream, DeviceAim};
pub use callbacks::{EventSink, StreamSink};
pub use context::{Context, ContextOptions, Waker};
pub use device::Device;
pub use error::{Error, Result};
pub use handle::Handle;
pub use outstream::{ChannelAreas, OutStream, OutStreamWriter, StreamState};
pub use soundport_format::{
    ChannelId, ChannelLayout, ChannelLayoutId, Endian, SampleFormat, SampleRateRange, MAX_CHANNELS,
};
