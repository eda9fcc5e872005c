//! Value types shared by every soundport backend.
//!
//! - [`ChannelId`] / [`ChannelLayout`]: speaker and microphone channel roles
//! - [`SampleFormat`]: sample encodings, byte sizes, endian handling and the
//!   `f64` sample codec used on the realtime path
//! - [`SampleRateRange`]: inclusive sample rate ranges advertised by devices

pub mod format;
pub mod layout;
pub mod rate;

pub use format::{Endian, SampleFormat};
pub use layout::{ChannelId, ChannelLayout, ChannelLayoutId, LayoutError, MAX_CHANNELS};
pub use rate::{nearest_sample_rate, SampleRateRange, MAX_SAMPLE_RATE, MIN_SAMPLE_RATE};
