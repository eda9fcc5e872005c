//! Backend capability interface.
//!
//! A backend connects to one platform audio system, reports its devices and
//! opens playback streams that pull samples on a thread the backend owns.
//! Backends never hold references to contexts or streams; they report
//! through an [`EventSink`] or [`StreamSink`], which resolve a handle through
//! the callback registry.

pub mod dummy;

#[cfg(feature = "cpal")]
pub mod cpal;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use soundport_format::{ChannelLayout, SampleFormat, SampleRateRange};

use crate::callbacks::{EventSink, StreamSink};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    Dummy,
    Alsa,
    PulseAudio,
    Jack,
    CoreAudio,
    Wasapi,
}

impl BackendKind {
    /// Order in which an automatic connect tries backends.
    pub const PRIORITY: [BackendKind; 6] = [
        BackendKind::Jack,
        BackendKind::PulseAudio,
        BackendKind::Alsa,
        BackendKind::CoreAudio,
        BackendKind::Wasapi,
        BackendKind::Dummy,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BackendKind::Dummy => "Dummy",
            BackendKind::Alsa => "ALSA",
            BackendKind::PulseAudio => "PulseAudio",
            BackendKind::Jack => "JACK",
            BackendKind::CoreAudio => "CoreAudio",
            BackendKind::Wasapi => "WASAPI",
        }
    }

    /// Lower-case identifier accepted by [`FromStr`].
    pub fn id(self) -> &'static str {
        match self {
            BackendKind::Dummy => "dummy",
            BackendKind::Alsa => "alsa",
            BackendKind::PulseAudio => "pulseaudio",
            BackendKind::Jack => "jack",
            BackendKind::CoreAudio => "coreaudio",
            BackendKind::Wasapi => "wasapi",
        }
    }

    /// Whether this build can drive the backend on this platform.
    pub fn is_available(self) -> bool {
        match self {
            BackendKind::Dummy => true,
            BackendKind::Alsa => cfg!(all(
                feature = "cpal",
                any(
                    target_os = "linux",
                    target_os = "dragonfly",
                    target_os = "freebsd",
                    target_os = "netbsd"
                )
            )),
            BackendKind::Jack => cfg!(all(
                feature = "jack",
                any(
                    target_os = "linux",
                    target_os = "dragonfly",
                    target_os = "freebsd",
                    target_os = "netbsd",
                    target_os = "macos",
                    target_os = "windows"
                )
            )),
            BackendKind::CoreAudio => cfg!(all(feature = "cpal", target_os = "macos")),
            BackendKind::Wasapi => cfg!(all(feature = "cpal", target_os = "windows")),
            BackendKind::PulseAudio => false,
        }
    }

    /// Instantiate an unconnected backend of this kind.
    pub(crate) fn create(self) -> Result<Box<dyn Backend>> {
        if !self.is_available() {
            return Err(Error::BackendUnavailable);
        }
        match self {
            BackendKind::Dummy => Ok(Box::new(dummy::DummyBackend::new())),
            #[cfg(feature = "cpal")]
            _ => Ok(Box::new(self::cpal::CpalBackend::new(self)?)),
            #[cfg(not(feature = "cpal"))]
            _ => Err(Error::BackendUnavailable),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        BackendKind::PRIORITY
            .into_iter()
            .find(|kind| kind.id().eq_ignore_ascii_case(s) || kind.name().eq_ignore_ascii_case(s))
            .ok_or(Error::BackendUnavailable)
    }
}

/// Backends this build can drive, in connect priority order.
pub fn available_backends() -> Vec<BackendKind> {
    BackendKind::PRIORITY
        .into_iter()
        .filter(|kind| kind.is_available())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceAim {
    Input,
    Output,
}

impl fmt::Display for DeviceAim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceAim::Input => f.write_str("input"),
            DeviceAim::Output => f.write_str("output"),
        }
    }
}

/// Result of a successful device probe.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceCapabilities {
    pub layouts: Vec<ChannelLayout>,
    pub formats: Vec<SampleFormat>,
    pub sample_rates: Vec<SampleRateRange>,
    pub current_layout: ChannelLayout,
    pub current_format: SampleFormat,
    /// 0 when the backend does not know.
    pub sample_rate_current: u32,
    pub software_latency_min: f64,
    pub software_latency_max: f64,
    /// 0.0 when the backend does not know.
    pub software_latency_current: f64,
}

/// A device as the backend reported it at enumeration time.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceDescriptor {
    pub id: String,
    pub name: String,
    pub aim: DeviceAim,
    pub is_raw: bool,
    pub probe: std::result::Result<DeviceCapabilities, Error>,
}

#[derive(Debug, Clone, Default)]
pub struct DeviceEnumeration {
    pub inputs: Vec<DeviceDescriptor>,
    pub outputs: Vec<DeviceDescriptor>,
    pub default_input: Option<usize>,
    pub default_output: Option<usize>,
}

/// Negotiated stream configuration handed to the backend at open.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamParams {
    pub format: SampleFormat,
    pub layout: ChannelLayout,
    pub sample_rate: u32,
    /// 0.0 lets the backend choose.
    pub software_latency: f64,
    pub name: String,
    pub bytes_per_sample: usize,
    pub bytes_per_frame: usize,
}

/// Location of one channel's samples inside a writable region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelArea {
    /// Byte offset of the channel's first sample.
    pub offset: usize,
    /// Bytes between consecutive samples of the channel.
    pub step: usize,
}

impl ChannelArea {
    /// Describe an interleaved region: frame after frame, channel after channel.
    pub fn fill_interleaved(areas: &mut [ChannelArea], bytes_per_sample: usize) {
        let step = areas.len() * bytes_per_sample;
        for (channel, area) in areas.iter_mut().enumerate() {
            *area = ChannelArea {
                offset: channel * bytes_per_sample,
                step,
            };
        }
    }
}

/// Writable memory a backend lends to the write callback.
///
/// Implementations must not allocate or block in any of these methods; they
/// run on the audio thread.
pub trait PlaybackBuffer {
    /// Reserve up to `frame_count` frames, describe them in `areas` (one entry
    /// per channel) and return the number of frames granted. 0 means no space
    /// is left in this callback.
    fn begin_write(&mut self, frame_count: usize, areas: &mut [ChannelArea]) -> Result<usize>;

    /// The region reserved by the last `begin_write`.
    fn region_mut(&mut self) -> &mut [u8];

    /// Commit the reserved region.
    fn end_write(&mut self) -> Result<()>;
}

pub trait Backend: Send {
    fn kind(&self) -> BackendKind;

    /// Connect to the audio system. `events` stays valid for the lifetime of
    /// the connection and may be used from any thread.
    fn connect(&mut self, events: EventSink) -> Result<()>;

    /// Probe every device. Called at connect and after each devices-changed
    /// notification.
    fn enumerate(&mut self) -> Result<DeviceEnumeration>;

    fn open_output_stream(
        &mut self,
        device: &DeviceDescriptor,
        params: &StreamParams,
        sink: StreamSink,
    ) -> Result<Box<dyn BackendStream>>;
}

/// An opened playback stream. Dropping it stops its audio thread; no sink
/// call happens after drop returns.
pub trait BackendStream: Send {
    fn start(&mut self) -> Result<()>;

    fn pause(&mut self, pause: bool) -> Result<()>;

    fn clear_buffer(&mut self) -> Result<()>;

    /// The software latency actually in effect, in seconds.
    fn software_latency(&self) -> f64;

    /// Layout problem the backend accepted the stream with, if any.
    fn layout_error(&self) -> Option<Error> {
        None
    }

    /// Seconds until a sample written now is heard.
    fn latency(&self) -> Result<f64>;
}
