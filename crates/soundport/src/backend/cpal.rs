//! ALSA, JACK, CoreAudio and WASAPI through cpal.
//!
//! cpal streams are not `Send` on every host, so each stream lives on its own
//! thread and is driven through a command channel. cpal reports channel
//! counts only; a device advertises the conventional layout for each count it
//! accepts.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use ::cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use ::cpal::{
    BufferSize, BuildStreamError, HostId, PauseStreamError, PlayStreamError, SampleRate,
    StreamConfig, StreamError, SupportedBufferSize, SupportedStreamConfigRange,
    SupportedStreamConfigsError,
};
use crossbeam_channel::{Receiver, Sender};
use soundport_format::{ChannelId, ChannelLayout, SampleFormat, SampleRateRange, MAX_CHANNELS};
use tracing::{debug, error, info, warn};

use super::{
    Backend, BackendKind, BackendStream, ChannelArea, DeviceAim, DeviceCapabilities,
    DeviceDescriptor, DeviceEnumeration, PlaybackBuffer, StreamParams,
};
use crate::callbacks::{EventSink, StreamSink};
use crate::error::{Error, Result};

/// Latency range assumed when a host does not report buffer sizes.
const UNKNOWN_LATENCY_RANGE: (f64, f64) = (0.0, 4.0);

pub struct CpalBackend {
    kind: BackendKind,
    host_id: HostId,
    events: Option<EventSink>,
}

impl CpalBackend {
    pub fn new(kind: BackendKind) -> Result<Self> {
        let host_id = ::cpal::available_hosts()
            .into_iter()
            .find(|id| id.name().eq_ignore_ascii_case(kind.name()))
            .ok_or(Error::BackendUnavailable)?;
        Ok(Self {
            kind,
            host_id,
            events: None,
        })
    }

    fn host(&self) -> Result<::cpal::Host> {
        ::cpal::host_from_id(self.host_id).map_err(|e| {
            warn!("{} host unavailable: {e}", self.kind);
            Error::InitFailed
        })
    }
}

fn map_format(format: ::cpal::SampleFormat) -> Option<SampleFormat> {
    use ::cpal::SampleFormat as Cpal;
    match format {
        Cpal::I8 => Some(SampleFormat::S8),
        Cpal::U8 => Some(SampleFormat::U8),
        Cpal::I16 => Some(SampleFormat::S16_NE),
        Cpal::U16 => Some(SampleFormat::U16_NE),
        Cpal::I32 => Some(SampleFormat::S32_NE),
        Cpal::U32 => Some(SampleFormat::U32_NE),
        Cpal::F32 => Some(SampleFormat::FLOAT32_NE),
        Cpal::F64 => Some(SampleFormat::FLOAT64_NE),
        _ => None,
    }
}

fn unmap_format(format: SampleFormat) -> Option<::cpal::SampleFormat> {
    use ::cpal::SampleFormat as Cpal;
    match format {
        SampleFormat::S8 => Some(Cpal::I8),
        SampleFormat::U8 => Some(Cpal::U8),
        f if f == SampleFormat::S16_NE => Some(Cpal::I16),
        f if f == SampleFormat::U16_NE => Some(Cpal::U16),
        f if f == SampleFormat::S32_NE => Some(Cpal::I32),
        f if f == SampleFormat::U32_NE => Some(Cpal::U32),
        f if f == SampleFormat::FLOAT32_NE => Some(Cpal::F32),
        f if f == SampleFormat::FLOAT64_NE => Some(Cpal::F64),
        _ => None,
    }
}

/// The layout cpal plays a channel count with.
fn layout_for_channels(channels: usize) -> Option<ChannelLayout> {
    if channels == 0 || channels > MAX_CHANNELS {
        return None;
    }
    ChannelLayout::default_for_channel_count(channels).or_else(|| {
        let aux: Vec<ChannelId> = (0..channels)
            .map(|i| ChannelId::aux(i).unwrap_or(ChannelId::Aux))
            .collect();
        ChannelLayout::new(&aux).ok()
    })
}

fn probe_error(err: SupportedStreamConfigsError) -> Error {
    match err {
        SupportedStreamConfigsError::DeviceNotAvailable => Error::NoSuchDevice,
        _ => Error::OpeningDevice,
    }
}

fn probe(device: &::cpal::Device, aim: DeviceAim) -> std::result::Result<DeviceCapabilities, Error> {
    let (ranges, default) = match aim {
        DeviceAim::Output => (
            device
                .supported_output_configs()
                .map_err(probe_error)?
                .collect::<Vec<SupportedStreamConfigRange>>(),
            device.default_output_config().ok(),
        ),
        DeviceAim::Input => (
            device
                .supported_input_configs()
                .map_err(probe_error)?
                .collect::<Vec<SupportedStreamConfigRange>>(),
            device.default_input_config().ok(),
        ),
    };
    if ranges.is_empty() {
        return Err(Error::IncompatibleDevice);
    }

    let mut layouts = Vec::new();
    let mut formats = Vec::new();
    let mut sample_rates = Vec::new();
    let mut frames_min = u32::MAX;
    let mut frames_max = 0;
    for range in &ranges {
        if let Some(layout) = layout_for_channels(range.channels() as usize) {
            if !layouts.contains(&layout) {
                layouts.push(layout);
            }
        }
        if let Some(format) = map_format(range.sample_format()) {
            if !formats.contains(&format) {
                formats.push(format);
            }
        }
        let rates = SampleRateRange::new(range.min_sample_rate().0, range.max_sample_rate().0);
        if !sample_rates.contains(&rates) {
            sample_rates.push(rates);
        }
        if let SupportedBufferSize::Range { min, max } = range.buffer_size() {
            frames_min = frames_min.min(*min);
            frames_max = frames_max.max(*max);
        }
    }
    if formats.is_empty() || layouts.is_empty() {
        return Err(Error::IncompatibleDevice);
    }
    ChannelLayout::sort_by_channel_count(&mut layouts);

    let current_layout = default
        .as_ref()
        .and_then(|c| layout_for_channels(c.channels() as usize))
        .unwrap_or_default();
    let current_format = default
        .as_ref()
        .and_then(|c| map_format(c.sample_format()))
        .unwrap_or(SampleFormat::Invalid);
    let sample_rate_current = default.as_ref().map_or(0, |c| c.sample_rate().0);

    let (software_latency_min, software_latency_max) = match sample_rate_current {
        rate if rate > 0 && frames_max > 0 => (
            frames_min as f64 / rate as f64,
            frames_max as f64 / rate as f64,
        ),
        _ => UNKNOWN_LATENCY_RANGE,
    };

    Ok(DeviceCapabilities {
        layouts,
        formats,
        sample_rates,
        current_layout,
        current_format,
        sample_rate_current,
        software_latency_min,
        software_latency_max,
        software_latency_current: 0.0,
    })
}

fn describe(devices: impl Iterator<Item = ::cpal::Device>, aim: DeviceAim) -> Vec<DeviceDescriptor> {
    devices
        .filter_map(|device| {
            let name = match device.name() {
                Ok(name) => name,
                Err(e) => {
                    debug!("Skipping unnamed {aim} device: {e}");
                    return None;
                }
            };
            Some(DeviceDescriptor {
                id: name.clone(),
                name,
                aim,
                is_raw: false,
                probe: probe(&device, aim),
            })
        })
        .collect()
}

fn default_index(devices: &[DeviceDescriptor], default: Option<::cpal::Device>) -> Option<usize> {
    let name = default.and_then(|d| d.name().ok())?;
    devices.iter().position(|d| d.id == name)
}

impl Backend for CpalBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn connect(&mut self, events: EventSink) -> Result<()> {
        self.host()?;
        info!("Connected to {} through cpal", self.kind);
        self.events = Some(events);
        Ok(())
    }

    fn enumerate(&mut self) -> Result<DeviceEnumeration> {
        let host = self.host()?;
        let outputs = match host.output_devices() {
            Ok(devices) => describe(devices, DeviceAim::Output),
            Err(e) => {
                warn!("Failed to enumerate {} output devices: {e}", self.kind);
                Vec::new()
            }
        };
        let inputs = match host.input_devices() {
            Ok(devices) => describe(devices, DeviceAim::Input),
            Err(e) => {
                warn!("Failed to enumerate {} input devices: {e}", self.kind);
                Vec::new()
            }
        };
        Ok(DeviceEnumeration {
            default_output: default_index(&outputs, host.default_output_device()),
            default_input: default_index(&inputs, host.default_input_device()),
            inputs,
            outputs,
        })
    }

    fn open_output_stream(
        &mut self,
        device: &DeviceDescriptor,
        params: &StreamParams,
        sink: StreamSink,
    ) -> Result<Box<dyn BackendStream>> {
        let stream = CpalStream::open(self.host_id, device, params, sink)?;
        Ok(Box::new(stream))
    }
}

// ─── Streams ───────────────────────────────────────────────────────────────

enum Command {
    Play(Sender<Result<()>>),
    Pause(Sender<Result<()>>),
    /// Pause or resume asked for by the write callback. Nobody waits on it.
    Hold(bool),
    Close,
}

pub struct CpalStream {
    commands: Sender<Command>,
    thread: Option<JoinHandle<()>>,
    software_latency: f64,
    layout_error: Option<Error>,
    /// Seconds, stored as `f64` bits.
    latency: Arc<AtomicU64>,
}

fn build_error(err: BuildStreamError) -> Error {
    match err {
        BuildStreamError::DeviceNotAvailable => Error::NoSuchDevice,
        BuildStreamError::StreamConfigNotSupported | BuildStreamError::InvalidArgument => {
            Error::IncompatibleDevice
        }
        BuildStreamError::StreamIdOverflow => Error::SystemResources,
        BuildStreamError::BackendSpecific { err } => {
            warn!("cpal: {err}");
            Error::OpeningDevice
        }
    }
}

fn play_error(err: PlayStreamError) -> Error {
    warn!("cpal play failed: {err}");
    Error::Streaming
}

fn pause_error(err: PauseStreamError) -> Error {
    warn!("cpal pause failed: {err}");
    Error::Streaming
}

/// Borrowed cpal output buffer.
struct CpalBuffer<'a> {
    bytes: &'a mut [u8],
    bytes_per_frame: usize,
    bytes_per_sample: usize,
    frames: usize,
    written: usize,
    pending: usize,
}

impl PlaybackBuffer for CpalBuffer<'_> {
    fn begin_write(&mut self, frame_count: usize, areas: &mut [ChannelArea]) -> Result<usize> {
        self.pending = frame_count.min(self.frames - self.written);
        ChannelArea::fill_interleaved(areas, self.bytes_per_sample);
        Ok(self.pending)
    }

    fn region_mut(&mut self) -> &mut [u8] {
        let start = self.written * self.bytes_per_frame;
        &mut self.bytes[start..start + self.pending * self.bytes_per_frame]
    }

    fn end_write(&mut self) -> Result<()> {
        self.written += self.pending;
        self.pending = 0;
        Ok(())
    }
}

impl CpalStream {
    fn open(
        host_id: HostId,
        device: &DeviceDescriptor,
        params: &StreamParams,
        sink: StreamSink,
    ) -> Result<Self> {
        let sample_format = unmap_format(params.format).ok_or(Error::IncompatibleDevice)?;
        let channels = params.layout.channel_count();
        let layout_error = match ChannelLayout::default_for_channel_count(channels) {
            Some(expected) if expected != params.layout => Some(Error::IncompatibleDevice),
            _ => None,
        };

        let (buffer_size, software_latency) = match params.software_latency {
            latency if latency > 0.0 => {
                let frames = (latency * params.sample_rate as f64).round().max(1.0) as u32;
                (BufferSize::Fixed(frames), frames as f64 / params.sample_rate as f64)
            }
            _ => (BufferSize::Default, 0.0),
        };
        let config = StreamConfig {
            channels: channels as u16,
            sample_rate: SampleRate(params.sample_rate),
            buffer_size,
        };

        let (commands, command_rx) = crossbeam_channel::unbounded();
        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);
        let latency = Arc::new(AtomicU64::new(0f64.to_bits()));
        let worker = StreamWorker {
            host_id,
            device_id: device.id.clone(),
            config,
            sample_format,
            format: params.format,
            bytes_per_frame: params.bytes_per_frame,
            bytes_per_sample: params.bytes_per_sample,
            sink,
            latency: Arc::clone(&latency),
            hold: commands.clone(),
        };
        let thread = std::thread::Builder::new()
            .name(format!("soundport-{}", params.name))
            .spawn(move || worker.run(command_rx, ready_tx))
            .map_err(|e| {
                warn!("Failed to spawn stream thread: {e}");
                Error::SystemResources
            })?;

        let ready = ready_rx.recv().unwrap_or(Err(Error::OpeningDevice));
        if let Err(err) = ready {
            let _ = thread.join();
            return Err(err);
        }
        Ok(Self {
            commands,
            thread: Some(thread),
            software_latency,
            layout_error,
            latency,
        })
    }

    fn request(&self, command: impl FnOnce(Sender<Result<()>>) -> Command) -> Result<()> {
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        self.commands
            .send(command(reply_tx))
            .map_err(|_| Error::Streaming)?;
        reply_rx.recv().unwrap_or(Err(Error::Streaming))
    }
}

impl BackendStream for CpalStream {
    fn start(&mut self) -> Result<()> {
        self.request(Command::Play)
    }

    fn pause(&mut self, pause: bool) -> Result<()> {
        match pause {
            true => self.request(Command::Pause),
            false => self.request(Command::Play),
        }
    }

    fn clear_buffer(&mut self) -> Result<()> {
        Err(Error::IncompatibleBackend)
    }

    fn software_latency(&self) -> f64 {
        self.software_latency
    }

    fn layout_error(&self) -> Option<Error> {
        self.layout_error
    }

    fn latency(&self) -> Result<f64> {
        Ok(f64::from_bits(self.latency.load(Ordering::Relaxed)))
    }
}

impl Drop for CpalStream {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Close);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("cpal stream thread panicked");
            }
        }
    }
}

/// Everything the stream thread needs to build and own the cpal stream.
struct StreamWorker {
    host_id: HostId,
    device_id: String,
    config: StreamConfig,
    sample_format: ::cpal::SampleFormat,
    format: SampleFormat,
    bytes_per_frame: usize,
    bytes_per_sample: usize,
    sink: StreamSink,
    latency: Arc<AtomicU64>,
    hold: Sender<Command>,
}

impl StreamWorker {
    fn find_device(&self) -> Result<::cpal::Device> {
        let host = ::cpal::host_from_id(self.host_id).map_err(|_| Error::BackendDisconnected)?;
        let mut devices = host.output_devices().map_err(|_| Error::OpeningDevice)?;
        devices
            .find(|d| d.name().is_ok_and(|name| name == self.device_id))
            .ok_or(Error::NoSuchDevice)
    }

    fn build(&self) -> Result<::cpal::Stream> {
        let device = self.find_device()?;
        let sink = self.sink.clone();
        let error_sink = self.sink.clone();
        let latency = Arc::clone(&self.latency);
        let hold = self.hold.clone();
        let format = self.format;
        let bytes_per_frame = self.bytes_per_frame;
        let bytes_per_sample = self.bytes_per_sample;
        let mut primed = false;

        let data_callback = move |data: &mut ::cpal::Data, info: &::cpal::OutputCallbackInfo| {
            let timestamp = info.timestamp();
            if let Some(delay) = timestamp.playback.duration_since(&timestamp.callback) {
                latency.store(delay.as_secs_f64().to_bits(), Ordering::Relaxed);
            }

            let bytes = data.bytes_mut();
            let frames = bytes.len() / bytes_per_frame;
            let mut buffer = CpalBuffer {
                bytes,
                bytes_per_frame,
                bytes_per_sample,
                frames,
                written: 0,
                pending: 0,
            };
            let pause = sink.write(frames, frames, &mut buffer);

            let written = buffer.written;
            if written < frames {
                format.fill_silence(&mut buffer.bytes[written * bytes_per_frame..]);
                if primed && pause != Some(true) {
                    sink.underflow();
                }
            }
            primed |= written > 0;
            if let Some(pause) = pause {
                let _ = hold.try_send(Command::Hold(pause));
            }
        };
        let error_callback = move |err: StreamError| {
            error!("cpal stream error: {err}");
            error_sink.error(Error::Streaming);
        };

        device
            .build_output_stream_raw(&self.config, self.sample_format, data_callback, error_callback, None)
            .map_err(build_error)
    }

    fn run(self, commands: Receiver<Command>, ready: Sender<Result<()>>) {
        let stream = match self.build() {
            Ok(stream) => {
                let _ = ready.send(Ok(()));
                stream
            }
            Err(err) => {
                let _ = ready.send(Err(err));
                return;
            }
        };
        debug!(
            "cpal stream on {} built: {:?} {} channels",
            self.device_id, self.sample_format, self.config.channels
        );

        while let Ok(command) = commands.recv() {
            match command {
                Command::Play(reply) => {
                    let _ = reply.send(stream.play().map_err(play_error));
                }
                Command::Pause(reply) => {
                    let _ = reply.send(stream.pause().map_err(pause_error));
                }
                Command::Hold(pause) => {
                    let result = match pause {
                        true => stream.pause().map_err(pause_error),
                        false => stream.play().map_err(play_error),
                    };
                    if let Err(err) = result {
                        warn!("cpal stream on {}: hold({pause}) failed: {err}", self.device_id);
                    }
                }
                Command::Close => break,
            }
        }
        drop(stream);
        debug!("cpal stream on {} closed", self.device_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_mapping_round_trips() {
        for format in SampleFormat::ALL {
            if let Some(cpal_format) = unmap_format(format) {
                assert_eq!(map_format(cpal_format), Some(format));
            }
        }
        assert_eq!(unmap_format(SampleFormat::S24_NE), None);
        assert_eq!(unmap_format(SampleFormat::FLOAT32_NE.swap_endian()), None);
    }

    #[test]
    fn test_layout_for_channels() {
        assert_eq!(layout_for_channels(2), Some(ChannelLayout::stereo()));
        let wide = layout_for_channels(10).unwrap();
        assert_eq!(wide.channel_count(), 10);
        assert_eq!(wide.channels()[9], ChannelId::Aux9);
        assert_eq!(layout_for_channels(0), None);
        assert_eq!(layout_for_channels(MAX_CHANNELS + 1), None);
    }

    #[test]
    fn test_buffer_grants_remaining_frames() {
        let mut bytes = [0u8; 16];
        let mut buffer = CpalBuffer {
            bytes: &mut bytes,
            bytes_per_frame: 4,
            bytes_per_sample: 2,
            frames: 4,
            written: 0,
            pending: 0,
        };
        let mut areas = [ChannelArea::default(); 2];
        assert_eq!(buffer.begin_write(3, &mut areas).unwrap(), 3);
        buffer.end_write().unwrap();
        assert_eq!(buffer.begin_write(3, &mut areas).unwrap(), 1);
        assert_eq!(buffer.region_mut().len(), 4);
        buffer.end_write().unwrap();
        assert_eq!(buffer.begin_write(3, &mut areas).unwrap(), 0);
    }
}
