//! Output streams and the realtime write protocol.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use soundport_format::{ChannelLayout, SampleFormat, MAX_CHANNELS};
use tracing::{debug, error, info, warn};

use crate::backend::{BackendStream, ChannelArea, PlaybackBuffer, StreamParams};
use crate::callbacks::StreamSink;
use crate::device::Device;
use crate::error::{Error, Result};
use crate::handle::Handle;
use crate::registry::STREAMS;

/// Sample rate an unconfigured stream asks for.
pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

/// Called on the audio thread with `(writer, frame_count_min, frame_count_max)`.
///
/// Returning `Err(Error::Underflow)` counts an underflow. Any other error
/// fails the stream and is reported to the error callback.
pub type WriteCallback = Box<dyn FnMut(&mut OutStreamWriter<'_>, usize, usize) -> Result<()> + Send>;
pub type UnderflowCallback = Box<dyn FnMut() + Send>;
pub type ErrorCallback = Box<dyn FnMut(Error) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamState {
    Created,
    Opened,
    Started,
    Paused,
    /// A realtime error stopped the stream. Only disposal remains.
    Failed,
    Destroyed,
}

const PAUSE_NONE: u8 = 0;
const PAUSE_HOLD: u8 = 1;
const PAUSE_RESUME: u8 = 2;

#[derive(Debug, Clone, PartialEq)]
struct StreamConfig {
    format: SampleFormat,
    sample_rate: u32,
    layout: ChannelLayout,
    software_latency: f64,
    name: String,
}

#[derive(Default)]
struct PendingCallbacks {
    write: Option<WriteCallback>,
    underflow: Option<UnderflowCallback>,
    error: Option<ErrorCallback>,
}

/// Stream state reachable from the audio thread through the registry.
pub(crate) struct StreamShared {
    handle: Handle,
    params: StreamParams,
    write: Mutex<WriteCallback>,
    underflow: Mutex<Option<UnderflowCallback>>,
    error: Mutex<Option<ErrorCallback>>,
    failed: AtomicBool,
    paused: AtomicBool,
    pause_request: AtomicU8,
    frames_written: AtomicU64,
    underflow_count: AtomicU64,
}

impl StreamShared {
    fn new(handle: Handle, params: StreamParams, write: WriteCallback, callbacks: PendingCallbacks) -> Self {
        Self {
            handle,
            params,
            write: Mutex::new(write),
            underflow: Mutex::new(callbacks.underflow),
            error: Mutex::new(callbacks.error),
            failed: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            pause_request: AtomicU8::new(PAUSE_NONE),
            frames_written: AtomicU64::new(0),
            underflow_count: AtomicU64::new(0),
        }
    }

    fn into_callbacks(self) -> PendingCallbacks {
        PendingCallbacks {
            write: Some(self.write.into_inner()),
            underflow: self.underflow.into_inner(),
            error: self.error.into_inner(),
        }
    }

    /// Run the write callback. Returns the pause state the callback asked
    /// for, which the backend applies once this returns.
    pub(crate) fn dispatch_write(
        &self,
        frame_count_min: usize,
        frame_count_max: usize,
        buffer: &mut dyn PlaybackBuffer,
    ) -> Option<bool> {
        if self.failed.load(Ordering::Acquire) {
            return None;
        }
        let result = {
            let mut guard = self.write.lock();
            let callback: &mut WriteCallback = &mut guard;
            let mut writer = OutStreamWriter::new(
                &self.params,
                buffer,
                &self.frames_written,
                &self.pause_request,
            );
            callback(&mut writer, frame_count_min, frame_count_max)
        };
        match result {
            Ok(()) => {}
            Err(Error::Underflow) => self.dispatch_underflow(),
            Err(err) => {
                self.pause_request.store(PAUSE_NONE, Ordering::Release);
                self.dispatch_error(err);
                return None;
            }
        }
        let pause = match self.pause_request.swap(PAUSE_NONE, Ordering::AcqRel) {
            PAUSE_HOLD => true,
            PAUSE_RESUME => false,
            _ => return None,
        };
        self.paused.store(pause, Ordering::Release);
        Some(pause)
    }

    pub(crate) fn dispatch_underflow(&self) {
        self.underflow_count.fetch_add(1, Ordering::Relaxed);
        if let Some(callback) = self.underflow.lock().as_mut() {
            callback();
        }
    }

    pub(crate) fn dispatch_error(&self, err: Error) {
        self.failed.store(true, Ordering::Release);
        match self.error.lock().as_mut() {
            Some(callback) => callback(err),
            None => error!("Stream {} failed: {err}", self.handle),
        }
    }
}

/// A playback stream on one device.
///
/// Configure it while [`StreamState::Created`], then [`open`](Self::open) and
/// [`start`](Self::start). Dropping the stream disposes it.
pub struct OutStream {
    device: Option<Device>,
    config: StreamConfig,
    callbacks: PendingCallbacks,
    state: StreamState,
    shared: Option<Arc<StreamShared>>,
    backend: Option<Box<dyn BackendStream>>,
    layout_error: Option<Error>,
}

impl OutStream {
    pub(crate) fn new(device: Device) -> Self {
        debug!("Output stream created on {}", device.id());
        Self {
            device: Some(device),
            config: StreamConfig {
                format: SampleFormat::Invalid,
                sample_rate: 0,
                layout: ChannelLayout::default(),
                software_latency: 0.0,
                name: String::from("SoundPortOutStream"),
            },
            callbacks: PendingCallbacks::default(),
            state: StreamState::Created,
            shared: None,
            backend: None,
            layout_error: None,
        }
    }

    // ─── Configuration ─────────────────────────────────────────────────────

    fn configurable(&mut self) -> Result<&mut Self> {
        match self.state {
            StreamState::Created => Ok(self),
            _ => Err(Error::InvalidState),
        }
    }

    /// `SampleFormat::Invalid` picks a format at open.
    pub fn set_format(&mut self, format: SampleFormat) -> Result<()> {
        self.configurable()?.config.format = format;
        Ok(())
    }

    /// 0 picks the rate nearest [`DEFAULT_SAMPLE_RATE`] at open.
    pub fn set_sample_rate(&mut self, sample_rate: u32) -> Result<()> {
        self.configurable()?.config.sample_rate = sample_rate;
        Ok(())
    }

    /// An empty layout picks one at open.
    pub fn set_layout(&mut self, layout: ChannelLayout) -> Result<()> {
        self.configurable()?.config.layout = layout;
        Ok(())
    }

    /// Target buffering in seconds. 0 lets the backend choose.
    pub fn set_software_latency(&mut self, seconds: f64) -> Result<()> {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(Error::InvalidState);
        }
        self.configurable()?.config.software_latency = seconds;
        Ok(())
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> Result<()> {
        self.configurable()?.config.name = name.into();
        Ok(())
    }

    pub fn set_write_callback<F>(&mut self, callback: F) -> Result<()>
    where
        F: FnMut(&mut OutStreamWriter<'_>, usize, usize) -> Result<()> + Send + 'static,
    {
        self.configurable()?.callbacks.write = Some(Box::new(callback));
        Ok(())
    }

    pub fn clear_write_callback(&mut self) -> Result<()> {
        self.configurable()?.callbacks.write = None;
        Ok(())
    }

    pub fn set_underflow_callback<F>(&mut self, callback: F) -> Result<()>
    where
        F: FnMut() + Send + 'static,
    {
        self.configurable()?.callbacks.underflow = Some(Box::new(callback));
        Ok(())
    }

    pub fn clear_underflow_callback(&mut self) -> Result<()> {
        self.configurable()?.callbacks.underflow = None;
        Ok(())
    }

    pub fn set_error_callback<F>(&mut self, callback: F) -> Result<()>
    where
        F: FnMut(Error) + Send + 'static,
    {
        self.configurable()?.callbacks.error = Some(Box::new(callback));
        Ok(())
    }

    pub fn clear_error_callback(&mut self) -> Result<()> {
        self.configurable()?.callbacks.error = None;
        Ok(())
    }

    // ─── Lifecycle ─────────────────────────────────────────────────────────

    /// Negotiate the configuration against the device and open the backend
    /// stream.
    pub fn open(&mut self) -> Result<()> {
        if self.state != StreamState::Created {
            return Err(Error::InvalidState);
        }
        if self.callbacks.write.is_none() {
            return Err(Error::InvalidState);
        }
        let device = self.device.clone().ok_or(Error::InvalidState)?;
        let config = self.negotiate(&device)?;

        let bytes_per_sample = config.format.bytes_per_sample();
        let params = StreamParams {
            format: config.format,
            layout: config.layout.clone(),
            sample_rate: config.sample_rate,
            software_latency: config.software_latency,
            name: config.name.clone(),
            bytes_per_sample,
            bytes_per_frame: bytes_per_sample * config.layout.channel_count(),
        };

        let mut callbacks = std::mem::take(&mut self.callbacks);
        let Some(write) = callbacks.write.take() else {
            return Err(Error::InvalidState);
        };
        let handle = Handle::next();
        let shared = Arc::new(StreamShared::new(handle, params.clone(), write, callbacks));

        // Registered before the backend can fire.
        STREAMS.register(handle, &shared);
        match device.open_backend_stream(&params, StreamSink::new(handle)) {
            Ok(backend) => {
                self.layout_error = backend.layout_error();
                if let Some(err) = self.layout_error {
                    warn!("Stream {handle} opened with layout error: {err}");
                }
                self.config = StreamConfig {
                    software_latency: backend.software_latency(),
                    ..config
                };
                self.backend = Some(backend);
                self.shared = Some(shared);
                self.state = StreamState::Opened;
                info!(
                    "Stream {handle} opened on {}: {} {} Hz {}",
                    device.id(),
                    params.format,
                    params.sample_rate,
                    params.layout
                );
                Ok(())
            }
            Err(err) => {
                STREAMS.deregister(handle);
                // Hand the callbacks back so the caller can retry.
                if let Ok(shared) = Arc::try_unwrap(shared) {
                    self.callbacks = shared.into_callbacks();
                }
                debug!("Stream open on {} failed: {err}", device.id());
                Err(err)
            }
        }
    }

    fn negotiate(&self, device: &Device) -> Result<StreamConfig> {
        let caps = device.capabilities().ok_or(Error::InvalidState)?;
        let mut config = self.config.clone();

        config.format = match config.format {
            SampleFormat::Invalid if caps.formats.contains(&SampleFormat::FLOAT32_NE) => {
                SampleFormat::FLOAT32_NE
            }
            SampleFormat::Invalid => *caps.formats.first().ok_or(Error::IncompatibleDevice)?,
            format if caps.formats.contains(&format) => format,
            _ => return Err(Error::IncompatibleDevice),
        };

        config.layout = if config.layout.is_empty() {
            let stereo = ChannelLayout::stereo();
            if !caps.current_layout.is_empty() && caps.layouts.contains(&caps.current_layout) {
                caps.current_layout.clone()
            } else if caps.layouts.contains(&stereo) {
                stereo
            } else {
                caps.layouts.first().cloned().ok_or(Error::IncompatibleDevice)?
            }
        } else {
            // The device's entry carries the name.
            caps.layouts
                .iter()
                .find(|layout| **layout == config.layout)
                .cloned()
                .ok_or(Error::IncompatibleDevice)?
        };

        config.sample_rate = match config.sample_rate {
            0 => device
                .nearest_sample_rate(DEFAULT_SAMPLE_RATE)
                .ok_or(Error::IncompatibleDevice)?,
            rate if device.supports_sample_rate(rate) => rate,
            _ => return Err(Error::IncompatibleDevice),
        };

        if config.software_latency > 0.0 {
            config.software_latency = config
                .software_latency
                .clamp(caps.software_latency_min, caps.software_latency_max.max(caps.software_latency_min));
        }
        Ok(config)
    }

    /// State of an opened, not yet disposed stream.
    fn live(&self) -> Result<StreamState> {
        match (&self.shared, self.state()) {
            (_, StreamState::Destroyed) | (None, _) => Err(Error::InvalidState),
            (_, StreamState::Failed) => Err(Error::Streaming),
            (Some(_), state) => Ok(state),
        }
    }

    fn backend_call<T>(&mut self, call: impl FnOnce(&mut dyn BackendStream) -> Result<T>) -> Result<T> {
        let backend = self.backend.as_deref_mut().ok_or(Error::InvalidState)?;
        let result = call(backend);
        if let (Err(Error::Streaming), Some(shared)) = (&result, &self.shared) {
            shared.failed.store(true, Ordering::Release);
        }
        result
    }

    pub fn start(&mut self) -> Result<()> {
        if self.live()? != StreamState::Opened {
            return Err(Error::InvalidState);
        }
        self.backend_call(|b| b.start())?;
        self.state = StreamState::Started;
        debug!("Stream started");
        Ok(())
    }

    /// Pause or resume. Pausing a paused stream, or resuming a running one,
    /// does nothing.
    pub fn pause(&mut self, pause: bool) -> Result<()> {
        let target = match (self.live()?, pause) {
            (StreamState::Started, false) | (StreamState::Paused, true) => return Ok(()),
            (StreamState::Started, true) => StreamState::Paused,
            (StreamState::Paused, false) => StreamState::Started,
            _ => return Err(Error::InvalidState),
        };
        self.backend_call(|b| b.pause(pause))?;
        if let Some(shared) = &self.shared {
            shared.paused.store(pause, Ordering::Release);
        }
        self.state = target;
        debug!("Stream {}", if pause { "paused" } else { "resumed" });
        Ok(())
    }

    /// Discard buffered audio that has not been played yet.
    pub fn clear_buffer(&mut self) -> Result<()> {
        if !matches!(self.live()?, StreamState::Started | StreamState::Paused) {
            return Err(Error::InvalidState);
        }
        self.backend_call(|b| b.clear_buffer())
    }

    /// Seconds until a sample written now is heard.
    pub fn latency(&mut self) -> Result<f64> {
        self.live()?;
        self.backend_call(|b| b.latency())
    }

    /// Release the backend stream and the device reference. Safe to call more
    /// than once.
    pub fn dispose(&mut self) {
        if self.state == StreamState::Destroyed {
            return;
        }
        if let Some(shared) = &self.shared {
            STREAMS.deregister(shared.handle);
        }
        // Joins the audio thread.
        self.backend = None;
        if let Some(shared) = self.shared.take() {
            info!(
                "Stream {} destroyed after {} frames, {} underflows",
                shared.handle,
                shared.frames_written.load(Ordering::Relaxed),
                shared.underflow_count.load(Ordering::Relaxed)
            );
        }
        self.callbacks = PendingCallbacks::default();
        self.device = None;
        self.state = StreamState::Destroyed;
    }

    // ─── Accessors ─────────────────────────────────────────────────────────

    /// Reflects pauses requested from the write callback and realtime
    /// failures as well as the calls made on this handle.
    pub fn state(&self) -> StreamState {
        let Some(shared) = &self.shared else {
            return self.state;
        };
        match self.state {
            StreamState::Destroyed => StreamState::Destroyed,
            _ if shared.failed.load(Ordering::Acquire) => StreamState::Failed,
            StreamState::Started | StreamState::Paused if shared.paused.load(Ordering::Acquire) => {
                StreamState::Paused
            }
            StreamState::Started | StreamState::Paused => StreamState::Started,
            state => state,
        }
    }

    /// The device, until the stream is disposed.
    pub fn device(&self) -> Option<&Device> {
        self.device.as_ref()
    }

    /// Registry handle, once opened.
    pub fn handle(&self) -> Option<Handle> {
        self.shared.as_ref().map(|s| s.handle)
    }

    pub fn format(&self) -> SampleFormat {
        self.config.format
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    pub fn layout(&self) -> &ChannelLayout {
        &self.config.layout
    }

    pub fn software_latency(&self) -> f64 {
        self.config.software_latency
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn bytes_per_sample(&self) -> usize {
        self.config.format.bytes_per_sample()
    }

    pub fn bytes_per_frame(&self) -> usize {
        self.bytes_per_sample() * self.config.layout.channel_count()
    }

    /// Layout problem the backend reported at open.
    pub fn layout_error(&self) -> Option<Error> {
        self.layout_error
    }

    /// Whether a realtime error has failed the stream.
    pub fn is_failed(&self) -> bool {
        self.shared
            .as_ref()
            .is_some_and(|s| s.failed.load(Ordering::Acquire))
    }

    pub fn frames_written(&self) -> u64 {
        self.shared
            .as_ref()
            .map_or(0, |s| s.frames_written.load(Ordering::Relaxed))
    }

    pub fn underflow_count(&self) -> u64 {
        self.shared
            .as_ref()
            .map_or(0, |s| s.underflow_count.load(Ordering::Relaxed))
    }
}

impl Drop for OutStream {
    fn drop(&mut self) {
        self.dispose();
    }
}

// ─── Realtime write protocol ───────────────────────────────────────────────

/// Handed to the write callback for the duration of one call.
pub struct OutStreamWriter<'a> {
    params: &'a StreamParams,
    buffer: &'a mut dyn PlaybackBuffer,
    frames_written: &'a AtomicU64,
    pause_request: &'a AtomicU8,
    areas: [ChannelArea; MAX_CHANNELS],
}

impl<'a> OutStreamWriter<'a> {
    fn new(
        params: &'a StreamParams,
        buffer: &'a mut dyn PlaybackBuffer,
        frames_written: &'a AtomicU64,
        pause_request: &'a AtomicU8,
    ) -> Self {
        Self {
            params,
            buffer,
            frames_written,
            pause_request,
            areas: [ChannelArea::default(); MAX_CHANNELS],
        }
    }

    /// Pause (or resume) the stream once this callback returns. The last
    /// request made during a callback wins.
    pub fn request_pause(&self, pause: bool) {
        let request = if pause { PAUSE_HOLD } else { PAUSE_RESUME };
        self.pause_request.store(request, Ordering::Release);
    }

    pub fn format(&self) -> SampleFormat {
        self.params.format
    }

    pub fn sample_rate(&self) -> u32 {
        self.params.sample_rate
    }

    pub fn layout(&self) -> &ChannelLayout {
        &self.params.layout
    }

    pub fn channel_count(&self) -> usize {
        self.params.layout.channel_count()
    }

    pub fn bytes_per_frame(&self) -> usize {
        self.params.bytes_per_frame
    }

    /// Reserve up to `frame_count` frames. The granted count may be smaller
    /// and is 0 when no more space is available in this callback.
    pub fn begin_write(&mut self, frame_count: usize) -> Result<ChannelAreas<'_, 'a>> {
        let channel_count = self.params.layout.channel_count();
        let areas = &mut self.areas[..channel_count];
        let granted = self.buffer.begin_write(frame_count, areas)?.min(frame_count);
        Ok(ChannelAreas {
            buffer: &mut *self.buffer,
            areas: &self.areas[..channel_count],
            format: self.params.format,
            frame_count: granted,
            frames_written: self.frames_written,
            committed: false,
        })
    }
}

/// A reserved region. Commit it with [`end_write`](Self::end_write); dropping
/// it uncommitted commits it too.
pub struct ChannelAreas<'w, 'a> {
    buffer: &'w mut (dyn PlaybackBuffer + 'a),
    areas: &'w [ChannelArea],
    format: SampleFormat,
    frame_count: usize,
    frames_written: &'a AtomicU64,
    committed: bool,
}

impl ChannelAreas<'_, '_> {
    /// Frames granted. Every channel must be written for each of them.
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    pub fn channel_count(&self) -> usize {
        self.areas.len()
    }

    pub fn areas(&self) -> &[ChannelArea] {
        self.areas
    }

    /// Raw region the areas point into.
    pub fn region_mut(&mut self) -> &mut [u8] {
        self.buffer.region_mut()
    }

    fn offset(&self, channel: usize, frame: usize) -> usize {
        debug_assert!(frame < self.frame_count, "frame {frame} out of {}", self.frame_count);
        let area = self.areas[channel];
        area.offset + frame * area.step
    }

    /// Bytes of one sample.
    pub fn sample_mut(&mut self, channel: usize, frame: usize) -> &mut [u8] {
        let offset = self.offset(channel, frame);
        let width = self.format.bytes_per_sample();
        &mut self.buffer.region_mut()[offset..offset + width]
    }

    /// Encode `sample` in the stream format.
    #[inline]
    pub fn write_sample(&mut self, channel: usize, frame: usize, sample: f64) {
        let format = self.format;
        format.encode(sample, self.sample_mut(channel, frame));
    }

    pub fn read_sample(&mut self, channel: usize, frame: usize) -> f64 {
        let format = self.format;
        format.decode(self.sample_mut(channel, frame))
    }

    fn commit(&mut self) -> Result<()> {
        self.committed = true;
        self.buffer.end_write()?;
        self.frames_written
            .fetch_add(self.frame_count as u64, Ordering::Relaxed);
        Ok(())
    }

    /// Commit the region.
    pub fn end_write(mut self) -> Result<()> {
        self.commit()
    }
}

impl Drop for ChannelAreas<'_, '_> {
    fn drop(&mut self) {
        if !self.committed && self.frame_count > 0 {
            let _ = self.commit();
        }
    }
}
