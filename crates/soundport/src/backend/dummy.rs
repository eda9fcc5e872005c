//! Software-only backend.
//!
//! Devices are fixed. An output stream owns a ring buffer and a thread that
//! drains it at the stream's sample rate, asking the application for more
//! every half latency period.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use soundport_format::{ChannelLayout, SampleFormat, SampleRateRange};
use tracing::{debug, info, warn};

use super::{
    Backend, BackendKind, BackendStream, ChannelArea, DeviceAim, DeviceCapabilities,
    DeviceDescriptor, DeviceEnumeration, PlaybackBuffer, StreamParams,
};
use crate::callbacks::{EventSink, StreamSink};
use crate::error::{Error, Result};

pub const INPUT_DEVICE_ID: &str = "dummy-in";
pub const OUTPUT_DEVICE_ID: &str = "dummy-out";

const SOFTWARE_LATENCY_MIN: f64 = 0.01;
const SOFTWARE_LATENCY_MAX: f64 = 4.0;
const SOFTWARE_LATENCY_DEFAULT: f64 = 0.1;
const SAMPLE_RATE_DEFAULT: u32 = 48000;

pub struct DummyBackend {
    events: Option<EventSink>,
}

impl DummyBackend {
    pub fn new() -> Self {
        Self { events: None }
    }

    fn capabilities() -> DeviceCapabilities {
        let mut layouts: Vec<ChannelLayout> = ChannelLayout::builtins().collect();
        ChannelLayout::sort_by_channel_count(&mut layouts);
        DeviceCapabilities {
            layouts,
            formats: SampleFormat::ALL.to_vec(),
            sample_rates: vec![SampleRateRange::full()],
            current_layout: ChannelLayout::stereo(),
            current_format: SampleFormat::FLOAT32_NE,
            sample_rate_current: SAMPLE_RATE_DEFAULT,
            software_latency_min: SOFTWARE_LATENCY_MIN,
            software_latency_max: SOFTWARE_LATENCY_MAX,
            software_latency_current: SOFTWARE_LATENCY_DEFAULT,
        }
    }
}

impl Default for DummyBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for DummyBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Dummy
    }

    fn connect(&mut self, events: EventSink) -> Result<()> {
        debug!("Dummy backend connected for context {}", events.handle());
        self.events = Some(events);
        Ok(())
    }

    fn enumerate(&mut self) -> Result<DeviceEnumeration> {
        if self.events.is_none() {
            return Err(Error::InvalidState);
        }
        Ok(DeviceEnumeration {
            inputs: vec![DeviceDescriptor {
                id: INPUT_DEVICE_ID.into(),
                name: "Dummy Input Device".into(),
                aim: DeviceAim::Input,
                is_raw: false,
                probe: Ok(Self::capabilities()),
            }],
            outputs: vec![DeviceDescriptor {
                id: OUTPUT_DEVICE_ID.into(),
                name: "Dummy Output Device".into(),
                aim: DeviceAim::Output,
                is_raw: false,
                probe: Ok(Self::capabilities()),
            }],
            default_input: Some(0),
            default_output: Some(0),
        })
    }

    fn open_output_stream(
        &mut self,
        device: &DeviceDescriptor,
        params: &StreamParams,
        sink: StreamSink,
    ) -> Result<Box<dyn BackendStream>> {
        if device.id != OUTPUT_DEVICE_ID || device.aim != DeviceAim::Output {
            return Err(Error::NoSuchDevice);
        }
        Ok(Box::new(DummyStream::open(params, sink)?))
    }
}

/// Ring of frames drained by the playback thread.
struct RingBuffer {
    data: Vec<u8>,
    bytes_per_frame: usize,
    bytes_per_sample: usize,
    capacity: usize,
    read: usize,
    fill: usize,
    pending_start: usize,
    pending: usize,
}

impl RingBuffer {
    fn new(capacity: usize, bytes_per_frame: usize, bytes_per_sample: usize) -> Result<Self> {
        let len = capacity
            .checked_mul(bytes_per_frame)
            .ok_or(Error::OutOfMemory)?;
        let mut data = Vec::new();
        data.try_reserve_exact(len).map_err(|e| {
            warn!("Dummy ring of {len} bytes: {e}");
            Error::OutOfMemory
        })?;
        data.resize(len, 0);
        Ok(Self {
            data,
            bytes_per_frame,
            bytes_per_sample,
            capacity,
            read: 0,
            fill: 0,
            pending_start: 0,
            pending: 0,
        })
    }

    fn free(&self) -> usize {
        self.capacity - self.fill
    }

    fn consume(&mut self, frames: usize) {
        let frames = frames.min(self.fill);
        self.read = (self.read + frames) % self.capacity;
        self.fill -= frames;
    }

    fn clear(&mut self) {
        self.consume(self.fill);
    }
}

impl PlaybackBuffer for RingBuffer {
    fn begin_write(&mut self, frame_count: usize, areas: &mut [ChannelArea]) -> Result<usize> {
        let write = (self.read + self.fill) % self.capacity;
        let contiguous = (self.capacity - write).min(self.free());
        self.pending_start = write;
        self.pending = frame_count.min(contiguous);
        ChannelArea::fill_interleaved(areas, self.bytes_per_sample);
        Ok(self.pending)
    }

    fn region_mut(&mut self) -> &mut [u8] {
        let start = self.pending_start * self.bytes_per_frame;
        let end = start + self.pending * self.bytes_per_frame;
        &mut self.data[start..end]
    }

    fn end_write(&mut self) -> Result<()> {
        self.fill += self.pending;
        self.pending = 0;
        Ok(())
    }
}

#[derive(Default)]
struct Control {
    started: bool,
    paused: bool,
    clear: bool,
    stop: bool,
}

struct DummyShared {
    control: Mutex<Control>,
    wake: Condvar,
    /// Mirror of the ring fill, read by `latency`.
    fill: AtomicUsize,
}

pub struct DummyStream {
    shared: Arc<DummyShared>,
    thread: Option<JoinHandle<()>>,
    software_latency: f64,
    sample_rate: u32,
}

impl DummyStream {
    fn open(params: &StreamParams, sink: StreamSink) -> Result<Self> {
        if params.bytes_per_frame == 0 || params.sample_rate == 0 {
            return Err(Error::IncompatibleDevice);
        }
        let software_latency = if params.software_latency > 0.0 {
            params.software_latency.clamp(SOFTWARE_LATENCY_MIN, SOFTWARE_LATENCY_MAX)
        } else {
            SOFTWARE_LATENCY_DEFAULT
        };
        let capacity = ((software_latency * params.sample_rate as f64).ceil() as usize).max(2);
        let ring = RingBuffer::new(capacity, params.bytes_per_frame, params.bytes_per_sample)?;

        let shared = Arc::new(DummyShared {
            control: Mutex::new(Control::default()),
            wake: Condvar::new(),
            fill: AtomicUsize::new(0),
        });

        let playback = Playback {
            shared: Arc::clone(&shared),
            sink,
            ring,
            sample_rate: params.sample_rate,
            period: Duration::from_secs_f64(software_latency / 2.0),
        };
        let thread = std::thread::Builder::new()
            .name(format!("soundport-dummy-{}", playback.sink.handle()))
            .spawn(move || playback.run())
            .map_err(|e| {
                warn!("Failed to spawn dummy playback thread: {e}");
                Error::SystemResources
            })?;

        info!(
            "Dummy stream opened: {} Hz, {} frames buffered",
            params.sample_rate, capacity
        );
        Ok(Self {
            shared,
            thread: Some(thread),
            software_latency,
            sample_rate: params.sample_rate,
        })
    }

    fn update(&self, f: impl FnOnce(&mut Control)) {
        let mut control = self.shared.control.lock();
        f(&mut control);
        self.shared.wake.notify_all();
    }
}

impl BackendStream for DummyStream {
    fn start(&mut self) -> Result<()> {
        self.update(|c| c.started = true);
        Ok(())
    }

    fn pause(&mut self, pause: bool) -> Result<()> {
        self.update(|c| c.paused = pause);
        Ok(())
    }

    fn clear_buffer(&mut self) -> Result<()> {
        self.update(|c| c.clear = true);
        Ok(())
    }

    fn software_latency(&self) -> f64 {
        self.software_latency
    }

    fn latency(&self) -> Result<f64> {
        Ok(self.shared.fill.load(Ordering::Acquire) as f64 / self.sample_rate as f64)
    }
}

impl Drop for DummyStream {
    fn drop(&mut self) {
        self.update(|c| c.stop = true);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Dummy playback thread panicked");
            }
        }
        debug!("Dummy stream closed");
    }
}

/// State owned by the playback thread.
struct Playback {
    shared: Arc<DummyShared>,
    sink: StreamSink,
    ring: RingBuffer,
    sample_rate: u32,
    period: Duration,
}

impl Playback {
    fn run(mut self) {
        let mut clock: Option<(Instant, u64)> = None;
        let mut primed = false;
        let period_frames = self.ring.capacity / 2;

        loop {
            {
                let mut control = self.shared.control.lock();
                if control.stop {
                    break;
                }
                if control.clear {
                    control.clear = false;
                    self.ring.clear();
                    self.shared.fill.store(0, Ordering::Release);
                }
                if !control.started || control.paused {
                    clock = None;
                    self.shared.wake.wait(&mut control);
                    continue;
                }
            }

            // Drain what the virtual device played since the last period.
            let now = Instant::now();
            let (origin, consumed) = clock.get_or_insert((now, 0));
            let due = (now.duration_since(*origin).as_secs_f64() * self.sample_rate as f64) as u64;
            let frames = (due - *consumed) as usize;
            *consumed = due;
            if frames > self.ring.fill {
                let ran_dry = primed;
                self.ring.clear();
                if ran_dry {
                    self.sink.underflow();
                }
            } else {
                self.ring.consume(frames);
            }

            let free = self.ring.free();
            if free > 0 {
                let min = if primed {
                    period_frames.saturating_sub(self.ring.fill).min(free)
                } else {
                    free
                };
                if let Some(pause) = self.sink.write(min, free, &mut self.ring) {
                    self.shared.control.lock().paused = pause;
                }
                primed |= self.ring.fill > 0;
            }
            self.shared.fill.store(self.ring.fill, Ordering::Release);

            let mut control = self.shared.control.lock();
            if !control.stop && !control.clear && control.started && !control.paused {
                self.shared.wake.wait_for(&mut control, self.period);
            }
        }
        debug!("Dummy playback thread for {} exiting", self.sink.handle());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_grants_contiguous_regions() {
        let mut ring = RingBuffer::new(8, 4, 2).unwrap();
        let mut areas = [ChannelArea::default(); 2];

        assert_eq!(ring.begin_write(5, &mut areas).unwrap(), 5);
        assert_eq!(ring.region_mut().len(), 20);
        ring.end_write().unwrap();
        ring.consume(4);

        // Write position is 5; only 3 frames remain before the wrap.
        assert_eq!(ring.begin_write(10, &mut areas).unwrap(), 3);
        ring.end_write().unwrap();
        assert_eq!(ring.begin_write(10, &mut areas).unwrap(), 4);
        ring.end_write().unwrap();
        assert_eq!(ring.free(), 0);
        assert_eq!(ring.begin_write(1, &mut areas).unwrap(), 0);
        assert_eq!(areas[1], ChannelArea { offset: 2, step: 4 });
    }

    #[test]
    fn test_ring_clear() {
        let mut ring = RingBuffer::new(4, 1, 1).unwrap();
        let mut areas = [ChannelArea::default(); 1];
        ring.begin_write(3, &mut areas).unwrap();
        ring.end_write().unwrap();
        ring.clear();
        assert_eq!(ring.fill, 0);
        assert_eq!(ring.free(), 4);
    }

    #[test]
    fn test_oversized_ring_is_out_of_memory() {
        assert_eq!(RingBuffer::new(usize::MAX / 2, 4, 2).err(), Some(Error::OutOfMemory));
        assert_eq!(RingBuffer::new(1 << 60, 1, 1).err(), Some(Error::OutOfMemory));
    }

    #[test]
    fn test_enumerate_requires_connect() {
        let mut backend = DummyBackend::new();
        assert_eq!(backend.enumerate().err(), Some(Error::InvalidState));
    }

    #[test]
    fn test_capabilities_advertise_everything() {
        let caps = DummyBackend::capabilities();
        assert_eq!(caps.formats.len(), SampleFormat::ALL.len());
        assert_eq!(caps.layouts.first().map(|l| l.channel_count()), Some(8));
        assert!(caps.layouts.contains(&ChannelLayout::stereo()));
        assert!(caps.sample_rates[0].contains(48000));
    }
}
