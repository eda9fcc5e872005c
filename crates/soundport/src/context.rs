//! Backend connection, device snapshots and event delivery.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::backend::{
    Backend, BackendKind, BackendStream, DeviceDescriptor, DeviceEnumeration, StreamParams,
};
use crate::callbacks::{ContextEvent, EventSink, StreamSink};
use crate::device::Device;
use crate::error::{Error, Result};
use crate::handle::Handle;
use crate::registry::CONTEXTS;

pub type DevicesChangeCallback = Box<dyn FnMut(&Context) + Send>;
pub type BackendDisconnectCallback = Box<dyn FnMut(&Context, Error) + Send>;
/// Called on whichever thread queued an event. Must not call back into the
/// context.
pub type EventsSignalCallback = Box<dyn FnMut() + Send>;

/// Options a context is created with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextOptions {
    pub app_name: String,
    /// Backend `connect` uses. `None` tries every available backend.
    pub backend: Option<BackendKind>,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            app_name: String::from("SoundPort"),
            backend: None,
        }
    }
}

impl ContextOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }

    pub fn backend(mut self, backend: Option<BackendKind>) -> Self {
        self.backend = backend;
        self
    }

    /// Load options from environment variables
    /// Set SOUNDPORT_BACKEND=dummy, alsa, pulseaudio, jack, coreaudio or wasapi
    /// Set SOUNDPORT_APP_NAME=MyPlayer
    pub fn from_env() -> Self {
        let mut options = Self::default();
        if let Ok(name) = std::env::var("SOUNDPORT_APP_NAME") {
            if !name.is_empty() {
                options.app_name = name;
            }
        }
        if let Ok(backend) = std::env::var("SOUNDPORT_BACKEND") {
            match backend.parse() {
                Ok(kind) => options.backend = Some(kind),
                Err(_) => warn!("Ignoring unknown SOUNDPORT_BACKEND={backend}"),
            }
        }
        options
    }
}

/// Context state reachable from backend threads through the registry.
pub(crate) struct ContextShared {
    handle: Handle,
    events: Sender<ContextEvent>,
    backend: Mutex<Option<Box<dyn Backend>>>,
    connection: AtomicU64,
    on_events_signal: Mutex<Option<EventsSignalCallback>>,
}

impl ContextShared {
    pub(crate) fn post(&self, event: ContextEvent) {
        // The receiver lives as long as the context, which holds this sender.
        let _ = self.events.send(event);
        if let Some(signal) = self.on_events_signal.lock().as_mut() {
            signal();
        }
    }

    pub(crate) fn open_output_stream(
        &self,
        connection: u64,
        device: &DeviceDescriptor,
        params: &StreamParams,
        sink: StreamSink,
    ) -> Result<Box<dyn BackendStream>> {
        let mut backend = self.backend.lock();
        match backend.as_mut() {
            Some(backend) if self.connection.load(Ordering::Acquire) == connection => {
                backend.open_output_stream(device, params, sink)
            }
            _ => Err(Error::BackendDisconnected),
        }
    }
}

struct DeviceSnapshot {
    inputs: Vec<Device>,
    outputs: Vec<Device>,
    default_input: Option<usize>,
    default_output: Option<usize>,
}

/// Unblocks [`Context::wait_events`] from any thread.
#[derive(Debug, Clone)]
pub struct Waker {
    shared: Weak<ContextShared>,
}

impl Waker {
    /// Does nothing once the context is gone.
    pub fn wake(&self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.post(ContextEvent::Wakeup);
        }
    }
}

/// Entry point: owns one backend connection and the devices it reported.
///
/// Notifications from the backend are queued and only delivered inside
/// [`flush_events`](Self::flush_events) and [`wait_events`](Self::wait_events),
/// on the caller's thread.
pub struct Context {
    shared: Arc<ContextShared>,
    events: Receiver<ContextEvent>,
    options: ContextOptions,
    devices: Option<DeviceSnapshot>,
    on_devices_change: Option<DevicesChangeCallback>,
    on_backend_disconnect: Option<BackendDisconnectCallback>,
}

impl Context {
    pub fn new() -> Self {
        Self::with_options(ContextOptions::default())
    }

    pub fn with_options(options: ContextOptions) -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let shared = Arc::new(ContextShared {
            handle: Handle::next(),
            events: sender,
            backend: Mutex::new(None),
            connection: AtomicU64::new(0),
            on_events_signal: Mutex::new(None),
        });
        CONTEXTS.register(shared.handle, &shared);
        info!("Context {} created for {}", shared.handle, options.app_name);
        Self {
            shared,
            events: receiver,
            options,
            devices: None,
            on_devices_change: None,
            on_backend_disconnect: None,
        }
    }

    pub fn options(&self) -> &ContextOptions {
        &self.options
    }

    pub fn handle(&self) -> Handle {
        self.shared.handle
    }

    // ─── Connection ────────────────────────────────────────────────────────

    /// Connect to the configured backend, or to the first available one in
    /// [`BackendKind::PRIORITY`] order.
    pub fn connect(&mut self) -> Result<()> {
        if let Some(kind) = self.options.backend {
            return self.connect_backend(kind);
        }
        self.ensure_disconnected()?;

        let mut last_err = Error::BackendUnavailable;
        for kind in BackendKind::PRIORITY {
            if !kind.is_available() {
                continue;
            }
            match self.connect_backend(kind) {
                Ok(()) => return Ok(()),
                Err(err) => {
                    debug!("Backend {kind} unusable: {err}");
                    last_err = err;
                }
            }
        }
        Err(last_err)
    }

    pub fn connect_backend(&mut self, kind: BackendKind) -> Result<()> {
        self.ensure_disconnected()?;
        let backend = kind.create()?;
        self.connect_with(backend)
    }

    /// Connect through an application supplied backend.
    pub fn connect_with(&mut self, mut backend: Box<dyn Backend>) -> Result<()> {
        self.ensure_disconnected()?;
        let kind = backend.kind();
        backend.connect(EventSink::new(self.shared.handle))?;
        let enumeration = backend.enumerate()?;

        let connection = self.shared.connection.fetch_add(1, Ordering::AcqRel) + 1;
        *self.shared.backend.lock() = Some(backend);
        self.devices = Some(self.snapshot(enumeration, kind, connection));
        info!("Context {} connected to {kind}", self.shared.handle);
        Ok(())
    }

    /// Drop the connection and the device snapshot. Open streams keep running.
    pub fn disconnect(&mut self) {
        let backend = self.shared.backend.lock().take();
        self.devices = None;
        if let Some(backend) = backend {
            info!("Context {} disconnected from {}", self.shared.handle, backend.kind());
        }
    }

    pub fn current_backend(&self) -> Option<BackendKind> {
        self.shared.backend.lock().as_ref().map(|b| b.kind())
    }

    fn ensure_disconnected(&self) -> Result<()> {
        if self.shared.backend.lock().is_some() {
            return Err(Error::InvalidState);
        }
        Ok(())
    }

    fn snapshot(&self, enumeration: DeviceEnumeration, kind: BackendKind, connection: u64) -> DeviceSnapshot {
        let to_devices = |descriptors: Vec<DeviceDescriptor>| -> Vec<Device> {
            descriptors
                .into_iter()
                .map(|d| Device::new(d, kind, Arc::downgrade(&self.shared), connection))
                .collect()
        };
        let inputs = to_devices(enumeration.inputs);
        let outputs = to_devices(enumeration.outputs);
        debug!("{} input and {} output devices", inputs.len(), outputs.len());
        DeviceSnapshot {
            default_input: enumeration.default_input.filter(|&i| i < inputs.len()),
            default_output: enumeration.default_output.filter(|&i| i < outputs.len()),
            inputs,
            outputs,
        }
    }

    fn refresh_devices(&mut self) {
        let connection = self.shared.connection.load(Ordering::Acquire);
        let enumeration = {
            let mut backend = self.shared.backend.lock();
            match backend.as_mut() {
                Some(backend) => Some((backend.kind(), backend.enumerate())),
                None => None,
            }
        };
        match enumeration {
            Some((kind, Ok(enumeration))) => {
                self.devices = Some(self.snapshot(enumeration, kind, connection));
            }
            Some((_, Err(err))) => {
                warn!("Device refresh failed: {err}");
                self.devices = None;
            }
            None => {}
        }
    }

    // ─── Events ────────────────────────────────────────────────────────────

    /// Deliver every pending notification without blocking.
    pub fn flush_events(&mut self) {
        let pending: Vec<ContextEvent> = self.events.try_iter().collect();
        self.deliver(pending);
    }

    /// Block until a notification or wakeup arrives, then deliver everything
    /// pending.
    pub fn wait_events(&mut self) {
        let mut pending = Vec::new();
        if let Ok(event) = self.events.recv() {
            pending.push(event);
        }
        pending.extend(self.events.try_iter());
        self.deliver(pending);
    }

    /// Wake a thread blocked in `wait_events`.
    pub fn wakeup(&self) {
        self.waker().wake();
    }

    pub fn waker(&self) -> Waker {
        Waker {
            shared: Arc::downgrade(&self.shared),
        }
    }

    fn deliver(&mut self, pending: Vec<ContextEvent>) {
        let mut devices_changed = false;
        let mut disconnected = None;
        for event in pending {
            match event {
                ContextEvent::DevicesChanged => devices_changed = true,
                ContextEvent::BackendDisconnected(err) => disconnected = Some(err),
                ContextEvent::Wakeup => {}
            }
        }

        if let Some(err) = disconnected {
            self.disconnect();
            match self.on_backend_disconnect.take() {
                Some(mut callback) => {
                    callback(self, err);
                    self.on_backend_disconnect = Some(callback);
                }
                None => error!("Context {} lost its backend: {err}", self.shared.handle),
            }
            return;
        }

        if devices_changed && self.current_backend().is_some() {
            self.refresh_devices();
            if let Some(mut callback) = self.on_devices_change.take() {
                callback(self);
                self.on_devices_change = Some(callback);
            }
        }
    }

    pub fn set_on_devices_change<F>(&mut self, callback: F) -> Result<()>
    where
        F: FnMut(&Context) + Send + 'static,
    {
        self.on_devices_change = Some(Box::new(callback));
        Ok(())
    }

    /// Fails with `InvalidState` when no callback was set.
    pub fn clear_on_devices_change(&mut self) -> Result<()> {
        match self.on_devices_change.take() {
            Some(_) => Ok(()),
            None => Err(Error::InvalidState),
        }
    }

    pub fn set_on_backend_disconnect<F>(&mut self, callback: F) -> Result<()>
    where
        F: FnMut(&Context, Error) + Send + 'static,
    {
        self.on_backend_disconnect = Some(Box::new(callback));
        Ok(())
    }

    /// Fails with `InvalidState` when no callback was set.
    pub fn clear_on_backend_disconnect(&mut self) -> Result<()> {
        match self.on_backend_disconnect.take() {
            Some(_) => Ok(()),
            None => Err(Error::InvalidState),
        }
    }

    /// Install a callback run every time an event is queued, on the thread
    /// that queued it. Lets an application drive its own loop and call
    /// [`flush_events`](Self::flush_events) when signalled instead of blocking
    /// in [`wait_events`](Self::wait_events).
    pub fn set_on_events_signal<F>(&mut self, callback: F) -> Result<()>
    where
        F: FnMut() + Send + 'static,
    {
        *self.shared.on_events_signal.lock() = Some(Box::new(callback));
        Ok(())
    }

    /// Fails with `InvalidState` when no callback was set.
    pub fn clear_on_events_signal(&mut self) -> Result<()> {
        match self.shared.on_events_signal.lock().take() {
            Some(_) => Ok(()),
            None => Err(Error::InvalidState),
        }
    }

    // ─── Devices ───────────────────────────────────────────────────────────

    fn devices(&self) -> Result<&DeviceSnapshot> {
        self.devices.as_ref().ok_or(Error::InvalidState)
    }

    pub fn input_device_count(&self) -> usize {
        self.devices.as_ref().map_or(0, |d| d.inputs.len())
    }

    pub fn output_device_count(&self) -> usize {
        self.devices.as_ref().map_or(0, |d| d.outputs.len())
    }

    /// New references to every input device, in backend order.
    pub fn list_input_devices(&self) -> Result<Vec<Device>> {
        Ok(self.devices()?.inputs.clone())
    }

    /// New references to every output device, in backend order.
    pub fn list_output_devices(&self) -> Result<Vec<Device>> {
        Ok(self.devices()?.outputs.clone())
    }

    pub fn default_input_device_index(&self) -> Option<usize> {
        self.devices.as_ref().and_then(|d| d.default_input)
    }

    pub fn default_output_device_index(&self) -> Option<usize> {
        self.devices.as_ref().and_then(|d| d.default_output)
    }

    pub fn default_input_device(&self) -> Option<Device> {
        let devices = self.devices.as_ref()?;
        devices.inputs.get(devices.default_input?).cloned()
    }

    pub fn default_output_device(&self) -> Option<Device> {
        let devices = self.devices.as_ref()?;
        devices.outputs.get(devices.default_output?).cloned()
    }

    pub fn input_device_by_id(&self, id: &str, raw: bool) -> Option<Device> {
        let devices = self.devices.as_ref()?;
        find_device(&devices.inputs, id, raw)
    }

    pub fn output_device_by_id(&self, id: &str, raw: bool) -> Option<Device> {
        let devices = self.devices.as_ref()?;
        find_device(&devices.outputs, id, raw)
    }
}

fn find_device(devices: &[Device], id: &str, raw: bool) -> Option<Device> {
    devices
        .iter()
        .find(|d| d.id() == id && d.is_raw() == raw)
        .cloned()
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        CONTEXTS.deregister(self.shared.handle);
        self.disconnect();
        info!("Context {} destroyed", self.shared.handle);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use soundport_format::{ChannelLayout, SampleFormat, SampleRateRange};

    use super::*;
    use crate::backend::{DeviceAim, DeviceCapabilities};

    /// Backend whose device list and notifications are driven by the test.
    struct Scripted {
        outputs: Arc<Mutex<Vec<&'static str>>>,
        sink: Arc<Mutex<Option<EventSink>>>,
    }

    impl Scripted {
        fn new(outputs: &[&'static str]) -> (Self, Arc<Mutex<Vec<&'static str>>>, Arc<Mutex<Option<EventSink>>>) {
            let outputs = Arc::new(Mutex::new(outputs.to_vec()));
            let sink = Arc::new(Mutex::new(None));
            let backend = Self {
                outputs: Arc::clone(&outputs),
                sink: Arc::clone(&sink),
            };
            (backend, outputs, sink)
        }
    }

    fn caps() -> DeviceCapabilities {
        DeviceCapabilities {
            layouts: vec![ChannelLayout::stereo()],
            formats: vec![SampleFormat::FLOAT32_NE],
            sample_rates: vec![SampleRateRange::single(48000)],
            current_layout: ChannelLayout::stereo(),
            current_format: SampleFormat::FLOAT32_NE,
            sample_rate_current: 48000,
            software_latency_min: 0.01,
            software_latency_max: 1.0,
            software_latency_current: 0.05,
        }
    }

    impl Backend for Scripted {
        fn kind(&self) -> BackendKind {
            BackendKind::Dummy
        }

        fn connect(&mut self, events: EventSink) -> Result<()> {
            *self.sink.lock() = Some(events);
            Ok(())
        }

        fn enumerate(&mut self) -> Result<DeviceEnumeration> {
            let outputs = self
                .outputs
                .lock()
                .iter()
                .enumerate()
                .map(|(i, id)| DeviceDescriptor {
                    id: id.to_string(),
                    name: id.to_uppercase(),
                    aim: DeviceAim::Output,
                    is_raw: i % 2 == 1,
                    probe: if id.starts_with("broken") {
                        Err(Error::OpeningDevice)
                    } else {
                        Ok(caps())
                    },
                })
                .collect();
            Ok(DeviceEnumeration {
                outputs,
                default_output: Some(0),
                ..Default::default()
            })
        }

        fn open_output_stream(
            &mut self,
            _device: &DeviceDescriptor,
            _params: &StreamParams,
            _sink: StreamSink,
        ) -> Result<Box<dyn BackendStream>> {
            Err(Error::OpeningDevice)
        }
    }

    struct Refusing;

    impl Backend for Refusing {
        fn kind(&self) -> BackendKind {
            BackendKind::Jack
        }

        fn connect(&mut self, _events: EventSink) -> Result<()> {
            Err(Error::InitFailed)
        }

        fn enumerate(&mut self) -> Result<DeviceEnumeration> {
            Err(Error::InvalidState)
        }

        fn open_output_stream(
            &mut self,
            _device: &DeviceDescriptor,
            _params: &StreamParams,
            _sink: StreamSink,
        ) -> Result<Box<dyn BackendStream>> {
            Err(Error::InvalidState)
        }
    }

    #[test]
    fn test_connect_auto_falls_back_to_dummy() {
        let mut context = Context::new();
        assert_eq!(context.list_output_devices().err(), Some(Error::InvalidState));
        context.connect().unwrap();
        assert!(context.current_backend().is_some());
        assert_eq!(context.connect(), Err(Error::InvalidState));
        context.disconnect();
        assert_eq!(context.current_backend(), None);
        context.connect_backend(BackendKind::Dummy).unwrap();
        assert_eq!(context.current_backend(), Some(BackendKind::Dummy));
    }

    #[test]
    fn test_connect_honours_options() {
        let mut context = Context::with_options(ContextOptions::new().backend(Some(BackendKind::PulseAudio)));
        assert_eq!(context.connect(), Err(Error::BackendUnavailable));
        assert_eq!(context.current_backend(), None);
    }

    #[test]
    fn test_failed_connect_leaves_context_usable() {
        let mut context = Context::new();
        assert_eq!(context.connect_with(Box::new(Refusing)), Err(Error::InitFailed));
        assert_eq!(context.current_backend(), None);
        context.connect_backend(BackendKind::Dummy).unwrap();
    }

    #[test]
    fn test_dummy_devices() {
        let mut context = Context::new();
        context.connect_backend(BackendKind::Dummy).unwrap();

        let outputs = context.list_output_devices().unwrap();
        let inputs = context.list_input_devices().unwrap();
        assert_eq!(outputs.len(), 1);
        assert_eq!(inputs.len(), 1);
        assert_eq!(context.default_output_device_index(), Some(0));
        assert_eq!(context.default_input_device_index(), Some(0));
        assert_eq!(outputs[0].aim(), DeviceAim::Output);
        assert_eq!(inputs[0].aim(), DeviceAim::Input);
        assert_eq!(context.default_output_device().as_ref(), Some(&outputs[0]));
        assert_eq!(
            context.output_device_by_id(crate::backend::dummy::OUTPUT_DEVICE_ID, false).as_ref(),
            Some(&outputs[0])
        );
        assert!(context.output_device_by_id(crate::backend::dummy::OUTPUT_DEVICE_ID, true).is_none());
        // Snapshot plus the listed handle.
        assert_eq!(outputs[0].ref_count(), 2);
    }

    #[test]
    fn test_devices_change_is_coalesced() {
        let (backend, outputs, sink) = Scripted::new(&["a", "b"]);
        let mut context = Context::new();
        context.connect_with(Box::new(backend)).unwrap();
        assert_eq!(context.output_device_count(), 2);

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        context
            .set_on_devices_change(move |ctx| {
                assert_eq!(ctx.output_device_count(), 3);
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        outputs.lock().push("broken-c");
        let events = sink.lock().clone().unwrap();
        events.devices_changed();
        events.devices_changed();
        events.devices_changed();

        // Nothing is delivered outside flush/wait.
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(context.output_device_count(), 2);

        context.flush_events();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let listed = context.list_output_devices().unwrap();
        assert_eq!(listed[2].probe_error(), Some(Error::OpeningDevice));
        assert!(listed[1].is_raw());

        context.flush_events();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        context.clear_on_devices_change().unwrap();
        assert_eq!(context.clear_on_devices_change(), Err(Error::InvalidState));
    }

    #[test]
    fn test_old_snapshot_handles_survive_refresh() {
        let (backend, outputs, sink) = Scripted::new(&["a"]);
        let mut context = Context::new();
        context.connect_with(Box::new(backend)).unwrap();
        let old = context.default_output_device().unwrap();

        outputs.lock().clear();
        sink.lock().as_ref().unwrap().devices_changed();
        context.flush_events();

        assert_eq!(context.output_device_count(), 0);
        assert_eq!(context.default_output_device(), None);
        assert_eq!(old.id(), "a");
        assert_eq!(old.ref_count(), 1);
    }

    #[test]
    fn test_backend_disconnect_callback() {
        let (backend, _outputs, sink) = Scripted::new(&["a"]);
        let mut context = Context::new();
        context.connect_with(Box::new(backend)).unwrap();

        let seen = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&seen);
        context
            .set_on_backend_disconnect(move |ctx, err| {
                assert_eq!(ctx.current_backend(), None);
                *slot.lock() = Some(err);
            })
            .unwrap();

        let events = sink.lock().clone().unwrap();
        events.backend_disconnected(Error::BackendDisconnected);
        context.flush_events();

        assert_eq!(*seen.lock(), Some(Error::BackendDisconnected));
        assert_eq!(context.list_output_devices().err(), Some(Error::InvalidState));
        context.connect_backend(BackendKind::Dummy).unwrap();
    }

    #[test]
    fn test_events_after_drop_are_ignored() {
        let (backend, _outputs, sink) = Scripted::new(&["a"]);
        let mut context = Context::new();
        context.connect_with(Box::new(backend)).unwrap();
        let handle = context.handle();
        let events = sink.lock().clone().unwrap();
        drop(context);

        assert!(!CONTEXTS.contains(handle));
        events.devices_changed();
        events.backend_disconnected(Error::BackendDisconnected);
    }

    #[test]
    fn test_wakeup_unblocks_wait_events() {
        let mut context = Context::new();
        context.connect_backend(BackendKind::Dummy).unwrap();
        let waker = context.waker();
        let (done_tx, done_rx) = crossbeam_channel::bounded(1);

        let waiter = std::thread::spawn(move || {
            context.wait_events();
            done_tx.send(()).unwrap();
            context
        });

        std::thread::sleep(Duration::from_millis(50));
        waker.wake();
        assert!(done_rx.recv_timeout(Duration::from_secs(5)).is_ok());
        let context = waiter.join().unwrap();
        assert_eq!(context.current_backend(), Some(BackendKind::Dummy));
    }

    #[test]
    fn test_events_signal_fires_on_posting_thread() {
        let (backend, _outputs, sink) = Scripted::new(&["a"]);
        let mut context = Context::new();
        context.connect_with(Box::new(backend)).unwrap();

        let (signal_tx, signal_rx) = crossbeam_channel::unbounded();
        context
            .set_on_events_signal(move || {
                signal_tx.send(std::thread::current().id()).unwrap();
            })
            .unwrap();

        let events = sink.lock().clone().unwrap();
        let poster = std::thread::spawn(move || {
            events.devices_changed();
            std::thread::current().id()
        });
        let poster_id = poster.join().unwrap();
        assert_eq!(signal_rx.recv_timeout(Duration::from_secs(5)), Ok(poster_id));

        context.wakeup();
        assert!(signal_rx.try_recv().is_ok());

        // The signal only announces; delivery still waits for flush.
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        context
            .set_on_devices_change(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        context.flush_events();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        context.clear_on_events_signal().unwrap();
        assert_eq!(context.clear_on_events_signal(), Err(Error::InvalidState));
        context.wakeup();
        assert!(signal_rx.try_recv().is_err());
    }

    #[test]
    fn test_waker_outliving_context_is_harmless() {
        let context = Context::new();
        let waker = context.waker();
        drop(context);
        waker.wake();
    }

    #[test]
    fn test_flush_events_never_blocks() {
        let mut context = Context::new();
        context.flush_events();
        context.wakeup();
        context.flush_events();
    }

    #[test]
    fn test_stream_open_after_disconnect() {
        let mut context = Context::new();
        context.connect_backend(BackendKind::Dummy).unwrap();
        let device = context.default_output_device().unwrap();
        context.disconnect();

        let mut stream = device.create_output_stream().unwrap();
        stream.set_write_callback(|_, _, _| Ok(())).unwrap();
        assert_eq!(stream.open(), Err(Error::BackendDisconnected));

        // A new connection does not revive devices from the old one.
        context.connect_backend(BackendKind::Dummy).unwrap();
        assert_eq!(stream.open(), Err(Error::BackendDisconnected));
    }

    #[test]
    fn test_options_from_env() {
        std::env::set_var("SOUNDPORT_APP_NAME", "envtest");
        std::env::set_var("SOUNDPORT_BACKEND", "dummy");
        let options = ContextOptions::from_env();
        std::env::remove_var("SOUNDPORT_APP_NAME");
        std::env::remove_var("SOUNDPORT_BACKEND");
        assert_eq!(options.app_name, "envtest");
        assert_eq!(options.backend, Some(BackendKind::Dummy));
    }
}
