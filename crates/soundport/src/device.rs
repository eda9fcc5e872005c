//! Reference-counted device handles.

use std::fmt;
use std::sync::{Arc, Weak};

use soundport_format::{nearest_sample_rate, ChannelLayout, SampleFormat, SampleRateRange};
use tracing::debug;

use crate::backend::{BackendKind, BackendStream, DeviceAim, DeviceCapabilities, DeviceDescriptor, StreamParams};
use crate::callbacks::StreamSink;
use crate::context::ContextShared;
use crate::error::{Error, Result};
use crate::outstream::OutStream;

pub(crate) struct DeviceInner {
    descriptor: DeviceDescriptor,
    backend: BackendKind,
    context: Weak<ContextShared>,
    /// Connection the device was enumerated on.
    connection: u64,
}

impl Drop for DeviceInner {
    fn drop(&mut self) {
        debug!("Device {} ({}) released", self.descriptor.id, self.descriptor.aim);
    }
}

/// A probed input or output endpoint.
///
/// Cloning takes another reference to the same device; the probe data is
/// freed when the last reference goes. Equality is identity.
#[derive(Clone)]
pub struct Device {
    inner: Arc<DeviceInner>,
}

impl Device {
    pub(crate) fn new(
        descriptor: DeviceDescriptor,
        backend: BackendKind,
        context: Weak<ContextShared>,
        connection: u64,
    ) -> Self {
        if let Err(err) = &descriptor.probe {
            debug!("Device {} failed to probe: {err}", descriptor.id);
        }
        Self {
            inner: Arc::new(DeviceInner {
                descriptor,
                backend,
                context,
                connection,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.descriptor.id
    }

    pub fn name(&self) -> &str {
        &self.inner.descriptor.name
    }

    pub fn aim(&self) -> DeviceAim {
        self.inner.descriptor.aim
    }

    /// Whether this is the exclusive hardware path of the device.
    pub fn is_raw(&self) -> bool {
        self.inner.descriptor.is_raw
    }

    pub fn backend(&self) -> BackendKind {
        self.inner.backend
    }

    /// Why probing failed, if it did.
    pub fn probe_error(&self) -> Option<Error> {
        self.inner.descriptor.probe.as_ref().err().copied()
    }

    pub fn capabilities(&self) -> Option<&DeviceCapabilities> {
        self.inner.descriptor.probe.as_ref().ok()
    }

    pub fn layouts(&self) -> &[ChannelLayout] {
        self.capabilities()
            .map(|c| c.layouts.as_slice())
            .unwrap_or_default()
    }

    pub fn formats(&self) -> &[SampleFormat] {
        self.capabilities()
            .map(|c| c.formats.as_slice())
            .unwrap_or_default()
    }

    pub fn sample_rates(&self) -> &[SampleRateRange] {
        self.capabilities()
            .map(|c| c.sample_rates.as_slice())
            .unwrap_or_default()
    }

    pub fn current_layout(&self) -> Option<&ChannelLayout> {
        self.capabilities()
            .map(|c| &c.current_layout)
            .filter(|l| !l.is_empty())
    }

    pub fn current_format(&self) -> SampleFormat {
        self.capabilities()
            .map_or(SampleFormat::Invalid, |c| c.current_format)
    }

    /// 0 when unknown.
    pub fn sample_rate_current(&self) -> u32 {
        self.capabilities().map_or(0, |c| c.sample_rate_current)
    }

    pub fn software_latency_min(&self) -> f64 {
        self.capabilities().map_or(0.0, |c| c.software_latency_min)
    }

    pub fn software_latency_max(&self) -> f64 {
        self.capabilities().map_or(0.0, |c| c.software_latency_max)
    }

    pub fn software_latency_current(&self) -> f64 {
        self.capabilities().map_or(0.0, |c| c.software_latency_current)
    }

    pub fn supports_format(&self, format: SampleFormat) -> bool {
        self.formats().contains(&format)
    }

    pub fn supports_layout(&self, layout: &ChannelLayout) -> bool {
        self.layouts().contains(layout)
    }

    pub fn supports_sample_rate(&self, rate: u32) -> bool {
        self.sample_rates().iter().any(|r| r.contains(rate))
    }

    /// Smallest supported rate at or above `rate`, else the largest supported
    /// rate.
    pub fn nearest_sample_rate(&self, rate: u32) -> Option<u32> {
        nearest_sample_rate(self.sample_rates(), rate)
    }

    /// A new output stream holding its own reference to this device.
    pub fn create_output_stream(&self) -> Result<OutStream> {
        if self.aim() != DeviceAim::Output {
            return Err(Error::InvalidState);
        }
        if self.probe_error().is_some() {
            return Err(Error::InvalidState);
        }
        Ok(OutStream::new(self.clone()))
    }

    pub(crate) fn open_backend_stream(
        &self,
        params: &StreamParams,
        sink: StreamSink,
    ) -> Result<Box<dyn BackendStream>> {
        let context = self
            .inner
            .context
            .upgrade()
            .ok_or(Error::BackendDisconnected)?;
        context.open_output_stream(self.inner.connection, &self.inner.descriptor, params, sink)
    }

    /// Number of live references, this one included.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    pub fn same_as(&self, other: &Device) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Release this reference.
    pub fn dispose(self) {
        debug!("Device {} disposed, {} references left", self.id(), self.ref_count() - 1);
    }
}

impl PartialEq for Device {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl Eq for Device {}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("aim", &self.aim())
            .field("raw", &self.is_raw())
            .field("backend", &self.backend())
            .field("probe_error", &self.probe_error())
            .finish()
    }
}
