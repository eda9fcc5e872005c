//! Sinks backends report through.
//!
//! A sink only carries the [`Handle`] of its context or stream. Each call
//! resolves the handle in the callback registry and forwards to the live
//! object; when the object is gone the call is dropped.

use crate::backend::PlaybackBuffer;
use crate::error::Error;
use crate::handle::Handle;
use crate::registry::{CONTEXTS, STREAMS};

/// Notification queued for delivery inside `flush_events`/`wait_events`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ContextEvent {
    DevicesChanged,
    BackendDisconnected(Error),
    Wakeup,
}

/// Context-level notifications. Callable from any thread.
#[derive(Debug, Clone)]
pub struct EventSink {
    handle: Handle,
}

impl EventSink {
    pub(crate) fn new(handle: Handle) -> Self {
        Self { handle }
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// The set of devices, or the configuration of one, changed.
    pub fn devices_changed(&self) {
        self.post(ContextEvent::DevicesChanged);
    }

    /// The connection to the audio system is gone.
    pub fn backend_disconnected(&self, err: Error) {
        self.post(ContextEvent::BackendDisconnected(err));
    }

    fn post(&self, event: ContextEvent) {
        if let Some(context) = CONTEXTS.lookup(self.handle) {
            context.post(event);
        }
    }
}

/// Stream-level callbacks, called on the backend's audio thread.
///
/// A backend must not call into the same sink from two threads at once.
#[derive(Debug, Clone)]
pub struct StreamSink {
    handle: Handle,
}

impl StreamSink {
    pub(crate) fn new(handle: Handle) -> Self {
        Self { handle }
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// Ask the application for between `frame_count_min` and
    /// `frame_count_max` frames, written through `buffer`.
    ///
    /// `Some(pause)` means the callback asked to pause or resume the stream;
    /// the backend applies it before the next call.
    pub fn write(
        &self,
        frame_count_min: usize,
        frame_count_max: usize,
        buffer: &mut dyn PlaybackBuffer,
    ) -> Option<bool> {
        STREAMS
            .lookup(self.handle)
            .and_then(|stream| stream.dispatch_write(frame_count_min, frame_count_max, buffer))
    }

    pub fn underflow(&self) {
        if let Some(stream) = STREAMS.lookup(self.handle) {
            stream.dispatch_underflow();
        }
    }

    pub fn error(&self, err: Error) {
        if let Some(stream) = STREAMS.lookup(self.handle) {
            stream.dispatch_error(err);
        }
    }

    /// Whether the stream this sink reports to still exists.
    pub fn is_live(&self) -> bool {
        STREAMS.contains(self.handle)
    }
}
