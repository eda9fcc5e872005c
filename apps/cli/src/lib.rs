//! Shared plumbing for the soundport command-line tools.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use serde::Serialize;
use soundport::{
    BackendKind, ChannelId, ChannelLayout, Context, ContextOptions, DeviceAim, Device,
    SampleFormat, SampleRateRange,
};
use tracing::info;

/// Install the `tracing` subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "soundport=info,soundport_cli=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Create a context and connect it, to `backend` if given, else to the first
/// backend that accepts the connection.
pub fn connect(backend: Option<BackendKind>) -> Result<Context> {
    let mut options = ContextOptions::from_env();
    if backend.is_some() {
        options = options.backend(backend);
    }
    let mut context = Context::with_options(options);
    match context.options().backend {
        Some(kind) => context
            .connect_backend(kind)
            .with_context(|| format!("Unable to connect to {kind}"))?,
        None => context.connect().context("Unable to connect to any backend")?,
    }
    if let Some(kind) = context.current_backend() {
        info!("Connected to {kind}");
    }
    context.flush_events();
    Ok(context)
}

/// Channel names of `layout`, comma separated.
pub fn layout_names(layout: &ChannelLayout) -> String {
    layout
        .channels()
        .iter()
        .map(|c| c.name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Text rendering of one device, in the `sp-list-devices` format.
pub fn describe_device(device: &Device, is_default: bool, short: bool) -> String {
    let mut out = String::from(device.name());
    if is_default {
        out.push_str(" (default)");
    }
    if device.is_raw() {
        out.push_str(" (raw)");
    }
    out.push('\n');
    if short {
        return out;
    }

    let _ = writeln!(out, "  id: {}", device.id());
    if let Some(err) = device.probe_error() {
        let _ = writeln!(out, "  probe error: {err}");
        out.push('\n');
        return out;
    }

    out.push_str("  channel layouts:\n");
    for layout in device.layouts() {
        let _ = writeln!(out, "    {}", layout_names(layout));
    }
    if let Some(layout) = device.current_layout() {
        let _ = writeln!(out, "  current layout: {}", layout_names(layout));
    }

    out.push_str("  sample rates:\n");
    for range in device.sample_rates() {
        let _ = writeln!(out, "    {} - {}", range.min, range.max);
    }
    if device.sample_rate_current() != 0 {
        let _ = writeln!(out, "  current sample rate: {}", device.sample_rate_current());
    }

    let formats: Vec<_> = device.formats().iter().map(|f| f.name()).collect();
    let _ = writeln!(out, "  formats: {}", formats.join(", "));
    if device.current_format() != SampleFormat::Invalid {
        let _ = writeln!(out, "  current format: {}", device.current_format().name());
    }

    let _ = writeln!(out, "  min software latency: {:.8} sec", device.software_latency_min());
    let _ = writeln!(out, "  max software latency: {:.8} sec", device.software_latency_max());
    if device.software_latency_current() != 0.0 {
        let _ = writeln!(
            out,
            "  current software latency: {:.8} sec",
            device.software_latency_current()
        );
    }
    out.push('\n');
    out
}

/// Text listing of every device on the connected backend.
///
/// With `short`, raw duplicates of shared devices are left out.
pub fn describe_devices(context: &Context, short: bool) -> Result<String> {
    let inputs = context.list_input_devices()?;
    let outputs = context.list_output_devices()?;
    let default_input = context.default_input_device_index();
    let default_output = context.default_output_device_index();

    let mut out = String::from("--------Input Devices--------\n\n");
    let mut shown = 0;
    for (i, device) in inputs.iter().enumerate() {
        if short && device.is_raw() {
            continue;
        }
        out.push_str(&describe_device(device, default_input == Some(i), short));
        shown += 1;
    }
    out.push_str("\n--------Output Devices--------\n\n");
    for (i, device) in outputs.iter().enumerate() {
        if short && device.is_raw() {
            continue;
        }
        out.push_str(&describe_device(device, default_output == Some(i), short));
        shown += 1;
    }
    let _ = writeln!(out, "\n{shown} devices found");
    Ok(out)
}

#[derive(Debug, Serialize)]
pub struct DeviceReport {
    pub id: String,
    pub name: String,
    pub aim: DeviceAim,
    pub is_raw: bool,
    pub is_default: bool,
    pub probe_error: Option<String>,
    pub layouts: Vec<Vec<ChannelId>>,
    pub current_layout: Option<Vec<ChannelId>>,
    pub formats: Vec<SampleFormat>,
    pub current_format: Option<SampleFormat>,
    pub sample_rates: Vec<SampleRateRange>,
    pub sample_rate_current: Option<u32>,
    pub software_latency_min: f64,
    pub software_latency_max: f64,
    pub software_latency_current: Option<f64>,
}

impl DeviceReport {
    pub fn new(device: &Device, is_default: bool) -> Self {
        Self {
            id: device.id().to_owned(),
            name: device.name().to_owned(),
            aim: device.aim(),
            is_raw: device.is_raw(),
            is_default,
            probe_error: device.probe_error().map(|e| e.to_string()),
            layouts: device.layouts().iter().map(|l| l.channels().to_vec()).collect(),
            current_layout: device.current_layout().map(|l| l.channels().to_vec()),
            formats: device.formats().to_vec(),
            current_format: Some(device.current_format()).filter(|f| *f != SampleFormat::Invalid),
            sample_rates: device.sample_rates().to_vec(),
            sample_rate_current: Some(device.sample_rate_current()).filter(|r| *r != 0),
            software_latency_min: device.software_latency_min(),
            software_latency_max: device.software_latency_max(),
            software_latency_current: Some(device.software_latency_current()).filter(|l| *l != 0.0),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DevicesReport {
    pub backend: Option<BackendKind>,
    pub inputs: Vec<DeviceReport>,
    pub outputs: Vec<DeviceReport>,
}

impl DevicesReport {
    pub fn collect(context: &Context) -> Result<Self> {
        let default_input = context.default_input_device_index();
        let default_output = context.default_output_device_index();
        let inputs = context
            .list_input_devices()?
            .iter()
            .enumerate()
            .map(|(i, d)| DeviceReport::new(d, default_input == Some(i)))
            .collect();
        let outputs = context
            .list_output_devices()?
            .iter()
            .enumerate()
            .map(|(i, d)| DeviceReport::new(d, default_output == Some(i)))
            .collect();
        Ok(Self {
            backend: context.current_backend(),
            inputs,
            outputs,
        })
    }
}

/// Underflow tally shared between the audio thread and the event loop.
#[derive(Debug, Clone, Default)]
pub struct UnderflowCounter {
    count: Arc<AtomicU64>,
    reported: Arc<AtomicU64>,
}

impl UnderflowCounter {
    /// Safe to call from the audio thread.
    pub fn record(&self) {
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// The running total when it moved since the previous report.
    pub fn take_report(&self) -> Option<u64> {
        let count = self.count();
        let previous = self.reported.swap(count, Ordering::Relaxed);
        (count != previous).then_some(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy() -> Context {
        connect(Some(BackendKind::Dummy)).unwrap()
    }

    #[test]
    fn test_underflow_counter_reports_each_change_once() {
        let counter = UnderflowCounter::default();
        assert_eq!(counter.take_report(), None);
        let audio = counter.clone();
        audio.record();
        audio.record();
        assert_eq!(counter.take_report(), Some(2));
        assert_eq!(counter.take_report(), None);
        audio.record();
        assert_eq!(counter.take_report(), Some(3));
    }

    #[test]
    fn test_underflow_counter_from_stream_callback() {
        let context = dummy();
        let device = context.default_output_device().unwrap();
        let mut stream = device.create_output_stream().unwrap();
        let counter = UnderflowCounter::default();
        let audio = counter.clone();
        stream
            .set_write_callback(|_, _, _| Err(soundport::Error::Underflow))
            .unwrap();
        stream.set_underflow_callback(move || audio.record()).unwrap();
        stream.open().unwrap();
        stream.start().unwrap();

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while counter.count() == 0 && std::time::Instant::now() < deadline {
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        stream.dispose();
        let total = counter.count();
        assert!(total > 0);
        assert_eq!(counter.take_report(), Some(total));
        assert_eq!(counter.take_report(), None);
    }

    #[test]
    fn test_layout_names() {
        assert_eq!(layout_names(&ChannelLayout::stereo()), "Front Left, Front Right");
        assert_eq!(layout_names(&ChannelLayout::default()), "");
    }

    #[test]
    fn test_describe_devices_lists_dummy_endpoints() {
        let context = dummy();
        let text = describe_devices(&context, false).unwrap();
        assert!(text.starts_with("--------Input Devices--------"));
        assert!(text.contains("(default)"));
        assert!(text.contains("  id: dummy-out"));
        assert!(text.contains("  current layout: Front Left, Front Right"));
        assert!(text.contains("  current sample rate: 48000"));
        assert!(text.ends_with("2 devices found\n"));
    }

    #[test]
    fn test_short_output_has_names_only() {
        let context = dummy();
        let text = describe_devices(&context, true).unwrap();
        assert!(!text.contains("  id:"));
        assert!(!text.contains("formats:"));
        assert!(text.ends_with("2 devices found\n"));
    }

    #[test]
    fn test_report_serializes_as_json() {
        let context = dummy();
        let report = DevicesReport::collect(&context).unwrap();
        assert_eq!(report.backend, Some(BackendKind::Dummy));
        assert_eq!(report.outputs.len(), 1);
        assert!(report.outputs[0].is_default);
        assert_eq!(report.outputs[0].probe_error, None);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["outputs"][0]["id"], "dummy-out");
        assert_eq!(json["outputs"][0]["sample_rate_current"], 48000);
        assert!(json["inputs"][0]["formats"].as_array().unwrap().len() > 1);
    }
}
