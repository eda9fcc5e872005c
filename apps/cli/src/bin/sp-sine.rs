use std::f64::consts::TAU;
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context as _, Result};
use clap::Parser;
use soundport::{BackendKind, Device, OutStream, OutStreamWriter, SampleFormat, Waker};
use soundport_cli::{connect, init_tracing, UnderflowCounter};
use tracing::warn;

const PITCH: f64 = 440.0;

/// How often the monitor thread checks the underflow counter.
const UNDERFLOW_POLL: Duration = Duration::from_millis(250);

/// Formats tried in order when `--format` is not given.
const PREFERRED_FORMATS: [SampleFormat; 4] = [
    SampleFormat::FLOAT32_NE,
    SampleFormat::FLOAT64_NE,
    SampleFormat::S32_NE,
    SampleFormat::S16_NE,
];

#[derive(Parser)]
#[command(name = "sp-sine")]
#[command(about = "Play a 440 Hz sine wave")]
#[command(version)]
struct Cli {
    /// Backend to connect to: dummy, alsa, pulseaudio, jack, coreaudio or wasapi
    #[arg(long)]
    backend: Option<BackendKind>,

    /// Output device id (default: the backend's default output)
    #[arg(long)]
    device: Option<String>,

    /// Open the raw variant of --device
    #[arg(long)]
    raw: bool,

    /// Stream name shown by the backend
    #[arg(long)]
    name: Option<String>,

    /// Software latency in seconds (0 picks the device default)
    #[arg(long, default_value = "0")]
    latency: f64,

    /// Sample rate in Hz (0 picks the nearest to 48000)
    #[arg(long, default_value = "0")]
    sample_rate: u32,

    /// Sample format, e.g. f32le, s16ne
    #[arg(long, value_parser = parse_format)]
    format: Option<SampleFormat>,
}

fn parse_format(name: &str) -> std::result::Result<SampleFormat, String> {
    SampleFormat::parse(name).ok_or_else(|| format!("unknown sample format: {name}"))
}

fn choose_format(device: &Device, requested: Option<SampleFormat>) -> Result<SampleFormat> {
    match requested {
        Some(format) if device.supports_format(format) => Ok(format),
        Some(format) => bail!("{} does not support {}", device.name(), format.name()),
        None => PREFERRED_FORMATS
            .into_iter()
            .find(|f| device.supports_format(*f))
            .context("No suitable device format available"),
    }
}

/// Write callback producing a continuous sine on every channel. Pauses the
/// stream itself once `want_pause` is raised.
fn sine_writer(
    want_pause: Arc<AtomicBool>,
) -> impl FnMut(&mut OutStreamWriter<'_>, usize, usize) -> soundport::Result<()> + Send + 'static {
    let mut seconds_offset = 0.0;
    move |writer: &mut OutStreamWriter<'_>, _frame_count_min: usize, frame_count_max: usize| {
        let seconds_per_frame = 1.0 / writer.sample_rate() as f64;
        let channels = writer.channel_count();
        let mut frames_left = frame_count_max;
        while frames_left > 0 {
            let mut areas = writer.begin_write(frames_left)?;
            let frame_count = areas.frame_count();
            if frame_count == 0 {
                break;
            }
            for frame in 0..frame_count {
                let t = seconds_offset + frame as f64 * seconds_per_frame;
                let sample = (t * PITCH * TAU).sin();
                for channel in 0..channels {
                    areas.write_sample(channel, frame, sample);
                }
            }
            seconds_offset = (seconds_offset + seconds_per_frame * frame_count as f64) % 1.0;
            areas.end_write()?;
            frames_left -= frame_count;
        }
        if want_pause.swap(false, Ordering::Relaxed) {
            writer.request_pause(true);
        }
        Ok(())
    }
}

/// State the audio thread shares with the event loop.
#[derive(Default)]
struct Shared {
    want_pause: Arc<AtomicBool>,
    underflows: UnderflowCounter,
}

fn open_stream(device: &Device, cli: &Cli, shared: &Shared, waker: Waker) -> Result<OutStream> {
    let mut stream = device.create_output_stream()?;
    stream.set_format(choose_format(device, cli.format)?)?;
    stream.set_sample_rate(cli.sample_rate)?;
    stream.set_software_latency(cli.latency)?;
    if let Some(name) = &cli.name {
        stream.set_name(name.as_str())?;
    }
    stream.set_write_callback(sine_writer(Arc::clone(&shared.want_pause)))?;
    let underflows = shared.underflows.clone();
    stream.set_underflow_callback(move || underflows.record())?;
    stream.set_error_callback(move |e| {
        eprintln!("stream error: {e}");
        waker.wake();
    })?;

    stream.open().context("Unable to open device")?;
    if let Some(err) = stream.layout_error() {
        warn!("Unable to set channel layout: {err}");
    }
    Ok(stream)
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut context = connect(cli.backend)?;
    if let Some(kind) = context.current_backend() {
        println!("Backend: {kind}");
    }

    let device = match &cli.device {
        Some(id) => context.output_device_by_id(id, cli.raw),
        None => context.default_output_device(),
    }
    .context("Output device not found")?;
    println!("Output device: {}", device.name());
    if let Some(err) = device.probe_error() {
        bail!("Cannot probe device: {err}");
    }

    let shared = Shared::default();
    let mut stream = open_stream(&device, &cli, &shared, context.waker())?;
    println!(
        "Format: {}, {} Hz, {} channels",
        stream.format().name(),
        stream.sample_rate(),
        stream.layout().channel_count()
    );
    println!("Software latency: {:.6} sec", stream.software_latency());
    print!(
        "'p\\n' - pause\n\
         'P\\n' - pause from within the write callback\n\
         'u\\n' - unpause\n\
         'c\\n' - clear buffer\n\
         'q\\n' - quit\n"
    );

    stream.start().context("Unable to start device")?;

    let (commands, lines) = std::sync::mpsc::channel::<String>();
    let waker = context.waker();
    std::thread::Builder::new()
        .name("sp-sine-stdin".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if commands.send(line).is_err() {
                    break;
                }
                waker.wake();
            }
            let _ = commands.send(String::from("q"));
            waker.wake();
        })?;

    let underflows = shared.underflows.clone();
    let waker = context.waker();
    std::thread::Builder::new()
        .name("sp-sine-underflow".into())
        .spawn(move || {
            let mut seen = 0;
            loop {
                std::thread::sleep(UNDERFLOW_POLL);
                let count = underflows.count();
                if count != seen {
                    seen = count;
                    waker.wake();
                }
            }
        })?;

    'events: loop {
        context.wait_events();
        while let Ok(line) = lines.try_recv() {
            let result = match line.trim() {
                "p" => {
                    println!("pausing...");
                    stream.pause(true)
                }
                "P" => {
                    println!("pausing from the write callback...");
                    shared.want_pause.store(true, Ordering::Relaxed);
                    Ok(())
                }
                "u" => {
                    println!("unpausing...");
                    shared.want_pause.store(false, Ordering::Relaxed);
                    stream.pause(false)
                }
                "c" => {
                    println!("clear buffer...");
                    stream.clear_buffer()
                }
                "q" => break 'events,
                "" => Ok(()),
                other => {
                    println!("Unrecognized command: {other}");
                    Ok(())
                }
            };
            if let Err(e) = result {
                eprintln!("{e}");
            }
        }
        if let Some(underflows) = shared.underflows.take_report() {
            eprintln!("underflow {underflows}");
        }
        if stream.is_failed() {
            bail!("Stream failed");
        }
    }

    stream.dispose();
    device.dispose();
    Ok(())
}
