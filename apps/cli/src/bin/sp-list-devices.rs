use anyhow::Result;
use clap::Parser;
use soundport::BackendKind;
use soundport_cli::{connect, describe_devices, init_tracing, DevicesReport};
use tracing::error;

#[derive(Parser)]
#[command(name = "sp-list-devices")]
#[command(about = "List the audio devices of a backend")]
#[command(version)]
struct Cli {
    /// Keep running and list devices again whenever they change
    #[arg(long)]
    watch: bool,

    /// Backend to connect to: dummy, alsa, pulseaudio, jack, coreaudio or wasapi
    #[arg(long)]
    backend: Option<BackendKind>,

    /// Print device names only and hide raw devices
    #[arg(long)]
    short: bool,

    /// Print a JSON document instead of text
    #[arg(long)]
    json: bool,
}

fn print_devices(context: &soundport::Context, short: bool, json: bool) -> Result<()> {
    if json {
        let report = DevicesReport::collect(context)?;
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", describe_devices(context, short)?);
    }
    Ok(())
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut context = connect(cli.backend)?;
    if !cli.watch {
        return print_devices(&context, cli.short, cli.json);
    }

    let (short, json) = (cli.short, cli.json);
    context.set_on_devices_change(move |context| {
        if !json {
            println!("devices changed");
        }
        if let Err(e) = print_devices(context, short, json) {
            error!("Failed to list devices: {e:#}");
        }
    })?;
    print_devices(&context, short, json)?;
    loop {
        context.wait_events();
    }
}
