//! uac-probe: inspect and exercise USB Audio Class 1.0 devices.

use std::io::stdout;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{Context as _, Result, bail};
use clap::{Parser, Subcommand};

use uac::protocol::{FORMAT_DATA_ANY, TERMINAL_ANY, TERMINAL_USB_STREAMING};

#[derive(Parser)]
#[command(name = "uac-probe", about = "Inspect USB Audio Class 1.0 devices")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List detected audio devices
    List,
    /// Dump topology, formats and routes for every device
    Dump {
        /// Emit the parsed model as JSON
        #[arg(long)]
        json: bool,
    },
    /// Stream from a device and print packet statistics
    Watch {
        /// Vendor id (hex)
        #[arg(long, value_parser = parse_hex16)]
        vid: u16,
        /// Product id (hex)
        #[arg(long, value_parser = parse_hex16)]
        pid: u16,
        /// Isochronous packets per transfer
        #[arg(long, default_value_t = 1)]
        burst: usize,
        /// How long to stream
        #[arg(long, default_value_t = 5)]
        seconds: u64,
    },
}

fn parse_hex16(value: &str) -> Result<u16, String> {
    let digits = value.trim_start_matches("0x");
    u16::from_str_radix(digits, 16).map_err(|e| e.to_string())
}

fn main() -> Result<()> {
    env_logger::init();
    log::debug!("starting uac-probe");
    let cli = Cli::parse();
    let context = uac::Context::new().context("initialising the USB context")?;

    match cli.command {
        Command::List => list(&context),
        Command::Dump { json } => dump(&context, json),
        Command::Watch {
            vid,
            pid,
            burst,
            seconds,
        } => watch(&context, vid, pid, burst, seconds),
    }
}

fn list(context: &uac::Context) -> Result<()> {
    let devices = context.query_all_devices()?;
    if devices.is_empty() {
        println!("no UAC 1.0 devices found");
        return Ok(());
    }
    for device in devices {
        let audio = device.audio_control();
        println!(
            "{:04x}:{:04x}  routes={} streams={}",
            device.vid(),
            device.pid(),
            audio.routes.len(),
            audio.streams.len()
        );
    }
    Ok(())
}

fn dump(context: &uac::Context, json: bool) -> Result<()> {
    let devices = context.query_all_devices()?;
    if json {
        let report: Vec<serde_json::Value> = devices
            .iter()
            .map(|device| {
                serde_json::json!({
                    "vid": device.vid(),
                    "pid": device.pid(),
                    "audio": device.audio_control(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    for device in devices {
        match device.open() {
            Ok(handle) => handle.dump(&mut stdout())?,
            Err(err) => println!(
                "{:04x}:{:04x}  (cannot open: {err})",
                device.vid(),
                device.pid()
            ),
        }
        println!();
    }
    Ok(())
}

fn watch(context: &uac::Context, vid: u16, pid: u16, burst: usize, seconds: u64) -> Result<()> {
    let devices = context.query_all_devices()?;
    let Some(device) = devices.iter().find(|d| d.vid() == vid && d.pid() == pid) else {
        bail!("no audio device {vid:04x}:{pid:04x}");
    };

    let routes = device.query_audio_routes(TERMINAL_ANY, TERMINAL_USB_STREAMING);
    let Some(route) = routes.first() else {
        bail!("device has no USB streaming route");
    };
    let stream = device.get_stream_interface(route)?;

    let channels = *stream
        .channel_counts(FORMAT_DATA_ANY)
        .last()
        .context("no uncompressed formats")?;
    let rates = stream.sample_rates(FORMAT_DATA_ANY);
    let rate = if rates.contains(&48_000) {
        48_000
    } else {
        *rates.first().context("no sample rates declared")?
    };
    let config = stream
        .query_config_uncompressed(FORMAT_DATA_ANY, channels, rate)
        .context("no matching stream configuration")?;
    println!(
        "streaming {channels}ch {}bit @ {rate} Hz, wMaxPacketSize={}",
        config.bit_resolution, config.max_packet_size
    );

    let handle = device.open().context("opening the device")?;
    handle.detach()?;

    let packets = Arc::new(AtomicUsize::new(0));
    let bytes = Arc::new(AtomicUsize::new(0));
    let stream_handle = {
        let packets = Arc::clone(&packets);
        let bytes = Arc::clone(&bytes);
        handle.start_streaming_with_burst(
            stream,
            &config,
            move |packet: &[u8]| {
                packets.fetch_add(1, Ordering::Relaxed);
                bytes.fetch_add(packet.len(), Ordering::Relaxed);
            },
            burst,
        )?
    };

    for second in 1..=seconds {
        std::thread::sleep(Duration::from_secs(1));
        println!(
            "[{second:>3}s] packets={} bytes={} error={:?}",
            packets.load(Ordering::Relaxed),
            bytes.load(Ordering::Relaxed),
            stream_handle.check_streaming_error()
        );
    }

    stream_handle.stop();
    Ok(())
}
