//! Voice Client Application
//!
//! Connects to a speech service over WebSocket, streams the microphone as
//! 16 kHz PCM16 and plays back whatever audio the service returns.
//! Controlled with line commands on stdin.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use voicelink::{
    audio::{capture::CpalCaptureSource, device::list_devices},
    config::AppConfig,
    playback::{CpalPlayback, PlayOutcome},
    session::{Session, SessionSettings, SessionState},
    transport::WsConnector,
};

const HELP: &str = "\
Commands:
  connect      open the connection
  disconnect   close the connection and release audio
  talk         start the microphone (manual capture mode)
  mute         stop the microphone
  play         play buffered audio (buffered playback mode)
  status       print session status
  log          print the session log
  devices      list audio devices
  quit         exit";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting voice client");

    let mut config = AppConfig::load_or_default()?;
    if let Some(url) = std::env::args().nth(1) {
        config.transport.url = url;
    }
    config.validate()?;

    print_devices();

    tracing::info!(
        "Target {} | playback {:?} | capture {:?} at {} Hz",
        config.transport.url,
        config.playback.mode,
        config.session.capture_start,
        config.capture.requested_rate()
    );

    let (connector, mut events) = WsConnector::channel(&config.transport, tokio::runtime::Handle::current());
    let engine = Arc::new(CpalPlayback::new(
        config.playback.device_id.clone(),
        config.playback.queue_capacity,
    ));
    let source = CpalCaptureSource::new(config.capture.device_id.clone());
    let mut session = Session::new(SessionSettings::from(&config), Box::new(connector), source, engine);

    println!("{}", HELP);
    if let Err(e) = session.connect() {
        tracing::warn!("Initial connect failed: {}", e);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut capture_check = tokio::time::interval(Duration::from_millis(500));
    let mut stats_tick = tokio::time::interval(Duration::from_secs(5));

    loop {
        tokio::select! {
            Some(event) = events.recv() => session.handle_event(event),
            _ = capture_check.tick() => {
                if let Some(e) = session.poll_capture() {
                    println!("microphone stopped: {}", e);
                }
            }
            _ = stats_tick.tick() => log_stats(&session),
            line = lines.next_line() => match line? {
                Some(line) => {
                    if !run_command(&mut session, line.trim()) {
                        break;
                    }
                }
                None => break,
            },
        }
    }

    session.disconnect();
    tracing::info!("Voice client stopped");
    Ok(())
}

/// Returns false when the client should exit
fn run_command(session: &mut Session<CpalCaptureSource>, command: &str) -> bool {
    match command {
        "" => {}
        "connect" => {
            if let Err(e) = session.connect() {
                println!("connect failed: {}", e);
            }
        }
        "disconnect" => session.disconnect(),
        "talk" => {
            if let Err(e) = session.start_talking() {
                println!("talk failed: {}", e);
            }
        }
        "mute" => session.stop_talking(),
        "play" => match session.play() {
            Ok(PlayOutcome::Played { bytes }) => println!("playing {} byte clip", bytes),
            Ok(PlayOutcome::NoBufferedData) => println!("nothing buffered yet"),
            Ok(PlayOutcome::Streaming) => println!("streaming mode plays audio as it arrives"),
            Err(e) => println!("play failed: {}", e),
        },
        "status" => match serde_json::to_string_pretty(&session.status()) {
            Ok(json) => println!("{}", json),
            Err(e) => println!("status unavailable: {}", e),
        },
        "log" => {
            for entry in session.log().entries() {
                println!("{}", entry);
            }
        }
        "devices" => print_devices(),
        "help" => println!("{}", HELP),
        "quit" | "exit" => return false,
        other => println!("unknown command: {} (try help)", other),
    }
    true
}

fn log_stats(session: &Session<CpalCaptureSource>) {
    let status = session.status();
    if status.state != SessionState::Connected {
        return;
    }
    tracing::info!(
        "Capture: {} chunks sent, {} dropped, {:.1} KB | Playback: {} chunks, {} malformed, {} rejected",
        status.capture.chunks_sent,
        status.capture.chunks_dropped,
        status.capture.bytes_sent as f64 / 1024.0,
        status.playback.chunks_received,
        status.playback.malformed,
        status.playback.rejected
    );
    tracing::info!(
        "Output queue: {} queued, {} overflows, {} underruns",
        status.output.queued,
        status.output.overflows,
        status.output.underruns
    );
}

fn print_devices() {
    println!("\n=== Available Audio Devices ===");
    for device in list_devices() {
        let device_type = if device.is_input { "Input" } else { "Output" };
        let default_marker = if device.is_default { " [DEFAULT]" } else { "" };
        println!("  {} ({}){}:", device.name, device_type, default_marker);
        println!("    ID: {}", device.id);
        println!("    Sample rates: {:?}", device.sample_rates);
        println!("    Channels: {:?}", device.channels);
    }
    println!();
}
