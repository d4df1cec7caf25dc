//! follow - fly a Tello drone that keeps a detected face in frame
//!
//! Live: connects to the drone, pipes its video through ffmpeg and steers.
//! Replay (`--replay`): decodes a local video file and records the commands
//! it would have sent.

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use face_follower::detect::open_backend;
use face_follower::display::{Display, HeadlessDisplay};
use face_follower::drone::{
    CommandSink, Dispatcher, LatestTelemetry, RecordingSink, SinkCommand, TelloSdk,
};
use face_follower::ingest::FfmpegDecoder;
use face_follower::input::{request_stop, spawn_stdin_reader, InputEvent};
use face_follower::tracking::{SelectionMode, TargetSelector};
use face_follower::{FollowerConfig, FrameError, Session};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Face detector topology (ONNX graph), or `stub://` for the bright-region stub.
    topology: PathBuf,
    /// Face detector weights.
    weights: PathBuf,
    /// Config file (JSON or TOML). Falls back to FOLLOW_CONFIG.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Decode this video file instead of connecting to the drone.
    #[arg(long)]
    replay: Option<PathBuf>,
    /// Target the most confident face instead of the last one reported.
    #[arg(long)]
    highest_confidence: bool,
    /// Show frames in a window (requires the display-window feature).
    #[arg(long)]
    window: bool,
}

enum Link {
    Live {
        sdk: Arc<TelloSdk>,
        dispatcher: JoinHandle<()>,
    },
    Replay {
        recorder: Arc<RecordingSink>,
        feeder: JoinHandle<()>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let cfg = FollowerConfig::load(args.config.as_deref())?;
    let detector = open_backend(&args.topology, &args.weights, &cfg.detector)?;
    let mode = if args.highest_confidence {
        SelectionMode::HighestConfidence
    } else {
        cfg.tracking.selection
    };
    let selector = TargetSelector::new(cfg.detector.confidence_threshold, mode);

    let mut decoder = FfmpegDecoder::spawn(&cfg.decoder, cfg.frame.width, cfg.frame.height)?;
    let mut video_in = decoder.take_input()?;
    let frames = decoder.take_frames()?;

    // First Ctrl-C: stop the decoder so a blocked frame read returns and the
    // session lands. Second Ctrl-C: leave immediately.
    let stop = Arc::new(AtomicBool::new(false));
    let handler_flag = stop.clone();
    let decoder_stop = decoder.stop_handle();
    ctrlc::set_handler(move || {
        if request_stop(&handler_flag) {
            log::warn!("interrupted again; exiting without landing");
            std::process::exit(130);
        }
        log::info!("interrupted; landing");
        decoder_stop.stop();
    })
    .context("failed to install Ctrl-C handler")?;

    let (input_tx, input_rx) = mpsc::channel::<InputEvent>();
    spawn_stdin_reader(input_tx.clone())?;
    let display = open_display(&args, &cfg, stop.clone(), input_tx)?;

    let telemetry = LatestTelemetry::default();
    let (link, sink): (Link, Arc<dyn CommandSink>) = match args.replay.as_ref() {
        Some(path) => {
            let mut file = File::open(path)
                .with_context(|| format!("failed to open replay file {}", path.display()))?;
            let feeder = thread::Builder::new()
                .name("replay-feed".to_string())
                .spawn(move || {
                    if let Err(e) = std::io::copy(&mut file, &mut video_in) {
                        log::warn!("replay feed stopped: {}", e);
                    }
                    log::info!("replay: fed {} bytes to decoder", video_in.bytes_written());
                })
                .context("spawn replay feeder")?;
            let recorder = Arc::new(RecordingSink::new());
            let sink: Arc<dyn CommandSink> = recorder.clone();
            log::info!("replaying {}; commands are recorded, not flown", path.display());
            (Link::Replay { recorder, feeder }, sink)
        }
        None => {
            let (event_tx, event_rx) = mpsc::channel();
            let sdk = Arc::new(TelloSdk::connect(&cfg.drone, event_tx)?);
            let dispatcher = Dispatcher::new(
                sdk.clone(),
                Some(Box::new(video_in)),
                cfg.drone.keepalive,
                telemetry.clone(),
            )
            .with_bitrate(cfg.drone.video_bitrate)
            .spawn(event_rx)?;
            let sink: Arc<dyn CommandSink> = sdk.clone();
            (Link::Live { sdk, dispatcher }, sink)
        }
    };

    let mut session = Session::new(
        cfg.frame,
        Box::new(frames),
        detector,
        sink,
        display,
        input_rx,
    )
    .with_selector(selector)
    .with_telemetry(telemetry);
    let result = session.run();
    drop(session);
    let interrupted = stop.load(Ordering::SeqCst);

    match link {
        Link::Live { sdk, dispatcher } => {
            sdk.shutdown()?;
            if dispatcher.join().is_err() {
                log::warn!("dispatcher thread panicked");
            }
            drop(decoder);
            // Ctrl-C ends the stream by stopping the decoder.
            match result {
                Err(e) if interrupted && stream_ended(&e) => Ok(()),
                other => other,
            }
        }
        Link::Replay { recorder, feeder } => {
            // A killed decoder unblocks a feeder stuck on a full pipe.
            drop(decoder);
            if feeder.join().is_err() {
                log::warn!("replay feeder panicked");
            }
            print_summary(&recorder.commands());
            // The end of the replay file is the normal way out.
            match result {
                Err(e) if stream_ended(&e) => Ok(()),
                other => other,
            }
        }
    }
}

fn stream_ended(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<FrameError>(),
        Some(FrameError::Exhausted { .. })
    )
}

#[cfg_attr(not(feature = "display-window"), allow(unused_variables))]
fn open_display(
    args: &Args,
    cfg: &FollowerConfig,
    stop: Arc<AtomicBool>,
    keys: mpsc::Sender<InputEvent>,
) -> Result<Box<dyn Display>> {
    if !args.window {
        return Ok(Box::new(HeadlessDisplay::with_stop_flag(stop)));
    }
    #[cfg(feature = "display-window")]
    {
        let window = face_follower::display::WindowDisplay::new(
            "face follower",
            cfg.frame.width,
            cfg.frame.height,
            keys,
        )?;
        Ok(Box::new(window.with_stop_flag(stop)))
    }
    #[cfg(not(feature = "display-window"))]
    {
        anyhow::bail!("--window requires the display-window feature")
    }
}

fn print_summary(commands: &[SinkCommand]) {
    let moves = commands
        .iter()
        .filter(|c| {
            matches!(
                c,
                SinkCommand::Yaw(r) | SinkCommand::Vertical(r) | SinkCommand::Forward(r) if *r != 0
            )
        })
        .count();
    println!("Recorded {} commands ({} non-zero moves)", commands.len(), moves);
    if let Some(last) = commands.last() {
        println!("Last command: {:?}", last);
    }
}
