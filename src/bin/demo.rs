//! demo - end-to-end synthetic tracking run, no drone or camera needed

use anyhow::Result;
use clap::Parser;
use std::path::Path;
use std::sync::mpsc;
use std::sync::Arc;

use face_follower::detect::open_backend;
use face_follower::drone::{RecordingSink, SinkCommand};
use face_follower::input::InputEvent;
use face_follower::{
    DetectorSettings, FrameError, FrameSettings, HeadlessDisplay, Session, SyntheticConfig,
    SyntheticSource,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Number of synthetic frames to run.
    #[arg(long, default_value_t = 160)]
    frames: u64,
    /// Frame width.
    #[arg(long, default_value_t = 400)]
    width: u32,
    /// Frame height.
    #[arg(long, default_value_t = 300)]
    height: u32,
}

#[derive(Default, Debug)]
struct Summary {
    take_offs: usize,
    lands: usize,
    clockwise: usize,
    counter_clockwise: usize,
    up: usize,
    down: usize,
    forward: usize,
    backward: usize,
    holds: usize,
}

impl Summary {
    fn from_commands(commands: &[SinkCommand]) -> Self {
        let mut summary = Summary::default();
        for command in commands {
            match *command {
                SinkCommand::TakeOff => summary.take_offs += 1,
                SinkCommand::Land => summary.lands += 1,
                SinkCommand::Yaw(r) if r > 0 => summary.clockwise += 1,
                SinkCommand::Yaw(r) if r < 0 => summary.counter_clockwise += 1,
                SinkCommand::Vertical(r) if r > 0 => summary.up += 1,
                SinkCommand::Vertical(r) if r < 0 => summary.down += 1,
                SinkCommand::Forward(r) if r > 0 => summary.forward += 1,
                SinkCommand::Forward(r) if r < 0 => summary.backward += 1,
                SinkCommand::Yaw(_) | SinkCommand::Vertical(_) | SinkCommand::Forward(_) => {
                    summary.holds += 1
                }
                _ => {}
            }
        }
        summary
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let source = SyntheticSource::new(SyntheticConfig {
        url: "stub://demo".to_string(),
        width: args.width,
        height: args.height,
        max_frames: Some(args.frames),
    });
    let stub = Path::new("stub://demo");
    let detector = open_backend(stub, stub, &DetectorSettings::default())?;
    let recorder = Arc::new(RecordingSink::new());

    // Take off, then arm so the first visible face becomes the reference.
    let (input_tx, input_rx) = mpsc::channel();
    input_tx.send(InputEvent::TakeOff)?;
    input_tx.send(InputEvent::ToggleTracking)?;
    drop(input_tx);

    let mut session = Session::new(
        FrameSettings {
            width: args.width,
            height: args.height,
        },
        Box::new(source),
        detector,
        recorder.clone(),
        Box::new(HeadlessDisplay::new()),
        input_rx,
    );
    match session.run() {
        Ok(()) => {}
        Err(e)
            if matches!(
                e.downcast_ref::<FrameError>(),
                Some(FrameError::Exhausted { .. })
            ) => {}
        Err(e) => return Err(e),
    }

    let stats = session.stats().clone();
    let reference = session.state().reference_distance();
    let summary = Summary::from_commands(&recorder.commands());

    println!("Demo complete");
    println!("  cycles:     {}", stats.cycles);
    println!("  detections: {}", stats.detections);
    println!("  reference:  {:.2}", reference);
    println!("  commands:   {}", stats.commands);
    println!("  {:?}", summary);
    Ok(())
}
