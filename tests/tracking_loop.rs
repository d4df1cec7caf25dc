use anyhow::{anyhow, Result};
use std::collections::VecDeque;
use std::sync::atomic::Ordering;
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};

use face_follower::display::{Display, HeadlessDisplay, Presented};
use face_follower::drone::{RecordingSink, SinkCommand, NUDGE_RATE};
use face_follower::frame::{frame_len, BOX_COLOUR};
use face_follower::ingest::FrameSource;
use face_follower::input::{InputEvent, Nudge};
use face_follower::tracking::{
    Phase, SelectionMode, TargetSelector, CONFIDENCE_THRESHOLD, FORWARD_RATE, YAW_RATE,
};
use face_follower::{
    CycleOutcome, DetectorBackend, Frame, FrameError, FrameSettings, RawDetection, Session,
};

const W: u32 = 400;
const H: u32 = 300;

/// Blank frames, optionally interleaved with scripted errors, then exhaustion.
struct ScriptedSource {
    script: VecDeque<Result<Frame, FrameError>>,
    read: u64,
}

impl ScriptedSource {
    fn blank(frames: usize) -> Self {
        let script = (0..frames).map(|_| Ok(blank_frame())).collect();
        Self { script, read: 0 }
    }

    fn with_script(script: Vec<Result<Frame, FrameError>>) -> Self {
        Self {
            script: script.into(),
            read: 0,
        }
    }
}

impl FrameSource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    fn next_frame(&mut self) -> Result<Frame, FrameError> {
        match self.script.pop_front() {
            Some(Ok(frame)) => {
                self.read += 1;
                Ok(frame)
            }
            Some(Err(e)) => Err(e),
            None => Err(FrameError::Exhausted {
                expected: frame_len(W, H),
            }),
        }
    }

    fn frames_read(&self) -> u64 {
        self.read
    }
}

/// Returns one scripted detection list per call; empty once the script runs out.
struct ScriptedDetector {
    script: VecDeque<Result<Vec<RawDetection>>>,
}

impl ScriptedDetector {
    fn new(script: Vec<Result<Vec<RawDetection>>>) -> Self {
        Self {
            script: script.into(),
        }
    }
}

impl DetectorBackend for ScriptedDetector {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn detect(&mut self, _frame: &Frame) -> Result<Vec<RawDetection>> {
        self.script.pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Keeps a copy of every presented frame.
#[derive(Clone, Default)]
struct CapturingDisplay {
    frames: Arc<Mutex<Vec<Frame>>>,
}

impl Display for CapturingDisplay {
    fn name(&self) -> &str {
        "capturing"
    }

    fn show(&mut self, frame: &Frame) -> Result<Presented> {
        self.frames.lock().unwrap().push(frame.clone());
        Ok(Presented::Continue)
    }
}

fn blank_frame() -> Frame {
    Frame::from_bgr(vec![0; frame_len(W, H)], W, H).unwrap()
}

/// A detection given in pixel coordinates of a W x H frame.
fn face(confidence: f32, left: f32, top: f32, right: f32, bottom: f32) -> RawDetection {
    RawDetection {
        class_id: 1,
        confidence,
        left: left / W as f32,
        top: top / H as f32,
        right: right / W as f32,
        bottom: bottom / H as f32,
    }
}

struct Rig {
    session: Session,
    sink: Arc<RecordingSink>,
    input: Sender<InputEvent>,
}

fn rig(source: ScriptedSource, detector: ScriptedDetector, display: Box<dyn Display>) -> Rig {
    let sink = Arc::new(RecordingSink::new());
    let (input, input_rx) = mpsc::channel();
    let session = Session::new(
        FrameSettings {
            width: W,
            height: H,
        },
        Box::new(source),
        Box::new(detector),
        sink.clone(),
        display,
        input_rx,
    );
    Rig {
        session,
        sink,
        input,
    }
}

fn stops() -> Vec<SinkCommand> {
    vec![
        SinkCommand::Yaw(0),
        SinkCommand::Vertical(0),
        SinkCommand::Forward(0),
    ]
}

#[test]
fn armed_without_detections_issues_no_movement() {
    let mut r = rig(
        ScriptedSource::blank(5),
        ScriptedDetector::new(vec![]),
        Box::new(HeadlessDisplay::new()),
    );
    r.input.send(InputEvent::ToggleTracking).unwrap();

    for _ in 0..5 {
        assert_eq!(r.session.step().unwrap(), CycleOutcome::Continue);
    }

    // Only the all-axes stop issued by the toggle itself.
    assert_eq!(r.sink.commands(), stops());
    assert_eq!(r.session.state().phase(), Phase::Calibrating);
}

#[test]
fn first_target_calibrates_and_reference_is_kept() {
    let mut r = rig(
        ScriptedSource::blank(3),
        ScriptedDetector::new(vec![
            Ok(vec![face(0.9, 100.0, 100.0, 200.0, 200.0)]),
            Ok(vec![face(0.9, 175.0, 125.0, 225.0, 175.0)]),
            Ok(vec![face(0.9, 100.0, 50.0, 250.0, 250.0)]),
        ]),
        Box::new(HeadlessDisplay::new()),
    );
    r.input.send(InputEvent::ToggleTracking).unwrap();

    r.session.step().unwrap();
    let reference = r.session.state().reference_distance();
    assert!((reference - 141.42).abs() < 0.01, "reference {}", reference);
    assert_eq!(r.session.state().phase(), Phase::Active);
    // Calibrating cycle steers right after capture: centred and at reference.
    let mut expected = stops();
    expected.extend(stops());
    assert_eq!(r.sink.commands(), expected);

    // Smaller face: move forward.
    r.sink.clear();
    r.session.step().unwrap();
    assert_eq!(
        r.sink.commands(),
        vec![
            SinkCommand::Yaw(0),
            SinkCommand::Vertical(0),
            SinkCommand::Forward(FORWARD_RATE),
        ]
    );

    // Larger face: back off. The reference never moves while active.
    r.sink.clear();
    r.session.step().unwrap();
    assert_eq!(
        r.sink.commands().last(),
        Some(&SinkCommand::Forward(-FORWARD_RATE))
    );
    assert_eq!(r.session.state().reference_distance(), reference);
}

#[test]
fn last_qualifying_face_is_followed_and_all_are_drawn() {
    let display = CapturingDisplay::default();
    let frames = display.frames.clone();
    let mut r = rig(
        ScriptedSource::blank(1),
        ScriptedDetector::new(vec![Ok(vec![
            face(0.95, 20.0, 100.0, 80.0, 160.0),
            face(0.30, 150.0, 100.0, 190.0, 160.0),
            face(0.60, 300.0, 100.0, 360.0, 160.0),
        ])]),
        Box::new(display),
    );
    r.input.send(InputEvent::ToggleTracking).unwrap();
    r.session.step().unwrap();

    // Rightmost box was last qualifying: rotate clockwise.
    assert_eq!(r.sink.commands()[3], SinkCommand::Yaw(YAW_RATE));

    let frames = frames.lock().unwrap();
    let shown = &frames[0];
    assert_eq!(shown.pixel(20, 130), Some(BOX_COLOUR));
    assert_eq!(shown.pixel(300, 130), Some(BOX_COLOUR));
    // Below threshold: not drawn.
    assert_eq!(shown.pixel(150, 130), Some([0, 0, 0]));
    assert_eq!(r.session.stats().detections, 2);
}

#[test]
fn highest_confidence_mode_prefers_strongest_face() {
    let mut r = rig(
        ScriptedSource::blank(1),
        ScriptedDetector::new(vec![Ok(vec![
            face(0.95, 20.0, 100.0, 80.0, 160.0),
            face(0.60, 300.0, 100.0, 360.0, 160.0),
        ])]),
        Box::new(HeadlessDisplay::new()),
    );
    r.session = r.session.with_selector(TargetSelector::new(
        CONFIDENCE_THRESHOLD,
        SelectionMode::HighestConfidence,
    ));
    r.input.send(InputEvent::ToggleTracking).unwrap();
    r.session.step().unwrap();

    assert_eq!(r.sink.commands()[3], SinkCommand::Yaw(-YAW_RATE));
}

#[test]
fn disarmed_session_never_steers() {
    let mut r = rig(
        ScriptedSource::blank(2),
        ScriptedDetector::new(vec![
            Ok(vec![face(0.9, 10.0, 10.0, 50.0, 50.0)]),
            Ok(vec![face(0.9, 10.0, 10.0, 50.0, 50.0)]),
        ]),
        Box::new(HeadlessDisplay::new()),
    );
    r.session.step().unwrap();
    // Arm and disarm before the next frame: even toggles leave it idle.
    r.input.send(InputEvent::ToggleTracking).unwrap();
    r.input.send(InputEvent::ToggleTracking).unwrap();
    r.session.step().unwrap();

    let mut expected = stops();
    expected.extend(stops());
    assert_eq!(r.sink.commands(), expected);
    assert_eq!(r.session.state().phase(), Phase::Idle);
    assert_eq!(r.session.stats().targets, 2);
}

#[test]
fn stream_end_is_fatal_and_lands() {
    let mut r = rig(
        ScriptedSource::blank(2),
        ScriptedDetector::new(vec![]),
        Box::new(HeadlessDisplay::new()),
    );
    let err = r.session.run().unwrap_err();
    assert!(matches!(
        err.downcast_ref::<FrameError>(),
        Some(FrameError::Exhausted { .. })
    ));
    assert_eq!(r.sink.commands(), vec![SinkCommand::Land]);
    assert_eq!(r.session.stats().cycles, 3);
}

#[test]
fn display_stop_ends_session_and_lands() {
    let display = HeadlessDisplay::new();
    let flag = display.stop_flag();
    flag.store(true, Ordering::SeqCst);
    let mut r = rig(
        ScriptedSource::blank(10),
        ScriptedDetector::new(vec![Ok(vec![face(0.9, 10.0, 10.0, 50.0, 50.0)])]),
        Box::new(display),
    );
    r.input.send(InputEvent::ToggleTracking).unwrap();

    r.session.run().unwrap();
    // Stop is checked before steering: only the toggle's stops, then land.
    let mut expected = stops();
    expected.push(SinkCommand::Land);
    assert_eq!(r.sink.commands(), expected);
}

#[test]
fn malformed_frames_and_detector_failures_skip_the_cycle() {
    let mut r = rig(
        ScriptedSource::with_script(vec![
            Err(FrameError::Malformed("zero-sized".to_string())),
            Ok(blank_frame()),
            Ok(blank_frame()),
        ]),
        ScriptedDetector::new(vec![
            Err(anyhow!("inference failed")),
            Ok(vec![face(0.9, 10.0, 10.0, 50.0, 50.0)]),
        ]),
        Box::new(HeadlessDisplay::new()),
    );
    r.input.send(InputEvent::ToggleTracking).unwrap();
    r.session.step().unwrap();
    r.sink.clear();

    // The toggle was drained on the malformed cycle; now skip on detector error.
    assert_eq!(r.session.step().unwrap(), CycleOutcome::Skipped);
    assert!(r.sink.commands().is_empty());
    assert_eq!(r.session.step().unwrap(), CycleOutcome::Continue);
    assert_eq!(r.sink.commands().len(), 3);
    assert_eq!(r.session.stats().skipped, 2);
}

#[test]
fn failed_deliveries_are_counted_not_fatal() {
    let mut r = rig(
        ScriptedSource::blank(2),
        ScriptedDetector::new(vec![
            Ok(vec![face(0.9, 10.0, 10.0, 50.0, 50.0)]),
            Ok(vec![face(0.9, 10.0, 10.0, 50.0, 50.0)]),
        ]),
        Box::new(HeadlessDisplay::new()),
    );
    r.sink.fail_deliveries(true);
    r.input.send(InputEvent::ToggleTracking).unwrap();

    assert_eq!(r.session.step().unwrap(), CycleOutcome::Continue);
    assert_eq!(r.session.step().unwrap(), CycleOutcome::Continue);
    assert_eq!(r.session.stats().command_failures, 9);
}

#[test]
fn operator_commands_reach_the_sink() {
    let mut r = rig(
        ScriptedSource::blank(1),
        ScriptedDetector::new(vec![]),
        Box::new(HeadlessDisplay::new()),
    );
    for event in [
        InputEvent::TakeOff,
        InputEvent::Nudge(Nudge::Up),
        InputEvent::Nudge(Nudge::Down),
        InputEvent::Nudge(Nudge::Left),
        InputEvent::Nudge(Nudge::Right),
        InputEvent::Nudge(Nudge::Clockwise),
        InputEvent::Nudge(Nudge::CounterClockwise),
        InputEvent::Land,
    ] {
        r.input.send(event).unwrap();
    }
    r.session.step().unwrap();

    assert_eq!(
        r.sink.commands(),
        vec![
            SinkCommand::TakeOff,
            SinkCommand::Vertical(NUDGE_RATE),
            SinkCommand::Vertical(-NUDGE_RATE),
            SinkCommand::Lateral(-NUDGE_RATE),
            SinkCommand::Lateral(NUDGE_RATE),
            SinkCommand::Yaw(NUDGE_RATE),
            SinkCommand::Yaw(-NUDGE_RATE),
            SinkCommand::Land,
        ]
    );
}

#[test]
fn synthetic_scenes_exercise_every_steering_branch() {
    use face_follower::{StubBackend, SyntheticConfig, SyntheticSource};

    let sink = Arc::new(RecordingSink::new());
    let (input, input_rx) = mpsc::channel();
    input.send(InputEvent::ToggleTracking).unwrap();
    let mut session = Session::new(
        FrameSettings {
            width: W,
            height: H,
        },
        Box::new(SyntheticSource::new(SyntheticConfig {
            max_frames: Some(160),
            ..SyntheticConfig::default()
        })),
        Box::new(StubBackend::new()),
        sink.clone(),
        Box::new(HeadlessDisplay::new()),
        input_rx,
    );

    assert!(session.run().is_err());
    let commands = sink.commands();
    // Centre scene sets the reference: 75 px square.
    assert!((session.state().reference_distance() - 75.0 * 2f64.sqrt()).abs() < 1.0);
    assert!(commands.contains(&SinkCommand::Yaw(-YAW_RATE)));
    assert!(commands.contains(&SinkCommand::Yaw(YAW_RATE)));
    assert!(commands.contains(&SinkCommand::Forward(-FORWARD_RATE)));
    assert_eq!(commands.last(), Some(&SinkCommand::Land));
    assert_eq!(session.stats().targets, 160);
}
