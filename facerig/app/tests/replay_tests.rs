use api::{BoneForm, HumanBone, LandmarkSource, PoseSolver, Side, SkeletalRig, SolverOptions};
use common::{RetargetSession, RigConfig, TickOutcome};
use facerig::headless_rig::HeadlessRig;
use facerig::replay::{self, parse_capture};
use std::fs;
use std::path::PathBuf;

const CAPTURE: &str = r#"{"timestamp":0.0,"face":{"landmarks":[{"x":0.5,"y":0.5,"z":0.0}]},"face_estimate":{"head":{"x":0.2},"eye":{"l":0.5,"r":0.5}}}
{"timestamp":0.0,"face":{"landmarks":[{"x":0.5,"y":0.5,"z":0.0}]},"face_estimate":{"head":{"x":0.2}}}
not json at all

{"timestamp":0.033,"hands":[{"side":"Left","landmarks":[{"x":0.1,"y":0.2}]}],"hand_estimates":{"Left":{"LeftWrist":{"x":0.1,"y":0.0,"z":0.0}}}}
"#;

fn write_capture(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(name);
    let _ = fs::create_dir_all(&dir);
    let path = dir.join("capture.jsonl");
    fs::write(&path, CAPTURE).expect("write capture");
    path
}

#[test]
fn test_malformed_lines_are_skipped() {
    let frames = parse_capture(CAPTURE.as_bytes()).unwrap();
    assert_eq!(frames.len(), 3);
    assert!(frames[0].face_estimate.is_some());
    assert!(frames[2].face_estimate.is_none());
    assert_eq!(frames[2].frame.hands[0].side, Side::Left);
}

#[test]
fn test_missing_capture_fails_initialization() {
    let (mut source, _solver) = replay::open("/nonexistent/facerig/capture.jsonl", false);
    assert!(source.initialize().is_err());

    let mut session = RetargetSession::new(RigConfig::default());
    assert!(session.start(&mut source).is_err());
    assert!(!session.is_running());
}

#[test]
fn test_solver_answers_for_current_frame() {
    let path = write_capture("facerig_test_replay_solver");
    let (mut source, mut solver) = replay::open(&path, false);
    source.initialize().unwrap();
    assert_eq!(source.len(), 3);
    assert_eq!(source.path(), path.as_path());

    source.next_frame().unwrap().unwrap();
    let face = solver.solve_face(&[], &SolverOptions::default()).unwrap();
    assert_eq!(face.head.x, 0.2);
    assert!(solver.solve_hand(&[], Side::Left).is_err());

    source.next_frame().unwrap();
    let third = source.next_frame().unwrap().unwrap();
    assert!(third.face.is_none());
    assert!(solver.solve_face(&[], &SolverOptions::default()).is_err());
    assert_eq!(solver.solve_hand(&[], Side::Left).unwrap().len(), 1);

    assert!(source.next_frame().unwrap().is_none());
}

#[test]
fn test_looping_keeps_timestamps_increasing() {
    let path = write_capture("facerig_test_replay_loop");
    let (mut source, _solver) = replay::open(&path, true);
    source.initialize().unwrap();

    let mut last = f64::NEG_INFINITY;
    let mut stamps = Vec::new();
    for _ in 0..7 {
        let frame = source.next_frame().unwrap().unwrap();
        stamps.push(frame.timestamp);
        assert!(frame.timestamp >= last);
        last = frame.timestamp;
    }
    assert!(stamps[3] > stamps[2]);
}

#[test]
fn test_replay_drives_headless_rig() {
    let path = write_capture("facerig_test_replay_e2e");
    let (mut source, mut solver) = replay::open(&path, false);

    let mut session = RetargetSession::new(RigConfig::default());
    session.start(&mut source).unwrap();
    let rig = HeadlessRig::humanoid();
    let pose = rig.shared_pose();
    session.load_rig(Box::new(rig));

    let mut outcomes = Vec::new();
    while let Some(frame) = source.next_frame().unwrap() {
        outcomes.push(session.tick(&frame, &mut solver, 1.0 / 30.0));
    }

    assert_eq!(
        outcomes,
        vec![
            TickOutcome::Applied {
                face: true,
                hands: 0
            },
            TickOutcome::Skipped,
            TickOutcome::Applied {
                face: false,
                hands: 1
            },
        ]
    );

    let pose = pose.read().unwrap();
    assert_eq!(pose.updates, 2);
    let head = pose.rotations[HumanBone::Head.name()];
    assert!((head.x + 0.5 * std::f32::consts::FRAC_PI_4).abs() < 1e-5);
    assert!((pose.rotations[HumanBone::LeftHand.name()].x - 0.1).abs() < 1e-6);
    assert_eq!(pose.expressions["blinkLeft"], 1.0);
    assert_eq!(session.calibrator().frames_collected(), 1);
}

#[test]
fn test_face_only_rig_skips_hands() {
    let rig = HeadlessRig::face_only().with_raw_only([HumanBone::Neck]);
    let mut session = RetargetSession::new(RigConfig::default());
    let path = write_capture("facerig_test_replay_face_only");
    let (mut source, mut solver) = replay::open(&path, false);
    session.start(&mut source).unwrap();

    assert!(rig.bone(HumanBone::Neck, BoneForm::Normalized).is_none());
    assert!(rig.bone(HumanBone::Neck, BoneForm::Raw).is_some());
    session.load_rig(Box::new(rig));

    while let Some(frame) = source.next_frame().unwrap() {
        session.tick(&frame, &mut solver, 1.0 / 30.0);
    }
    let cache = session.applier().cache();
    assert_eq!(cache.len(), 4);
    assert!(cache.get(HumanBone::Neck).is_some());
    assert!(cache.get(HumanBone::LeftHand).is_none());
}
