mod mock;

use common::bone_map::hand_bone;
use common::{
    AnimationConfig, BoneCache, FacePose, HandJoint, HandPoseEstimate, HumanBone, JointRotation,
    RigApplier, Side,
};
use glam::Vec3;
use mock::MockRig;
use std::f32::consts::PI;

fn approx(a: Vec3, b: Vec3) -> bool {
    (a - b).abs().max_element() < 1e-5
}

fn wrist(v: Vec3) -> HandPoseEstimate {
    let mut hand = HandPoseEstimate::default();
    hand.insert(Side::Left, HandJoint::Wrist, v);
    hand
}

#[test]
fn test_cached_bone_is_not_requeried() {
    let rig = MockRig::full();
    let log = rig.shared_log();
    let mut cache = BoneCache::default();

    let first = cache.resolve(&rig, HumanBone::LeftHand);
    assert!(first.is_some());
    for _ in 0..1000 {
        assert_eq!(cache.resolve(&rig, HumanBone::LeftHand), first);
    }
    assert_eq!(log.lock().unwrap().lookups(HumanBone::LeftHand), 1);
}

#[test]
fn test_raw_form_is_fallback() {
    let rig = MockRig::full().raw_only(HumanBone::LeftHand);
    let log = rig.shared_log();
    let mut cache = BoneCache::default();

    assert!(cache.resolve(&rig, HumanBone::LeftHand).is_some());
    assert!(cache.resolve(&rig, HumanBone::LeftHand).is_some());
    assert_eq!(log.lock().unwrap().lookups(HumanBone::LeftHand), 2);
}

#[test]
fn test_missing_bone_queried_once_and_others_still_applied() {
    let bones = common::bone_map::LEFT_HAND_BONES
        .iter()
        .map(|(_, b)| *b)
        .filter(|b| *b != HumanBone::LeftLittleDistal);
    let mut rig = MockRig::with_bones(bones);
    let log = rig.shared_log();
    let mut applier = RigApplier::new();
    let config = AnimationConfig::default();

    let mut hand = HandPoseEstimate::default();
    hand.insert(Side::Left, HandJoint::LittleDistal, Vec3::splat(0.2));
    hand.insert(Side::Left, HandJoint::IndexProximal, Vec3::splat(0.2));

    for _ in 0..5 {
        let report = applier.apply_hand(&mut rig, Side::Left, &hand, &config);
        assert_eq!(report.processed, 2);
        assert_eq!(report.applied, 1);
    }

    let log = log.lock().unwrap();
    // normalized + raw, once, during validation
    assert_eq!(log.lookups(HumanBone::LeftLittleDistal), 2);
    assert!(log.rotations.contains_key(&HumanBone::LeftIndexProximal));
    assert!(!log.rotations.contains_key(&HumanBone::LeftLittleDistal));
}

#[test]
fn test_malformed_joint_is_skipped_alone() {
    let mut rig = MockRig::full();
    let log = rig.shared_log();
    let mut applier = RigApplier::new();

    let mut hand = HandPoseEstimate::default();
    hand.insert(Side::Left, HandJoint::MiddleProximal, Vec3::new(0.1, 0.2, 0.3));
    hand.joints.insert(
        "LeftRingProximal".into(),
        JointRotation {
            x: Some(0.1),
            y: None,
            z: Some(0.3),
        },
    );
    hand.joints.insert(
        "LeftRingDistal".into(),
        JointRotation::new(f32::NAN, 0.0, 0.0),
    );
    hand.joints.insert("LeftTail".into(), JointRotation::new(0.0, 0.0, 0.0));

    let report = applier.apply_hand(&mut rig, Side::Left, &hand, &AnimationConfig::default());
    assert_eq!(report.processed, 4);
    assert_eq!(report.applied, 1);

    let log = log.lock().unwrap();
    assert!(approx(
        log.rotations[&HumanBone::LeftMiddleProximal],
        Vec3::new(0.1, 0.2, 0.3)
    ));
    assert!(!log.rotations.contains_key(&HumanBone::LeftRingProximal));
    assert!(!log.rotations.contains_key(&HumanBone::LeftRingDistal));
}

#[test]
fn test_hand_rotation_interpolates_toward_new_value() {
    let mut rig = MockRig::full();
    let log = rig.shared_log();
    let mut applier = RigApplier::new();
    let config = AnimationConfig::default();

    applier.apply_hand(&mut rig, Side::Left, &wrist(Vec3::ZERO), &config);
    applier.apply_hand(&mut rig, Side::Left, &wrist(Vec3::ONE), &config);

    let applied = log.lock().unwrap().rotations[&HumanBone::LeftHand];
    assert!(approx(applied, Vec3::splat(0.85)));
    assert_eq!(
        applier.previous_rotation(Side::Left, HumanBone::LeftHand),
        Some(applied)
    );
}

#[test]
fn test_multiplier_scales_output_not_history() {
    let mut rig = MockRig::full();
    let log = rig.shared_log();
    let mut applier = RigApplier::new();
    let config = AnimationConfig {
        hand_rotation_multiplier: 2.0,
        hand_smoothing_factor: 0.0,
        ..Default::default()
    };

    applier.apply_hand(&mut rig, Side::Left, &wrist(Vec3::splat(0.25)), &config);
    assert!(approx(
        log.lock().unwrap().rotations[&HumanBone::LeftHand],
        Vec3::splat(0.5)
    ));
    assert_eq!(
        applier.previous_rotation(Side::Left, HumanBone::LeftHand),
        Some(Vec3::splat(0.25))
    );
}

#[test]
fn test_rig_reload_clears_cache_and_history() {
    let mut old_rig = MockRig::full();
    let mut applier = RigApplier::new();
    let config = AnimationConfig::default();

    applier.apply_hand(&mut old_rig, Side::Left, &wrist(Vec3::ZERO), &config);
    assert!(applier.bones_validated());
    assert!(applier.cache().get(HumanBone::LeftHand).is_some());

    applier.on_rig_loaded();
    assert!(applier.cache().is_empty());
    assert!(!applier.bones_validated());
    assert!(applier
        .previous_rotation(Side::Left, HumanBone::LeftHand)
        .is_none());

    let mut new_rig = MockRig::full();
    let log = new_rig.shared_log();
    applier.apply_hand(&mut new_rig, Side::Left, &wrist(Vec3::ONE), &config);

    let log = log.lock().unwrap();
    assert_eq!(log.lookups(HumanBone::LeftHand), 1);
    assert!(approx(log.rotations[&HumanBone::LeftHand], Vec3::ONE));
}

#[test]
fn test_other_side_joints_are_not_applied() {
    let mut rig = MockRig::full();
    let log = rig.shared_log();
    let mut applier = RigApplier::new();

    let mut hand = HandPoseEstimate::default();
    hand.insert(Side::Right, HandJoint::Wrist, Vec3::ONE);
    let report = applier.apply_hand(&mut rig, Side::Left, &hand, &AnimationConfig::default());

    assert_eq!(report.applied, 0);
    assert!(log.lock().unwrap().rotations.is_empty());
}

#[test]
fn test_thumb_intermediate_drives_metacarpal() {
    let mut rig = MockRig::full();
    let log = rig.shared_log();
    let mut applier = RigApplier::new();

    let mut hand = HandPoseEstimate::default();
    hand.insert(Side::Right, HandJoint::ThumbProximal, Vec3::X);
    hand.insert(Side::Right, HandJoint::ThumbIntermediate, Vec3::Y);
    applier.apply_hand(&mut rig, Side::Right, &hand, &AnimationConfig::default());

    assert_eq!(
        hand_bone(Side::Right, HandJoint::ThumbIntermediate),
        HumanBone::RightThumbMetacarpal
    );
    let log = log.lock().unwrap();
    let proximal = log.rotations[&HumanBone::RightThumbProximal];
    let metacarpal = log.rotations[&HumanBone::RightThumbMetacarpal];
    assert!(proximal.x > 0.0 && proximal.y == 0.0);
    assert!(metacarpal.y > 0.0 && metacarpal.x == 0.0);
}

#[test]
fn test_face_rotations_are_clamped() {
    let mut rig = MockRig::full();
    let log = rig.shared_log();
    let mut applier = RigApplier::new();
    let config = AnimationConfig::default();

    let mut pose = FacePose::default();
    pose.head = Vec3::new(5.0, -0.5, 0.2);
    pose.pupil.x = 1.0;
    pose.pupil.y = -10.0;

    let written = applier.apply_face(&mut rig, &pose, None, &config);
    assert_eq!(written, 4);

    let log = log.lock().unwrap();
    let q = PI / 4.0;
    assert!(approx(
        log.rotations[&HumanBone::Head],
        Vec3::new(-q, 0.5 * q, 0.2 * q)
    ));
    assert!(approx(
        log.rotations[&HumanBone::Neck],
        Vec3::new(-0.3, 0.15, 0.04)
    ));
    let eye = Vec3::new(PI / 10.0, -PI / 12.0, 0.0);
    assert!(approx(log.rotations[&HumanBone::LeftEye], eye));
    assert!(approx(log.rotations[&HumanBone::RightEye], eye));
}

#[test]
fn test_misconfigured_eye_limits_still_apply() {
    let mut rig = MockRig::full();
    let log = rig.shared_log();
    let mut applier = RigApplier::new();
    let config = AnimationConfig {
        eye_yaw_limit: -0.1,
        eye_pitch_limit: f32::NAN,
        ..Default::default()
    };

    let mut pose = FacePose::default();
    pose.pupil.x = -1.0;
    pose.pupil.y = 0.5;

    let written = applier.apply_face(&mut rig, &pose, None, &config);
    assert_eq!(written, 4);

    let eye = log.lock().unwrap().rotations[&HumanBone::LeftEye];
    assert!(approx(eye, Vec3::new(-0.5 * PI / 12.0, 0.1, 0.0)));
}

#[test]
fn test_face_sensitivity_scales_head_range() {
    let mut rig = MockRig::full();
    let log = rig.shared_log();
    let mut applier = RigApplier::new();
    let config = AnimationConfig {
        face_sensitivity: 0.5,
        ..Default::default()
    };

    let mut pose = FacePose::default();
    pose.head = Vec3::new(0.0, 1.0, 0.0);
    applier.apply_face(&mut rig, &pose, None, &config);

    let head = log.lock().unwrap().rotations[&HumanBone::Head];
    assert!((head.y + PI / 8.0).abs() < 1e-5);
}

#[test]
fn test_face_expressions_written() {
    let mut rig = MockRig::full();
    let log = rig.shared_log();
    let mut applier = RigApplier::new();
    let config = AnimationConfig {
        expression_intensity: 2.0,
        ..Default::default()
    };

    let mut pose = FacePose::default();
    pose.eye.l = 0.4;
    pose.eye.r = 1.7;
    pose.mouth.shape.a = 0.3;
    pose.mouth.shape.u = 0.9;

    let mut scores = common::BlendshapeScores::new();
    scores.insert("mouthSmileLeft".into(), 0.2);
    scores.insert("mouthSmileRight".into(), 0.6);
    scores.insert("eyeBlinkLeft".into(), 1.0);
    applier.apply_face(&mut rig, &pose, Some(&scores), &config);

    let log = log.lock().unwrap();
    let ex = &log.expressions;
    assert!((ex["blinkLeft"] - 0.4).abs() < 1e-6);
    assert_eq!(ex["blinkRight"], 1.0);
    assert!((ex["aa"] - 0.6).abs() < 1e-6);
    assert_eq!(ex["ou"], 1.0);
    assert_eq!(ex["ee"], 0.0);
    let happy = (0.6f32.powf(0.7) * 2.0).min(1.0);
    assert!((ex["happy"] - happy).abs() < 1e-6);
    assert!(!ex.contains_key("eyeBlinkLeft"));
}

#[test]
fn test_blendshape_expressions_can_be_disabled() {
    let mut rig = MockRig::full();
    let log = rig.shared_log();
    let mut applier = RigApplier::new();
    let config = AnimationConfig {
        enable_blendshapes: false,
        ..Default::default()
    };

    let mut scores = common::BlendshapeScores::new();
    scores.insert("cheekPuff".into(), 0.8);
    applier.apply_face(&mut rig, &FacePose::default(), Some(&scores), &config);

    assert!(!log.lock().unwrap().expressions.contains_key("puff"));
}
