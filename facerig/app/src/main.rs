use anyhow::{Context, Result};
use api::LandmarkSource;
use common::{RetargetSession, RigConfig, TickOutcome};
use facerig::control::{self, ControlState};
use facerig::headless_rig::HeadlessRig;
use facerig::replay;
use log::{debug, error, info, trace, warn};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::{Duration, Instant};

fn main() -> Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    info!("Starting...");
    debug!("Debug logging is active");
    trace!("Trace logging is active");

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        info!("Received Ctrl-C, shutting down...");
        r.store(false, Ordering::SeqCst);
    })
    .context("Error setting Ctrl-C handler")?;

    let config = RigConfig::load_or_create(Path::new("config.json")).unwrap_or_else(|e| {
        error!("Failed to load config: {:#}. Using defaults.", e);
        RigConfig::default()
    });
    info!("Loaded Config: {:?}", config);

    let (mut source, mut solver) =
        replay::open(&config.runtime.replay_path, config.runtime.loop_replay);
    let mut session = RetargetSession::new(config.clone());
    session.start(&mut source)?;

    let rig = HeadlessRig::humanoid();
    let pose = rig.shared_pose();
    session.load_rig(Box::new(rig));

    let control_state = Arc::new(RwLock::new(ControlState::new(&session)));
    if let Some(port) = config.runtime.control_port {
        let router = control::get_router(control_state.clone(), Some(pose));
        thread::spawn(move || {
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    error!("Failed to create Tokio runtime: {}", e);
                    return;
                }
            };
            rt.block_on(async {
                if let Err(e) = control::serve(port, router).await {
                    error!("Control surface failed: {}", e);
                }
            });
        });
    } else {
        info!("Control surface disabled.");
    }

    info!("Entering Main Loop...");

    let mut frame_count: u64 = 0;
    let mut log_interval: u64 = 1000;
    let mut last_log = Instant::now();
    let mut last_frame_time = Instant::now();
    let mut last_tick = Instant::now();
    let target_frame_duration = config
        .runtime
        .max_fps
        .filter(|fps| *fps > 0.0)
        .map(|fps| Duration::from_secs_f32(1.0 / fps));

    while running.load(Ordering::SeqCst) {
        control::exchange(&control_state, &mut session);

        let frame = match source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                info!("Replay finished");
                break;
            }
            Err(e) => {
                warn!("Failed to read frame: {:#}", e);
                thread::sleep(Duration::from_millis(5));
                continue;
            }
        };

        let now = Instant::now();
        let dt = now.duration_since(last_tick).as_secs_f32();
        last_tick = now;
        if let TickOutcome::Applied { .. } = session.tick(&frame, &mut solver, dt) {
            frame_count += 1;
            if frame_count % log_interval == 0 {
                let elapsed = last_log.elapsed().as_secs_f32();
                let fps = log_interval as f32 / elapsed;
                info!(
                    "Tracking Active: Processed {} frames (approx {:.1} FPS, {:.2} ms/frame)",
                    frame_count,
                    fps,
                    session.stats().last_processing_ms
                );
                last_log = Instant::now();

                if frame_count >= 1_000_000 {
                    log_interval = 1_000_000;
                } else if frame_count >= 100_000 {
                    log_interval = 100_000;
                } else if frame_count >= 10_000 {
                    log_interval = 10_000;
                }
            }
        }

        if let Some(target_duration) = target_frame_duration {
            let elapsed = last_frame_time.elapsed();
            if elapsed < target_duration {
                thread::sleep(target_duration - elapsed);
            }
        }
        last_frame_time = Instant::now();
    }

    info!("Shutting down...");
    session.stop();
    source.close();
    control::exchange(&control_state, &mut session);
    info!("Final stats: {:?}", session.stats());
    Ok(())
}
