use crate::headless_rig::SharedPose;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use common::{CalibrationStatus, ConfigPatch, RetargetSession, RigConfig, SessionStats};
use log::info;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::net::TcpListener;

/// State shared between the tick loop and the HTTP control surface. The loop
/// publishes status and drains requests once per tick.
#[derive(Debug, Default)]
pub struct ControlState {
    pub calibration: CalibrationStatus,
    pub stats: SessionStats,
    pub config: RigConfig,
    pub recalibrate_requested: bool,
    pub pending_patch: Option<ConfigPatch>,
}

pub type SharedControl = Arc<RwLock<ControlState>>;

impl ControlState {
    pub fn new(session: &RetargetSession) -> Self {
        Self {
            calibration: session.calibration_status(),
            stats: session.stats(),
            config: session.config().clone(),
            ..Default::default()
        }
    }
}

/// Applies pending requests to the session, then publishes its status.
pub fn exchange(shared: &SharedControl, session: &mut RetargetSession) {
    let mut state = shared.write().unwrap_or_else(PoisonError::into_inner);

    if std::mem::take(&mut state.recalibrate_requested) {
        info!("Starting calibration from HTTP request");
        session.recalibrate();
    }
    if let Some(patch) = state.pending_patch.take() {
        session.apply_patch(&patch);
    }

    state.calibration = session.calibration_status();
    state.stats = session.stats();
    if state.config != *session.config() {
        state.config = session.config().clone();
    }
}

#[derive(Clone)]
struct ControlContext {
    control: SharedControl,
    pose: Option<SharedPose>,
}

pub fn get_router(control: SharedControl, pose: Option<SharedPose>) -> Router {
    Router::new()
        .route("/calibration", get(calibration_status_handler))
        .route("/calibration/status", get(calibration_status_handler))
        .route("/calibration/start", post(start_calibration_handler))
        .route("/config", get(config_handler).post(patch_config_handler))
        .route("/stats", get(stats_handler))
        .route("/pose", get(pose_handler))
        .with_state(ControlContext { control, pose })
}

pub async fn serve(port: u16, router: Router) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!("Control surface listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router).await?;
    Ok(())
}

async fn calibration_status_handler(State(ctx): State<ControlContext>) -> Json<Value> {
    let state = ctx.control.read().unwrap_or_else(PoisonError::into_inner);
    Json(json!({
        "status": "ok",
        "calibration": state.calibration
    }))
}

async fn start_calibration_handler(State(ctx): State<ControlContext>) -> Json<Value> {
    let mut state = ctx.control.write().unwrap_or_else(PoisonError::into_inner);
    if state.recalibrate_requested {
        return Json(json!({
            "status": "already_requested",
            "message": "Recalibration will start on the next frame"
        }));
    }
    state.recalibrate_requested = true;

    Json(json!({
        "status": "starting",
        "target_frames": state.calibration.target_frames
    }))
}

async fn config_handler(State(ctx): State<ControlContext>) -> Json<Value> {
    let state = ctx.control.read().unwrap_or_else(PoisonError::into_inner);
    Json(json!({
        "status": "ok",
        "config": state.config
    }))
}

async fn patch_config_handler(
    State(ctx): State<ControlContext>,
    Json(patch): Json<ConfigPatch>,
) -> Json<Value> {
    let mut state = ctx.control.write().unwrap_or_else(PoisonError::into_inner);
    if patch.is_empty() {
        return Json(json!({
            "status": "unchanged",
            "config": state.config
        }));
    }

    state
        .pending_patch
        .get_or_insert_with(ConfigPatch::default)
        .merge(&patch);

    let mut preview = state.config.clone();
    preview.apply_patch(&patch);
    info!("Config patch queued: {:?}", patch);
    Json(json!({
        "status": "queued",
        "config": preview
    }))
}

async fn stats_handler(State(ctx): State<ControlContext>) -> Json<Value> {
    let state = ctx.control.read().unwrap_or_else(PoisonError::into_inner);
    Json(json!({
        "status": "ok",
        "stats": state.stats
    }))
}

async fn pose_handler(State(ctx): State<ControlContext>) -> Json<Value> {
    match &ctx.pose {
        Some(pose) => {
            let pose = pose.read().unwrap_or_else(PoisonError::into_inner).clone();
            Json(json!({
                "status": "ok",
                "pose": pose
            }))
        }
        None => Json(json!({
            "status": "unavailable"
        })),
    }
}
