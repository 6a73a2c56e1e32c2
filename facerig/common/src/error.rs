/// Failure classes of the retargeting pipeline. Only `Initialization` is
/// returned to callers; the rest are logged and absorbed by the tick.
#[derive(Debug, thiserror::Error)]
pub enum RigError {
    #[error("Failed to initialize perception backend: {0}")]
    Initialization(String),
    #[error("Solver failed: {0}")]
    Solver(String),
    #[error("Malformed estimate for {0}")]
    MalformedEstimate(String),
    #[error("No rig loaded")]
    RigUnavailable,
}
