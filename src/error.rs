use std::fmt;

/// Errors raised while ingesting configuration or building a scene.
///
/// Steady-state simulation and rendering never fail; out-of-range numbers are
/// clamped instead.
#[derive(Debug)]
pub enum SandboxError {
    Json(serde_json::Error),
    InvalidScene { index: usize, reason: String },
}

impl fmt::Display for SandboxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SandboxError::Json(e) => write!(f, "Config error: {e}"),
            SandboxError::InvalidScene { index, reason } => {
                write!(f, "Scene object {index} is invalid: {reason}")
            }
        }
    }
}

impl std::error::Error for SandboxError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SandboxError::Json(e) => Some(e),
            SandboxError::InvalidScene { .. } => None,
        }
    }
}

impl From<serde_json::Error> for SandboxError {
    fn from(e: serde_json::Error) -> Self {
        SandboxError::Json(e)
    }
}
