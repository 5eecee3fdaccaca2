use thiserror::Error;

/// Classification of a generation-service failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceErrorKind {
    Auth,
    Network,
    RateLimit,
    Other,
}

impl std::fmt::Display for ServiceErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ServiceErrorKind::Auth => "auth",
            ServiceErrorKind::Network => "network",
            ServiceErrorKind::RateLimit => "rate_limit",
            ServiceErrorKind::Other => "other",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Error)]
pub enum CodeloomError {
    // Generation service errors
    #[error("generation service failed ({kind}): {message}")]
    Service {
        kind: ServiceErrorKind,
        message: String,
    },

    // Workflow errors
    #[error("step '{step}' failed: {message}")]
    Step { step: String, message: String },

    #[error("graph error: {0}")]
    Graph(String),

    #[error("run exceeded iteration cap ({0})")]
    IterationLimit(usize),

    #[error("run cancelled")]
    Cancelled,

    // Config errors
    #[error("config error: {0}")]
    Config(String),

    #[error("config file not found: {0}")]
    ConfigNotFound(String),

    // Storage errors
    #[error("checkpoint error: {0}")]
    Checkpoint(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CodeloomError {
    /// Shorthand for a service failure.
    pub fn service(kind: ServiceErrorKind, message: impl Into<String>) -> Self {
        Self::Service {
            kind,
            message: message.into(),
        }
    }

    /// Shorthand for a step post-processing failure.
    pub fn step(step: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Step {
            step: step.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CodeloomError>;
