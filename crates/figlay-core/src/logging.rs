#![forbid(unsafe_code)]

//! Log targets and optional JSON subscriber installation.
//!
//! Every component logs through `tracing` under one of the targets below.
//! Applications normally install their own subscriber; the `tracing-json`
//! feature provides a ready-made JSON formatter filtered by [`LOG_ENV`].

/// Panel registry events (key collisions).
pub const TARGET_REGISTRY: &str = "figlay.registry";
/// Size and resolution changes.
pub const TARGET_FRAME: &str = "figlay.frame";
/// Layout mode transitions and solver hand-off.
pub const TARGET_LAYOUT: &str = "figlay.layout";
/// Figure-level placement and render passes.
pub const TARGET_FIGURE: &str = "figlay.figure";

/// Environment variable holding the `EnvFilter` directives.
pub const LOG_ENV: &str = "FIGLAY_LOG";

/// Install a global JSON subscriber.
///
/// Filter directives come from [`LOG_ENV`]; when unset or unparsable the
/// subscriber logs warnings and above. Fails if a global subscriber is
/// already installed.
#[cfg(feature = "tracing-json")]
pub fn init_json_logging() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
}
