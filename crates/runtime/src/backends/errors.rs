use thiserror::Error;

/// Failures while compiling or running an embedded script.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScriptError {
    #[error("script is empty")]
    Empty,

    #[error("script looks truncated: {0}")]
    Truncated(&'static str),

    #[error("script failed to compile: {0}")]
    Compile(String),

    #[error("script exceeded its operation budget")]
    Budget,

    #[error("script failed: {0}")]
    Runtime(String),

    #[error("script returned {0}, expected a position, an offset or a direction")]
    BadResult(String),
}

/// A backend reply that cannot be read as a move.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoerceError {
    #[error("no direction word in {0:?}")]
    NoDirection(String),

    #[error("reply is not structured offsets: {0}")]
    NotOffsets(String),

    #[error("reply grid is {found_width}x{found_height}, expected {width}x{height}")]
    GridShape {
        width: u32,
        height: u32,
        found_width: u32,
        found_height: u32,
    },

    #[error("reply grid has no `@` cell")]
    MissingSelf,
}

/// Failures while turning a description into a playable enemy.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("completion failed: {0}")]
    Completion(String),

    #[error("completion did not answer within {0:?}")]
    Timeout(std::time::Duration),

    #[error(transparent)]
    Script(#[from] ScriptError),
}
