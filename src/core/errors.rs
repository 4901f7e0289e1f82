use std::path::PathBuf;

/// Faults of the grading process itself. Anything that reaches the grader as a
/// `GradeError` marks the run as unsuccessful.
#[derive(Debug, thiserror::Error)]
pub enum GradeError {
    #[error("invalid scoring configuration: {msg}")]
    InvalidConfiguration { msg: String },

    #[error("failed to prepare artifact scope at {}: {source}", path.display())]
    Scope {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("compiler reported success without an artifact")]
    MissingArtifact,

    #[error("grading stage panicked: {msg}")]
    Panicked { msg: String },
}
