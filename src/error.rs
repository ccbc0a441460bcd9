use std::io;
use std::path::PathBuf;

/// Errors surfaced by the trimming pipeline and its views.
///
/// Anything isolated to a single line, entry, or regex match attempt is
/// recovered in place and never reaches this type.
#[derive(Debug, thiserror::Error)]
pub enum TrimError {
    #[error("reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("session header template: {0}")]
    Template(String),
}

impl TrimError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        TrimError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = TrimError> = std::result::Result<T, E>;
