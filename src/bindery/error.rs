use thiserror::Error;

#[derive(Error, Debug)]
pub enum BinderyError {
    #[error("I/O error at '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Manifest missing or unreadable at '{0}'")]
    ManifestMissing(String),

    #[error("Manifest at '{path}' is corrupt: {source}")]
    ManifestCorrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Recycle log at '{path}' is corrupt: {source}")]
    RecycleLogCorrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("No node at '{0}'")]
    NodeNotFound(String),

    #[error("Store error: {0}")]
    Store(String),
}

impl BinderyError {
    /// Wrap an `io::Error` together with the store path it occurred at.
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        BinderyError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, BinderyError>;
