pub mod config;
pub mod views;

/// A configuration document that exists but could not be used.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("unable to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("unable to parse {path}: {message}")]
    Parse { path: String, message: String },
}

impl LoadError {
    pub fn path(&self) -> &str {
        match self {
            LoadError::Read { path, .. } => path,
            LoadError::Parse { path, .. } => path,
        }
    }
}
