use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Resolver failed: {0}")]
    Resolution(String),

    #[error("Failed to spawn {0}")]
    SpawnFailed(String),

    #[error("Failed to capture {0} from yt-dlp")]
    CaptureFailed(String),

    #[error("yt-dlp returned empty output")]
    EmptyOutput,

    #[error("Download produced no usable file: {0}")]
    Fetch(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed playlist at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Playback error: {0}")]
    Playback(String),

    #[error("JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
