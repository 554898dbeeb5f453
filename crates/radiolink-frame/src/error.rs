use radiolink_transport::TransportError;

/// Errors that can occur while reading or writing frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The underlying transport failed.
    #[error("frame transport error: {0}")]
    Transport(#[from] TransportError),

    /// Refused to write an empty frame.
    #[error("refusing to write an empty frame")]
    Empty,
}

pub type Result<T> = std::result::Result<T, FrameError>;
