use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),
}

impl CoreError {
    pub fn invalid(reason: impl std::fmt::Display) -> Self {
        Self::InvalidFormat(reason.to_string())
    }
}

impl From<mp4::Error> for CoreError {
    fn from(err: mp4::Error) -> Self {
        match err {
            mp4::Error::IoError(e) => Self::Io(e),
            other => Self::InvalidFormat(format!("mp4: {other}")),
        }
    }
}

impl From<zip::result::ZipError> for CoreError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => Self::Io(e),
            other => Self::InvalidFormat(format!("zip: {other}")),
        }
    }
}

impl From<image::ImageError> for CoreError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::IoError(e) => Self::Io(e),
            other => Self::InvalidFormat(format!("image: {other}")),
        }
    }
}

impl From<lofty::error::LoftyError> for CoreError {
    fn from(err: lofty::error::LoftyError) -> Self {
        Self::InvalidFormat(format!("audio: {err}"))
    }
}

impl From<lopdf::Error> for CoreError {
    fn from(err: lopdf::Error) -> Self {
        Self::InvalidFormat(format!("pdf: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
