#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unsupported image extension for '{key}'")]
    UnsupportedExtension { key: String },

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Malformed trigger event: {0}")]
    MalformedEvent(String),

    #[error("Image processing failed: {0}")]
    Image(#[from] image::ImageError),
}
