use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Every way a request or the model load can fail.
///
/// Errors coming from the libraries underneath are carried unchanged; the
/// handler never recovers from any of them.
#[derive(Debug, Error)]
pub enum Error {
    #[error("missing system property `{0}`")]
    MissingProperty(&'static str),

    #[error("invalid value '{value}' for system property `{name}`")]
    InvalidProperty { name: &'static str, value: String },

    #[error("request batch is empty")]
    EmptyBatch,

    #[error("request item has neither `data` nor `body`")]
    MissingPayload,

    #[error("payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Shape(String),

    #[error("image data must be numeric, found {0}")]
    NotNumeric(String),

    #[error("could not decode image: {0}")]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Torch(#[from] tch::TchError),

    #[error("handler has not been initialized")]
    NotInitialized,

    #[error("model lock poisoned by a panicked request")]
    Poisoned,
}
