use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Invalid selector: {selector}")]
    InvalidSelector { selector: String },

    #[error("Notification error: {0}")]
    Notify(String),
}

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;
