use thiserror::Error;

#[derive(Error, Debug)]
pub enum KuttiError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error ({status}): {message}")]
    Api {
        status: u16,
        message: String,
        field: Option<String>,
    },

    #[error("Login failed: {0}")]
    Auth(String),

    #[error("Not allowed: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl KuttiError {
    /// The form field this error belongs to, when the API named one.
    pub fn field(&self) -> Option<&str> {
        match self {
            KuttiError::Api { field, .. } => field.as_deref(),
            _ => None,
        }
    }

    /// Message suitable for a form's general error slot.
    pub fn user_message(&self) -> String {
        match self {
            KuttiError::Api { message, .. } => message.clone(),
            KuttiError::Auth(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, KuttiError>;
