use actix_web::{HttpResponse, ResponseError};
use redis::RedisError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TelemetryError>;

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Key error: {0}")]
    KeyError(String),
    #[error("Signing error: {0}")]
    SigningError(String),
    #[error("Certificate error: {0}")]
    CertificateError(String),
    #[error("Registration error: {0}")]
    RegistrationError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Unknown metric: {0}")]
    UnknownMetric(String),
    #[error("Storage error: {0}")]
    StorageError(String),
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<std::io::Error> for TelemetryError {
    fn from(err: std::io::Error) -> Self {
        TelemetryError::InternalError(err.to_string())
    }
}

impl From<serde_json::Error> for TelemetryError {
    fn from(err: serde_json::Error) -> Self {
        TelemetryError::SerializationError(err.to_string())
    }
}

impl From<RedisError> for TelemetryError {
    fn from(err: RedisError) -> Self {
        TelemetryError::StorageError(err.to_string())
    }
}

impl From<reqwest::Error> for TelemetryError {
    fn from(err: reqwest::Error) -> Self {
        TelemetryError::NetworkError(err.to_string())
    }
}

impl ResponseError for TelemetryError {
    fn error_response(&self) -> HttpResponse {
        match self {
            Self::ValidationError(_) | Self::RegistrationError(_) => {
                HttpResponse::BadRequest().json(self.to_string())
            }
            Self::UnknownMetric(_) => HttpResponse::UnprocessableEntity().json(self.to_string()),
            Self::NetworkError(_)
            | Self::SerializationError(_)
            | Self::KeyError(_)
            | Self::SigningError(_)
            | Self::CertificateError(_)
            | Self::StorageError(_)
            | Self::InternalError(_) => HttpResponse::InternalServerError().json(self.to_string()),
        }
    }
}
