// Error types for the Strata resolution core

use crate::HttpStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Registration-time misconfiguration: conflicting provider keys,
    /// forbidden parameter names, missing required methods. Fatal.
    #[error("Improperly configured: {0}")]
    Configuration(String),

    /// Registration-time signature validation failure: missing return
    /// annotation, invalid redirect status pairing. Fatal.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Raised by a guard to deny a connection lacking credentials.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Raised by a guard to deny a connection with insufficient rights.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Template engine failed to render.
    #[error("Template error: {0}")]
    Template(String),

    /// Server-side configuration problem discovered at response time.
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Response body could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Unauthorized(_) => HttpStatus::Unauthorized.code(),
            Error::Forbidden(_) => HttpStatus::Forbidden.code(),
            // Configuration and validation failures surface as 500s when
            // they escape to request time.
            Error::Configuration(_)
            | Error::Validation(_)
            | Error::Template(_)
            | Error::Internal(_)
            | Error::Serialization(_)
            | Error::Io(_) => HttpStatus::InternalServerError.code(),
        }
    }

    /// Get the HttpStatus enum for this error
    pub fn http_status(&self) -> HttpStatus {
        HttpStatus::from_code(self.status_code()).unwrap_or(HttpStatus::InternalServerError)
    }

    /// Check if this is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        self.http_status().is_client_error()
    }

    /// Check if this is a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        self.http_status().is_server_error()
    }
}
