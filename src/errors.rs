use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::{json, Value};
use std::fmt;

pub const NO_RESPONSE_MESSAGE: &str = "No response received from the server";

/// Failures of one forwarded prediction, each mapped to its own response.
#[derive(Debug)]
pub enum ForwardError {
    /// The prediction service answered with a non-success status.
    RemoteRejection { status: u16, body: Value },
    /// The request went out but no response came back.
    NoResponse(reqwest::Error),
    /// Anything that failed locally: credentials, request building, decoding.
    Setup(String),
}

impl ForwardError {
    pub fn setup(err: impl fmt::Display) -> Self {
        ForwardError::Setup(err.to_string())
    }
}

impl From<reqwest::Error> for ForwardError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            ForwardError::setup(err)
        } else {
            ForwardError::NoResponse(err)
        }
    }
}

impl fmt::Display for ForwardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForwardError::RemoteRejection { status, body } => {
                write!(f, "prediction service returned {status}: {body}")
            }
            ForwardError::NoResponse(err) => write!(f, "{NO_RESPONSE_MESSAGE}: {err}"),
            ForwardError::Setup(message) => f.write_str(message),
        }
    }
}

impl std::error::Error for ForwardError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ForwardError::NoResponse(err) => Some(err),
            _ => None,
        }
    }
}

impl ResponseError for ForwardError {
    fn status_code(&self) -> StatusCode {
        match self {
            ForwardError::RemoteRejection { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            ForwardError::NoResponse(_) | ForwardError::Setup(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let error = match self {
            ForwardError::RemoteRejection { body, .. } => body.clone(),
            ForwardError::NoResponse(_) => Value::from(NO_RESPONSE_MESSAGE),
            ForwardError::Setup(message) => Value::from(message.as_str()),
        };
        HttpResponse::build(self.status_code()).json(json!({ "error": error }))
    }
}

/// Error body for inbound payloads the JSON extractor refuses.
pub fn payload_rejection(status: StatusCode, message: impl fmt::Display) -> HttpResponse {
    HttpResponse::build(status).json(json!({ "error": message.to_string() }))
}
