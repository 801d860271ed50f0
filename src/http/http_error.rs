use crate::error::{MessageError, UserError};
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use core::fmt;
use log::error;
use serde_json::json;
use std::error::Error;

#[derive(Debug)]
pub enum HttpError {
    GenericError(StatusCode),
    DetailedError(StatusCode, String),
}

// HttpError essentially wraps a StatusCode, optionally with a message for the client
impl HttpError {
    pub fn from_status_code(status_code: StatusCode) -> Self {
        Self::GenericError(status_code)
    }

    fn reason(&self) -> String {
        match self {
            Self::GenericError(status_code) => status_code
                .canonical_reason()
                .unwrap_or("unknown")
                .to_owned(),
            Self::DetailedError(_, message) => message.clone(),
        }
    }
}

impl From<anyhow::Error> for HttpError {
    fn from(err: anyhow::Error) -> Self {
        if let Some(message_error) = err.downcast_ref::<MessageError>() {
            let status_code = match message_error {
                MessageError::NotFound(_) => StatusCode::NOT_FOUND,
                MessageError::DuplicateId(_) => StatusCode::CONFLICT,
                MessageError::InvalidId(_)
                | MessageError::UnknownUser(_)
                | MessageError::EmptyContent
                | MessageError::MissingKey
                | MessageError::MissingFileName(_)
                | MessageError::InvalidFileName(_)
                | MessageError::InvalidPage(_) => StatusCode::BAD_REQUEST,
            };
            return Self::DetailedError(status_code, message_error.to_string());
        }

        if let Some(user_error) = err.downcast_ref::<UserError>() {
            let status_code = match user_error {
                UserError::NotFound(_) => StatusCode::NOT_FOUND,
                UserError::DuplicateUsername(_) => StatusCode::CONFLICT,
                UserError::EmptyUsername => StatusCode::BAD_REQUEST,
                UserError::NotAuthorized => StatusCode::FORBIDDEN,
            };
            return Self::DetailedError(status_code, user_error.to_string());
        }

        error!("{err:?}");
        Self::from_status_code(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.status_code().as_str(), self.reason())
    }
}

impl Error for HttpError {}

impl ResponseError for HttpError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.reason() }))
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::GenericError(status_code) | Self::DetailedError(status_code, _) => *status_code,
        }
    }
}
