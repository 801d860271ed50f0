use core::fmt;
use std::error::Error;

/// Failures of message operations that callers are expected to handle
#[derive(Debug, Eq, PartialEq)]
pub enum MessageError {
    /// The message doesn't exist or doesn't belong to the acting user
    NotFound(String),
    DuplicateId(String),
    InvalidId(String),
    UnknownUser(i32),
    EmptyContent,
    MissingKey,
    MissingFileName(String),
    InvalidFileName(String),
    InvalidPage(String),
}

impl fmt::Display for MessageError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::NotFound(message_id) => {
                write!(f, "Message {message_id} not found or not authorized")
            }
            Self::DuplicateId(message_id) => write!(f, "Message id {message_id} already exists"),
            Self::InvalidId(message_id) => write!(f, "Invalid message id \"{message_id}\""),
            Self::UnknownUser(id) => write!(f, "User {id} does not exist"),
            Self::EmptyContent => write!(f, "Message cannot be empty"),
            Self::MissingKey => write!(f, "message and message_key are required"),
            Self::MissingFileName(message_id) => {
                write!(f, "Message {message_id} doesn't have a file name")
            }
            Self::InvalidFileName(file_name) => write!(f, "Invalid file name \"{file_name}\""),
            Self::InvalidPage(reason) => write!(f, "Invalid page: {reason}"),
        }
    }
}

impl Error for MessageError {}

#[derive(Debug, Eq, PartialEq)]
pub enum UserError {
    NotFound(i32),
    DuplicateUsername(String),
    EmptyUsername,
    NotAuthorized,
}

impl fmt::Display for UserError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "User {id} does not exist"),
            Self::DuplicateUsername(username) => write!(f, "Username {username} is taken"),
            Self::EmptyUsername => write!(f, "Username cannot be empty"),
            Self::NotAuthorized => write!(f, "Not authorized to act as this user"),
        }
    }
}

impl Error for UserError {}
