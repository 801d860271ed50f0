use crate::error::MessageError;
use lazy_static::lazy_static;
use regex::Regex;

/// Validate a client-generated message id
// Message ids end up in media paths and URLs, so they are restricted to a safe alphabet
pub fn validate_message_id(message_id: &str) -> Result<(), MessageError> {
    lazy_static! {
        static ref RE: Regex = Regex::new(r"^[A-Za-z0-9_-]{1,64}$").unwrap();
    }

    if RE.is_match(message_id) {
        Ok(())
    } else {
        Err(MessageError::InvalidId(message_id.to_owned()))
    }
}
