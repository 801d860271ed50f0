use crate::database::{Message, MessageFilter, MessageType, Page, User};
use actix_web::{HttpRequest, Result};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HistoryQuery {
    pub user: Option<i32>,
    pub peer: Option<i32>,
    pub r#type: Option<MessageType>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl HistoryQuery {
    pub fn filter(&self) -> MessageFilter {
        MessageFilter {
            user: self.user,
            peer: self.peer,
            r#type: self.r#type,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct MessageInfo {
    pub message_id: String,
    pub sender: i32,
    pub receiver: i32,
    pub message: String,
    pub nonce: String,
    pub ephemeral_key: String,
    pub message_key: String,
    pub r#type: MessageType,
    pub file_name: Option<String>,
    pub file_type: Option<String>,
    pub file_url: Option<String>,
    pub file_size: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_edited: bool,
}

impl MessageInfo {
    // Generate the client view of a message, linking to its file if one has been uploaded
    pub fn from_message(message: Message, req: &HttpRequest) -> Result<Self> {
        let file_url = match message.file_path {
            Some(_) => Some(
                req.url_for("message_file", [&message.message_id])?
                    .to_string(),
            ),
            None => None,
        };

        Ok(Self {
            message_id: message.message_id,
            sender: message.sender_id,
            receiver: message.receiver_id,
            message: message.content,
            nonce: message.nonce,
            ephemeral_key: message.ephemeral_key,
            message_key: message.message_key,
            r#type: message.r#type,
            file_name: message.file_name,
            file_type: message.file_type,
            file_url,
            file_size: message.file_size,
            created_at: utc(message.created_at),
            updated_at: utc(message.updated_at),
            is_edited: message.is_edited,
        })
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct HistoryResponse {
    pub messages: Vec<MessageInfo>,
    pub page: u32,
    pub page_size: u32,
}

impl HistoryResponse {
    pub fn new(page: Page, messages: Vec<Message>, req: &HttpRequest) -> Result<Self> {
        Ok(Self {
            messages: messages
                .into_iter()
                .map(|message| MessageInfo::from_message(message, req))
                .collect::<Result<_>>()?,
            page: page.number,
            page_size: page.size,
        })
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct DeleteConfirmation {
    pub r#type: String,
    pub message_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterUser {
    pub username: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct UserInfo {
    pub id: i32,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            created_at: utc(user.created_at),
            last_seen: utc(user.last_seen),
        }
    }
}

// Timestamps are stored without an offset but are always UTC
fn utc(timestamp: NaiveDateTime) -> DateTime<Utc> {
    Utc.from_utc_datetime(&timestamp)
}
