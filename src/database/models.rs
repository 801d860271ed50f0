use super::message_type::MessageType;
use crate::schema::{message, user};
use chrono::NaiveDateTime;
use diesel::prelude::*;

/*
 * A message row. The content, nonce and keys are end-to-end encrypted by the
 * clients and stored verbatim. message_id is generated by the sending client
 * and is what every API refers to; id is only the storage key. file_path is
 * relative to the media directory and is only set once the file bytes have
 * been uploaded.
 */
#[derive(Clone, Debug, Queryable, Selectable)]
#[diesel(table_name = message)]
pub struct Message {
    pub id: i32,
    pub message_id: String,
    pub sender_id: i32,
    pub receiver_id: i32,
    pub content: String,
    pub nonce: String,
    pub ephemeral_key: String,
    pub message_key: String,
    pub file_name: Option<String>,
    pub file_type: Option<String>,
    pub file_size: Option<i64>,
    pub file_path: Option<String>,
    pub created_at: NaiveDateTime,
    #[diesel(column_name = type_)]
    pub r#type: MessageType,
    pub is_edited: bool,
    pub updated_at: NaiveDateTime,
}

#[derive(Clone, Debug, Insertable)]
#[diesel(table_name = message)]
pub struct NewMessage {
    pub message_id: String,
    pub sender_id: i32,
    pub receiver_id: i32,
    pub content: String,
    pub nonce: String,
    pub ephemeral_key: String,
    pub message_key: String,
    pub file_name: Option<String>,
    pub file_type: Option<String>,
    #[diesel(column_name = type_)]
    pub r#type: MessageType,
}

/// Replacement values for an edited message. `None` keeps the stored value.
#[derive(AsChangeset, Clone, Debug, Default)]
#[diesel(table_name = message)]
pub struct MessageEdit {
    pub content: String,
    pub nonce: Option<String>,
    pub ephemeral_key: Option<String>,
    pub message_key: Option<String>,
}

#[derive(Clone, Debug, Queryable, Selectable)]
#[diesel(table_name = user)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub created_at: NaiveDateTime,
    pub last_seen: NaiveDateTime,
}
