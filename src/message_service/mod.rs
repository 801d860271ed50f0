mod media;
mod message_id;

use self::media::{sanitize_file_name, MediaStore};
use self::message_id::validate_message_id;
use crate::config::{Config, HistoryConfig};
use crate::database::{
    Database, Message, MessageEdit, MessageFilter, MessageType, NewMessage, Page, User,
};
use crate::error::{MessageError, UserError};
use anyhow::{bail, Context, Result};
use log::{debug, info, warn};
use serde::Deserialize;

/// A new message as submitted by its sender
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessage {
    pub message_id: String,
    pub receiver: i32,
    #[serde(default, rename = "message")]
    pub content: String,
    pub nonce: Option<String>,
    pub ephemeral_key: Option<String>,
    pub message_key: Option<String>,
    pub r#type: Option<MessageType>,
    pub file_name: Option<String>,
    pub file_type: Option<String>,
}

/// New content for an existing message
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EditMessage {
    #[serde(default, rename = "message")]
    pub content: String,
    #[serde(default)]
    pub message_key: String,
    pub nonce: Option<String>,
    pub ephemeral_key: Option<String>,
}

pub struct MessageService {
    db: Database,
    media: MediaStore,
    history: HistoryConfig,
}

impl MessageService {
    /// Create a new `MessageService` instance
    pub fn new(db: Database, config: &Config) -> Self {
        Self {
            db,
            media: MediaStore::new(config.media.dir.clone()),
            history: config.history,
        }
    }

    pub fn register_user(&self, username: &str) -> Result<User> {
        let username = username.trim();
        if username.is_empty() {
            bail!(UserError::EmptyUsername);
        }
        let user = self.db.create_user(username)?;
        info!("Registered user {} ({})", user.id, user.username);
        Ok(user)
    }

    pub fn get_user(&self, id: i32) -> Result<User> {
        Ok(self.db.get_user(id)?.ok_or(UserError::NotFound(id))?)
    }

    /// Mark a user as active right now
    pub fn touch_last_seen(&self, actor: i32, id: i32) -> Result<User> {
        if actor != id {
            bail!(UserError::NotAuthorized);
        }
        Ok(self
            .db
            .touch_last_seen(id)?
            .ok_or(UserError::NotFound(id))?)
    }

    /// Store a message from `sender`
    pub fn send(&self, sender: i32, request: SendMessage) -> Result<Message> {
        validate_message_id(&request.message_id)?;
        if request.content.is_empty() && request.file_name.is_none() {
            bail!(MessageError::EmptyContent);
        }
        if let Some(file_name) = request.file_name.as_deref() {
            if sanitize_file_name(file_name).is_none() {
                bail!(MessageError::InvalidFileName(file_name.to_owned()));
            }
        }
        for user_id in [sender, request.receiver] {
            if self.db.get_user(user_id)?.is_none() {
                bail!(MessageError::UnknownUser(user_id));
            }
        }

        // Messages announcing a file default to the generic file type
        let message_type = request.r#type.unwrap_or(if request.file_name.is_some() {
            MessageType::File
        } else {
            MessageType::Text
        });
        let message = self.db.insert_message(NewMessage {
            message_id: request.message_id,
            sender_id: sender,
            receiver_id: request.receiver,
            content: request.content,
            nonce: request.nonce.unwrap_or_default(),
            ephemeral_key: request.ephemeral_key.unwrap_or_default(),
            message_key: request.message_key.unwrap_or_default(),
            file_name: request.file_name,
            file_type: request.file_type,
            r#type: message_type,
        })?;
        info!(
            "Message {} ({}) sent from {} to {}",
            message.message_id, message.r#type, message.sender_id, message.receiver_id
        );
        Ok(message)
    }

    pub fn get(&self, message_id: &str) -> Result<Message> {
        Ok(self
            .db
            .get_message(message_id)?
            .ok_or_else(|| MessageError::NotFound(message_id.to_owned()))?)
    }

    /// Load a message that `actor` sent, hiding whether messages from other senders exist
    fn get_owned(&self, actor: i32, message_id: &str) -> Result<Message> {
        match self.db.get_message(message_id)? {
            Some(message) if message.sender_id == actor => Ok(message),
            Some(_) => {
                warn!("User {actor} attempted to modify message {message_id} that they didn't send");
                bail!(MessageError::NotFound(message_id.to_owned()))
            }
            None => bail!(MessageError::NotFound(message_id.to_owned())),
        }
    }

    /// Replace the content of a message that `actor` sent
    pub fn edit(&self, actor: i32, message_id: &str, request: EditMessage) -> Result<Message> {
        if request.content.is_empty() || request.message_key.is_empty() {
            bail!(MessageError::MissingKey);
        }
        self.get_owned(actor, message_id)?;

        // Empty values keep the previous encryption parameters
        let edit = MessageEdit {
            content: request.content,
            nonce: request.nonce.filter(|nonce| !nonce.is_empty()),
            ephemeral_key: request.ephemeral_key.filter(|key| !key.is_empty()),
            message_key: Some(request.message_key),
        };
        let message = self
            .db
            .update_message(message_id, &edit)?
            .ok_or_else(|| MessageError::NotFound(message_id.to_owned()))?;
        info!("Message {message_id} edited by user {actor}");
        Ok(message)
    }

    /// Delete a message that `actor` sent, along with its file
    pub fn delete(&self, actor: i32, message_id: &str) -> Result<Message> {
        self.get_owned(actor, message_id)?;
        let message = self
            .db
            .delete_message(message_id)?
            .ok_or_else(|| MessageError::NotFound(message_id.to_owned()))?;
        if let Some(file_path) = &message.file_path {
            debug!("Deleting file {file_path} of message {message_id}");
            // The row is already gone, so a leftover file doesn't fail the delete
            if let Err(err) = self.media.remove(file_path) {
                warn!("Failed to delete file of message {message_id}: {err:?}");
            }
        }
        info!("Message {message_id} deleted by user {actor}");
        Ok(message)
    }

    /// Store the file announced by a message that `actor` sent
    pub fn attach_file(&self, actor: i32, message_id: &str, contents: &[u8]) -> Result<Message> {
        let message = self.get_owned(actor, message_id)?;
        let Some(file_name) = message.file_name.as_deref() else {
            bail!(MessageError::MissingFileName(message_id.to_owned()));
        };

        let file_path = self.media.save(message_id, file_name, contents)?;
        if let Some(previous_path) = message.file_path.as_deref() {
            if previous_path != file_path {
                self.media.remove(previous_path)?;
            }
        }

        let file_size = i64::try_from(contents.len()).context("File is too large")?;
        let message = self
            .db
            .set_message_file(message_id, &file_path, file_size)?
            .ok_or_else(|| MessageError::NotFound(message_id.to_owned()))?;
        info!("Stored {file_size} byte file for message {message_id}");
        Ok(message)
    }

    /// Load a message and the contents of its file
    pub fn read_file(&self, message_id: &str) -> Result<(Message, Vec<u8>)> {
        let message = self.get(message_id)?;
        let Some(file_path) = message.file_path.as_deref() else {
            bail!(MessageError::NotFound(message_id.to_owned()));
        };
        let contents = self.media.read(file_path)?;
        Ok((message, contents))
    }

    /// Load a page of messages, applying the configured page size defaults and limits
    pub fn history(
        &self,
        filter: &MessageFilter,
        page: Option<u32>,
        page_size: Option<u32>,
    ) -> Result<(Page, Vec<Message>)> {
        let page = Page {
            number: page.unwrap_or(1),
            size: page_size.unwrap_or(self.history.default_page_size),
        };
        if page.number == 0 {
            bail!(MessageError::InvalidPage("page numbers start at 1".to_owned()));
        }
        if page.size == 0 || page.size > self.history.max_page_size {
            bail!(MessageError::InvalidPage(format!(
                "page_size must be between 1 and {}",
                self.history.max_page_size
            )));
        }

        let messages = self.db.list_messages(filter, page)?;
        debug!(
            "Loaded {} messages for page {} of {filter:?}",
            messages.len(),
            page.number
        );
        Ok((page, messages))
    }
}

#[cfg(test)]
pub mod tests {
    use super::media::tests::temp_media_dir;
    use super::*;
    use assert_matches::assert_matches;

    /// Build a service backed by an in-memory database and a temporary media directory
    pub fn test_service() -> Result<MessageService> {
        let mut config = Config::defaults(&temp_media_dir());
        config.history.default_page_size = 2;
        config.history.max_page_size = 3;
        Ok(MessageService::new(Database::open_in_memory()?, &config))
    }

    fn setup() -> Result<(MessageService, User, User)> {
        let service = test_service()?;
        let alice = service.register_user("alice")?;
        let bob = service.register_user("bob")?;
        Ok((service, alice, bob))
    }

    fn text(message_id: &str, receiver: i32) -> SendMessage {
        SendMessage {
            message_id: message_id.to_owned(),
            receiver,
            content: "ciphertext".to_owned(),
            nonce: Some("nonce".to_owned()),
            ephemeral_key: Some("ephemeral".to_owned()),
            message_key: Some("key".to_owned()),
            ..SendMessage::default()
        }
    }

    fn attachment(message_id: &str, receiver: i32, file_name: &str) -> SendMessage {
        SendMessage {
            message_id: message_id.to_owned(),
            receiver,
            file_name: Some(file_name.to_owned()),
            file_type: Some("image/png".to_owned()),
            ..SendMessage::default()
        }
    }

    fn message_error(err: &anyhow::Error) -> Option<&MessageError> {
        err.downcast_ref::<MessageError>()
    }

    #[test]
    fn test_register_user() -> Result<()> {
        let service = test_service()?;
        assert_eq!(service.register_user("  carol ")?.username, "carol");
        assert_eq!(
            service
                .register_user("   ")
                .unwrap_err()
                .downcast_ref::<UserError>(),
            Some(&UserError::EmptyUsername)
        );
        assert_eq!(
            service.get_user(999).unwrap_err().downcast_ref::<UserError>(),
            Some(&UserError::NotFound(999))
        );
        Ok(())
    }

    #[test]
    fn test_touch_last_seen() -> Result<()> {
        let (service, alice, bob) = setup()?;
        assert_eq!(service.touch_last_seen(alice.id, alice.id)?.id, alice.id);
        assert_eq!(
            service
                .touch_last_seen(alice.id, bob.id)
                .unwrap_err()
                .downcast_ref::<UserError>(),
            Some(&UserError::NotAuthorized)
        );
        Ok(())
    }

    #[test]
    fn test_send() -> Result<()> {
        let (service, alice, bob) = setup()?;
        let message = service.send(alice.id, text("m1", bob.id))?;
        assert_eq!(message.sender_id, alice.id);
        assert_eq!(message.receiver_id, bob.id);
        assert_eq!(message.r#type, MessageType::Text);
        assert_eq!(message.nonce, "nonce");
        assert!(!message.is_edited);

        let message = service.send(alice.id, attachment("m2", bob.id, "cat.png"))?;
        assert_eq!(message.r#type, MessageType::File);
        assert_eq!(message.content, "");

        let mut photo = attachment("m3", bob.id, "cat.png");
        photo.r#type = Some(MessageType::Photo);
        assert_eq!(service.send(alice.id, photo)?.r#type, MessageType::Photo);
        Ok(())
    }

    #[test]
    fn test_send_rejections() -> Result<()> {
        let (service, alice, bob) = setup()?;

        let err = service.send(alice.id, text("bad id", bob.id)).unwrap_err();
        assert_matches!(message_error(&err), Some(MessageError::InvalidId(_)));

        let mut empty = text("m1", bob.id);
        empty.content = String::new();
        let err = service.send(alice.id, empty).unwrap_err();
        assert_eq!(message_error(&err), Some(&MessageError::EmptyContent));

        for file_name in ["", "..", ".hidden", "/"] {
            let err = service
                .send(alice.id, attachment("m1", bob.id, file_name))
                .unwrap_err();
            assert_eq!(
                message_error(&err),
                Some(&MessageError::InvalidFileName(file_name.to_owned()))
            );
        }
        assert!(service.db.get_message("m1")?.is_none());

        let err = service.send(alice.id, text("m1", 999)).unwrap_err();
        assert_eq!(message_error(&err), Some(&MessageError::UnknownUser(999)));

        let err = service.send(999, text("m1", bob.id)).unwrap_err();
        assert_eq!(message_error(&err), Some(&MessageError::UnknownUser(999)));

        service.send(alice.id, text("m1", bob.id))?;
        let err = service.send(bob.id, text("m1", alice.id)).unwrap_err();
        assert_eq!(
            message_error(&err),
            Some(&MessageError::DuplicateId("m1".to_owned()))
        );
        Ok(())
    }

    #[test]
    fn test_edit() -> Result<()> {
        let (service, alice, bob) = setup()?;
        service.send(alice.id, text("m1", bob.id))?;

        let edit = EditMessage {
            content: "edited".to_owned(),
            message_key: "new-key".to_owned(),
            nonce: Some(String::new()),
            ephemeral_key: Some("new-ephemeral".to_owned()),
        };
        let message = service.edit(alice.id, "m1", edit.clone())?;
        assert_eq!(message.content, "edited");
        assert_eq!(message.nonce, "nonce");
        assert_eq!(message.ephemeral_key, "new-ephemeral");
        assert_eq!(message.message_key, "new-key");
        assert!(message.is_edited);

        // Only the sender may edit
        let err = service.edit(bob.id, "m1", edit.clone()).unwrap_err();
        assert_eq!(
            message_error(&err),
            Some(&MessageError::NotFound("m1".to_owned()))
        );
        let err = service.edit(alice.id, "missing", edit).unwrap_err();
        assert_eq!(
            message_error(&err),
            Some(&MessageError::NotFound("missing".to_owned()))
        );

        let err = service
            .edit(
                alice.id,
                "m1",
                EditMessage {
                    content: "edited".to_owned(),
                    ..EditMessage::default()
                },
            )
            .unwrap_err();
        assert_eq!(message_error(&err), Some(&MessageError::MissingKey));
        Ok(())
    }

    #[test]
    fn test_delete() -> Result<()> {
        let (service, alice, bob) = setup()?;
        service.send(alice.id, text("m1", bob.id))?;

        let err = service.delete(bob.id, "m1").unwrap_err();
        assert_matches!(message_error(&err), Some(MessageError::NotFound(_)));

        assert_eq!(service.delete(alice.id, "m1")?.message_id, "m1");
        let err = service.get("m1").unwrap_err();
        assert_matches!(message_error(&err), Some(MessageError::NotFound(_)));
        Ok(())
    }

    #[test]
    fn test_attach_file() -> Result<()> {
        let (service, alice, bob) = setup()?;
        service.send(alice.id, attachment("m1", bob.id, "cat.png"))?;

        let err = service.attach_file(bob.id, "m1", b"png").unwrap_err();
        assert_matches!(message_error(&err), Some(MessageError::NotFound(_)));
        let err = service.read_file("m1").unwrap_err();
        assert_matches!(message_error(&err), Some(MessageError::NotFound(_)));

        let message = service.attach_file(alice.id, "m1", b"png bytes")?;
        assert_eq!(message.file_path.as_deref(), Some("m1/cat.png"));
        assert_eq!(message.file_size, Some(9));

        let (message, contents) = service.read_file("m1")?;
        assert_eq!(message.message_id, "m1");
        assert_eq!(contents, b"png bytes");

        service.delete(alice.id, "m1")?;
        let err = service.read_file("m1").unwrap_err();
        assert_matches!(message_error(&err), Some(MessageError::NotFound(_)));
        Ok(())
    }

    #[test]
    fn test_delete_with_unremovable_file() -> Result<()> {
        let (service, alice, bob) = setup()?;
        service.send(alice.id, attachment("m1", bob.id, "cat.png"))?;
        let message = service.attach_file(alice.id, "m1", b"png")?;

        // A directory in place of the file can't be removed with remove_file
        let file_path = service.media.path(&message.file_path.unwrap());
        std::fs::remove_file(&file_path)?;
        std::fs::create_dir_all(file_path.join("nested"))?;

        assert_eq!(service.delete(alice.id, "m1")?.message_id, "m1");
        assert!(service.db.get_message("m1")?.is_none());
        Ok(())
    }

    #[test]
    fn test_attach_file_without_name() -> Result<()> {
        let (service, alice, bob) = setup()?;
        service.send(alice.id, text("m1", bob.id))?;
        let err = service.attach_file(alice.id, "m1", b"data").unwrap_err();
        assert_eq!(
            message_error(&err),
            Some(&MessageError::MissingFileName("m1".to_owned()))
        );
        Ok(())
    }

    #[test]
    fn test_history() -> Result<()> {
        let (service, alice, bob) = setup()?;
        for index in 0..3 {
            service.send(alice.id, text(&format!("m{index}"), bob.id))?;
        }
        let conversation = MessageFilter {
            user: Some(bob.id),
            peer: Some(alice.id),
            r#type: None,
        };

        let (page, messages) = service.history(&conversation, None, None)?;
        assert_eq!(page, Page { number: 1, size: 2 });
        assert_eq!(messages.len(), 2);

        let (_, messages) = service.history(&conversation, Some(2), None)?;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].message_id, "m2");

        let (_, messages) = service.history(&conversation, None, Some(3))?;
        assert_eq!(messages.len(), 3);

        let err = service.history(&conversation, None, Some(4)).unwrap_err();
        assert_matches!(message_error(&err), Some(MessageError::InvalidPage(_)));
        let err = service.history(&conversation, Some(0), None).unwrap_err();
        assert_matches!(message_error(&err), Some(MessageError::InvalidPage(_)));
        let err = service.history(&conversation, None, Some(0)).unwrap_err();
        assert_matches!(message_error(&err), Some(MessageError::InvalidPage(_)));
        Ok(())
    }
}
