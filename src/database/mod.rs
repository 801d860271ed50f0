mod message_type;
mod models;

pub use self::message_type::MessageType;
pub use self::models::{Message, MessageEdit, NewMessage, User};
use crate::error::{MessageError, UserError};
use crate::schema::{message, user};
use crate::sync_ext::MutexExt;
use anyhow::{anyhow, bail, Context, Result};
use chrono::{NaiveDateTime, Utc};
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::info;
use std::path::Path;
use std::sync::Mutex;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Restricts which messages `Database::list_messages` returns
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct MessageFilter {
    pub user: Option<i32>,
    pub peer: Option<i32>,
    pub r#type: Option<MessageType>,
}

/// A one-based page of results
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Page {
    pub number: u32,
    pub size: u32,
}

impl Page {
    fn offset(self) -> i64 {
        i64::from(self.number.saturating_sub(1)) * i64::from(self.size)
    }

    fn limit(self) -> i64 {
        i64::from(self.size)
    }
}

pub struct Database {
    connection: Mutex<SqliteConnection>,
}

impl Database {
    /// Open the database in the data directory, applying any pending migrations
    pub fn open(data_dir: &Path) -> Result<Self> {
        let db_path = data_dir.join("parley.sqlite");
        let connection = SqliteConnection::establish(&db_path.to_string_lossy())
            .with_context(|| format!("Failed to open SQLite database {}", db_path.display()))?;
        Self::from_connection(connection)
    }

    /// Open a private in-memory database
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let connection = SqliteConnection::establish(":memory:")
            .context("Failed to open in-memory SQLite database")?;
        Self::from_connection(connection)
    }

    fn from_connection(mut connection: SqliteConnection) -> Result<Self> {
        // Wait for other writers instead of erroring, and enforce the message -> user references
        connection
            .batch_execute("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 1000;")
            .context("Failed to configure SQLite connection")?;

        let applied = connection
            .run_pending_migrations(MIGRATIONS)
            .map_err(|err| anyhow!(err))
            .context("Failed to run SQLite migrations")?;
        for version in applied {
            info!("Applied migration {version}");
        }

        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    /// Register a new user
    pub fn create_user(&self, username: &str) -> Result<User> {
        let now = now();
        let result = diesel::insert_into(user::table)
            .values((
                user::username.eq(username),
                user::created_at.eq(now),
                user::last_seen.eq(now),
            ))
            .returning(User::as_returning())
            .get_result(&mut *self.connection.lock_unpoisoned());

        match result {
            Err(err) if is_unique_violation(&err) => {
                bail!(UserError::DuplicateUsername(username.to_owned()))
            }
            result => result.context("Failed to save user to the database"),
        }
    }

    pub fn get_user(&self, id: i32) -> Result<Option<User>> {
        user::table
            .find(id)
            .select(User::as_select())
            .first(&mut *self.connection.lock_unpoisoned())
            .optional()
            .context("Failed to load user from the database")
    }

    /// Set the user's last seen time to now
    pub fn touch_last_seen(&self, id: i32) -> Result<Option<User>> {
        diesel::update(user::table.find(id))
            .set(user::last_seen.eq(now()))
            .returning(User::as_returning())
            .get_result(&mut *self.connection.lock_unpoisoned())
            .optional()
            .context("Failed to update last seen time in the database")
    }

    /// Record a new message and return it
    pub fn insert_message(&self, new_message: NewMessage) -> Result<Message> {
        let now = now();
        let result = diesel::insert_into(message::table)
            .values((
                &new_message,
                message::created_at.eq(now),
                message::updated_at.eq(now),
            ))
            .returning(Message::as_returning())
            .get_result(&mut *self.connection.lock_unpoisoned());

        match result {
            Err(err) if is_unique_violation(&err) => {
                bail!(MessageError::DuplicateId(new_message.message_id))
            }
            result => result.context("Failed to save message to the database"),
        }
    }

    pub fn get_message(&self, message_id: &str) -> Result<Option<Message>> {
        message::table
            .filter(message::message_id.eq(message_id))
            .select(Message::as_select())
            .first(&mut *self.connection.lock_unpoisoned())
            .optional()
            .context("Failed to load message from the database")
    }

    /// Apply an edit to a message, marking it as edited
    pub fn update_message(&self, message_id: &str, edit: &MessageEdit) -> Result<Option<Message>> {
        diesel::update(message::table.filter(message::message_id.eq(message_id)))
            .set((edit, message::is_edited.eq(true), message::updated_at.eq(now())))
            .returning(Message::as_returning())
            .get_result(&mut *self.connection.lock_unpoisoned())
            .optional()
            .context("Failed to update message in the database")
    }

    /// Record where a message's file was stored and how large it is
    pub fn set_message_file(
        &self,
        message_id: &str,
        file_path: &str,
        file_size: i64,
    ) -> Result<Option<Message>> {
        diesel::update(message::table.filter(message::message_id.eq(message_id)))
            .set((
                message::file_path.eq(file_path),
                message::file_size.eq(file_size),
                message::updated_at.eq(now()),
            ))
            .returning(Message::as_returning())
            .get_result(&mut *self.connection.lock_unpoisoned())
            .optional()
            .context("Failed to update message file in the database")
    }

    /// Delete a message and return the deleted row
    pub fn delete_message(&self, message_id: &str) -> Result<Option<Message>> {
        diesel::delete(message::table.filter(message::message_id.eq(message_id)))
            .returning(Message::as_returning())
            .get_result(&mut *self.connection.lock_unpoisoned())
            .optional()
            .context("Failed to delete message from the database")
    }

    /// Load a page of messages in chronological order
    pub fn list_messages(&self, filter: &MessageFilter, page: Page) -> Result<Vec<Message>> {
        let mut query = message::table.select(Message::as_select()).into_boxed();

        match (filter.user, filter.peer) {
            (Some(user_id), Some(peer_id)) => {
                query = query.filter(
                    (message::sender_id.eq(user_id).and(message::receiver_id.eq(peer_id))).or(
                        message::sender_id
                            .eq(peer_id)
                            .and(message::receiver_id.eq(user_id)),
                    ),
                );
            }
            (Some(user_id), None) | (None, Some(user_id)) => {
                query = query.filter(
                    message::sender_id
                        .eq(user_id)
                        .or(message::receiver_id.eq(user_id)),
                );
            }
            (None, None) => {}
        }

        if let Some(message_type) = filter.r#type {
            query = query.filter(message::type_.eq(message_type));
        }

        query
            .order((message::created_at.asc(), message::id.asc()))
            .offset(page.offset())
            .limit(page.limit())
            .load(&mut *self.connection.lock_unpoisoned())
            .context("Failed to load messages from the database")
    }
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

fn is_unique_violation(err: &DieselError) -> bool {
    matches!(
        err,
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)
    )
}
