use crate::error::MessageError;
use crate::result_ext::ResultExt;
use anyhow::{Context, Result};
use std::fs::{create_dir_all, read, remove_dir, remove_file, write};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Stores message attachments on disk, one directory per message
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Write a message's file and return its path relative to the media root
    pub fn save(&self, message_id: &str, file_name: &str, contents: &[u8]) -> Result<String> {
        let file_name = sanitize_file_name(file_name)
            .ok_or_else(|| MessageError::InvalidFileName(file_name.to_owned()))?;
        let message_dir = self.root.join(message_id);
        create_dir_all(&message_dir).with_context(|| {
            format!("Failed to create media directory {}", message_dir.display())
        })?;

        let path = message_dir.join(&file_name);
        write(&path, contents)
            .with_context(|| format!("Failed to write media file {}", path.display()))?;
        Ok(format!("{message_id}/{file_name}"))
    }

    /// Resolve a path relative to the media root
    pub fn path(&self, relative_path: &str) -> PathBuf {
        self.root.join(relative_path)
    }

    pub fn read(&self, relative_path: &str) -> Result<Vec<u8>> {
        let path = self.path(relative_path);
        read(&path).with_context(|| format!("Failed to read media file {}", path.display()))
    }

    /// Remove a stored file and its message directory, ignoring files that are already gone
    pub fn remove(&self, relative_path: &str) -> Result<()> {
        let path = self.path(relative_path);
        remove_file(&path)
            .filter_err(|err| err.kind() == ErrorKind::NotFound)
            .with_context(|| format!("Failed to remove media file {}", path.display()))?;

        if let Some(message_dir) = path.parent().filter(|dir| *dir != self.root) {
            remove_dir(message_dir)
                .filter_err(|err| err.kind() == ErrorKind::NotFound)
                .with_context(|| {
                    format!("Failed to remove media directory {}", message_dir.display())
                })?;
        }
        Ok(())
    }
}

/// Reduce a client-supplied file name to its final path component
pub fn sanitize_file_name(file_name: &str) -> Option<String> {
    let name = Path::new(file_name.trim()).file_name()?.to_str()?;
    if name.starts_with('.') {
        return None;
    }
    Some(name.to_owned())
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Create a fresh directory under the system temp dir
    pub fn temp_media_dir() -> PathBuf {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        let dir = std::env::temp_dir().join(format!(
            "parley-test-{}-{}",
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("cat.png").as_deref(), Some("cat.png"));
        assert_eq!(
            sanitize_file_name("../../etc/passwd").as_deref(),
            Some("passwd")
        );
        assert_eq!(
            sanitize_file_name(" holiday video.mp4 ").as_deref(),
            Some("holiday video.mp4")
        );
        assert_eq!(sanitize_file_name(".."), None);
        assert_eq!(sanitize_file_name(".hidden"), None);
        assert_eq!(sanitize_file_name(""), None);
    }

    #[test]
    fn test_save_read_remove() -> Result<()> {
        let root = temp_media_dir();
        let store = MediaStore::new(root.clone());

        let relative_path = store.save("m1", "notes/report.pdf", b"%PDF")?;
        assert_eq!(relative_path, "m1/report.pdf");
        assert_eq!(store.read(&relative_path)?, b"%PDF");

        store.remove(&relative_path)?;
        assert!(!root.join("m1").exists());
        assert!(store.read(&relative_path).is_err());

        // Removing again is not an error
        store.remove(&relative_path)?;
        Ok(())
    }

    #[test]
    fn test_save_invalid_name() {
        let store = MediaStore::new(temp_media_dir());
        let err = store.save("m1", "..", b"data").unwrap_err();
        assert_eq!(
            err.downcast_ref::<MessageError>(),
            Some(&MessageError::InvalidFileName("..".to_owned()))
        );
    }
}
