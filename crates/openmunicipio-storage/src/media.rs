//! Attachment file storage under the media root.
//!
//! Stored names are relative to the media root (`attached_documents/20122206/DC_1_TestoProposta.doc`),
//! which is what attachment records keep in their `file` field.

use chrono::NaiveDate;
use std::fs;
use std::io;
use std::path::PathBuf;

/// Upload directory for attachments, dated `%Y%d%m`.
pub const ATTACHMENTS_UPLOAD_TO: &str = "attached_documents";

#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Absolute path of a stored name.
    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path(name).is_file()
    }

    /// Attachment upload directory for a given day.
    pub fn attachments_dir(day: NaiveDate) -> String {
        format!("{}/{}", ATTACHMENTS_UPLOAD_TO, day.format("%Y%d%m"))
    }

    /// Store `bytes` as `dir/file_name`, picking a free name if it is taken.
    ///
    /// Returns the stored name relative to the media root.
    pub fn save(&self, dir: &str, file_name: &str, bytes: &[u8]) -> io::Result<String> {
        let file_name = valid_file_name(file_name);
        fs::create_dir_all(self.root.join(dir))?;
        let name = self.available_name(dir, &file_name);
        fs::write(self.path(&name), bytes)?;
        tracing::debug!(name = %name, size = bytes.len(), "stored media file");
        Ok(name)
    }

    /// Remove a stored file; a file that is already gone is not an error.
    pub fn remove(&self, name: &str) -> io::Result<bool> {
        match fs::remove_file(self.path(name)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn available_name(&self, dir: &str, file_name: &str) -> String {
        let candidate = format!("{dir}/{file_name}");
        if !self.exists(&candidate) {
            return candidate;
        }
        let (stem, ext) = match file_name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem, format!(".{ext}")),
            _ => (file_name, String::new()),
        };
        let mut n = 1u32;
        loop {
            let candidate = format!("{dir}/{stem}_{n}{ext}");
            if !self.exists(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Name used when nothing of the requested name survives cleaning.
pub const FALLBACK_FILE_NAME: &str = "attachment";

/// Spaces become underscores; anything other than alphanumerics, `-`, `_` and `.` is dropped.
pub fn valid_file_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .filter_map(|c| match c {
            ' ' => Some('_'),
            c if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' => Some(c),
            _ => None,
        })
        .collect();
    if cleaned.chars().all(|c| c == '.') {
        FALLBACK_FILE_NAME.to_string()
    } else {
        cleaned
    }
}
