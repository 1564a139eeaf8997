use std::fs;
use std::io;
use std::path::Path;

use base64::Engine;

use crate::core::config::data::path_display;

/// A file the user attached to a message.
///
/// Only the reference (a display path) is stored in the transcript; the bytes
/// are kept in memory for the outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub reference: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl Attachment {
    /// Read an image from disk. Anything that is not a recognised image
    /// type is rejected before the file is read.
    pub fn from_path(path: &Path) -> io::Result<Self> {
        let Some(mime_type) = image_mime_type(path) else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "only image attachments (png, jpg, gif, webp) are supported",
            ));
        };
        let data = fs::read(path)?;
        Ok(Self {
            reference: path_display(path),
            mime_type: mime_type.to_string(),
            data,
        })
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    pub fn data_url(&self) -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&self.data);
        format!("data:{};base64,{}", self.mime_type, encoded)
    }
}

fn image_mime_type(path: &Path) -> Option<&'static str> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => Some("image/png"),
        Some("jpg") | Some("jpeg") => Some("image/jpeg"),
        Some("gif") => Some("image/gif"),
        Some("webp") => Some("image/webp"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn reads_file_and_builds_data_url() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("photo.PNG");
        fs::write(&path, b"abc").unwrap();

        let attachment = Attachment::from_path(&path).unwrap();
        assert_eq!(attachment.mime_type, "image/png");
        assert_eq!(attachment.data, b"abc");
        assert_eq!(attachment.data_url(), "data:image/png;base64,YWJj");
    }

    #[test]
    fn only_image_extensions_have_a_mime_type() {
        assert_eq!(image_mime_type(Path::new("x.jpeg")), Some("image/jpeg"));
        assert_eq!(image_mime_type(Path::new("a.bin")), None);
        assert_eq!(image_mime_type(Path::new("notes.txt")), None);
        assert_eq!(image_mime_type(Path::new("noext")), None);
    }

    #[test]
    fn non_image_files_are_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("notes.txt");
        fs::write(&path, "plain text").unwrap();

        let err = Attachment::from_path(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(Attachment::from_path(Path::new("/definitely/missing.png")).is_err());
    }
}
