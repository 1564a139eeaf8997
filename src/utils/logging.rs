//! Plain-text chat transcript written next to the interactive session.

use std::error::Error;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::core::message::{ChatMessage, ChatRole};

pub struct LoggingState {
    file_path: Option<PathBuf>,
    is_active: bool,
}

impl LoggingState {
    /// Start logging to `log_file` when one is given. The file is opened once
    /// up front so a bad path fails before the chat starts.
    pub fn new(log_file: Option<PathBuf>) -> Result<Self, Box<dyn Error>> {
        let mut logging = LoggingState {
            file_path: None,
            is_active: false,
        };
        if let Some(path) = log_file {
            logging.set_log_file(path)?;
        }
        Ok(logging)
    }

    pub fn set_log_file(&mut self, path: PathBuf) -> Result<String, Box<dyn Error>> {
        test_file_access(&path)?;
        let message = format!("Logging enabled to: {}", path.display());
        self.file_path = Some(path);
        self.is_active = true;
        Ok(message)
    }

    /// Pause or resume logging. A pause note is written before pausing.
    pub fn toggle_logging(&mut self, pause_message: &str) -> Result<String, Box<dyn Error>> {
        let Some(path) = self.file_path.clone() else {
            return Err("No log file specified. Start the chat with --log <FILE>.".into());
        };
        if self.is_active {
            self.log_note(pause_message)?;
            self.is_active = false;
            Ok(format!("Logging paused (file: {})", path.display()))
        } else {
            self.is_active = true;
            Ok(format!("Logging resumed to: {}", path.display()))
        }
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn get_status_string(&self) -> String {
        let name = |path: &Path| {
            path.file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .into_owned()
        };
        match (&self.file_path, self.is_active) {
            (None, _) => "disabled".to_string(),
            (Some(path), true) => format!("active ({})", name(path)),
            (Some(path), false) => format!("paused ({})", name(path)),
        }
    }

    /// Append one transcript entry. User lines carry `user_label`; empty
    /// assistant placeholders are skipped.
    pub fn log_message(&self, message: &ChatMessage, user_label: &str) -> Result<(), Box<dyn Error>> {
        match self.active_path() {
            Some(path) => append_block(path, &render_entry(message, user_label)),
            None => Ok(()),
        }
    }

    /// Append an out-of-band note, rendered as `## note`.
    pub fn log_note(&self, note: &str) -> Result<(), Box<dyn Error>> {
        match self.active_path() {
            Some(path) => append_block(path, &format!("## {note}")),
            None => Ok(()),
        }
    }

    /// Replace the log with the full transcript, used when a stored chat is
    /// resumed. The file is swapped in only after the write completes.
    pub fn rewrite_transcript(
        &self,
        messages: &[ChatMessage],
        user_label: &str,
    ) -> Result<(), Box<dyn Error>> {
        let Some(path) = self.active_path() else {
            return Ok(());
        };
        let parent = path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut temp_file = NamedTempFile::new_in(parent)?;
        for message in messages {
            let entry = render_entry(message, user_label);
            if entry.is_empty() {
                continue;
            }
            for line in entry.lines() {
                writeln!(temp_file, "{line}")?;
            }
            writeln!(temp_file)?;
        }
        temp_file.flush()?;
        temp_file.as_file().sync_all()?;
        temp_file.persist(path)?;
        Ok(())
    }

    fn active_path(&self) -> Option<&Path> {
        self.file_path.as_deref().filter(|_| self.is_active)
    }
}

fn render_entry(message: &ChatMessage, user_label: &str) -> String {
    match message.role {
        ChatRole::User => {
            let mut entry = format!("{user_label}: {}", message.content);
            if let Some(file) = &message.file {
                entry.push_str(&format!("\n[file: {file}]"));
            }
            entry
        }
        ChatRole::Assistant => message.content.trim_end().to_string(),
    }
}

fn append_block(path: &Path, content: &str) -> Result<(), Box<dyn Error>> {
    if content.is_empty() {
        return Ok(());
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = BufWriter::new(file);
    for line in content.lines() {
        writeln!(writer, "{line}")?;
    }
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

fn test_file_access(path: &Path) -> Result<(), Box<dyn Error>> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.flush()?;
    Ok(())
}
