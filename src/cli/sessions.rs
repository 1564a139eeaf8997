use std::error::Error;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::cli::{CliContext, SessionCommands};
use crate::core::i18n::t;
use crate::core::sessions::{export_file_name, ChatSession};

fn format_timestamp(timestamp: i64) -> String {
    DateTime::from_timestamp_millis(timestamp)
        .map(|time| time.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Resolve where an export goes: a directory gets the dated file name, no
/// path means the dated file name in the working directory.
pub fn export_destination(path: Option<&Path>, today: chrono::NaiveDate) -> PathBuf {
    match path {
        Some(path) if path.is_dir() => path.join(export_file_name(today)),
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(export_file_name(today)),
    }
}

fn write_session_line(
    out: &mut impl Write,
    language: &str,
    session: &ChatSession,
) -> std::io::Result<()> {
    writeln!(
        out,
        "{}  {}  {}  ({} {})  {}",
        session.id,
        session.mcp_id,
        session.title,
        session.messages.len(),
        t(language, "sessions.messages"),
        format_timestamp(session.timestamp)
    )?;
    if !session.last_message.is_empty() {
        writeln!(out, "    {}", session.last_message)?;
    }
    Ok(())
}

pub fn run_sessions_command(
    context: &CliContext,
    command: SessionCommands,
    out: &mut impl Write,
) -> Result<(), Box<dyn Error>> {
    let settings = context.settings()?;
    let language = settings.get().language.as_str();
    let mut store = context.sessions()?;

    match command {
        SessionCommands::List { service } => {
            let sessions: Vec<&ChatSession> = match service.as_deref() {
                Some(mcp_id) => store.sessions_for(mcp_id).collect(),
                None => store.list().iter().collect(),
            };
            if sessions.is_empty() {
                writeln!(out, "{}", t(language, "sessions.empty"))?;
            }
            for session in sessions {
                write_session_line(out, language, session)?;
            }
        }
        SessionCommands::Show { id } => {
            let session = store
                .get(&id)
                .ok_or_else(|| format!("{} ({id})", t(language, "sessions.not_found")))?;
            writeln!(out, "{}  [{}]", session.title, session.mcp_id)?;
            writeln!(out)?;
            for message in &session.messages {
                if message.content.is_empty() {
                    continue;
                }
                let label = if message.is_user() {
                    t(language, "chat.you")
                } else {
                    session.mcp_id.as_str()
                };
                writeln!(out, "{label}> {}", message.content.trim_end())?;
                if let Some(file) = &message.file {
                    writeln!(out, "    [{}: {file}]", t(language, "chat.attached"))?;
                }
            }
        }
        SessionCommands::Delete { id } => {
            if !store.delete(&id)? {
                return Err(format!("{} ({id})", t(language, "sessions.not_found")).into());
            }
            writeln!(out, "{}", t(language, "sessions.deleted"))?;
        }
        SessionCommands::Clear => {
            store.clear()?;
            writeln!(out, "{}", t(language, "sessions.cleared"))?;
        }
        SessionCommands::Export { path } => {
            let blob = store.export();
            if path.as_deref() == Some(Path::new("-")) {
                writeln!(out, "{blob}")?;
                return Ok(());
            }
            let destination = export_destination(path.as_deref(), Local::now().date_naive());
            fs::write(&destination, blob)
                .map_err(|err| format!("Failed to write {}: {err}", destination.display()))?;
            writeln!(
                out,
                "{} {}",
                t(language, "sessions.exported"),
                destination.display()
            )?;
        }
        SessionCommands::Import { path } => {
            let blob = fs::read_to_string(&path)
                .map_err(|err| format!("Failed to read {}: {err}", path.display()))?;
            let count = store.import(&blob)?;
            writeln!(out, "{}: {count}", t(language, "sessions.imported"))?;
        }
    }
    Ok(())
}
