//! One-shot "say" command: a single message, reply streamed to stdout.

use std::error::Error;
use std::io::{self, Write};
use std::path::Path;

use crate::cli::CliContext;
use crate::core::attachment::Attachment;
use crate::core::catalog::Service;
use crate::core::client::Conversation;

pub async fn run_say(
    context: &CliContext,
    service_id: &str,
    prompt: &str,
    file: Option<&Path>,
) -> Result<(), Box<dyn Error>> {
    let service = context.find_service(service_id)?;
    let mut stdout = io::stdout();
    let reply = say(context, service, prompt, file, &mut stdout).await?;
    if reply.is_empty() {
        return Err("The service returned an empty reply".into());
    }
    Ok(())
}

/// Send `prompt` on a fresh conversation and return the full reply. Nothing
/// is saved to the chat history.
pub async fn say(
    context: &CliContext,
    service: Service,
    prompt: &str,
    file: Option<&Path>,
    out: &mut impl Write,
) -> Result<String, Box<dyn Error>> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err("Usage: mcp-explorer say <SERVICE> <PROMPT>".into());
    }
    let attachment = match file {
        Some(path) => Some(
            Attachment::from_path(path)
                .map_err(|err| format!("Failed to read {}: {err}", path.display()))?,
        ),
        None => None,
    };

    let settings = context.settings()?.get().clone();
    let mut conversation =
        Conversation::new(service, &settings, &context.config).with_mode(context.mode);
    conversation.initialize().await?;

    let mut reply = String::new();
    let mut write_error = None;
    let outcome = conversation
        .send_message(prompt, attachment.as_ref(), |chunk| {
            reply.push_str(chunk);
            if write_error.is_none() {
                write_error = write!(out, "{chunk}").and_then(|()| out.flush()).err();
            }
        })
        .await;
    if let Some(err) = write_error {
        return Err(err.into());
    }
    outcome?;
    writeln!(out)?;

    Ok(reply.trim_end().to_string())
}
