//! Interactive line-based chat with one service.

use std::error::Error;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::warn;

use crate::cli::CliContext;
use crate::core::attachment::Attachment;
use crate::core::catalog::Service;
use crate::core::client::{ChatError, Conversation};
use crate::core::i18n::t;
use crate::core::message::ChatMessage;
use crate::core::session_sync::SessionSync;
use crate::utils::logging::LoggingState;

#[derive(Debug, Clone, PartialEq, Eq)]
enum ChatCommand {
    Quit,
    New,
    Log,
    File(PathBuf),
    Unknown(String),
    Message(String),
}

fn parse_command(line: &str) -> Option<ChatCommand> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if !line.starts_with('/') {
        return Some(ChatCommand::Message(line.to_string()));
    }

    let (name, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();
    Some(match name {
        "/quit" | "/exit" => ChatCommand::Quit,
        "/new" => ChatCommand::New,
        "/log" => ChatCommand::Log,
        "/file" if !rest.is_empty() => ChatCommand::File(PathBuf::from(rest)),
        _ => ChatCommand::Unknown(line.to_string()),
    })
}

pub struct ChatOptions {
    pub session: Option<String>,
    pub file: Option<PathBuf>,
}

pub async fn run_chat(
    context: &CliContext,
    service_id: &str,
    session: Option<String>,
    file: Option<PathBuf>,
) -> Result<(), Box<dyn Error>> {
    let service = context.find_service(service_id)?;
    let input = BufReader::new(tokio::io::stdin());
    let mut stdout = io::stdout();
    run_chat_loop(
        context,
        service,
        ChatOptions { session, file },
        input,
        &mut stdout,
    )
    .await
}

fn print_samples(out: &mut impl Write, language: &str, service: &Service) -> io::Result<()> {
    if service.sample_questions.is_empty() {
        return Ok(());
    }
    writeln!(out, "{}:", t(language, "chat.sample_questions"))?;
    for (index, question) in service.sample_questions.iter().enumerate() {
        writeln!(out, "  {}. {question}", index + 1)?;
    }
    Ok(())
}

fn print_transcript(
    out: &mut impl Write,
    messages: &[ChatMessage],
    user_label: &str,
    service: &Service,
) -> io::Result<()> {
    for message in messages {
        if message.is_user() {
            writeln!(out, "{user_label}> {}", message.content)?;
        } else if !message.content.is_empty() {
            writeln!(out, "{}> {}", service.name, message.content.trim_end())?;
        }
    }
    Ok(())
}

fn load_attachment(path: &Path) -> Result<Attachment, Box<dyn Error>> {
    Attachment::from_path(path)
        .map_err(|err| format!("Failed to read {}: {err}", path.display()).into())
}

/// Run the chat REPL over `input`, writing everything to `out`.
pub async fn run_chat_loop<R, W>(
    context: &CliContext,
    service: Service,
    options: ChatOptions,
    input: R,
    out: &mut W,
) -> Result<(), Box<dyn Error>>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let settings = context.settings()?.get().clone();
    let language = settings.language.clone();
    let lang = language.as_str();
    let user_label = t(lang, "chat.you");
    let mut sessions = context.sessions()?;
    let mut logging = LoggingState::new(context.log_file.clone())?;

    let (mut sync, history) = match &options.session {
        Some(id) => SessionSync::resume(&sessions, &service.id, id),
        None => (SessionSync::new(&service.id), Vec::new()),
    };

    writeln!(out, "{} {}", t(lang, "chat.with"), service.name)?;
    if !service.description.is_empty() {
        writeln!(out, "{}", service.description)?;
    }
    if let Some(id) = sync.chat_id() {
        writeln!(out, "{} {id}", t(lang, "chat.resumed"))?;
        print_transcript(out, &history, user_label, &service)?;
        logging.rewrite_transcript(&history, user_label)?;
    }

    let mut conversation = Conversation::new(service.clone(), &settings, &context.config)
        .with_mode(context.mode)
        .with_messages(history);

    writeln!(out, "{}", t(lang, "chat.connecting"))?;
    out.flush()?;
    let capabilities = conversation.initialize().await?.clone();

    let mut features = Vec::new();
    if capabilities.has_vision {
        features.push(t(lang, "chat.vision").to_string());
    }
    if capabilities.has_file_upload {
        features.push(t(lang, "chat.file_upload").to_string());
    }
    if capabilities.has_tool_calling {
        features.push(format!(
            "{} ({})",
            t(lang, "chat.tools"),
            capabilities.supported_tools.join(", ")
        ));
    }
    if features.is_empty() {
        features.push(t(lang, "chat.none").to_string());
    }
    writeln!(out, "{}: {}", t(lang, "chat.capabilities"), features.join(", "))?;
    writeln!(out, "{}", t(lang, "chat.help"))?;
    if logging.is_active() {
        writeln!(out, "Log: {}", logging.get_status_string())?;
    }
    if conversation.messages().is_empty() {
        print_samples(out, lang, &service)?;
    }

    let mut pending_attachment = match &options.file {
        Some(path) => Some(load_attachment(path)?),
        None => None,
    };

    let mut lines = input.lines();
    loop {
        write!(out, "{user_label}> ")?;
        out.flush()?;
        let Some(line) = lines.next_line().await? else {
            writeln!(out)?;
            break;
        };

        let Some(command) = parse_command(&line) else {
            continue;
        };
        let text = match command {
            ChatCommand::Quit => break,
            ChatCommand::New => {
                conversation.reset_messages();
                sync.reset();
                pending_attachment = None;
                writeln!(out, "{}", t(lang, "chat.new"))?;
                print_samples(out, lang, &service)?;
                continue;
            }
            ChatCommand::Log => {
                match logging.toggle_logging("Logging paused") {
                    Ok(status) => writeln!(out, "{status}")?,
                    Err(err) => writeln!(out, "❌ {err}")?,
                }
                continue;
            }
            ChatCommand::File(path) => {
                match load_attachment(&path) {
                    Ok(attachment) => {
                        writeln!(out, "{}: {}", t(lang, "chat.attached"), attachment.reference)?;
                        if !capabilities.has_vision {
                            writeln!(out, "{}", t(lang, "chat.attachment_ignored"))?;
                        }
                        pending_attachment = Some(attachment);
                    }
                    Err(err) => writeln!(out, "❌ {err}")?,
                }
                continue;
            }
            ChatCommand::Unknown(raw) => {
                writeln!(out, "❌ Unknown command: {raw}")?;
                continue;
            }
            ChatCommand::Message(text) => text,
        };

        let text = match text.parse::<usize>() {
            Ok(n) if conversation.messages().is_empty()
                && (1..=service.sample_questions.len()).contains(&n) =>
            {
                let question = service.sample_questions[n - 1].clone();
                writeln!(out, "{user_label}> {question}")?;
                question
            }
            _ => text,
        };

        let attachment = pending_attachment.take();
        let first_new = conversation.messages().len();
        write!(out, "{}> ", service.name)?;
        out.flush()?;

        let mut write_error = None;
        let outcome = conversation
            .send_message(&text, attachment.as_ref(), |chunk| {
                if write_error.is_none() {
                    write_error = write!(out, "{chunk}").and_then(|()| out.flush()).err();
                }
            })
            .await;
        if let Some(err) = write_error {
            return Err(err.into());
        }
        writeln!(out)?;

        match outcome {
            Ok(()) => {}
            Err(ChatError::SendInFlight) => {
                writeln!(out, "❌ {}", ChatError::SendInFlight)?;
                continue;
            }
            Err(err) => {
                if let Some(detail) = err.detail() {
                    warn!(service_id = %service.id, error = %detail, "Reply failed");
                }
                writeln!(out, "❌ {err}")?;
            }
        }

        for message in conversation.messages().iter().skip(first_new) {
            logging.log_message(message, user_label)?;
        }

        let was_saved = sync.chat_id().is_some();
        let saved = sync
            .sync(&mut sessions, conversation.messages())?
            .map(str::to_string);
        if let (false, Some(id)) = (was_saved, saved) {
            writeln!(out, "{} {id}", t(lang, "chat.saved"))?;
        }
    }

    conversation.close();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::backend::BackendMode;
    use crate::core::config::{Config, MockConfig};
    use crate::core::settings::Settings;
    use std::fs;
    use tempfile::TempDir;

    fn context(dir: &TempDir) -> CliContext {
        let config = Config {
            mock: Some(MockConfig::instant()),
            ..Config::default()
        };
        let context = CliContext::for_dir(config, dir.path(), BackendMode::Mock);
        let mut settings = context.settings().unwrap();
        settings
            .update(Settings {
                provider: "openai".into(),
                model: "gpt-4o".into(),
                api_key: "sk-test".into(),
                language: "en".into(),
            })
            .unwrap();
        context
    }

    async fn run(context: &CliContext, service_id: &str, options: ChatOptions, script: &str) -> String {
        let service = context.find_service(service_id).unwrap();
        let mut out = Vec::new();
        run_chat_loop(context, service, options, script.as_bytes(), &mut out)
            .await
            .expect("chat loop");
        String::from_utf8(out).unwrap()
    }

    fn fresh() -> ChatOptions {
        ChatOptions {
            session: None,
            file: None,
        }
    }

    #[test]
    fn parses_chat_commands() {
        assert_eq!(parse_command("   "), None);
        assert_eq!(parse_command("/quit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/new"), Some(ChatCommand::New));
        assert_eq!(
            parse_command("/file  ./id card.png "),
            Some(ChatCommand::File(PathBuf::from("./id card.png")))
        );
        assert_eq!(
            parse_command("/file"),
            Some(ChatCommand::Unknown("/file".into()))
        );
        assert_eq!(
            parse_command(" hola "),
            Some(ChatCommand::Message("hola".into()))
        );
    }

    #[tokio::test]
    async fn exchange_is_streamed_and_saved() {
        let dir = TempDir::new().unwrap();
        let context = context(&dir);

        let output = run(&context, "legal-advisor", fresh(), "business registration\n/quit\n").await;
        assert!(output.contains("Chat with"));
        assert!(output.contains("Para registrar un negocio"));
        assert!(output.contains("Saved as chat"));

        let sessions = context.sessions().unwrap();
        assert_eq!(sessions.list().len(), 1);
        let session = &sessions.list()[0];
        assert_eq!(session.mcp_id, "legal-advisor");
        assert_eq!(session.title, "business registration...");
        assert_eq!(session.messages.len(), 2);
    }

    #[tokio::test]
    async fn sample_question_can_be_picked_by_number() {
        let dir = TempDir::new().unwrap();
        let context = context(&dir);
        let service = context.find_service("tax-consultant").unwrap();

        let output = run(&context, "tax-consultant", fresh(), "1\n").await;
        assert!(output.contains(&service.sample_questions[0]));

        let sessions = context.sessions().unwrap();
        assert_eq!(
            sessions.list()[0].messages[0].content,
            service.sample_questions[0]
        );
    }

    #[tokio::test]
    async fn resumed_chat_keeps_appending_to_same_session() {
        let dir = TempDir::new().unwrap();
        let context = context(&dir);
        run(&context, "legal-advisor", fresh(), "business\n").await;
        let id = context.sessions().unwrap().list()[0].id.clone();

        let output = run(
            &context,
            "legal-advisor",
            ChatOptions {
                session: Some(id.clone()),
                file: None,
            },
            "divorce\n",
        )
        .await;
        assert!(output.contains(&format!("Resumed chat {id}")));

        let sessions = context.sessions().unwrap();
        assert_eq!(sessions.list().len(), 1);
        assert_eq!(sessions.get(&id).unwrap().messages.len(), 4);
    }

    #[tokio::test]
    async fn new_command_starts_another_session() {
        let dir = TempDir::new().unwrap();
        let context = context(&dir);
        run(&context, "legal-advisor", fresh(), "business\n/new\ndivorce\n").await;
        assert_eq!(context.sessions().unwrap().list().len(), 2);
    }

    #[tokio::test]
    async fn transcript_log_records_exchange() {
        let dir = TempDir::new().unwrap();
        let mut context = context(&dir);
        let log_path = dir.path().join("chat.log");
        context.log_file = Some(log_path.clone());

        let output = run(&context, "tax-consultant", fresh(), "itbis\n").await;
        assert!(output.contains("Log: active (chat.log)"));
        let log = fs::read_to_string(&log_path).unwrap();
        assert!(log.starts_with("You: itbis\n\n"));
        assert!(log.contains("18%"));
    }

    #[tokio::test]
    async fn non_image_file_is_refused_and_not_sent() {
        let dir = TempDir::new().unwrap();
        let context = context(&dir);
        let notes = dir.path().join("notes.txt");
        fs::write(&notes, "plain text").unwrap();

        let script = format!("/file {}\nvisa\n", notes.display());
        let output = run(&context, "immigration-advisor", fresh(), &script).await;
        assert!(output.contains("❌ Failed to read"));
        assert!(!output.contains("He recibido su imagen."));

        let sessions = context.sessions().unwrap();
        assert_eq!(sessions.list()[0].messages[0].file, None);
    }

    #[tokio::test]
    async fn incomplete_settings_fail_before_prompting() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            mock: Some(MockConfig::instant()),
            ..Config::default()
        };
        let context = CliContext::for_dir(config, dir.path(), BackendMode::Mock);
        let service = context.find_service("legal-advisor").unwrap();

        let mut out = Vec::new();
        let err = run_chat_loop(&context, service, fresh(), "hola\n".as_bytes(), &mut out)
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Missing provider, model, API key"));
        assert!(context.sessions().unwrap().list().is_empty());
    }
}
