use std::error::Error;
use std::io::Write;

use crate::cli::{CliContext, TestEntryCommands};
use crate::core::catalog::{add_test_entry, ConnectionDetails};
use crate::core::i18n::t;
use crate::utils::url::validate_service_url;

/// Turn the `test-entry add` flags into connection details.
pub fn connection_from_flags(
    url: Option<String>,
    command: Option<String>,
    args: Vec<String>,
) -> Result<ConnectionDetails, String> {
    match (url, command) {
        (Some(url), None) => {
            if !args.is_empty() {
                return Err("--arg only applies to --command entries".to_string());
            }
            let url = validate_service_url(&url)?;
            Ok(ConnectionDetails::Sse {
                url: url.to_string(),
            })
        }
        (None, Some(command)) if !command.trim().is_empty() => Ok(ConnectionDetails::Stdio {
            command: command.trim().to_string(),
            args,
        }),
        (None, Some(_)) => Err("The stdio command cannot be empty".to_string()),
        _ => Err("Specify exactly one of --url or --command".to_string()),
    }
}

pub fn run_test_entry_command(
    context: &CliContext,
    command: TestEntryCommands,
    out: &mut impl Write,
) -> Result<(), Box<dyn Error>> {
    let settings = context.settings()?;
    let language = settings.get().language.as_str();

    match command {
        TestEntryCommands::Add {
            name,
            url,
            command,
            args,
        } => {
            let name = name.trim();
            if name.is_empty() {
                return Err("The test entry needs a name".into());
            }
            let connection = connection_from_flags(url, command, args)?;
            let service = add_test_entry(&context.storage, name, connection)?;
            writeln!(
                out,
                "{}: {} ({})",
                t(language, "test_entry.added"),
                service.name,
                service.id
            )?;
        }
    }
    Ok(())
}
