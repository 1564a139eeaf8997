use std::error::Error;
use std::io::Write;

use crate::cli::{CliContext, SettingKey, SettingsCommands};
use crate::core::i18n::t;
use crate::core::providers::{find_language, Provider, LANGUAGES};
use crate::core::settings::Settings;

fn or_not_set<'a>(language: &str, value: &'a str) -> &'a str {
    if value.trim().is_empty() {
        t(language, "settings.not_set")
    } else {
        value
    }
}

fn write_settings(out: &mut impl Write, settings: &Settings) -> std::io::Result<()> {
    let lang = settings.language.as_str();
    let provider = match Provider::from_id(&settings.provider) {
        Ok(provider) => format!("{} ({})", provider.id(), provider.display_name()),
        Err(_) => or_not_set(lang, &settings.provider).to_string(),
    };
    let language = find_language(lang)
        .map(|l| format!("{} ({})", l.code, l.name))
        .unwrap_or_else(|| lang.to_string());
    let api_key = settings.masked_api_key();

    writeln!(out, "{}:", t(lang, "settings.title"))?;
    writeln!(out, "  {}: {provider}", t(lang, "settings.provider"))?;
    writeln!(
        out,
        "  {}: {}",
        t(lang, "settings.model"),
        or_not_set(lang, &settings.model)
    )?;
    writeln!(
        out,
        "  {}: {}",
        t(lang, "settings.api_key"),
        or_not_set(lang, &api_key)
    )?;
    writeln!(out, "  {}: {language}", t(lang, "settings.language"))?;
    Ok(())
}

/// Apply one `settings set` change. Unknown providers, models and languages
/// are stored as given; the returned notes say what looked off.
pub fn apply_setting(settings: &mut Settings, key: SettingKey, value: &str) -> Vec<String> {
    let value = value.trim();
    let mut notes = Vec::new();
    match key {
        SettingKey::Provider => match Provider::from_id(value) {
            Ok(provider) => settings.provider = provider.id().to_string(),
            Err(err) => {
                let known: Vec<&str> = Provider::ALL.iter().map(|p| p.id()).collect();
                notes.push(format!("{err}. Known providers: {}", known.join(", ")));
                settings.provider = value.to_string();
            }
        },
        SettingKey::Model => {
            if let Ok(provider) = Provider::from_id(&settings.provider) {
                if provider.find_model(value).is_none() {
                    notes.push(format!(
                        "Model '{value}' is not in the {} model list",
                        provider.display_name()
                    ));
                }
            }
            settings.model = value.to_string();
        }
        SettingKey::ApiKey => settings.api_key = value.to_string(),
        SettingKey::Language => match find_language(value) {
            Some(language) => settings.language = language.code.to_string(),
            None => {
                let known: Vec<&str> = LANGUAGES.iter().map(|l| l.code).collect();
                notes.push(format!(
                    "Unknown language '{value}'. Known languages: {}",
                    known.join(", ")
                ));
                settings.language = value.to_string();
            }
        },
    }
    notes
}

pub fn run_settings_command(
    context: &CliContext,
    command: SettingsCommands,
    out: &mut impl Write,
) -> Result<(), Box<dyn Error>> {
    let mut store = context.settings()?;
    match command {
        SettingsCommands::Show => write_settings(out, store.get())?,
        SettingsCommands::Set { key, value } => {
            let mut settings = store.get().clone();
            for note in apply_setting(&mut settings, key, &value) {
                writeln!(out, "⚠️  {note}")?;
            }
            store.update(settings)?;
            writeln!(out, "{}", t(&store.get().language, "settings.saved"))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::backend::BackendMode;
    use crate::core::config::Config;
    use tempfile::TempDir;

    fn set(context: &CliContext, key: SettingKey, value: &str) -> String {
        let mut out = Vec::new();
        run_settings_command(
            context,
            SettingsCommands::Set {
                key,
                value: value.to_string(),
            },
            &mut out,
        )
        .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn set_persists_and_show_masks_key() {
        let dir = TempDir::new().unwrap();
        let context = CliContext::for_dir(Config::default(), dir.path(), BackendMode::Mock);

        set(&context, SettingKey::Language, "EN");
        set(&context, SettingKey::Provider, "OpenAI");
        set(&context, SettingKey::Model, "gpt-4o");
        let saved = set(&context, SettingKey::ApiKey, "sk-secret-1234");
        assert_eq!(saved, "Settings saved.\n");

        let stored = context.settings().unwrap().get().clone();
        assert_eq!(stored.provider, "openai");
        assert_eq!(stored.language, "en");
        assert!(stored.is_complete());

        let mut out = Vec::new();
        run_settings_command(&context, SettingsCommands::Show, &mut out).unwrap();
        let shown = String::from_utf8(out).unwrap();
        assert!(shown.contains("Provider: openai (OpenAI)"));
        assert!(shown.contains("Model: gpt-4o"));
        assert!(shown.contains("API key: **********1234"));
        assert!(shown.contains("Language: en (English)"));
    }

    #[test]
    fn show_defaults_in_spanish() {
        let dir = TempDir::new().unwrap();
        let context = CliContext::for_dir(Config::default(), dir.path(), BackendMode::Mock);
        let mut out = Vec::new();
        run_settings_command(&context, SettingsCommands::Show, &mut out).unwrap();
        let shown = String::from_utf8(out).unwrap();
        assert!(shown.starts_with("Configuración:\n"));
        assert!(shown.contains("Proveedor: (sin definir)"));
    }

    #[test]
    fn unknown_values_are_kept_with_a_note() {
        let mut settings = Settings::default();
        let notes = apply_setting(&mut settings, SettingKey::Provider, "mistral");
        assert_eq!(settings.provider, "mistral");
        assert!(notes[0].starts_with("Unknown provider 'mistral'"));

        let notes = apply_setting(&mut settings, SettingKey::Language, "de");
        assert_eq!(settings.language, "de");
        assert_eq!(notes.len(), 1);

        apply_setting(&mut settings, SettingKey::Provider, "deepseek");
        let notes = apply_setting(&mut settings, SettingKey::Model, "made-up");
        assert_eq!(settings.model, "made-up");
        assert!(notes[0].contains("DeepSeek"));
    }
}
