//! Interface strings for the supported languages.

use std::collections::HashMap;
use std::sync::LazyLock;

use tracing::warn;

const FALLBACK_LANGUAGE: &str = "en";

type Table = HashMap<String, HashMap<String, String>>;

static TRANSLATIONS: LazyLock<Table> = LazyLock::new(load_builtin_translations);

fn load_builtin_translations() -> Table {
    const CONTENT: &str = include_str!("../builtins/translations.toml");

    toml::from_str(CONTENT).unwrap_or_else(|err| {
        warn!(error = %err, "Failed to parse built-in translations");
        HashMap::new()
    })
}

fn lookup(language: &str, key: &str) -> Option<&'static str> {
    TRANSLATIONS
        .get(language)
        .and_then(|strings| strings.get(key))
        .map(String::as_str)
}

/// Look up `key` for `language`, falling back to English and then to the
/// key itself.
pub fn t<'a>(language: &str, key: &'a str) -> &'a str {
    lookup(language, key)
        .or_else(|| lookup(FALLBACK_LANGUAGE, key))
        .unwrap_or(key)
}
