//! Supported chat providers.
//!
//! The provider set is closed: settings carry a provider id string, and
//! [`Provider::from_id`] is the only place where an unknown id turns into an
//! error.

use std::error::Error;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Provider {
    OpenAi,
    Google,
    Anthropic,
    DeepSeek,
    Qroq,
    OpenRouter,
    Xai,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModelInfo {
    pub id: &'static str,
    pub display_name: &'static str,
    pub vision: bool,
    pub tool_calling: bool,
}

/// How a provider expects the API key to be presented.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthMode {
    Bearer,
    Anthropic,
}

const fn model(
    id: &'static str,
    display_name: &'static str,
    vision: bool,
    tool_calling: bool,
) -> ModelInfo {
    ModelInfo {
        id,
        display_name,
        vision,
        tool_calling,
    }
}

const OPENAI_MODELS: &[ModelInfo] = &[
    model("gpt-4o", "GPT-4o", true, true),
    model("gpt-4-turbo", "GPT-4 Turbo", true, true),
    model("gpt-3.5-turbo", "GPT-3.5 Turbo", false, true),
];

const GOOGLE_MODELS: &[ModelInfo] = &[
    model("gemini-1.5-pro", "Gemini 1.5 Pro", true, true),
    model("gemini-1.5-flash", "Gemini 1.5 Flash", true, true),
    model("gemini-1.0-pro", "Gemini 1.0 Pro", false, true),
];

const ANTHROPIC_MODELS: &[ModelInfo] = &[
    model("claude-3-opus", "Claude 3 Opus", true, true),
    model("claude-3-sonnet", "Claude 3 Sonnet", true, true),
    model("claude-3-haiku", "Claude 3 Haiku", true, true),
];

const DEEPSEEK_MODELS: &[ModelInfo] = &[
    model("deepseek-chat", "DeepSeek Chat", false, true),
    model("deepseek-coder", "DeepSeek Coder", false, false),
];

const QROQ_MODELS: &[ModelInfo] = &[model("qroq-gemini", "Qroq Gemini", false, false)];

const OPENROUTER_MODELS: &[ModelInfo] = &[
    model("openrouter-mixtral", "Mixtral 8x7B", false, false),
    model("openrouter-llama3", "Llama 3 70B", false, true),
];

const XAI_MODELS: &[ModelInfo] = &[model("grok-1", "Grok-1", false, false)];

impl Provider {
    pub const ALL: [Provider; 7] = [
        Provider::OpenAi,
        Provider::Google,
        Provider::Anthropic,
        Provider::DeepSeek,
        Provider::Qroq,
        Provider::OpenRouter,
        Provider::Xai,
    ];

    pub fn from_id(id: &str) -> Result<Self, UnknownProvider> {
        Self::ALL
            .into_iter()
            .find(|provider| provider.id().eq_ignore_ascii_case(id.trim()))
            .ok_or_else(|| UnknownProvider(id.to_string()))
    }

    pub fn id(self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Google => "google",
            Provider::Anthropic => "anthropic",
            Provider::DeepSeek => "deepseek",
            Provider::Qroq => "qroq",
            Provider::OpenRouter => "openrouter",
            Provider::Xai => "xai",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Provider::OpenAi => "OpenAI",
            Provider::Google => "Google Gemini",
            Provider::Anthropic => "Anthropic",
            Provider::DeepSeek => "DeepSeek",
            Provider::Qroq => "Qroq",
            Provider::OpenRouter => "OpenRouter",
            Provider::Xai => "xAI",
        }
    }

    /// Base URL of the provider's OpenAI-compatible API.
    pub fn base_url(self) -> &'static str {
        match self {
            Provider::OpenAi => "https://api.openai.com/v1",
            Provider::Google => "https://generativelanguage.googleapis.com/v1beta/openai",
            Provider::Anthropic => "https://api.anthropic.com/v1",
            Provider::DeepSeek => "https://api.deepseek.com/v1",
            Provider::Qroq => "https://api.groq.com/openai/v1",
            Provider::OpenRouter => "https://openrouter.ai/api/v1",
            Provider::Xai => "https://api.x.ai/v1",
        }
    }

    pub fn auth_mode(self) -> AuthMode {
        match self {
            Provider::Anthropic => AuthMode::Anthropic,
            _ => AuthMode::Bearer,
        }
    }

    pub fn models(self) -> &'static [ModelInfo] {
        match self {
            Provider::OpenAi => OPENAI_MODELS,
            Provider::Google => GOOGLE_MODELS,
            Provider::Anthropic => ANTHROPIC_MODELS,
            Provider::DeepSeek => DEEPSEEK_MODELS,
            Provider::Qroq => QROQ_MODELS,
            Provider::OpenRouter => OPENROUTER_MODELS,
            Provider::Xai => XAI_MODELS,
        }
    }

    pub fn find_model(self, model_id: &str) -> Option<&'static ModelInfo> {
        self.models().iter().find(|m| m.id == model_id)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownProvider(pub String);

impl fmt::Display for UnknownProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown provider '{}'", self.0)
    }
}

impl Error for UnknownProvider {}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Language {
    pub code: &'static str,
    pub name: &'static str,
}

pub const LANGUAGES: &[Language] = &[
    Language {
        code: "es",
        name: "Español",
    },
    Language {
        code: "en",
        name: "English",
    },
    Language {
        code: "fr",
        name: "Français",
    },
    Language {
        code: "pt",
        name: "Português",
    },
];

pub fn find_language(code: &str) -> Option<&'static Language> {
    LANGUAGES.iter().find(|l| l.code.eq_ignore_ascii_case(code))
}
