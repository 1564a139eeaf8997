use std::error::Error;
use std::io::Write;

use crate::cli::CliContext;
use crate::core::providers::{ModelInfo, Provider};

fn model_features(model: &ModelInfo) -> String {
    let mut features = Vec::new();
    if model.vision {
        features.push("vision");
    }
    if model.tool_calling {
        features.push("tools");
    }
    if features.is_empty() {
        String::new()
    } else {
        format!(" [{}]", features.join(", "))
    }
}

pub fn list_providers(context: &CliContext, out: &mut impl Write) -> Result<(), Box<dyn Error>> {
    let settings = context.settings()?;
    let selected = settings.get();
    let current = Provider::from_id(&selected.provider).ok();

    writeln!(out, "Available Providers:")?;
    for provider in Provider::ALL {
        writeln!(out)?;
        let marker = if Some(provider) == current { "*" } else { "" };
        let base_url = context
            .config
            .base_url_override(provider.id())
            .unwrap_or(provider.base_url());
        writeln!(
            out,
            "{}{marker}  {}  {base_url}",
            provider.id(),
            provider.display_name()
        )?;
        for model in provider.models() {
            let model_marker = if Some(provider) == current && selected.model == model.id {
                "*"
            } else {
                ""
            };
            writeln!(
                out,
                "  - {}{model_marker} ({}){}",
                model.id,
                model.display_name,
                model_features(model)
            )?;
        }
    }

    if current.is_some() {
        writeln!(out)?;
        writeln!(out, "* = current selection")?;
    }
    Ok(())
}
