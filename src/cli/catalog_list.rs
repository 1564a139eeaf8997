use std::error::Error;
use std::io::Write;

use crate::cli::CliContext;
use crate::core::catalog::{Service, ServiceStatus};
use crate::core::i18n::t;

pub fn status_label(language: &str, status: ServiceStatus) -> &'static str {
    match status {
        ServiceStatus::Online => t(language, "status.online"),
        ServiceStatus::Offline => t(language, "status.offline"),
        ServiceStatus::Maintenance => t(language, "status.maintenance"),
    }
}

fn write_service(out: &mut impl Write, language: &str, service: &Service) -> std::io::Result<()> {
    writeln!(
        out,
        "{} ({}) [{}]",
        service.name,
        service.id,
        status_label(language, service.status)
    )?;
    if !service.description.is_empty() {
        writeln!(out, "  {}", service.description)?;
    }
    if !service.tags.is_empty() {
        writeln!(out, "  {}: {}", t(language, "catalog.tags"), service.tags.join(", "))?;
    }
    writeln!(out, "  {}", service.connection_details)?;
    if let Some(github) = &service.github {
        writeln!(out, "  {github}")?;
    }
    Ok(())
}

pub fn list_services(
    context: &CliContext,
    query: &str,
    out: &mut impl Write,
) -> Result<(), Box<dyn Error>> {
    let settings = context.settings()?;
    let language = settings.get().language.as_str();
    let catalog = context.catalog()?;

    let query = query.trim();
    let matches: Vec<&Service> = catalog.search(query).collect();
    if matches.is_empty() {
        writeln!(out, "{}", t(language, "catalog.empty"))?;
        return Ok(());
    }

    for (index, service) in matches.iter().enumerate() {
        if index > 0 {
            writeln!(out)?;
        }
        write_service(out, language, service)?;
    }
    Ok(())
}
