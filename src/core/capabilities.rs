use serde::{Deserialize, Serialize};

use crate::core::providers::ModelInfo;

/// What a connected service can do. Held in memory for the lifetime of a
/// client; never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    pub has_vision: bool,
    pub has_file_upload: bool,
    pub has_tool_calling: bool,
    pub supported_tools: Vec<String>,
}

impl Capabilities {
    fn with_tools(vision: bool, file_upload: bool, tools: &[&str]) -> Self {
        Self {
            has_vision: vision,
            has_file_upload: file_upload,
            has_tool_calling: !tools.is_empty(),
            supported_tools: tools.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// Capability record reported by the simulated services.
    pub fn for_mock_service(service_id: &str) -> Self {
        match service_id {
            "legal-advisor" => Self::with_tools(
                false,
                false,
                &["search_legal_database", "calculate_legal_fees"],
            ),
            "tax-consultant" => {
                Self::with_tools(false, true, &["calculate_tax", "search_tax_regulations"])
            }
            "immigration-advisor" => Self::with_tools(
                true,
                true,
                &["check_visa_requirements", "document_verification"],
            ),
            "business-consultant" => Self::with_tools(
                false,
                true,
                &["business_plan_analysis", "market_research"],
            ),
            "property-advisor" => {
                Self::with_tools(true, true, &["property_valuation", "location_analysis"])
            }
            "labor-advisor" => Self::with_tools(
                false,
                true,
                &["contract_analysis", "compensation_calculator"],
            ),
            _ => Self::default(),
        }
    }

    /// Capability record derived from a provider's model table.
    pub fn for_model(model: Option<&ModelInfo>) -> Self {
        match model {
            Some(info) => Self {
                has_vision: info.vision,
                has_file_upload: info.vision,
                has_tool_calling: info.tool_calling,
                supported_tools: Vec::new(),
            },
            None => Self::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::providers::Provider;

    #[test]
    fn known_services_report_their_tools() {
        let legal = Capabilities::for_mock_service("legal-advisor");
        assert!(!legal.has_vision);
        assert!(!legal.has_file_upload);
        assert!(legal.has_tool_calling);
        assert_eq!(
            legal.supported_tools,
            vec!["search_legal_database", "calculate_legal_fees"]
        );

        let immigration = Capabilities::for_mock_service("immigration-advisor");
        assert!(immigration.has_vision);
        assert!(immigration.has_file_upload);
    }

    #[test]
    fn unknown_services_get_empty_record() {
        assert_eq!(
            Capabilities::for_mock_service("test-123"),
            Capabilities::default()
        );
    }

    #[test]
    fn model_capabilities_follow_model_table() {
        let caps = Capabilities::for_model(Provider::OpenAi.find_model("gpt-4o"));
        assert!(caps.has_vision);
        assert!(caps.has_tool_calling);

        let caps = Capabilities::for_model(Provider::OpenAi.find_model("gpt-3.5-turbo"));
        assert!(!caps.has_vision);

        assert_eq!(Capabilities::for_model(None), Capabilities::default());
    }
}
