use crate::config::LlmConfig;

use super::knowledge::treatment_context;
use super::llm_client::{LlmClient, LlmError};

/// Answer for the most severe tier, returned without consulting the model.
pub const EMERGENCY_REFERRAL: &str = "🚨 This is a severe infection. Immediate professional lab diagnosis is required. Please check the Nearest Labs section for contact information.";

pub const SERVICE_UNAVAILABLE: &str = "❌ Error: the recommendation service is unavailable. Please verify your internet connection or API configuration.";

/// Produces farmer-facing treatment advice. Every outcome is a displayable
/// string: configuration and provider problems are reported in the text
/// rather than as errors.
#[derive(Clone)]
pub struct RecommendationService {
    provider: String,
    api_key_var: String,
    client: Option<LlmClient>,
}

impl RecommendationService {
    pub fn new(provider: impl Into<String>, api_key_var: impl Into<String>, client: Option<LlmClient>) -> Self {
        Self {
            provider: provider.into(),
            api_key_var: api_key_var.into(),
            client,
        }
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let client = match config.api_key() {
            Some(key) => {
                let client = LlmClient::new(config, key.to_string())?;
                log::info!(
                    "Recommendations via {} ({} at {})",
                    config.provider,
                    client.model(),
                    config.base_url()
                );
                Some(client)
            }
            None => {
                log::warn!(
                    "{} is not set; recommendations will report a configuration error",
                    config.api_key_var()
                );
                None
            }
        };
        Ok(Self::new(config.provider.clone(), config.api_key_var(), client))
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    pub async fn generate(&self, disease_name: &str, severity: u8, language_code: &str) -> String {
        if severity == 5 {
            return EMERGENCY_REFERRAL.to_string();
        }

        let Some(client) = &self.client else {
            return format!(
                "⚠️ Missing API key for {}. Please set {} in .env.",
                self.provider, self.api_key_var
            );
        };

        let context = treatment_context(disease_name, severity);
        let system = system_prompt(language_code, &context);
        let user = format!(
            "Give treatment plan for {} (Severity {}) translated to {}.",
            disease_name, severity, language_code
        );

        match client.complete(&system, &user).await {
            Ok(advice) => advice,
            Err(e) => {
                log::error!(
                    "Recommendation for {} (severity {}, {}) failed: {:?}",
                    disease_name,
                    severity,
                    language_code,
                    e
                );
                SERVICE_UNAVAILABLE.to_string()
            }
        }
    }
}

fn system_prompt(language_code: &str, context: &str) -> String {
    format!(
        "You are CropGuard, a professional agricultural assistant for farmers.\n\
         Your job: generate easy-to-understand, localized (language = {language_code}) disease management advice.\n\
         \n\
         RULES:\n\
         1. Base the answer strictly on the CONTEXT provided below.\n\
         2. If severity = 5, return ONLY:\n\
         \x20  {EMERGENCY_REFERRAL}\n\
         3. Divide the output into:\n\
         \x20  - **Sanitation / Cultural Practices**\n\
         \x20  - **Treatment / Pesticide Recommendation**\n\
         \x20  - **Safety Note**\n\
         4. Keep the tone simple and instructive for farmers.\n\
         \n\
         CONTEXT:\n\
         ---\n\
         {context}\n\
         ---\n"
    )
}
