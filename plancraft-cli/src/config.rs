//! Provider configuration from the environment

use plancraft_error::{Error, Result};
use plancraft_llm::{ProviderConfig, ProviderType};
use std::path::PathBuf;

/// Load `.env` from the working directory, if there is one.
///
/// Runs before logging is set up, so the caller reports the outcome.
pub fn load_dotenv() -> Result<Option<PathBuf>> {
    match dotenv::dotenv() {
        Ok(path) => Ok(Some(path)),
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(Error::config_invalid(e.to_string())
            .with_operation("config::load_dotenv")
            .set_source(e)),
    }
}

/// Connection settings collected from flags (which already fall back to env vars)
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub provider: ProviderType,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
}

impl ProviderSettings {
    /// Build the provider config, failing fast when the API key is missing.
    pub fn resolve(&self, lookup: impl Fn(&str) -> Option<String>) -> Result<ProviderConfig> {
        let var = self.provider.api_key_env();
        let api_key = lookup(var)
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                Error::config_invalid(format!(
                    "please set {} in the environment or a .env file ({}=your_key_here)",
                    var, var
                ))
                .with_operation("config::resolve")
                .with_context("provider", self.provider.as_str())
            })?;

        let mut config = ProviderConfig::for_type(self.provider, api_key).with_timeout(self.timeout_secs);
        if let Some(model) = &self.model {
            config = config.with_model(model.clone());
        }
        if let Some(base_url) = &self.base_url {
            config = config.with_base_url(base_url.clone());
        }
        Ok(config)
    }

    /// Resolve against the process environment.
    pub fn from_env(&self) -> Result<ProviderConfig> {
        self.resolve(|name| std::env::var(name).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plancraft_error::ErrorKind;

    fn settings(provider: ProviderType) -> ProviderSettings {
        ProviderSettings {
            provider,
            model: None,
            base_url: None,
            timeout_secs: 60,
        }
    }

    #[test]
    fn test_missing_key_fails_fast() {
        let err = settings(ProviderType::OpenAI).resolve(|_| None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
        assert!(err.message().contains("OPENAI_API_KEY"));

        let err = settings(ProviderType::OpenAI)
            .resolve(|_| Some("   ".into()))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    }

    #[test]
    fn test_key_is_read_from_provider_variable() {
        let config = settings(ProviderType::Anthropic)
            .resolve(|name| (name == "ANTHROPIC_API_KEY").then(|| "sk-ant".to_string()))
            .unwrap();

        assert_eq!(config.provider_type, ProviderType::Anthropic);
        assert_eq!(config.api_key.as_deref(), Some("sk-ant"));
        assert_eq!(config.timeout_secs, Some(60));
    }

    #[test]
    fn test_overrides_apply() {
        let mut s = settings(ProviderType::OpenAI);
        s.model = Some("gpt-4o-mini".into());
        s.base_url = Some("http://localhost:11434/v1".into());

        let config = s.resolve(|_| Some("sk-test".into())).unwrap();
        assert_eq!(config.default_model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(config.base_url.as_deref(), Some("http://localhost:11434/v1"));
    }
}
