use crate::clients::{GatewayConfig, RetryConfig};
use crate::core::{AgentConfig, DispatchMode, ToolErrorPolicy};
use crate::tools::components::available_components;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_COMPONENTS_DIR: &str = "./src/components";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Problems detected before any model call is made.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{var} environment variable is not set.")]
    MissingCredential { var: &'static str },
    #[error("No query provided.")]
    EmptyQuery,
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
    #[error("Unknown provider: {0} (expected openai or anthropic)")]
    UnknownProvider(String),
    #[error("Unknown profile: {0} (expected codegen, design-system or plain)")]
    UnknownProfile(String),
    #[error("No markdown documentation files found in {}", .0.display())]
    NoComponentDocs(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAI,
    Anthropic,
}

impl Provider {
    pub fn api_key_var(self) -> &'static str {
        match self {
            Provider::OpenAI => "OPENAI_API_KEY",
            Provider::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    pub fn base_url_var(self) -> &'static str {
        match self {
            Provider::OpenAI => "OPENAI_BASE_URL",
            Provider::Anthropic => "ANTHROPIC_BASE_URL",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Provider::OpenAI => "gpt-4o-mini",
            Provider::Anthropic => "claude-3-5-sonnet-20240620",
        }
    }

    fn max_temperature(self) -> f32 {
        match self {
            Provider::OpenAI => 2.0,
            Provider::Anthropic => 1.0,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::OpenAI => write!(f, "openai"),
            Provider::Anthropic => write!(f, "anthropic"),
        }
    }
}

impl FromStr for Provider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAI),
            "anthropic" | "claude" => Ok(Provider::Anthropic),
            _ => Err(ConfigError::UnknownProvider(s.to_string())),
        }
    }
}

/// Which assistant variant to run: its prompt, tools and model defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Profile {
    /// Full-stack code generation with weather lookups.
    #[default]
    Codegen,
    /// React screens built only from a documented design system.
    DesignSystem,
    /// Single-shot code generation without tools.
    Plain,
}

impl Profile {
    pub fn default_provider(self) -> Provider {
        match self {
            Profile::Codegen | Profile::Plain => Provider::OpenAI,
            Profile::DesignSystem => Provider::Anthropic,
        }
    }

    pub fn default_temperature(self) -> f32 {
        match self {
            Profile::Codegen | Profile::Plain => 0.7,
            Profile::DesignSystem => 0.0,
        }
    }

    pub fn default_max_iterations(self) -> usize {
        match self {
            Profile::Codegen => 15,
            Profile::DesignSystem => 30,
            Profile::Plain => 1,
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Profile::Codegen => write!(f, "codegen"),
            Profile::DesignSystem => write!(f, "design-system"),
            Profile::Plain => write!(f, "plain"),
        }
    }
}

impl FromStr for Profile {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "codegen" => Ok(Profile::Codegen),
            "design-system" | "ds" => Ok(Profile::DesignSystem),
            "plain" => Ok(Profile::Plain),
            _ => Err(ConfigError::UnknownProfile(s.to_string())),
        }
    }
}

/// Values given on the command line; `None` falls back to the profile.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub provider: Option<Provider>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub temperature: Option<f32>,
    pub max_iterations: Option<usize>,
    pub retries: Option<u32>,
    pub timeout_secs: Option<u64>,
    pub components_dir: Option<PathBuf>,
    pub concurrent_tools: bool,
    pub abort_on_tool_error: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub profile: Profile,
    pub gateway: GatewayConfig,
    pub agent: AgentConfig,
    pub components_dir: PathBuf,
}

impl AppConfig {
    /// Merges profile defaults, command-line overrides and credentials.
    ///
    /// `env` stands in for the process environment so callers decide where
    /// credentials come from.
    pub fn resolve<F>(profile: Profile, overrides: Overrides, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider = overrides.provider.unwrap_or_else(|| profile.default_provider());

        let api_key = overrides
            .api_key
            .or_else(|| env(provider.api_key_var()))
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingCredential {
                var: provider.api_key_var(),
            })?;

        let temperature = overrides
            .temperature
            .unwrap_or_else(|| profile.default_temperature());
        if !(0.0..=provider.max_temperature()).contains(&temperature) {
            return Err(ConfigError::InvalidValue {
                field: "temperature",
                reason: format!(
                    "{} is outside 0..={} for {}",
                    temperature,
                    provider.max_temperature(),
                    provider
                ),
            });
        }

        let max_iterations = overrides
            .max_iterations
            .unwrap_or_else(|| profile.default_max_iterations());
        if max_iterations == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max-iterations",
                reason: "must be at least 1".to_string(),
            });
        }

        let timeout_secs = overrides.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "timeout-secs",
                reason: "must be at least 1".to_string(),
            });
        }

        let gateway = GatewayConfig {
            provider,
            api_key,
            model: overrides
                .model
                .unwrap_or_else(|| provider.default_model().to_string()),
            base_url: overrides.base_url.or_else(|| env(provider.base_url_var())),
            temperature,
            timeout: Duration::from_secs(timeout_secs),
            retry: RetryConfig::with_retries(overrides.retries.unwrap_or(0)),
        };

        let agent = AgentConfig {
            max_iterations,
            dispatch: if overrides.concurrent_tools {
                DispatchMode::Concurrent
            } else {
                DispatchMode::Sequential
            },
            on_tool_error: if overrides.abort_on_tool_error {
                ToolErrorPolicy::Abort
            } else {
                ToolErrorPolicy::Observe
            },
        };

        Ok(Self {
            profile,
            gateway,
            agent,
            components_dir: overrides
                .components_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_COMPONENTS_DIR)),
        })
    }
}

impl AppConfig {
    /// The design-system profile needs at least one component doc to work
    /// from. A missing or unreadable directory counts as having none.
    pub async fn check_component_docs(&self) -> Result<(), ConfigError> {
        if self.profile != Profile::DesignSystem {
            return Ok(());
        }

        match available_components(&self.components_dir).await {
            Ok(names) if !names.is_empty() => {
                debug!(count = names.len(), "found component docs");
                Ok(())
            }
            _ => Err(ConfigError::NoComponentDocs(self.components_dir.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env_with(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_codegen_defaults() {
        let config = AppConfig::resolve(
            Profile::Codegen,
            Overrides::default(),
            env_with(&[("OPENAI_API_KEY", "sk-test")]),
        )
        .unwrap();

        assert_eq!(config.gateway.provider, Provider::OpenAI);
        assert_eq!(config.gateway.model, "gpt-4o-mini");
        assert_eq!(config.gateway.api_key, "sk-test");
        assert_eq!(config.gateway.retry.max_retries, 0);
        assert_eq!(config.agent.max_iterations, 15);
        assert_eq!(config.agent.dispatch, DispatchMode::Sequential);
        assert_eq!(config.agent.on_tool_error, ToolErrorPolicy::Observe);
    }

    #[test]
    fn test_design_system_defaults() {
        let config = AppConfig::resolve(
            Profile::DesignSystem,
            Overrides::default(),
            env_with(&[
                ("ANTHROPIC_API_KEY", "sk-ant"),
                ("ANTHROPIC_BASE_URL", "http://localhost:8080/v1/messages"),
            ]),
        )
        .unwrap();

        assert_eq!(config.gateway.provider, Provider::Anthropic);
        assert_eq!(config.gateway.model, "claude-3-5-sonnet-20240620");
        assert_eq!(config.gateway.temperature, 0.0);
        assert_eq!(
            config.gateway.base_url.as_deref(),
            Some("http://localhost:8080/v1/messages")
        );
        assert_eq!(config.agent.max_iterations, 30);
        assert_eq!(config.components_dir, PathBuf::from(DEFAULT_COMPONENTS_DIR));
    }

    #[rstest]
    #[case(Profile::Codegen, "OPENAI_API_KEY")]
    #[case(Profile::DesignSystem, "ANTHROPIC_API_KEY")]
    fn test_missing_credential(#[case] profile: Profile, #[case] var: &'static str) {
        let err = AppConfig::resolve(profile, Overrides::default(), env_with(&[])).unwrap_err();
        assert_eq!(err, ConfigError::MissingCredential { var });
        assert_eq!(err.to_string(), format!("{} environment variable is not set.", var));
    }

    #[test]
    fn test_blank_credential_is_missing() {
        let err = AppConfig::resolve(
            Profile::Codegen,
            Overrides::default(),
            env_with(&[("OPENAI_API_KEY", "   ")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential { .. }));
    }

    #[test]
    fn test_overrides_win() {
        let overrides = Overrides {
            provider: Some(Provider::Anthropic),
            api_key: Some("flag-key".to_string()),
            model: Some("claude-custom".to_string()),
            max_iterations: Some(5),
            retries: Some(2),
            concurrent_tools: true,
            abort_on_tool_error: true,
            ..Overrides::default()
        };

        let config = AppConfig::resolve(Profile::Codegen, overrides, env_with(&[])).unwrap();

        assert_eq!(config.gateway.provider, Provider::Anthropic);
        assert_eq!(config.gateway.api_key, "flag-key");
        assert_eq!(config.gateway.model, "claude-custom");
        assert_eq!(config.gateway.retry.max_retries, 2);
        assert_eq!(config.agent.max_iterations, 5);
        assert_eq!(config.agent.dispatch, DispatchMode::Concurrent);
        assert_eq!(config.agent.on_tool_error, ToolErrorPolicy::Abort);
    }

    #[rstest]
    #[case(Overrides { temperature: Some(1.5), provider: Some(Provider::Anthropic), ..Overrides::default() }, "temperature")]
    #[case(Overrides { temperature: Some(-0.1), ..Overrides::default() }, "temperature")]
    #[case(Overrides { max_iterations: Some(0), ..Overrides::default() }, "max-iterations")]
    #[case(Overrides { timeout_secs: Some(0), ..Overrides::default() }, "timeout-secs")]
    fn test_invalid_values(#[case] overrides: Overrides, #[case] expected: &str) {
        let env = env_with(&[("OPENAI_API_KEY", "sk"), ("ANTHROPIC_API_KEY", "sk-ant")]);
        let err = AppConfig::resolve(Profile::Codegen, overrides, env).unwrap_err();

        assert!(matches!(err, ConfigError::InvalidValue { field, .. } if field == expected));
    }

    #[rstest]
    #[case("openai", Provider::OpenAI)]
    #[case("Anthropic", Provider::Anthropic)]
    #[case("claude", Provider::Anthropic)]
    fn test_parse_provider(#[case] input: &str, #[case] expected: Provider) {
        assert_eq!(input.parse::<Provider>().unwrap(), expected);
    }

    #[rstest]
    #[case("codegen", Profile::Codegen)]
    #[case("design_system", Profile::DesignSystem)]
    #[case("DS", Profile::DesignSystem)]
    #[case("plain", Profile::Plain)]
    fn test_parse_profile(#[case] input: &str, #[case] expected: Profile) {
        assert_eq!(input.parse::<Profile>().unwrap(), expected);
    }

    #[test]
    fn test_parse_unknown_values() {
        assert!(matches!("gemini".parse::<Provider>(), Err(ConfigError::UnknownProvider(_))));
        assert!(matches!("vue".parse::<Profile>(), Err(ConfigError::UnknownProfile(_))));
    }

    fn design_system_config(components_dir: PathBuf) -> AppConfig {
        AppConfig::resolve(
            Profile::DesignSystem,
            Overrides {
                components_dir: Some(components_dir),
                ..Overrides::default()
            },
            env_with(&[("ANTHROPIC_API_KEY", "sk-ant")]),
        )
        .unwrap()
    }

    #[rstest]
    #[case::empty_dir(&[])]
    #[case::only_text_files(&["notes.txt"])]
    #[tokio::test]
    async fn test_design_system_refuses_dir_without_docs(#[case] files: &[&str]) {
        let dir = TempDir::new().unwrap();
        for file in files {
            std::fs::write(dir.path().join(file), "not a component").unwrap();
        }
        let config = design_system_config(dir.path().to_path_buf());

        assert_eq!(
            config.check_component_docs().await,
            Err(ConfigError::NoComponentDocs(dir.path().to_path_buf()))
        );
    }

    #[tokio::test]
    async fn test_design_system_refuses_missing_dir() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("does-not-exist");
        let config = design_system_config(missing.clone());

        assert_eq!(
            config.check_component_docs().await,
            Err(ConfigError::NoComponentDocs(missing))
        );
    }

    #[tokio::test]
    async fn test_design_system_accepts_markdown_docs() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("button.md"), "# Button").unwrap();

        let config = design_system_config(dir.path().to_path_buf());

        assert_eq!(config.check_component_docs().await, Ok(()));
    }

    #[tokio::test]
    async fn test_other_profiles_skip_component_check() {
        let config = AppConfig::resolve(
            Profile::Codegen,
            Overrides {
                components_dir: Some(PathBuf::from("/nonexistent/components")),
                ..Overrides::default()
            },
            env_with(&[("OPENAI_API_KEY", "sk-test")]),
        )
        .unwrap();

        assert_eq!(config.check_component_docs().await, Ok(()));
    }
}
