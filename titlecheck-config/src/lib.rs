//! Loader for Titlecheck configuration with YAML + environment overlays.
//!
//! Sources, lowest precedence first:
//!
//! 1. built-in defaults (every section and field is optional),
//! 2. an optional YAML file (`titlecheck.yaml` by default),
//! 3. `TITLECHECK_`-prefixed environment variables, `__` between levels
//!    (e.g. `TITLECHECK_LLM__PROVIDER=qwen`).
//!
//! String values may reference other environment variables as `${VAR}`;
//! they are expanded after merging.
//!
//! Provider choice is turned into concrete connection settings by
//! [`resolve_llm`] and [`LlmSection::resolve_with`].
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use titlecheck_common::observability::LogFormat;
use titlecheck_common::{LlmConfig, Result, TitleCheckError};

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

pub const OPENROUTER_ENDPOINT: &str = "https://openrouter.ai/api/v1";
pub const QWEN_ENDPOINT: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";
pub const OPENROUTER_DEFAULT_MODEL: &str = "qwen/qwen3-235b-a22b:free";
pub const QWEN_DEFAULT_MODEL: &str = "qwen-turbo";
/// Credential read by [`Provider::Env`].
pub const OPENROUTER_KEY_ENV: &str = "OPENROUTER_API_KEY";

pub const DEFAULT_BIND: &str = "127.0.0.1:8501";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TitlecheckConfig {
    pub server: ServerConfig,
    pub llm: LlmSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub format: LogFormat,
    pub emit_stderr: bool,
    pub dir: Option<PathBuf>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            emit_stderr: true,
            dir: None,
        }
    }
}

/// Where the API key and endpoint come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    OpenRouter,
    Qwen,
    /// OpenRouter, with the key taken from `OPENROUTER_API_KEY`.
    Env,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::OpenRouter, Provider::Qwen, Provider::Env];

    pub fn as_str(self) -> &'static str {
        match self {
            Provider::OpenRouter => "openrouter",
            Provider::Qwen => "qwen",
            Provider::Env => "env",
        }
    }

    /// Label shown next to the provider choice in the UI.
    pub fn label(self) -> &'static str {
        match self {
            Provider::OpenRouter => "OpenRouter",
            Provider::Qwen => "Qwen官方",
            Provider::Env => "使用环境变量 OPENROUTER_API_KEY",
        }
    }

    pub fn default_endpoint(self) -> &'static str {
        match self {
            Provider::OpenRouter | Provider::Env => OPENROUTER_ENDPOINT,
            Provider::Qwen => QWEN_ENDPOINT,
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Provider::OpenRouter | Provider::Env => OPENROUTER_DEFAULT_MODEL,
            Provider::Qwen => QWEN_DEFAULT_MODEL,
        }
    }

    /// Whether the user must type a key for this provider.
    pub fn needs_key(self) -> bool {
        !matches!(self, Provider::Env)
    }
}

/// `llm:` section: the operator's default provider and optional presets.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    pub provider: Provider,
    pub model: Option<String>,
    pub api_key: Option<String>,
    /// Overrides the provider's default endpoint.
    pub endpoint: Option<String>,
}

impl LlmSection {
    /// Resolve the configured provider using only configured values.
    pub fn resolve(&self) -> Result<LlmConfig> {
        self.resolve_with(self.provider, None, None)
    }

    /// Resolve a provider chosen at request time.
    ///
    /// Blank `api_key`/`model` fall back to this section's presets when
    /// `provider` is the configured one, then to provider defaults.
    pub fn resolve_with(
        &self,
        provider: Provider,
        api_key: Option<&str>,
        model: Option<&str>,
    ) -> Result<LlmConfig> {
        let same = provider == self.provider;
        let preset = |v: &Option<String>| if same { v.clone() } else { None };

        let api_key = non_blank(api_key)
            .map(str::to_string)
            .or_else(|| preset(&self.api_key));
        let model = non_blank(model)
            .map(str::to_string)
            .or_else(|| preset(&self.model));
        let endpoint = preset(&self.endpoint);

        resolve_llm(
            provider,
            api_key.as_deref(),
            model.as_deref(),
            endpoint.as_deref(),
        )
    }

    /// Model to prefill in the form for `provider`.
    pub fn suggested_model(&self, provider: Provider) -> String {
        match (&self.model, provider == self.provider) {
            (Some(m), true) if !m.trim().is_empty() => m.clone(),
            _ => provider.default_model().to_string(),
        }
    }
}

/// Turn a provider choice into concrete connection settings.
///
/// Fills in the provider's default endpoint and model, reads
/// `OPENROUTER_API_KEY` for [`Provider::Env`], and fails with
/// [`TitleCheckError::Config`] when no usable key is available.
///
/// ```
/// use titlecheck_common::LlmConfig;
/// use titlecheck_config::{resolve_llm, Provider, QWEN_ENDPOINT};
///
/// let cfg = resolve_llm(Provider::Qwen, Some("sk-123"), None, None).unwrap();
/// assert_eq!(
///     cfg,
///     LlmConfig::OpenAi {
///         api_key: "sk-123".into(),
///         model: "qwen-turbo".into(),
///         base_url: QWEN_ENDPOINT.into(),
///     }
/// );
///
/// assert!(resolve_llm(Provider::OpenRouter, Some("  "), None, None).is_err());
/// ```
pub fn resolve_llm(
    provider: Provider,
    api_key: Option<&str>,
    model: Option<&str>,
    endpoint: Option<&str>,
) -> Result<LlmConfig> {
    let api_key = match provider {
        Provider::Env => std::env::var(OPENROUTER_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                TitleCheckError::Config(format!("{OPENROUTER_KEY_ENV} environment variable is not set"))
            })?,
        _ => non_blank(api_key)
            .map(str::to_string)
            .ok_or_else(|| {
                TitleCheckError::Config(format!("API key is required for {}", provider.as_str()))
            })?,
    };

    let model = non_blank(model).unwrap_or(provider.default_model()).trim();
    let base_url = non_blank(endpoint)
        .unwrap_or(provider.default_endpoint())
        .trim();

    tracing::debug!(provider = provider.as_str(), model, base_url, "config.llm.resolved");

    Ok(LlmConfig::OpenAi {
        api_key,
        model: model.to_string(),
        base_url: base_url.to_string(),
    })
}

fn non_blank(v: Option<&str>) -> Option<&str> {
    v.filter(|s| !s.trim().is_empty())
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) if s.contains('$') => {
            let mut cur = std::mem::take(s);
            for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                let expanded = shellexpand::env(&cur)
                    .map(|cow| cow.into_owned())
                    .unwrap_or_else(|_| cur.clone());
                if expanded == cur {
                    break;
                }
                cur = expanded;
            }
            *s = cur;
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder over the `config` crate (YAML + env overrides).
pub struct TitlecheckConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for TitlecheckConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl TitlecheckConfigLoader {
    /// Start from built-in defaults. `TITLECHECK_*` variables are layered on
    /// top of every file in [`load`](Self::load).
    ///
    /// ```
    /// use titlecheck_config::{Provider, TitlecheckConfigLoader, DEFAULT_BIND};
    ///
    /// let config = TitlecheckConfigLoader::new()
    ///     .with_yaml_str("llm:\n  provider: qwen\n")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.llm.provider, Provider::Qwen);
    /// assert_eq!(config.server.bind, DEFAULT_BIND);
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a required YAML/TOML/JSON file; the format is inferred by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that may be absent, for deployments configured purely
    /// through the environment.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Merge an inline YAML snippet.
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self.builder.add_source(File::from_str(yaml, FileFormat::Yaml));
        self
    }

    /// Merge all sources, expand `${VAR}` placeholders and deserialize.
    ///
    /// ```
    /// use titlecheck_common::LlmConfig;
    /// use titlecheck_config::{Provider, TitlecheckConfigLoader, OPENROUTER_ENDPOINT};
    ///
    /// unsafe { std::env::set_var("DOC_OPENROUTER_TOKEN", "sk-from-env"); }
    ///
    /// let config = TitlecheckConfigLoader::new()
    ///     .with_yaml_str(r#"
    /// llm:
    ///   provider: openrouter
    ///   api_key: "${DOC_OPENROUTER_TOKEN}"
    /// "#)
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// match config.llm.resolve().unwrap() {
    ///     LlmConfig::OpenAi { api_key, base_url, .. } => {
    ///         assert_eq!(api_key, "sk-from-env");
    ///         assert_eq!(base_url, OPENROUTER_ENDPOINT);
    ///     }
    ///     other => panic!("unexpected {other:?}"),
    /// }
    ///
    /// unsafe { std::env::remove_var("DOC_OPENROUTER_TOKEN"); }
    /// ```
    pub fn load(self) -> std::result::Result<TitlecheckConfig, ConfigError> {
        // Env last so it wins: TITLECHECK_SERVER__BIND -> server.bind
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix("TITLECHECK")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))
    }
}
