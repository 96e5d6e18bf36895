use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub local: LocalConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Origins allowed by the CORS layer. All methods and headers are allowed from these.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8000
}
fn default_allowed_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".into(),
        "http://192.168.2.1:3000".into(),
    ]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Locally hosted causal model. Sampling parameters are fixed per deployment.
#[derive(Debug, Clone, Deserialize)]
pub struct LocalConfig {
    #[serde(default = "default_model_path")]
    pub model_path: String,
    #[serde(default = "default_n_gpu_layers")]
    pub n_gpu_layers: i32,
    #[serde(default = "default_n_ctx")]
    pub n_ctx: u32,
    /// Prompts are truncated to this many tokens before generation.
    #[serde(default = "default_max_prompt_tokens")]
    pub max_prompt_tokens: usize,
    #[serde(default = "default_max_new_tokens")]
    pub max_new_tokens: u32,
    #[serde(default = "default_local_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_repetition_penalty")]
    pub repetition_penalty: f32,
    /// Hard wall-clock budget for one inference, lock wait included.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// `auto`, `chatml`, `llama3` or `plain`.
    #[serde(default = "default_prompt_format")]
    pub prompt_format: String,
    #[serde(default = "default_seed")]
    pub seed: u32,
}

fn default_model_path() -> String {
    "models/llama-3.2-Korean-Bllossom-3B-Q4_K_M.gguf".into()
}
fn default_n_gpu_layers() -> i32 {
    99
}
fn default_n_ctx() -> u32 {
    2048
}
fn default_max_prompt_tokens() -> usize {
    512
}
fn default_max_new_tokens() -> u32 {
    64
}
fn default_local_temperature() -> f32 {
    0.7
}
fn default_top_p() -> f32 {
    0.9
}
fn default_repetition_penalty() -> f32 {
    1.2
}
fn default_timeout_secs() -> u64 {
    300
}
fn default_prompt_format() -> String {
    "auto".into()
}
fn default_seed() -> u32 {
    42
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            n_gpu_layers: default_n_gpu_layers(),
            n_ctx: default_n_ctx(),
            max_prompt_tokens: default_max_prompt_tokens(),
            max_new_tokens: default_max_new_tokens(),
            temperature: default_local_temperature(),
            top_p: default_top_p(),
            repetition_penalty: default_repetition_penalty(),
            timeout_secs: default_timeout_secs(),
            prompt_format: default_prompt_format(),
            seed: default_seed(),
        }
    }
}

impl LocalConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Hosted chat-completion API.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_remote_model")]
    pub model: String,
    #[serde(default = "default_remote_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_penalty")]
    pub frequency_penalty: f32,
    #[serde(default = "default_penalty")]
    pub presence_penalty: f32,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".into()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_remote_model() -> String {
    "gpt-3.5-turbo-0125".into()
}
fn default_remote_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    2048
}
fn default_penalty() -> f32 {
    0.5
}
fn default_request_timeout_secs() -> u64 {
    120
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            api_key_env: default_api_key_env(),
            model: default_remote_model(),
            temperature: default_remote_temperature(),
            max_tokens: default_max_tokens(),
            top_p: default_top_p(),
            frequency_penalty: default_penalty(),
            presence_penalty: default_penalty(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl RemoteConfig {
    /// Read the API key from the configured environment variable.
    pub fn api_key(&self) -> anyhow::Result<String> {
        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => anyhow::bail!("environment variable {} is not set", self.api_key_env),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn check_top_p(section: &str, top_p: f32) -> anyhow::Result<()> {
    if !(top_p > 0.0 && top_p <= 1.0) {
        anyhow::bail!("{section}.top_p must be in (0, 1], got {top_p}");
    }
    Ok(())
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load config with fallback chain: explicit path → ./config/default.toml → hardcoded defaults.
    pub fn load_or_default(explicit_path: Option<&Path>) -> Self {
        if let Some(path) = explicit_path {
            match Self::load(path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {e}", path.display());
                }
            }
        }

        let default_path = Path::new("config/default.toml");
        if default_path.exists() {
            match Self::load(default_path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    tracing::warn!("Failed to load default config: {e}");
                }
            }
        }

        tracing::info!("Using hardcoded default configuration");
        Self::default()
    }

    /// Reject sampling parameters no backend can honour.
    pub fn validate(&self) -> anyhow::Result<()> {
        let local = &self.local;
        if local.temperature < 0.0 {
            anyhow::bail!("local.temperature must be >= 0, got {}", local.temperature);
        }
        check_top_p("local", local.top_p)?;
        if local.repetition_penalty <= 0.0 {
            anyhow::bail!("local.repetition_penalty must be > 0");
        }
        if local.max_prompt_tokens == 0 || local.max_new_tokens == 0 {
            anyhow::bail!("local token budgets must be non-zero");
        }
        let window = local
            .max_prompt_tokens
            .saturating_add(local.max_new_tokens as usize);
        if window > local.n_ctx as usize {
            anyhow::bail!(
                "local.max_prompt_tokens ({}) + local.max_new_tokens ({}) exceeds local.n_ctx ({})",
                local.max_prompt_tokens,
                local.max_new_tokens,
                local.n_ctx
            );
        }
        if local.timeout_secs == 0 {
            anyhow::bail!("local.timeout_secs must be non-zero");
        }

        let remote = &self.remote;
        if remote.temperature < 0.0 {
            anyhow::bail!("remote.temperature must be >= 0, got {}", remote.temperature);
        }
        check_top_p("remote", remote.top_p)?;
        if remote.max_tokens == 0 {
            anyhow::bail!("remote.max_tokens must be non-zero");
        }
        if remote.request_timeout_secs == 0 {
            anyhow::bail!("remote.request_timeout_secs must be non-zero");
        }
        Ok(())
    }
}
