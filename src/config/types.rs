//! Configuration types, defaults, loading, and validation.

use crate::error::Service;
use crate::utils::PollPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// HTTP listener configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Outbound HTTP client settings shared by all providers
    #[serde(default)]
    pub http: HttpConfig,

    /// Speech-to-text provider (AssemblyAI)
    #[serde(default)]
    pub transcription: TranscriptionConfig,

    /// Chat completion provider (OpenRouter)
    #[serde(default)]
    pub chat: ChatConfig,

    /// Text-to-speech provider (ElevenLabs)
    #[serde(default)]
    pub speech: SpeechConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (default: "0.0.0.0")
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Listen port (default: 5000, `PORT` env var overrides)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Largest accepted request body in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_max_upload_bytes() -> usize {
    25 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for daily rolling log files; stdout only when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Total timeout for a single provider request
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

/// AssemblyAI settings, including the bounded polling schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    /// API key (loaded from ASSEMBLYAI_KEY env var)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_transcription_url")]
    pub base_url: String,

    /// Delay after the first pending status check
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_max_poll_interval_ms")]
    pub max_poll_interval_ms: u64,

    /// Backoff multiplier between status checks
    #[serde(default = "default_poll_backoff")]
    pub poll_backoff: f64,

    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,

    /// Overall deadline for a transcription job
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
}

fn default_transcription_url() -> String {
    "https://api.assemblyai.com/v2".to_string()
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_max_poll_interval_ms() -> u64 {
    5000
}

fn default_poll_backoff() -> f64 {
    1.5
}

fn default_max_poll_attempts() -> u32 {
    120
}

fn default_poll_timeout_secs() -> u64 {
    300
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_transcription_url(),
            poll_interval_ms: default_poll_interval_ms(),
            max_poll_interval_ms: default_max_poll_interval_ms(),
            poll_backoff: default_poll_backoff(),
            max_poll_attempts: default_max_poll_attempts(),
            poll_timeout_secs: default_poll_timeout_secs(),
        }
    }
}

impl TranscriptionConfig {
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(self.poll_interval_ms),
            max_interval: Duration::from_millis(self.max_poll_interval_ms),
            multiplier: self.poll_backoff,
            max_attempts: self.max_poll_attempts,
            timeout: Duration::from_secs(self.poll_timeout_secs),
        }
    }
}

/// OpenRouter chat completion settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatConfig {
    /// API key (loaded from OPENROUTER_KEY env var)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_chat_url")]
    pub base_url: String,

    #[serde(default = "default_chat_model")]
    pub model: String,

    /// System prompt sent ahead of every transcript
    #[serde(default = "default_persona")]
    pub persona: String,

    /// Sent as `HTTP-Referer` for OpenRouter app attribution
    #[serde(default = "default_referer")]
    pub referer: String,

    /// Sent as `X-Title`
    #[serde(default = "default_title")]
    pub title: String,
}

fn default_chat_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_chat_model() -> String {
    "qwen/qwen3-235b-a22b-2507".to_string()
}

pub const DEFAULT_PERSONA: &str = "Sen Ziya'sın. Bir dijital ikizsin. Kullanıcıya arkadaşça, \
empatik, bilimsel ve psikolojik bir yanıt ver. Türkçe ve İngilizce konuşabilirsin. \
Yanıtlar kısa, doğal ve insan gibi olmalı.";

fn default_persona() -> String {
    DEFAULT_PERSONA.to_string()
}

fn default_referer() -> String {
    "https://ziya-dijital-ikiz.onrender.com".to_string()
}

fn default_title() -> String {
    "Ziya-Dijital-Ikiz".to_string()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_chat_url(),
            model: default_chat_model(),
            persona: default_persona(),
            referer: default_referer(),
            title: default_title(),
        }
    }
}

/// ElevenLabs text-to-speech settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// API key (loaded from ELEVENLABS_KEY env var)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_speech_url")]
    pub base_url: String,

    #[serde(default = "default_voice_id")]
    pub voice_id: String,

    #[serde(default = "default_speech_model")]
    pub model_id: String,
}

fn default_speech_url() -> String {
    "https://api.elevenlabs.io/v1".to_string()
}

fn default_voice_id() -> String {
    "mBUB5zYuPwfVE6DTcEjf".to_string()
}

fn default_speech_model() -> String {
    "eleven_multilingual_v2".to_string()
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_speech_url(),
            voice_id: default_voice_id(),
            model_id: default_speech_model(),
        }
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Priority (lowest to highest):
    /// 1. Default values
    /// 2. System config: ~/.config/voicerelay/config.toml
    /// 3. Local config: ./voicerelay.toml
    /// 4. Environment variables
    pub fn load() -> Result<Self> {
        tracing::debug!("Loading configuration...");

        let mut config = Self::default();

        if let Some(system_config_path) = Self::system_config_path()
            && system_config_path.exists() {
                tracing::debug!("Loading system config from: {:?}", system_config_path);
                config = Self::merge_from_file(config, &system_config_path)?;
            }

        let local_config_path = Self::local_config_path();
        if local_config_path.exists() {
            tracing::debug!("Loading local config from: {:?}", local_config_path);
            config = Self::merge_from_file(config, &local_config_path)?;
        }

        config = Self::apply_env_overrides(config);

        tracing::debug!("Configuration loaded successfully");
        Ok(config)
    }

    /// Load configuration from a specific file path, then apply environment
    /// overrides. The file must exist.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!("Loading configuration from custom path: {:?}", path);

        if !path.exists() {
            anyhow::bail!("Config file not found: {:?}", path);
        }
        let config = Self::merge_from_file(Self::default(), path)?;

        Ok(Self::apply_env_overrides(config))
    }

    /// System config path: ~/.config/voicerelay/config.toml
    pub fn system_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("voicerelay").join("config.toml"))
    }

    /// Local config path: ./voicerelay.toml
    pub fn local_config_path() -> PathBuf {
        PathBuf::from("./voicerelay.toml")
    }

    /// Load a TOML file and merge it over `base` key by key
    fn merge_from_file(base: Self, path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        Self::merge_toml(base, &contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Overlay a TOML document on `base`. Keys absent from the document keep
    /// their value from `base`.
    pub fn merge_toml(base: Self, contents: &str) -> Result<Self> {
        let overlay: toml::Table = toml::from_str(contents)?;
        let mut merged: toml::Table = toml::from_str(&toml::to_string(&base)?)?;
        merge_tables(&mut merged, overlay);
        Ok(toml::Value::Table(merged).try_into()?)
    }

    fn apply_env_overrides(config: Self) -> Self {
        Self::apply_overrides_from(config, |key| std::env::var(key).ok())
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// production)
    pub fn apply_overrides_from<F>(mut config: Self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("ASSEMBLYAI_KEY") {
            config.transcription.api_key = Some(key);
        }
        if let Some(key) = lookup("OPENROUTER_KEY") {
            config.chat.api_key = Some(key);
        }
        if let Some(key) = lookup("ELEVENLABS_KEY") {
            config.speech.api_key = Some(key);
        }

        if let Some(port) = lookup("PORT") {
            match port.parse() {
                Ok(port) => config.server.port = port,
                Err(_) => tracing::warn!("Ignoring invalid PORT value: {}", port),
            }
        }
        if let Some(bind) = lookup("VOICERELAY_BIND") {
            config.server.bind = bind;
        }

        if let Some(level) = lookup("VOICERELAY_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Some(dir) = lookup("VOICERELAY_LOG_DIR") {
            config.logging.dir = Some(PathBuf::from(dir));
        }

        config
    }

    /// Providers that have no usable API key configured
    pub fn missing_api_keys(&self) -> Vec<Service> {
        [
            (Service::Transcription, &self.transcription.api_key),
            (Service::Chat, &self.chat.api_key),
            (Service::Speech, &self.speech.api_key),
        ]
        .into_iter()
        .filter(|(_, key)| usable_key(key).is_none())
        .map(|(service, _)| service)
        .collect()
    }

    /// Validate configuration
    ///
    /// Missing API keys are only warned about: `/` keeps working without them.
    pub fn validate(&self) -> Result<()> {
        tracing::debug!("Validating configuration...");

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            anyhow::bail!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level,
                valid_levels
            );
        }

        if self.server.port == 0 {
            anyhow::bail!("server.port must be non-zero");
        }
        if self.server.max_upload_bytes == 0 {
            anyhow::bail!("server.max_upload_bytes must be greater than zero");
        }

        let t = &self.transcription;
        if t.poll_interval_ms == 0 || t.max_poll_interval_ms < t.poll_interval_ms {
            anyhow::bail!(
                "transcription.poll_interval_ms must be > 0 and <= max_poll_interval_ms"
            );
        }
        if t.max_poll_attempts == 0 || t.poll_timeout_secs == 0 {
            anyhow::bail!(
                "transcription polling needs at least one attempt and a non-zero timeout"
            );
        }
        if !t.poll_backoff.is_finite() || t.poll_backoff < 1.0 {
            anyhow::bail!("transcription.poll_backoff must be >= 1.0");
        }

        if self.http.timeout_secs == 0 || self.http.connect_timeout_secs == 0 {
            anyhow::bail!(
                "http.timeout_secs and http.connect_timeout_secs must be greater than zero"
            );
        }

        for (name, url) in [
            ("transcription", &self.transcription.base_url),
            ("chat", &self.chat.base_url),
            ("speech", &self.speech.base_url),
        ] {
            if url.trim().is_empty() {
                anyhow::bail!("{}.base_url is empty", name);
            }
        }

        for service in self.missing_api_keys() {
            tracing::warn!(
                "No API key configured for {} provider; /voice will fail",
                service
            );
        }

        tracing::debug!("Configuration validation passed");
        Ok(())
    }

    /// Copy with API keys masked, for display
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        for key in [
            &mut config.transcription.api_key,
            &mut config.chat.api_key,
            &mut config.speech.api_key,
        ] {
            if let Some(value) = key.as_mut() {
                *value = mask_secret(value);
            }
        }
        config
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let toml_string =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
            }

        fs::write(path, toml_string)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        tracing::info!("Configuration saved to: {:?}", path);
        Ok(())
    }
}

/// An API key that is set and non-empty
pub(crate) fn usable_key(key: &Option<String>) -> Option<&str> {
    key.as_deref().filter(|k| !k.is_empty())
}

fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// Keep the last four characters of a secret visible
fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.bind, "0.0.0.0");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.chat.model, "qwen/qwen3-235b-a22b-2507");
        assert_eq!(config.speech.model_id, "eleven_multilingual_v2");
        assert!(config.chat.persona.starts_with("Sen Ziya'sın."));
        assert_eq!(config.missing_api_keys().len(), 3);
    }

    #[test]
    fn test_config_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_rejects_unbounded_polling() {
        let mut config = Config::default();
        config.transcription.max_poll_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.transcription.poll_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.transcription.poll_backoff = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_rejects_zero_http_timeouts() {
        let mut config = Config::default();
        config.http.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.http.connect_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_api_key_counts_as_missing() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("ASSEMBLYAI_KEY", ""),
            ("OPENROUTER_KEY", "or-key"),
            ("ELEVENLABS_KEY", "el-key"),
        ]);
        let config = Config::apply_overrides_from(Config::default(), |k| {
            vars.get(k).map(|v| v.to_string())
        });

        assert_eq!(config.missing_api_keys(), vec![Service::Transcription]);
    }

    #[test]
    fn test_config_validation_empty_base_url() {
        let mut config = Config::default();
        config.speech.base_url = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_merge_toml_keeps_unspecified_keys() {
        let mut base = Config::default();
        base.chat.api_key = Some("sk-or-base".to_string());

        let merged = Config::merge_toml(
            base,
            r#"
[chat]
model = "openai/gpt-4o-mini"

[server]
port = 8080
"#,
        )
        .unwrap();

        assert_eq!(merged.chat.model, "openai/gpt-4o-mini");
        assert_eq!(merged.chat.api_key.as_deref(), Some("sk-or-base"));
        assert_eq!(merged.chat.title, "Ziya-Dijital-Ikiz");
        assert_eq!(merged.server.port, 8080);
        assert_eq!(merged.server.bind, "0.0.0.0");
    }

    #[test]
    fn test_merge_toml_rejects_bad_types() {
        let result = Config::merge_toml(Config::default(), "[server]\nport = \"eighty\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_poll_policy_from_config() {
        let mut config = TranscriptionConfig::default();
        config.poll_interval_ms = 250;
        config.max_poll_attempts = 7;
        config.poll_timeout_secs = 30;

        let policy = config.poll_policy();
        assert_eq!(policy.interval, Duration::from_millis(250));
        assert_eq!(policy.max_attempts, 7);
        assert_eq!(policy.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("ASSEMBLYAI_KEY", "aai-key"),
            ("OPENROUTER_KEY", "or-key"),
            ("ELEVENLABS_KEY", "el-key"),
            ("PORT", "7001"),
            ("VOICERELAY_LOG_LEVEL", "debug"),
        ]);
        let config = Config::apply_overrides_from(Config::default(), |k| {
            vars.get(k).map(|v| v.to_string())
        });

        assert_eq!(config.transcription.api_key.as_deref(), Some("aai-key"));
        assert_eq!(config.chat.api_key.as_deref(), Some("or-key"));
        assert_eq!(config.speech.api_key.as_deref(), Some("el-key"));
        assert_eq!(config.server.port, 7001);
        assert_eq!(config.logging.level, "debug");
        assert!(config.missing_api_keys().is_empty());
    }

    #[test]
    fn test_env_invalid_port_ignored() {
        let config = Config::apply_overrides_from(Config::default(), |k| {
            (k == "PORT").then(|| "not-a-port".to_string())
        });
        assert_eq!(config.server.port, 5000);
    }

    #[test]
    fn test_redacted_masks_keys() {
        let mut config = Config::default();
        config.chat.api_key = Some("sk-or-v1-abcdef1234".to_string());
        config.speech.api_key = Some("abc".to_string());

        let redacted = config.redacted();
        assert_eq!(redacted.chat.api_key.as_deref(), Some("****1234"));
        assert_eq!(redacted.speech.api_key.as_deref(), Some("****"));
        assert_eq!(redacted.transcription.api_key, None);
        assert_eq!(config.chat.api_key.as_deref(), Some("sk-or-v1-abcdef1234"));
    }

    #[test]
    fn test_config_save_and_load() {
        let temp_file = NamedTempFile::new().unwrap();
        let mut config = Config::default();
        config.speech.voice_id = "custom-voice".to_string();

        config.save(temp_file.path()).unwrap();

        let contents = std::fs::read_to_string(temp_file.path()).unwrap();
        let loaded: Config = toml::from_str(&contents).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_from_missing_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::load_from_path(dir.path().join("nope.toml"));
        assert!(result.is_err());
    }
}
