//! Configuration for voiceplan paths and API settings.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (VOICEPLAN_HOME)
//! 2. Config file (.voiceplan/config.yaml)
//! 3. Defaults (~/.voiceplan)
//!
//! Config file discovery searches the current directory and its parents
//! for .voiceplan/config.yaml. Credentials are never stored in the config
//! file; they come from the environment on every run.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<std::result::Result<ResolvedConfig, String>> = OnceLock::new();

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_TRANSCRIPTION_MODEL: &str = "whisper-1";
pub const DEFAULT_EXTRACTION_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_LANGUAGE: &str = "en-US";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub api: Option<ApiConfig>,
    #[serde(default)]
    pub defaults: Option<DefaultsConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiConfig {
    pub base_url: Option<String>,
    pub transcription_model: Option<String>,
    pub extraction_model: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DefaultsConfig {
    pub language: Option<String>,
    pub owner: Option<String>,
}

/// Resolved configuration with everything filled in
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Absolute path to voiceplan home (session, store, history)
    pub home: PathBuf,
    pub base_url: String,
    pub transcription_model: String,
    pub extraction_model: String,
    /// Default session language tag
    pub language: String,
    /// Owner recorded on stored tasks
    pub owner: String,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

impl ResolvedConfig {
    pub fn session_path(&self) -> PathBuf {
        self.home.join("session.json")
    }

    pub fn store_path(&self) -> PathBuf {
        self.home.join("tasks.jsonl")
    }

    pub fn history_path(&self) -> PathBuf {
        self.home.join("history.jsonl")
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".voiceplan").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".voiceplan");

    let config_file = find_config_file();
    let file = match &config_file {
        Some(path) => Some(load_config_file(path)?),
        None => None,
    };

    let home = std::env::var("VOICEPLAN_HOME")
        .map(PathBuf::from)
        .unwrap_or(default_home);

    let api = file.as_ref().and_then(|f| f.api.clone()).unwrap_or_default();
    let defaults = file
        .as_ref()
        .and_then(|f| f.defaults.clone())
        .unwrap_or_default();

    Ok(ResolvedConfig {
        home,
        base_url: api
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        transcription_model: api
            .transcription_model
            .unwrap_or_else(|| DEFAULT_TRANSCRIPTION_MODEL.to_string()),
        extraction_model: api
            .extraction_model
            .unwrap_or_else(|| DEFAULT_EXTRACTION_MODEL.to_string()),
        language: defaults
            .language
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
        owner: defaults.owner.unwrap_or_else(whoami),
        config_file,
    })
}

fn whoami() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "default".to_string())
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}

/// OpenAI API key from the environment.
pub fn api_key() -> Result<String> {
    std::env::var("OPENAI_API_KEY")
        .context("OPENAI_API_KEY is not set; export it before running")
}

/// Google Calendar bearer token from the environment.
pub fn google_token() -> Result<String> {
    std::env::var("GOOGLE_CALENDAR_TOKEN")
        .context("GOOGLE_CALENDAR_TOKEN is not set; export a Calendar access token")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(".voiceplan");
        std::fs::create_dir_all(&dir).unwrap();

        let config_path = dir.join("config.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(
            file,
            r#"
version: "1.0"
api:
  base_url: https://proxy.internal/v1
  extraction_model: gpt-4o
defaults:
  language: de-DE
  owner: alice
"#
        )
        .unwrap();

        let config = load_config_file(&config_path).unwrap();
        assert_eq!(config.version, "1.0");
        let api = config.api.unwrap();
        assert_eq!(api.base_url, Some("https://proxy.internal/v1".to_string()));
        assert_eq!(api.extraction_model, Some("gpt-4o".to_string()));
        assert_eq!(api.transcription_model, None);
        let defaults = config.defaults.unwrap();
        assert_eq!(defaults.language, Some("de-DE".to_string()));
        assert_eq!(defaults.owner, Some("alice".to_string()));
    }

    #[test]
    fn test_path_helpers() {
        let config = ResolvedConfig {
            home: PathBuf::from("/test/.voiceplan"),
            base_url: DEFAULT_BASE_URL.to_string(),
            transcription_model: DEFAULT_TRANSCRIPTION_MODEL.to_string(),
            extraction_model: DEFAULT_EXTRACTION_MODEL.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            owner: "tester".to_string(),
            config_file: None,
        };

        assert_eq!(
            config.session_path(),
            PathBuf::from("/test/.voiceplan/session.json")
        );
        assert_eq!(
            config.store_path(),
            PathBuf::from("/test/.voiceplan/tasks.jsonl")
        );
        assert_eq!(
            config.history_path(),
            PathBuf::from("/test/.voiceplan/history.jsonl")
        );
    }

    #[test]
    fn test_defaults_without_config_file() {
        let config = load_config().unwrap();

        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.transcription_model, "whisper-1");
        assert_eq!(config.extraction_model, "gpt-4o-mini");
    }
}
