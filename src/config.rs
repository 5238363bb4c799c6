use pantrack_core::generation::DEFAULT_MODEL as DEFAULT_GEMINI_MODEL;
use pantrack_core::GenerationConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Project URL of the hosted backend
    pub supabase_url: ConfigValue<Option<String>>,
    /// Public (anon) API key of the hosted backend
    pub supabase_anon_key: ConfigValue<Option<String>>,
    /// API key for recipe generation
    pub gemini_api_key: ConfigValue<Option<String>>,
    /// Generation model name
    pub gemini_model: ConfigValue<String>,
    /// Where the session file lives
    pub data_dir: ConfigValue<PathBuf>,
    /// Sampling parameters for recipe generation
    pub generation: GenerationConfig,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    supabase: Option<SupabaseSection>,
    gemini: Option<GeminiSection>,
    data_dir: Option<PathBuf>,
    generation: Option<GenerationSection>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct SupabaseSection {
    url: Option<String>,
    anon_key: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct GeminiSection {
    api_key: Option<String>,
    model: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct GenerationSection {
    temperature: Option<f32>,
    top_p: Option<f32>,
    top_k: Option<u32>,
    max_output_tokens: Option<u32>,
}

impl GenerationSection {
    fn apply(self, config: &mut GenerationConfig) {
        if let Some(temperature) = self.temperature {
            config.temperature = temperature;
        }
        if let Some(top_p) = self.top_p {
            config.top_p = top_p;
        }
        if let Some(top_k) = self.top_k {
            config.top_k = top_k;
        }
        if let Some(max_output_tokens) = self.max_output_tokens {
            config.max_output_tokens = max_output_tokens;
        }
    }
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        // Start with defaults
        let mut supabase_url = ConfigValue::new(None, ConfigSource::Default);
        let mut supabase_anon_key = ConfigValue::new(None, ConfigSource::Default);
        let mut gemini_api_key = ConfigValue::new(None, ConfigSource::Default);
        let mut gemini_model =
            ConfigValue::new(DEFAULT_GEMINI_MODEL.to_string(), ConfigSource::Default);
        let mut data_dir = ConfigValue::new(Self::default_data_dir(), ConfigSource::Default);
        let mut generation = GenerationConfig::default();
        let mut config_file = None;

        // Try to load from config file
        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config_file = Some(path.clone());

            if let Some(supabase) = file_config.supabase {
                if let Some(url) = supabase.url {
                    supabase_url = ConfigValue::new(Some(url), ConfigSource::File);
                }
                if let Some(key) = supabase.anon_key {
                    supabase_anon_key = ConfigValue::new(Some(key), ConfigSource::File);
                }
            }
            if let Some(gemini) = file_config.gemini {
                if let Some(key) = gemini.api_key {
                    gemini_api_key = ConfigValue::new(Some(key), ConfigSource::File);
                }
                if let Some(model) = gemini.model {
                    gemini_model = ConfigValue::new(model, ConfigSource::File);
                }
            }
            if let Some(dir) = file_config.data_dir {
                // Resolve relative paths against config file's directory
                let resolved = if dir.is_relative() {
                    path.parent().map(|p| p.join(&dir)).unwrap_or(dir)
                } else {
                    dir
                };
                data_dir = ConfigValue::new(resolved, ConfigSource::File);
            }
            if let Some(section) = file_config.generation {
                section.apply(&mut generation);
            }
        }

        // Apply environment variable overrides
        if let Ok(url) = std::env::var("PANTRACK_SUPABASE_URL") {
            supabase_url = ConfigValue::new(Some(url), ConfigSource::Environment);
        }
        if let Ok(key) = std::env::var("PANTRACK_SUPABASE_ANON_KEY") {
            supabase_anon_key = ConfigValue::new(Some(key), ConfigSource::Environment);
        }
        if let Ok(key) = std::env::var("PANTRACK_GEMINI_API_KEY") {
            gemini_api_key = ConfigValue::new(Some(key), ConfigSource::Environment);
        }
        if let Ok(model) = std::env::var("PANTRACK_GEMINI_MODEL") {
            gemini_model = ConfigValue::new(model, ConfigSource::Environment);
        }
        if let Ok(dir) = std::env::var("PANTRACK_DATA_DIR") {
            data_dir = ConfigValue::new(PathBuf::from(dir), ConfigSource::Environment);
        }

        Ok(Self {
            supabase_url,
            supabase_anon_key,
            gemini_api_key,
            gemini_model,
            data_dir,
            generation,
            config_file,
        })
    }

    /// URL and anon key of the backend, or an error naming what is missing.
    pub fn backend(&self) -> Result<(&str, &str), ConfigError> {
        let url = self
            .supabase_url
            .value
            .as_deref()
            .ok_or(ConfigError::MissingValue("supabase.url", "PANTRACK_SUPABASE_URL"))?;
        let key = self.supabase_anon_key.value.as_deref().ok_or(
            ConfigError::MissingValue("supabase.anon_key", "PANTRACK_SUPABASE_ANON_KEY"),
        )?;
        Ok((url, key))
    }

    pub fn gemini_key(&self) -> Result<&str, ConfigError> {
        self.gemini_api_key
            .value
            .as_deref()
            .ok_or(ConfigError::MissingValue("gemini.api_key", "PANTRACK_GEMINI_API_KEY"))
    }

    pub fn session_path(&self) -> PathBuf {
        self.data_dir.value.join("session.json")
    }

    /// Copy with secrets masked, for display.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        config.supabase_anon_key.value = config.supabase_anon_key.value.as_deref().map(mask);
        config.gemini_api_key.value = config.gemini_api_key.value.as_deref().map(mask);
        config
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/pantrack/
    /// - macOS: ~/Library/Application Support/pantrack/
    /// - Windows: %APPDATA%/pantrack/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pantrack")
    }

    /// Default data directory (platform-specific):
    /// - Linux: ~/.local/share/pantrack/
    /// - macOS: ~/Library/Application Support/pantrack/
    /// - Windows: %APPDATA%/pantrack/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pantrack")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

/// Keeps the first and last four characters of long secrets.
fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    } else {
        "****".to_string()
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    /// A required value is unset: (config key, environment variable)
    MissingValue(&'static str, &'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::MissingValue(key, env) => {
                write!(f, "{} is not configured. Set it in the config file or via {}.", key, env)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nonexistent.yaml");

        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(config.gemini_model.value, pantrack_core::generation::DEFAULT_MODEL);
        assert_eq!(config.gemini_model.source, ConfigSource::Default);
        assert!(config
            .data_dir
            .value
            .to_string_lossy()
            .contains("pantrack"));
        assert_eq!(config.generation, GenerationConfig::default());
        assert!(config.config_file.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "supabase:").unwrap();
        writeln!(file, "  url: https://abc.supabase.co").unwrap();
        writeln!(file, "  anon_key: anon-key-value").unwrap();
        writeln!(file, "gemini:").unwrap();
        writeln!(file, "  model: gemini-2.0-flash").unwrap();
        writeln!(file, "data_dir: state").unwrap();
        writeln!(file, "generation:").unwrap();
        writeln!(file, "  temperature: 0.4").unwrap();
        writeln!(file, "  top_k: 32").unwrap();

        let config = Config::load(Some(config_path.clone())).unwrap();
        assert_eq!(
            config.supabase_url.value.as_deref(),
            Some("https://abc.supabase.co")
        );
        assert_eq!(config.supabase_url.source, ConfigSource::File);
        assert_eq!(config.gemini_model.value, "gemini-2.0-flash");
        assert_eq!(config.data_dir.value, temp_dir.path().join("state"));
        assert_eq!(config.generation.temperature, 0.4);
        assert_eq!(config.generation.top_k, 32);
        assert_eq!(config.generation.max_output_tokens, 8192);
        assert_eq!(config.config_file, Some(config_path));
        assert_eq!(
            config.backend().unwrap(),
            ("https://abc.supabase.co", "anon-key-value")
        );
    }

    #[test]
    #[ignore] // Run with --ignored; env vars can pollute parallel tests
    fn test_env_var_overrides_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "gemini:").unwrap();
        writeln!(file, "  model: fromfile").unwrap();

        // Set env var
        std::env::set_var("PANTRACK_GEMINI_MODEL", "fromenv");

        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(config.gemini_model.value, "fromenv");
        assert_eq!(config.gemini_model.source, ConfigSource::Environment);

        // Clean up
        std::env::remove_var("PANTRACK_GEMINI_MODEL");
    }

    #[test]
    fn test_invalid_yaml_error() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "invalid: yaml: content: [").unwrap();

        let result = Config::load(Some(config_path));
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_missing_backend_names_env_var() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "supabase:").unwrap();
        writeln!(file, "  url: https://abc.supabase.co").unwrap();

        let config = Config::load(Some(config_path)).unwrap();
        let err = config.backend().unwrap_err();
        assert!(err.to_string().contains("PANTRACK_SUPABASE_ANON_KEY"));
    }

    #[test]
    fn test_redacted_masks_secrets() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "supabase:").unwrap();
        writeln!(file, "  anon_key: eyJhbGciOiJIUzI1NiJ9").unwrap();
        writeln!(file, "gemini:").unwrap();
        writeln!(file, "  api_key: short").unwrap();

        let config = Config::load(Some(config_path)).unwrap().redacted();
        assert_eq!(
            config.supabase_anon_key.value.as_deref(),
            Some("eyJh...NiJ9")
        );
        assert_eq!(config.gemini_api_key.value.as_deref(), Some("****"));
    }
}
