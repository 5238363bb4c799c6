use clap::{Args, Subcommand};
use std::fmt::Display;
use std::fs;
use std::io::Write;
use std::path::Path;

use super::OutputFormat;
use crate::config::{Config, ConfigValue};

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values (secrets masked)
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Initialize configuration file
    Init,
}

const DEFAULT_CONFIG: &str = r#"# pantrack configuration

# Hosted backend project (or set PANTRACK_SUPABASE_URL / PANTRACK_SUPABASE_ANON_KEY)
supabase:
  url: https://your-project.supabase.co
  anon_key: your-anon-key

# Recipe generation (or set PANTRACK_GEMINI_API_KEY / PANTRACK_GEMINI_MODEL)
gemini:
  # api_key: your-api-key
  model: gemini-1.5-flash

# Where the login session is stored (default: ~/.local/share/pantrack)
# data_dir: ~/.local/share/pantrack

# Sampling parameters for recipe generation
# generation:
#   temperature: 1.0
#   top_p: 0.95
#   top_k: 64
#   max_output_tokens: 8192
"#;

impl ConfigCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                let config = config.redacted();
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&config)?);
                    }
                    OutputFormat::Text => {
                        println!("Configuration");
                        println!("=============\n");

                        if let Some(path) = &config.config_file {
                            println!("Config file: {}", path.display());
                        } else {
                            println!(
                                "Config file: {} (not found)",
                                Config::default_config_path().display()
                            );
                        }
                        println!();

                        print_optional("supabase.url", &config.supabase_url);
                        print_optional("supabase.anon_key", &config.supabase_anon_key);
                        print_optional("gemini.api_key", &config.gemini_api_key);
                        print_value(
                            "gemini.model",
                            &config.gemini_model.value,
                            &config.gemini_model,
                        );
                        print_value(
                            "data_dir",
                            &config.data_dir.value.display(),
                            &config.data_dir,
                        );

                        let generation = &config.generation;
                        println!("generation:");
                        println!("  temperature: {}", generation.temperature);
                        println!("  top_p: {}", generation.top_p);
                        println!("  top_k: {}", generation.top_k);
                        println!("  max_output_tokens: {}", generation.max_output_tokens);
                    }
                }
                Ok(())
            }

            ConfigSubcommand::Init => {
                let config_path = config
                    .config_file
                    .clone()
                    .unwrap_or_else(Config::default_config_path);

                // Check if config already exists
                if config_path.exists() {
                    println!("Config file already exists: {}", config_path.display());
                    println!("Use 'pantrack config show' to view current configuration.");
                    return Ok(());
                }

                write_default_config(&config_path)?;
                println!("Created config file: {}", config_path.display());
                println!("\nEdit this file to customize your settings.");
                Ok(())
            }
        }
    }
}

fn write_default_config(path: &Path) -> std::io::Result<()> {
    // Create parent directory
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut file = fs::File::create(path)?;
    file.write_all(DEFAULT_CONFIG.as_bytes())
}

fn print_value<T>(key: &str, value: &dyn Display, tracked: &ConfigValue<T>) {
    println!("{}: {}", key, value);
    println!("  source: {}", tracked.source);
    println!();
}

fn print_optional(key: &str, tracked: &ConfigValue<Option<String>>) {
    match &tracked.value {
        Some(value) => print_value(key, value, tracked),
        None => print_value(key, &"(not set)", tracked),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_parses() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("pantrack").join("config.yaml");

        write_default_config(&config_path).unwrap();
        let config = Config::load(Some(config_path.clone())).unwrap();

        assert_eq!(config.config_file, Some(config_path));
        assert_eq!(
            config.supabase_url.value.as_deref(),
            Some("https://your-project.supabase.co")
        );
        assert!(config.gemini_api_key.value.is_none());
        assert_eq!(config.gemini_model.value, "gemini-1.5-flash");
    }
}
