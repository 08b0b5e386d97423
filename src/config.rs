use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use ::config::{File, FileFormat};
use dialoguer::{Input, Password, Select};

use crate::auth::{Credentials, Endpoints, Environment, MOCK_DOMAIN, PRODUCTION_DOMAIN};

/// Placeholder written into a fresh config file
pub const PLACEHOLDER_APPKEY: &str = "YOUR_APP_KEY";
pub const PLACEHOLDER_SECRETKEY: &str = "YOUR_SECRET_KEY";

const DEFAULT_LOG_FILE: &str = "logs/kiwoom_api.log";
const DEFAULT_MAX_LOG_SIZE_MB: u64 = 10;
const DEFAULT_BACKUP_COUNT: usize = 5;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// (section, key) pairs that environment variables may override.
/// The variable name is `SECTION_KEY`, e.g. `KIWOOM_APPKEY`.
const OVERRIDABLE_KEYS: &[(&str, &str)] = &[
    ("KIWOOM", "environment"),
    ("KIWOOM", "production_domain"),
    ("KIWOOM", "mock_domain"),
    ("KIWOOM", "appkey"),
    ("KIWOOM", "secretkey"),
    ("KIWOOM", "request_timeout"),
    ("LOGGING", "log_level"),
    ("LOGGING", "log_file"),
    ("LOGGING", "max_log_size"),
    ("LOGGING", "backup_count"),
];

/// Kiwoom REST API token manager
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to the INI configuration file
    #[arg(short, long, env = "KIWOOM_CONFIG_FILE", default_value = "config.ini")]
    pub config: String,

    /// Path to a .env file loaded before reading the environment
    #[arg(long, default_value = ".env")]
    pub env_file: String,

    /// Target environment (production, mock)
    #[arg(short, long)]
    pub environment: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Issue one token, print it as JSON and exit
    #[arg(long)]
    pub once: bool,
}

#[derive(Clone)]
pub struct Config {
    pub config_file: PathBuf,

    // Kiwoom API
    pub environment: String,
    pub production_domain: String,
    pub mock_domain: String,
    pub appkey: String,
    pub secretkey: String,
    pub request_timeout: u64,

    // Logging
    pub log_level: String,
    pub log_file: PathBuf,
    pub max_log_size: u64,
    pub backup_count: usize,

    // Run mode
    pub once: bool,
}

impl Config {
    /// Load configuration with priority: CLI > ENV > config file > defaults
    pub fn load(args: &CliArgs) -> Result<Self> {
        // Load .env file if it exists
        let env_file = expand_tilde(&args.env_file);
        if env_file.exists() {
            dotenvy::from_path(&env_file)
                .with_context(|| format!("Failed to load {}", env_file.display()))?;
        }

        let config_file = expand_tilde(&args.config);
        let mut config = Self::from_sources(&config_file, |name| std::env::var(name).ok())?;
        config.apply_cli_overrides(args);

        Ok(config)
    }

    /// Command-line flags win over every other source
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(ref environment) = args.environment {
            self.environment = environment.clone();
        }
        if let Some(ref log_level) = args.log_level {
            self.log_level = log_level.clone();
        }
        self.once = args.once;
    }

    /// Build from the config file plus variables resolved through `lookup`
    pub fn from_sources<F>(config_file: &Path, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = ::config::Config::builder()
            .set_default("KIWOOM.environment", "mock")?
            .set_default("KIWOOM.production_domain", PRODUCTION_DOMAIN)?
            .set_default("KIWOOM.mock_domain", MOCK_DOMAIN)?
            .set_default("KIWOOM.appkey", "")?
            .set_default("KIWOOM.secretkey", "")?
            .set_default(
                "KIWOOM.request_timeout",
                DEFAULT_REQUEST_TIMEOUT_SECS.to_string(),
            )?
            .set_default("LOGGING.log_level", "INFO")?
            .set_default("LOGGING.log_file", DEFAULT_LOG_FILE)?
            .set_default("LOGGING.max_log_size", DEFAULT_MAX_LOG_SIZE_MB.to_string())?
            .set_default("LOGGING.backup_count", DEFAULT_BACKUP_COUNT.to_string())?
            .add_source(
                File::from(config_file)
                    .format(FileFormat::Ini)
                    .required(false),
            );

        // Environment variables win over the file; empty values are ignored
        for (section, key) in OVERRIDABLE_KEYS {
            let var = format!("{}_{}", section, key.to_uppercase());
            if let Some(value) = lookup(&var).filter(|v| !v.is_empty()) {
                builder = builder.set_override(format!("{}.{}", section, key), value)?;
            }
        }

        let settings = builder
            .build()
            .with_context(|| format!("Failed to read config file {}", config_file.display()))?;

        let get = |path: &str| -> Result<String> {
            settings
                .get_string(path)
                .with_context(|| format!("Missing config value {}", path))
        };

        let max_log_size_mb = parse_or(&get("LOGGING.max_log_size")?, DEFAULT_MAX_LOG_SIZE_MB);

        Ok(Config {
            config_file: config_file.to_path_buf(),
            environment: get("KIWOOM.environment")?,
            production_domain: get("KIWOOM.production_domain")?,
            mock_domain: get("KIWOOM.mock_domain")?,
            appkey: get("KIWOOM.appkey")?,
            secretkey: get("KIWOOM.secretkey")?,
            request_timeout: parse_or(
                &get("KIWOOM.request_timeout")?,
                DEFAULT_REQUEST_TIMEOUT_SECS,
            ),
            log_level: get("LOGGING.log_level")?,
            log_file: expand_tilde(&get("LOGGING.log_file")?),
            max_log_size: max_log_size_mb * 1024 * 1024,
            backup_count: parse_or(&get("LOGGING.backup_count")?, DEFAULT_BACKUP_COUNT),
            once: false,
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.appkey.is_empty() || self.appkey == PLACEHOLDER_APPKEY {
            anyhow::bail!(
                "App key is not configured (set [KIWOOM] appkey in {} or KIWOOM_APPKEY)",
                self.config_file.display()
            );
        }

        if self.secretkey.is_empty() || self.secretkey == PLACEHOLDER_SECRETKEY {
            anyhow::bail!(
                "Secret key is not configured (set [KIWOOM] secretkey in {} or KIWOOM_SECRETKEY)",
                self.config_file.display()
            );
        }

        if self.request_timeout == 0 {
            anyhow::bail!("request_timeout must be at least 1 second");
        }

        Ok(())
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.appkey.clone(), self.secretkey.clone())
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints::new(self.production_domain.clone(), self.mock_domain.clone())
    }

    pub fn target_environment(&self) -> Environment {
        Environment::from_tag(&self.environment)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("config_file", &self.config_file)
            .field("environment", &self.environment)
            .field("production_domain", &self.production_domain)
            .field("mock_domain", &self.mock_domain)
            .field("appkey", &"[REDACTED]")
            .field("secretkey", &"[REDACTED]")
            .field("request_timeout", &self.request_timeout)
            .field("log_level", &self.log_level)
            .field("log_file", &self.log_file)
            .field("max_log_size", &self.max_log_size)
            .field("backup_count", &self.backup_count)
            .field("once", &self.once)
            .finish()
    }
}

/// Parse a numeric setting, keeping the default on garbage
fn parse_or<T: std::str::FromStr>(value: &str, default: T) -> T {
    value.trim().parse().unwrap_or(default)
}

/// Expand tilde (~) in file paths to user's home directory
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

// === First-run setup ===

/// Values collected for a fresh config file
#[derive(Clone)]
pub struct InitialSettings {
    pub appkey: String,
    pub secretkey: String,
    pub environment: String,
}

impl InitialSettings {
    pub fn placeholder() -> Self {
        Self {
            appkey: PLACEHOLDER_APPKEY.to_string(),
            secretkey: PLACEHOLDER_SECRETKEY.to_string(),
            environment: Environment::Mock.as_str().to_string(),
        }
    }
}

/// Setup is needed when there is no config file, no .env and no key in the environment
pub fn needs_initial_setup(args: &CliArgs) -> bool {
    let config_exists = expand_tilde(&args.config).exists();
    let env_file_exists = expand_tilde(&args.env_file).exists();
    let has_appkey = std::env::var("KIWOOM_APPKEY").is_ok_and(|v| !v.is_empty());

    !config_exists && !env_file_exists && !has_appkey
}

/// Prompt for credentials and environment
pub fn run_interactive_setup() -> Result<InitialSettings> {
    println!();
    println!("No configuration found. Let's set up your Kiwoom REST API keys.");
    println!();

    let appkey: String = Input::new()
        .with_prompt("App key")
        .interact_text()
        .context("Failed to read app key")?;

    if appkey.trim().is_empty() {
        anyhow::bail!("App key cannot be empty");
    }

    let secretkey: String = Password::new()
        .with_prompt("Secret key")
        .interact()
        .context("Failed to read secret key")?;

    if secretkey.is_empty() {
        anyhow::bail!("Secret key cannot be empty");
    }

    let environments = [Environment::Mock, Environment::Production];
    let labels: Vec<&str> = environments.iter().map(|e| e.as_str()).collect();
    let selected = Select::new()
        .with_prompt("Target environment")
        .items(&labels)
        .default(0)
        .interact()
        .context("Failed to read environment selection")?;

    Ok(InitialSettings {
        appkey: appkey.trim().to_string(),
        secretkey,
        environment: environments[selected].as_str().to_string(),
    })
}

/// Render a complete INI config file
pub fn render_config_file(settings: &InitialSettings) -> String {
    format!(
        r#"[KIWOOM]
environment = {}
production_domain = {}
mock_domain = {}
appkey = {}
secretkey = {}
request_timeout = {}

[LOGGING]
log_level = INFO
log_file = {}
max_log_size = {}
backup_count = {}
"#,
        settings.environment,
        PRODUCTION_DOMAIN,
        MOCK_DOMAIN,
        settings.appkey,
        settings.secretkey,
        DEFAULT_REQUEST_TIMEOUT_SECS,
        DEFAULT_LOG_FILE,
        DEFAULT_MAX_LOG_SIZE_MB,
        DEFAULT_BACKUP_COUNT,
    )
}

/// Write a config file, creating parent directories
pub fn save_config_file(path: &Path, settings: &InitialSettings) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    file.write_all(render_config_file(settings).as_bytes())
        .with_context(|| format!("Failed to write {}", path.display()))?;

    Ok(())
}
