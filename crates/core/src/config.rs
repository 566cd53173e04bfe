use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub steam: SteamConfig,
    pub discord: DiscordConfig,
    pub poller: PollerConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct SteamConfig {
    pub api_key: SecretString,
    pub base_url: String,
    pub page_size: u8,
    pub request_timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct DiscordConfig {
    pub bot_token: SecretString,
    pub announce_channel_id: String,
    pub command_prefix: String,
    pub prompt_timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct PollerConfig {
    pub interval_secs: u64,
    pub max_tracked_ids: usize,
}

#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl StorageConfig {
    pub fn announced_ids_path(&self) -> PathBuf {
        self.data_dir.join("tracked_news_ids.txt")
    }

    pub fn registry_path(&self) -> PathBuf {
        self.data_dir.join("tracked_app_ids.json")
    }
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub steam_api_key: Option<String>,
    pub discord_bot_token: Option<String>,
    pub announce_channel_id: Option<String>,
    pub poll_interval_secs: Option<u64>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            steam: SteamConfig {
                api_key: String::new().into(),
                base_url: "https://api.steampowered.com".to_string(),
                page_size: 5,
                request_timeout_secs: 10,
            },
            discord: DiscordConfig {
                bot_token: String::new().into(),
                announce_channel_id: String::new(),
                command_prefix: "!".to_string(),
                prompt_timeout_secs: 30,
            },
            poller: PollerConfig { interval_secs: 3600, max_tracked_ids: 100 },
            storage: StorageConfig { data_dir: PathBuf::from("data") },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("herald.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(steam) = patch.steam {
            if let Some(steam_api_key_value) = steam.api_key {
                self.steam.api_key = secret_value(steam_api_key_value);
            }
            if let Some(base_url) = steam.base_url {
                self.steam.base_url = base_url;
            }
            if let Some(page_size) = steam.page_size {
                self.steam.page_size = page_size;
            }
            if let Some(request_timeout_secs) = steam.request_timeout_secs {
                self.steam.request_timeout_secs = request_timeout_secs;
            }
        }

        if let Some(discord) = patch.discord {
            if let Some(bot_token_value) = discord.bot_token {
                self.discord.bot_token = secret_value(bot_token_value);
            }
            if let Some(announce_channel_id) = discord.announce_channel_id {
                self.discord.announce_channel_id = announce_channel_id;
            }
            if let Some(command_prefix) = discord.command_prefix {
                self.discord.command_prefix = command_prefix;
            }
            if let Some(prompt_timeout_secs) = discord.prompt_timeout_secs {
                self.discord.prompt_timeout_secs = prompt_timeout_secs;
            }
        }

        if let Some(poller) = patch.poller {
            if let Some(interval_secs) = poller.interval_secs {
                self.poller.interval_secs = interval_secs;
            }
            if let Some(max_tracked_ids) = poller.max_tracked_ids {
                self.poller.max_tracked_ids = max_tracked_ids;
            }
        }

        if let Some(storage) = patch.storage {
            if let Some(data_dir) = storage.data_dir {
                self.storage.data_dir = data_dir;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("HERALD_STEAM_API_KEY") {
            self.steam.api_key = secret_value(value);
        }
        if let Some(value) = read_env("HERALD_STEAM_BASE_URL") {
            self.steam.base_url = value;
        }
        if let Some(value) = read_env("HERALD_STEAM_PAGE_SIZE") {
            self.steam.page_size = parse_u8("HERALD_STEAM_PAGE_SIZE", &value)?;
        }
        if let Some(value) = read_env("HERALD_STEAM_REQUEST_TIMEOUT_SECS") {
            self.steam.request_timeout_secs =
                parse_u64("HERALD_STEAM_REQUEST_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("HERALD_DISCORD_BOT_TOKEN") {
            self.discord.bot_token = secret_value(value);
        }
        if let Some(value) = read_env("HERALD_DISCORD_ANNOUNCE_CHANNEL_ID") {
            self.discord.announce_channel_id = value;
        }
        if let Some(value) = read_env("HERALD_DISCORD_COMMAND_PREFIX") {
            self.discord.command_prefix = value;
        }
        if let Some(value) = read_env("HERALD_DISCORD_PROMPT_TIMEOUT_SECS") {
            self.discord.prompt_timeout_secs =
                parse_u64("HERALD_DISCORD_PROMPT_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("HERALD_POLL_INTERVAL_SECS") {
            self.poller.interval_secs = parse_u64("HERALD_POLL_INTERVAL_SECS", &value)?;
        }
        if let Some(value) = read_env("HERALD_MAX_TRACKED_IDS") {
            self.poller.max_tracked_ids =
                parse_u64("HERALD_MAX_TRACKED_IDS", &value)? as usize;
        }

        if let Some(value) = read_env("HERALD_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(value);
        }

        let log_level = read_env("HERALD_LOGGING_LEVEL").or_else(|| read_env("HERALD_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("HERALD_LOGGING_FORMAT").or_else(|| read_env("HERALD_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(data_dir) = overrides.data_dir {
            self.storage.data_dir = data_dir;
        }
        if let Some(steam_api_key) = overrides.steam_api_key {
            self.steam.api_key = secret_value(steam_api_key);
        }
        if let Some(discord_bot_token) = overrides.discord_bot_token {
            self.discord.bot_token = secret_value(discord_bot_token);
        }
        if let Some(announce_channel_id) = overrides.announce_channel_id {
            self.discord.announce_channel_id = announce_channel_id;
        }
        if let Some(poll_interval_secs) = overrides.poll_interval_secs {
            self.poller.interval_secs = poll_interval_secs;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_steam(&self.steam)?;
        validate_discord(&self.discord)?;
        validate_poller(&self.poller)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("herald.toml"), PathBuf::from("config/herald.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_steam(steam: &SteamConfig) -> Result<(), ConfigError> {
    if steam.api_key.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "steam.api_key is required. Get one from https://steamcommunity.com/dev/apikey"
                .to_string(),
        ));
    }

    let base_url = steam.base_url.trim();
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "steam.base_url must start with http:// or https://".to_string(),
        ));
    }

    if steam.page_size == 0 || steam.page_size > 25 {
        return Err(ConfigError::Validation(
            "steam.page_size must be in range 1..=25".to_string(),
        ));
    }

    if steam.request_timeout_secs == 0 || steam.request_timeout_secs > 120 {
        return Err(ConfigError::Validation(
            "steam.request_timeout_secs must be in range 1..=120".to_string(),
        ));
    }

    Ok(())
}

fn validate_discord(discord: &DiscordConfig) -> Result<(), ConfigError> {
    if discord.bot_token.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "discord.bot_token is required. Get it from https://discord.com/developers/applications > Your App > Bot".to_string(),
        ));
    }

    if discord.announce_channel_id.trim().is_empty() {
        return Err(ConfigError::Validation(
            "discord.announce_channel_id is required (the channel where news updates are posted)"
                .to_string(),
        ));
    }

    if discord.command_prefix.trim().is_empty() {
        return Err(ConfigError::Validation(
            "discord.command_prefix must not be empty".to_string(),
        ));
    }

    if discord.prompt_timeout_secs == 0 || discord.prompt_timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "discord.prompt_timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_poller(poller: &PollerConfig) -> Result<(), ConfigError> {
    if poller.interval_secs < 60 {
        return Err(ConfigError::Validation(
            "poller.interval_secs must be at least 60".to_string(),
        ));
    }

    if poller.max_tracked_ids == 0 {
        return Err(ConfigError::Validation(
            "poller.max_tracked_ids must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u8(key: &str, value: &str) -> Result<u8, ConfigError> {
    value.parse::<u8>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    steam: Option<SteamPatch>,
    discord: Option<DiscordPatch>,
    poller: Option<PollerPatch>,
    storage: Option<StoragePatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct SteamPatch {
    api_key: Option<String>,
    base_url: Option<String>,
    page_size: Option<u8>,
    request_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct DiscordPatch {
    bot_token: Option<String>,
    announce_channel_id: Option<String>,
    command_prefix: Option<String>,
    prompt_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct PollerPatch {
    interval_secs: Option<u64>,
    max_tracked_ids: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct StoragePatch {
    data_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    fn set_required_vars() {
        env::set_var("HERALD_STEAM_API_KEY", "test-key");
        env::set_var("HERALD_DISCORD_BOT_TOKEN", "test-token");
        env::set_var("HERALD_DISCORD_ANNOUNCE_CHANNEL_ID", "1234");
    }

    const REQUIRED_VARS: &[&str] = &[
        "HERALD_STEAM_API_KEY",
        "HERALD_DISCORD_BOT_TOKEN",
        "HERALD_DISCORD_ANNOUNCE_CHANNEL_ID",
    ];

    #[test]
    fn defaults_apply_when_no_file_or_env_present() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        set_required_vars();

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.poller.interval_secs == 3600, "default poll interval should be 1 hour")?;
            ensure(config.poller.max_tracked_ids == 100, "default id cap should be 100")?;
            ensure(config.steam.page_size == 5, "default page size should be 5")?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default log format should be compact",
            )?;
            Ok(())
        })();

        clear_vars(REQUIRED_VARS);
        result
    }

    #[test]
    fn missing_steam_api_key_fails_fast() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(REQUIRED_VARS);
        env::set_var("HERALD_DISCORD_BOT_TOKEN", "test-token");
        env::set_var("HERALD_DISCORD_ANNOUNCE_CHANNEL_ID", "1234");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };

            ensure(
                matches!(error, ConfigError::Validation(ref message) if message.contains("steam.api_key")),
                "missing api key should produce an actionable validation error",
            )
        })();

        clear_vars(REQUIRED_VARS);
        result
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_STEAM_KEY", "key-from-env");
        set_required_vars();

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("herald.toml");
            fs::write(
                &path,
                r#"
[steam]
api_key = "${TEST_STEAM_KEY}"
"#,
            )
            .map_err(|err| err.to_string())?;

            // env override for the api key must not shadow this test
            env::remove_var("HERALD_STEAM_API_KEY");

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.steam.api_key.expose_secret() == "key-from-env",
                "api key should be interpolated from the environment",
            )
        })();

        clear_vars(&["TEST_STEAM_KEY"]);
        clear_vars(REQUIRED_VARS);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        set_required_vars();
        env::set_var("HERALD_POLL_INTERVAL_SECS", "900");
        env::set_var("HERALD_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("herald.toml");
            fs::write(
                &path,
                r#"
[poller]
interval_secs = 600

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.poller.interval_secs == 900, "env poll interval should win over file")?;
            ensure(config.logging.level == "debug", "override log level should win over file")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty log format should be set from env alias",
            )?;
            Ok(())
        })();

        clear_vars(REQUIRED_VARS);
        clear_vars(&["HERALD_POLL_INTERVAL_SECS", "HERALD_LOG_FORMAT"]);
        result
    }

    #[test]
    fn storage_paths_derive_from_data_dir() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        set_required_vars();
        env::set_var("HERALD_DATA_DIR", "/var/lib/herald");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.storage.announced_ids_path().ends_with("tracked_news_ids.txt"),
                "announced ids path should live under the data dir",
            )?;
            ensure(
                config.storage.registry_path().ends_with("tracked_app_ids.json"),
                "registry path should live under the data dir",
            )?;
            Ok(())
        })();

        clear_vars(REQUIRED_VARS);
        clear_vars(&["HERALD_DATA_DIR"]);
        result
    }
}
