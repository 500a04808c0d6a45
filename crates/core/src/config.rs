use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub messenger: MessengerConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct MessengerConfig {
    pub page_access_token: SecretString,
    pub verify_token: SecretString,
    pub app_secret: Option<SecretString>,
    pub api_base_url: String,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub public_base_url: String,
    /// Directory holding the webview form page and other static assets.
    /// `None` lets the server fall back to its bundled asset directory.
    pub assets_dir: Option<PathBuf>,
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
    pub page_access_token: Option<String>,
    pub verify_token: Option<String>,
    pub app_secret: Option<String>,
    pub api_base_url: Option<String>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub public_base_url: Option<String>,
    pub assets_dir: Option<PathBuf>,
    pub log_level: Option<String>,
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
            messenger: MessengerConfig {
                page_access_token: String::new().into(),
                verify_token: String::new().into(),
                app_secret: None,
                api_base_url: "https://graph.facebook.com/v2.6".to_string(),
            },
            server: ServerConfig {
                bind_address: "0.0.0.0".to_string(),
                port: 5000,
                public_base_url: "http://localhost:5000".to_string(),
                assets_dir: None,
            },
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
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("innkeeper.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(messenger) = patch.messenger {
            if let Some(page_access_token_value) = messenger.page_access_token {
                self.messenger.page_access_token = secret_value(page_access_token_value);
            }
            if let Some(verify_token_value) = messenger.verify_token {
                self.messenger.verify_token = secret_value(verify_token_value);
            }
            if let Some(app_secret_value) = messenger.app_secret {
                self.messenger.app_secret = Some(secret_value(app_secret_value));
            }
            if let Some(api_base_url) = messenger.api_base_url {
                self.messenger.api_base_url = api_base_url;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(public_base_url) = server.public_base_url {
                self.server.public_base_url = public_base_url;
            }
            if let Some(assets_dir) = server.assets_dir {
                self.server.assets_dir = Some(assets_dir);
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
        if let Some(value) = read_env("INNKEEPER_PAGE_ACCESS_TOKEN") {
            self.messenger.page_access_token = secret_value(value);
        }
        if let Some(value) = read_env("INNKEEPER_VERIFY_TOKEN") {
            self.messenger.verify_token = secret_value(value);
        }
        if let Some(value) = read_env("INNKEEPER_APP_SECRET") {
            self.messenger.app_secret = Some(secret_value(value));
        }
        if let Some(value) = read_env("INNKEEPER_API_BASE_URL") {
            self.messenger.api_base_url = value;
        }

        if let Some(value) = read_env("INNKEEPER_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        // PORT is the alias the hosting platform conventionally injects.
        let port = read_env("INNKEEPER_SERVER_PORT").or_else(|| read_env("PORT"));
        if let Some(value) = port {
            self.server.port = parse_u16("INNKEEPER_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("INNKEEPER_SERVER_PUBLIC_BASE_URL") {
            self.server.public_base_url = value;
        }
        if let Some(value) = read_env("INNKEEPER_SERVER_ASSETS_DIR") {
            self.server.assets_dir = Some(PathBuf::from(value));
        }

        let log_level =
            read_env("INNKEEPER_LOGGING_LEVEL").or_else(|| read_env("INNKEEPER_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("INNKEEPER_LOGGING_FORMAT").or_else(|| read_env("INNKEEPER_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(page_access_token) = overrides.page_access_token {
            self.messenger.page_access_token = secret_value(page_access_token);
        }
        if let Some(verify_token) = overrides.verify_token {
            self.messenger.verify_token = secret_value(verify_token);
        }
        if let Some(app_secret) = overrides.app_secret {
            self.messenger.app_secret = Some(secret_value(app_secret));
        }
        if let Some(api_base_url) = overrides.api_base_url {
            self.messenger.api_base_url = api_base_url;
        }
        if let Some(bind_address) = overrides.bind_address {
            self.server.bind_address = bind_address;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(public_base_url) = overrides.public_base_url {
            self.server.public_base_url = public_base_url;
        }
        if let Some(assets_dir) = overrides.assets_dir {
            self.server.assets_dir = Some(assets_dir);
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_messenger(&self.messenger)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("innkeeper.toml"), PathBuf::from("config/innkeeper.toml")]
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

fn validate_messenger(messenger: &MessengerConfig) -> Result<(), ConfigError> {
    if messenger.page_access_token.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "messenger.page_access_token is required. Generate one in your app settings under \
             Messenger > Access Tokens"
                .to_string(),
        ));
    }

    if messenger.verify_token.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "messenger.verify_token is required. It must match the verify token entered in the \
             webhook subscription settings"
                .to_string(),
        ));
    }

    if !is_http_url(&messenger.api_base_url) {
        return Err(ConfigError::Validation(
            "messenger.api_base_url must start with http:// or https://".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if !is_http_url(&server.public_base_url) {
        return Err(ConfigError::Validation(
            "server.public_base_url must start with http:// or https:// (it is embedded in \
             webview button links)"
                .to_string(),
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

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    messenger: Option<MessengerPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct MessengerPatch {
    page_access_token: Option<String>,
    verify_token: Option<String>,
    app_secret: Option<String>,
    api_base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    public_base_url: Option<String>,
    assets_dir: Option<PathBuf>,
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

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_PAGE_ACCESS_TOKEN", "page-token-from-env");
        env::set_var("TEST_VERIFY_TOKEN", "verify-token-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("innkeeper.toml");
            fs::write(
                &path,
                r#"
[messenger]
page_access_token = "${TEST_PAGE_ACCESS_TOKEN}"
verify_token = "${TEST_VERIFY_TOKEN}"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.messenger.page_access_token.expose_secret() == "page-token-from-env",
                "page access token should be loaded from environment",
            )?;
            ensure(
                config.messenger.verify_token.expose_secret() == "verify-token-from-env",
                "verify token should be loaded from environment",
            )?;
            Ok(())
        })();

        clear_vars(&["TEST_PAGE_ACCESS_TOKEN", "TEST_VERIFY_TOKEN"]);
        result
    }

    #[test]
    fn port_alias_is_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("INNKEEPER_PAGE_ACCESS_TOKEN", "page-token");
        env::set_var("INNKEEPER_VERIFY_TOKEN", "verify-token");
        env::set_var("PORT", "8123");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.server.port == 8123, "PORT alias should set the server port")
        })();

        clear_vars(&["INNKEEPER_PAGE_ACCESS_TOKEN", "INNKEEPER_VERIFY_TOKEN", "PORT"]);
        result
    }

    #[test]
    fn assets_dir_env_override_is_applied() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("INNKEEPER_PAGE_ACCESS_TOKEN", "page-token");
        env::set_var("INNKEEPER_VERIFY_TOKEN", "verify-token");
        env::set_var("INNKEEPER_SERVER_ASSETS_DIR", "/srv/innkeeper/assets");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.server.assets_dir
                    == Some(std::path::PathBuf::from("/srv/innkeeper/assets")),
                "assets dir env override should be applied",
            )
        })();

        clear_vars(&[
            "INNKEEPER_PAGE_ACCESS_TOKEN",
            "INNKEEPER_VERIFY_TOKEN",
            "INNKEEPER_SERVER_ASSETS_DIR",
        ]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("INNKEEPER_PAGE_ACCESS_TOKEN", "page-token-from-env");
        env::set_var("INNKEEPER_VERIFY_TOKEN", "verify-token-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("innkeeper.toml");
            fs::write(
                &path,
                r#"
[messenger]
page_access_token = "page-token-from-file"
verify_token = "verify-token-from-file"

[server]
public_base_url = "https://bot.example.com"

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

            ensure(
                config.server.public_base_url == "https://bot.example.com",
                "file public base url should win over defaults",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(
                config.messenger.page_access_token.expose_secret() == "page-token-from-env",
                "env page access token should win over file and defaults",
            )?;
            ensure(
                config.messenger.verify_token.expose_secret() == "verify-token-from-env",
                "env verify token should win over file and defaults",
            )?;
            Ok(())
        })();

        clear_vars(&["INNKEEPER_PAGE_ACCESS_TOKEN", "INNKEEPER_VERIFY_TOKEN"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("INNKEEPER_VERIFY_TOKEN", "verify-token");
        clear_vars(&["INNKEEPER_PAGE_ACCESS_TOKEN"]);

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("page_access_token")
            );
            ensure(has_message, "validation failure should mention page_access_token")
        })();

        clear_vars(&["INNKEEPER_VERIFY_TOKEN"]);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("INNKEEPER_PAGE_ACCESS_TOKEN", "page-secret-value");
        env::set_var("INNKEEPER_VERIFY_TOKEN", "verify-secret-value");
        env::set_var("INNKEEPER_APP_SECRET", "app-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(
                !debug.contains("page-secret-value"),
                "debug output should not contain the page access token",
            )?;
            ensure(
                !debug.contains("verify-secret-value"),
                "debug output should not contain the verify token",
            )?;
            ensure(
                !debug.contains("app-secret-value"),
                "debug output should not contain the app secret",
            )?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )?;
            Ok(())
        })();

        clear_vars(&[
            "INNKEEPER_PAGE_ACCESS_TOKEN",
            "INNKEEPER_VERIFY_TOKEN",
            "INNKEEPER_APP_SECRET",
        ]);
        result
    }

    #[test]
    fn invalid_port_override_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("INNKEEPER_PAGE_ACCESS_TOKEN", "page-token");
        env::set_var("INNKEEPER_VERIFY_TOKEN", "verify-token");
        env::set_var("INNKEEPER_SERVER_PORT", "not-a-port");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => return Err("expected port parse failure".to_string()),
                Err(error) => error,
            };
            ensure(
                matches!(error, ConfigError::InvalidEnvOverride { ref key, .. }
                    if key == "INNKEEPER_SERVER_PORT"),
                "port parse failure should name the offending variable",
            )
        })();

        clear_vars(&[
            "INNKEEPER_PAGE_ACCESS_TOKEN",
            "INNKEEPER_VERIFY_TOKEN",
            "INNKEEPER_SERVER_PORT",
        ]);
        result
    }
}
