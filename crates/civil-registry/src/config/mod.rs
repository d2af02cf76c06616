use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the registry service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub sms: SmsConfig,
    pub storage: StorageConfig,
    pub registry: RegistryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_var("APP_PORT", 3000u16)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let format = match environment {
            AppEnvironment::Production => LogFormat::Json,
            _ => LogFormat::Compact,
        };

        let sms = SmsConfig {
            account_sid: non_empty_var("SMS_ACCOUNT_SID"),
            auth_token: non_empty_var("SMS_AUTH_TOKEN"),
            from_number: non_empty_var("SMS_FROM_NUMBER"),
            api_base: env::var("SMS_API_BASE")
                .unwrap_or_else(|_| SmsConfig::DEFAULT_API_BASE.to_string()),
            timeout: Duration::from_secs(parse_var("SMS_TIMEOUT_SECS", 10u64)?),
            default_country_code: env::var("SMS_DEFAULT_COUNTRY_CODE")
                .unwrap_or_else(|_| "263".to_string()),
        };
        if sms.default_country_code.is_empty()
            || !sms.default_country_code.chars().all(|c| c.is_ascii_digit())
        {
            return Err(ConfigError::InvalidCountryCode(sms.default_country_code));
        }

        let storage = StorageConfig {
            media_root: PathBuf::from(
                env::var("REGISTRY_MEDIA_ROOT").unwrap_or_else(|_| "media".to_string()),
            ),
            media_url: env::var("REGISTRY_MEDIA_URL").unwrap_or_else(|_| "/media".to_string()),
        };

        let reference_attempts = parse_var("REGISTRY_REFERENCE_ATTEMPTS", 5u32)?;
        if reference_attempts == 0 {
            return Err(ConfigError::InvalidNumber {
                key: "REGISTRY_REFERENCE_ATTEMPTS",
            });
        }

        let registry = RegistryConfig {
            reference_attempts,
            max_upload_bytes: parse_var(
                "REGISTRY_MAX_UPLOAD_BYTES",
                RegistryConfig::DEFAULT_MAX_UPLOAD_BYTES,
            )?,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level, format },
            sms,
            storage,
            registry,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_var<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { key }),
        Err(_) => Ok(default),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub format: LogFormat,
}

/// Credentials and delivery settings for the outbound SMS gateway.
///
/// The gateway is considered configured only when the account SID, auth token
/// and sender number are all present.
#[derive(Debug, Clone)]
pub struct SmsConfig {
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
    pub from_number: Option<String>,
    pub api_base: String,
    pub timeout: Duration,
    pub default_country_code: String,
}

impl SmsConfig {
    pub const DEFAULT_API_BASE: &'static str = "https://api.twilio.com";

    pub fn is_configured(&self) -> bool {
        self.account_sid.is_some() && self.auth_token.is_some() && self.from_number.is_some()
    }
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            account_sid: None,
            auth_token: None,
            from_number: None,
            api_base: Self::DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(10),
            default_country_code: "263".to_string(),
        }
    }
}

/// Where QR codes and attachments are written and how they are addressed publicly.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub media_root: PathBuf,
    pub media_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryConfig {
    pub reference_attempts: u32,
    pub max_upload_bytes: u64,
}

impl RegistryConfig {
    pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            reference_attempts: 5,
            max_upload_bytes: Self::DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str },
    InvalidCountryCode(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key } => {
                write!(f, "{key} must be a positive number in range")
            }
            ConfigError::InvalidCountryCode(value) => {
                write!(f, "SMS_DEFAULT_COUNTRY_CODE must be digits only, got '{value}'")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidNumber { .. } | ConfigError::InvalidCountryCode(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "SMS_ACCOUNT_SID",
            "SMS_AUTH_TOKEN",
            "SMS_FROM_NUMBER",
            "SMS_API_BASE",
            "SMS_TIMEOUT_SECS",
            "SMS_DEFAULT_COUNTRY_CODE",
            "REGISTRY_MEDIA_ROOT",
            "REGISTRY_MEDIA_URL",
            "REGISTRY_REFERENCE_ATTEMPTS",
            "REGISTRY_MAX_UPLOAD_BYTES",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.format, LogFormat::Compact);
        assert!(!config.sms.is_configured());
        assert_eq!(config.sms.default_country_code, "263");
        assert_eq!(config.sms.timeout, Duration::from_secs(10));
        assert_eq!(config.registry, RegistryConfig::default());
    }

    #[test]
    fn sms_is_configured_only_with_full_credentials() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("SMS_ACCOUNT_SID", "AC123");
        env::set_var("SMS_AUTH_TOKEN", "secret");
        let partial = AppConfig::load().expect("config loads");
        assert!(!partial.sms.is_configured());

        env::set_var("SMS_FROM_NUMBER", "+15005550006");
        let full = AppConfig::load().expect("config loads");
        assert!(full.sms.is_configured());
        reset_env();
    }

    #[test]
    fn rejects_zero_reference_attempts_and_bad_country_code() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("REGISTRY_REFERENCE_ATTEMPTS", "0");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidNumber {
                key: "REGISTRY_REFERENCE_ATTEMPTS"
            })
        ));

        reset_env();
        env::set_var("SMS_DEFAULT_COUNTRY_CODE", "+263");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidCountryCode(_))
        ));
        reset_env();
    }

    #[test]
    fn production_switches_to_json_logs() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_ENV", "production");
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.telemetry.format, LogFormat::Json);
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }
}
