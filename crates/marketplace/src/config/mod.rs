use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use rust_decimal::Decimal;

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

/// Top-level configuration for the marketplace service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub payments: PaymentConfig,
    pub notifications: NotificationConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let defaults = PaymentConfig::default();
        let payments = PaymentConfig {
            callback_url: env::var("PAYMENT_CALLBACK_URL").unwrap_or(defaults.callback_url),
            platform_share_percent: parse_var(
                "PAYMENT_PLATFORM_SHARE_PERCENT",
                defaults.platform_share_percent,
            )?,
            pending_ttl_hours: parse_var("PAYMENT_PENDING_TTL_HOURS", defaults.pending_ttl_hours)?,
            document_verification_fee: parse_var(
                "DOCUMENT_VERIFICATION_FEE",
                defaults.document_verification_fee,
            )?,
        };
        if payments.platform_share_percent > Decimal::ONE_HUNDRED
            || payments.platform_share_percent.is_sign_negative()
        {
            return Err(ConfigError::InvalidValue {
                key: "PAYMENT_PLATFORM_SHARE_PERCENT",
                value: payments.platform_share_percent.to_string(),
            });
        }

        let defaults = NotificationConfig::default();
        let notifications = NotificationConfig {
            sender: env::var("NOTIFY_SENDER").unwrap_or(defaults.sender),
            admin_email: env::var("NOTIFY_ADMIN_EMAIL").unwrap_or(defaults.admin_email),
            client_base_url: env::var("CLIENT_BASE_URL").unwrap_or(defaults.client_base_url),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                ansi: environment == AppEnvironment::Development,
            },
            payments,
            notifications,
        })
    }
}

fn parse_var<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub ansi: bool,
}

/// Payment provider settings shared by every checkout flow.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentConfig {
    /// Where the provider redirects the payer after checkout.
    pub callback_url: String,
    /// Platform cut of split payments routed through a deal site.
    pub platform_share_percent: Decimal,
    /// Pending transactions older than this are purged by the daily sweep.
    pub pending_ttl_hours: i64,
    pub document_verification_fee: Decimal,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            callback_url: "http://127.0.0.1:3000/payments/callback".to_string(),
            platform_share_percent: Decimal::from(10),
            pending_ttl_hours: 48,
            document_verification_fee: Decimal::from(20_000),
        }
    }
}

/// Addresses used by outbound email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationConfig {
    pub sender: String,
    pub admin_email: String,
    pub client_base_url: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            sender: "no-reply@marketplace.local".to_string(),
            admin_email: "admin@marketplace.local".to_string(),
            client_base_url: "http://127.0.0.1:3001".to_string(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidValue { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidValue { key, value } => {
                write!(f, "{key} has an invalid value '{value}'")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidValue { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
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
            "PAYMENT_CALLBACK_URL",
            "PAYMENT_PLATFORM_SHARE_PERCENT",
            "PAYMENT_PENDING_TTL_HOURS",
            "DOCUMENT_VERIFICATION_FEE",
            "NOTIFY_SENDER",
            "NOTIFY_ADMIN_EMAIL",
            "CLIENT_BASE_URL",
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
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert!(config.telemetry.ansi);
        assert_eq!(config.payments, PaymentConfig::default());
        assert_eq!(config.notifications, NotificationConfig::default());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
    }

    #[test]
    fn reads_payment_overrides() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_ENV", "production");
        env::set_var("PAYMENT_PLATFORM_SHARE_PERCENT", "12.5");
        env::set_var("PAYMENT_PENDING_TTL_HOURS", "6");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.environment, AppEnvironment::Production);
        assert!(!config.telemetry.ansi);
        assert_eq!(config.payments.platform_share_percent, Decimal::new(125, 1));
        assert_eq!(config.payments.pending_ttl_hours, 6);
        reset_env();
    }

    #[test]
    fn rejects_out_of_range_platform_share() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("PAYMENT_PLATFORM_SHARE_PERCENT", "140");
        let err = AppConfig::load().expect_err("share above 100 is invalid");
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "PAYMENT_PLATFORM_SHARE_PERCENT",
                ..
            }
        ));
        reset_env();
    }

    #[test]
    fn rejects_unparseable_numbers() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("PAYMENT_PENDING_TTL_HOURS", "two days");
        let err = AppConfig::load().expect_err("ttl must be numeric");
        assert_eq!(
            err.to_string(),
            "PAYMENT_PENDING_TTL_HOURS has an invalid value 'two days'"
        );
        reset_env();
    }
}
