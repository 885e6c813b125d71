use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
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

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub marketplace: MarketplaceConfig,
    pub assistant: AssistantConfig,
    pub public_url: String,
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
        let public_url =
            env::var("APP_PUBLIC_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

        let defaults = MarketplaceConfig::default();
        let marketplace = MarketplaceConfig {
            search_radius_km: read_number("MARKETPLACE_SEARCH_RADIUS_KM")?
                .unwrap_or(defaults.search_radius_km),
            shortlist_size: read_number("MARKETPLACE_SHORTLIST_SIZE")?
                .unwrap_or(defaults.shortlist_size),
            review_wait_days: read_number("MARKETPLACE_REVIEW_WAIT_DAYS")?
                .unwrap_or(defaults.review_wait_days),
        };

        let assistant = AssistantConfig {
            endpoint: env::var("ASSISTANT_ENDPOINT")
                .ok()
                .filter(|value| !value.trim().is_empty()),
            api_key: env::var("ASSISTANT_API_KEY")
                .ok()
                .filter(|value| !value.trim().is_empty()),
            max_attempts: read_number("ASSISTANT_MAX_ATTEMPTS")?.unwrap_or(2),
            initial_backoff: Duration::from_millis(
                read_number("ASSISTANT_INITIAL_BACKOFF_MS")?.unwrap_or(1000),
            ),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            marketplace,
            assistant,
            public_url,
        })
    }
}

fn read_number<T: FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber { key }),
        _ => Ok(None),
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

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Ranking and review dials for the marketplace core.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketplaceConfig {
    pub search_radius_km: f64,
    pub shortlist_size: usize,
    pub review_wait_days: i64,
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            search_radius_km: 100.0,
            shortlist_size: 6,
            review_wait_days: 7,
        }
    }
}

/// Generative-AI collaborator settings. A missing endpoint disables the concierge.
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key } => write!(f, "{key} must be a valid number"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidNumber { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
