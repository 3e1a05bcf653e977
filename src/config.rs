// src/config.rs

use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use dotenvy::dotenv;

/// Allowed per-question time limit, in seconds.
pub const MIN_TIME_LIMIT_SECS: i32 = 5;
pub const MAX_TIME_LIMIT_SECS: i32 = 300;
pub const DEFAULT_TIME_LIMIT_SECS: i32 = 30;

/// Every question is multiple choice with exactly this many options.
pub const OPTIONS_PER_QUESTION: usize = 4;

pub const MAX_QUESTIONS_PER_QUIZ: u64 = 100;
pub const DEFAULT_QUESTION_POINTS: i32 = 1;

pub const JOIN_CODE_LENGTH: usize = 6;
pub const JOIN_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const JOIN_CODE_ATTEMPTS: usize = 5;

pub const MAX_NICKNAME_LENGTH: usize = 32;

/// Late answers within this window still count.
pub const ANSWER_GRACE_SECS: i64 = 2;

/// Clients poll live views on this interval.
pub const POLL_INTERVAL_MS: u64 = 2000;

pub const QUIZ_LEADERBOARD_LIMIT: i64 = 10;
pub const GLOBAL_LEADERBOARD_LIMIT: i64 = 100;

/// Which `QuizStore` implementation backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(StoreBackend::Postgres),
            "memory" | "mem" => Ok(StoreBackend::Memory),
            other => Err(ConfigError::Invalid("STORE_BACKEND", other.to_string())),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str, String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{} must be set", key),
            ConfigError::Invalid(key, value) => write!(f, "{} has invalid value '{}'", key, value),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct Config {
    pub store_backend: StoreBackend,
    /// Empty when running on the memory store.
    pub database_url: String,
    pub jwt_secret: String,
    pub rust_log: String,
    pub bind_addr: SocketAddr,
    pub admin_user_id: Option<String>,
    pub cors_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let store_backend = match env::var("STORE_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) => StoreBackend::Postgres,
        };

        let database_url = match (store_backend, env::var("DATABASE_URL")) {
            (_, Ok(url)) => url,
            (StoreBackend::Memory, Err(_)) => String::new(),
            (StoreBackend::Postgres, Err(_)) => return Err(ConfigError::Missing("DATABASE_URL")),
        };

        let jwt_secret = env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?;

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_addr = bind_addr
            .parse()
            .map_err(|_| ConfigError::Invalid("BIND_ADDR", bind_addr.clone()))?;

        let admin_user_id = env::var("ADMIN_USER_ID")
            .ok()
            .filter(|id| !id.trim().is_empty());

        let cors_origins = env::var("CORS_ORIGINS")
            .map(|raw| parse_origins(&raw))
            .unwrap_or_else(|_| default_origins());

        Ok(Self {
            store_backend,
            database_url,
            jwt_secret,
            rust_log,
            bind_addr,
            admin_user_id,
            cors_origins,
        })
    }

    /// Minimal configuration for an in-memory instance (tests, local demos).
    pub fn in_memory(jwt_secret: &str) -> Self {
        Self {
            store_backend: StoreBackend::Memory,
            database_url: String::new(),
            jwt_secret: jwt_secret.to_string(),
            rust_log: "error".to_string(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            admin_user_id: None,
            cors_origins: default_origins(),
        }
    }
}

fn default_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://127.0.0.1:3000".to_string(),
    ]
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}
