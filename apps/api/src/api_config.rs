use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use orgaccess_application::{
    DEFAULT_CONTEXT_CACHE_TTL_SECONDS, DEFAULT_MAX_ROLE_HIERARCHY_DEPTH,
    DEFAULT_PERMISSION_CACHE_TTL_SECONDS,
};
use orgaccess_core::AppError;
use tracing_subscriber::EnvFilter;

/// Backend holding cached permission decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionCacheStore {
    Postgres,
    Memory,
}

impl PermissionCacheStore {
    fn parse(value: &str) -> Result<Self, AppError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postgres" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(AppError::Validation(format!(
                "PERMISSION_CACHE_STORE must be either 'postgres' or 'memory', got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub migrate_only: bool,
    pub database_url: String,
    pub database_max_connections: u32,
    pub database_acquire_timeout_seconds: u64,
    pub frontend_url: String,
    pub api_host: String,
    pub api_port: u16,
    pub cookie_secure: bool,
    pub session_idle_timeout_minutes: u32,
    pub redis_url: Option<String>,
    pub permission_cache_store: PermissionCacheStore,
    pub permission_cache_ttl_seconds: u32,
    pub context_cache_ttl_seconds: u32,
    pub role_hierarchy_max_depth: usize,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        let migrate_only = env::args().nth(1).as_deref() == Some("migrate");

        let database_url = required_env("DATABASE_URL")?;
        let database_max_connections = parse_env_or(
            "DATABASE_MAX_CONNECTIONS",
            optional_env("DATABASE_MAX_CONNECTIONS"),
            10_u32,
        )?;
        let database_acquire_timeout_seconds = parse_env_or(
            "DATABASE_ACQUIRE_TIMEOUT_SECONDS",
            optional_env("DATABASE_ACQUIRE_TIMEOUT_SECONDS"),
            5_u64,
        )?;
        let frontend_url =
            env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_owned());
        let api_host = env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
        let api_port = parse_env_or("API_PORT", optional_env("API_PORT"), 3001_u16)?;
        let cookie_secure = env::var("SESSION_COOKIE_SECURE")
            .unwrap_or_else(|_| "false".to_owned())
            .eq_ignore_ascii_case("true");
        let session_idle_timeout_minutes = parse_env_or(
            "SESSION_IDLE_TIMEOUT_MINUTES",
            optional_env("SESSION_IDLE_TIMEOUT_MINUTES"),
            30_u32,
        )?;

        let redis_url = optional_env("REDIS_URL");
        let permission_cache_store = optional_env("PERMISSION_CACHE_STORE")
            .map(|value| PermissionCacheStore::parse(value.as_str()))
            .transpose()?
            .unwrap_or(PermissionCacheStore::Postgres);
        let permission_cache_ttl_seconds = parse_env_or(
            "PERMISSION_CACHE_TTL_SECONDS",
            optional_env("PERMISSION_CACHE_TTL_SECONDS"),
            DEFAULT_PERMISSION_CACHE_TTL_SECONDS,
        )?;
        let context_cache_ttl_seconds = parse_env_or(
            "CONTEXT_CACHE_TTL_SECONDS",
            optional_env("CONTEXT_CACHE_TTL_SECONDS"),
            DEFAULT_CONTEXT_CACHE_TTL_SECONDS,
        )?;
        let role_hierarchy_max_depth = parse_env_or(
            "ROLE_HIERARCHY_MAX_DEPTH",
            optional_env("ROLE_HIERARCHY_MAX_DEPTH"),
            DEFAULT_MAX_ROLE_HIERARCHY_DEPTH,
        )?;
        if role_hierarchy_max_depth == 0 {
            return Err(AppError::Validation(
                "ROLE_HIERARCHY_MAX_DEPTH must be at least 1".to_owned(),
            ));
        }

        Ok(Self {
            migrate_only,
            database_url,
            database_max_connections,
            database_acquire_timeout_seconds,
            frontend_url,
            api_host,
            api_port,
            cookie_secure,
            session_idle_timeout_minutes,
            redis_url,
            permission_cache_store,
            permission_cache_ttl_seconds,
            context_cache_ttl_seconds,
            role_hierarchy_max_depth,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Internal(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> Result<String, AppError> {
    let value =
        env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))?;
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{name} must not be empty")));
    }

    Ok(value)
}

fn optional_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env_or<T>(name: &str, value: Option<String>, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|error| AppError::Validation(format!("invalid {name} '{value}': {error}"))),
        None => Ok(default),
    }
}
