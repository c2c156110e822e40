use std::{fmt::Display, str::FromStr};

use anyhow::{bail, Context};
use jsonwebtoken::Algorithm;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub algorithm: Algorithm,
    pub ttl_minutes: i64,
}

/// Account created at start-up when both variables are present.
#[derive(Debug, Clone)]
pub struct FirstSuperuser {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub project_name: String,
    pub api_prefix: String,
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub json_logs: bool,
    pub cors_origins: Vec<String>,
    pub database_url: String,
    pub db_max_connections: u32,
    pub jwt: JwtConfig,
    pub first_superuser: Option<FirstSuperuser>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; missing required values fail here.
    pub fn from_lookup<F>(var: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = var("SECRET_KEY").context("SECRET_KEY must be set")?;
        if secret.trim().is_empty() {
            bail!("SECRET_KEY must not be empty");
        }

        let algorithm: Algorithm = parse_or(&var, "ALGORITHM", Algorithm::HS256)?;
        if !matches!(
            algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            bail!("ALGORITHM must be one of HS256, HS384, HS512");
        }

        let ttl_minutes: i64 = parse_or(&var, "ACCESS_TOKEN_EXPIRE_MINUTES", 30)?;
        if ttl_minutes <= 0 {
            bail!("ACCESS_TOKEN_EXPIRE_MINUTES must be positive");
        }

        let first_superuser = match (
            var("FIRST_SUPERUSER_EMAIL"),
            var("FIRST_SUPERUSER_PASSWORD"),
        ) {
            (Some(email), Some(password)) => Some(FirstSuperuser { email, password }),
            _ => None,
        };

        let api_prefix = var("API_V1_STR")
            .unwrap_or_else(|| "/api/v1".into())
            .trim_end_matches('/')
            .to_string();
        if !api_prefix.starts_with('/') {
            bail!("API_V1_STR must be a non-root path starting with '/'");
        }

        Ok(Self {
            project_name: var("PROJECT_NAME").unwrap_or_else(|| "Accounts API".into()),
            api_prefix,
            host: var("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(&var, "APP_PORT", 8080)?,
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "INFO".into()),
            json_logs: var("LOG_FORMAT").map(|v| v == "json").unwrap_or(false),
            cors_origins: var("BACKEND_CORS_ORIGINS")
                .map(|raw| split_origins(&raw))
                .unwrap_or_default(),
            database_url: database_url(&var)?,
            db_max_connections: parse_or(&var, "DB_MAX_CONNECTIONS", 10)?,
            jwt: JwtConfig {
                secret,
                algorithm,
                ttl_minutes,
            },
            first_superuser,
        })
    }
}

fn parse_or<F, T>(var: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("invalid {key}={raw:?}: {e}")),
        None => Ok(default),
    }
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(String::from)
        .collect()
}

fn database_url<F>(var: &F) -> anyhow::Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = var("DATABASE_URL") {
        return Ok(url);
    }
    let part = |key: &str| {
        var(key).with_context(|| format!("DATABASE_URL is unset and {key} is missing"))
    };
    let server = part("POSTGRES_SERVER")?;
    let user = part("POSTGRES_USER")?;
    let password = part("POSTGRES_PASSWORD")?;
    let db = part("POSTGRES_DB")?;
    let port = var("POSTGRES_PORT").unwrap_or_else(|| "5432".into());
    Ok(format!("postgres://{user}:{password}@{server}:{port}/{db}"))
}
