use std::{env, str::FromStr};

use anyhow::{anyhow, Context};
use bill::BillSettings;
use chrono::FixedOffset;
use dotenv::dotenv;

#[derive(Debug, Clone)]
pub struct Config {
    // Server configuration
    pub server_host: String,
    pub server_port: u16,

    // Database configuration
    pub database_url: Option<String>,
    pub database_max_connections: u32,

    // Security
    pub jwt_secret: String,
    pub allowed_origins: Vec<String>,
    pub rate_limit: usize,

    // Shop
    pub page_size: u32,
    pub utc_offset: FixedOffset,
    pub bill: BillSettings,
}

fn var_or<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .with_context(|| format!("{} has an invalid value: {:?}", name, value)),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let server_port = var_or("SERVER_PORT", 8080u16)?;

        let database_url = env::var("DATABASE_URL").ok().filter(|url| !url.is_empty());
        let database_max_connections = var_or("DATABASE_MAX_CONNECTIONS", 5u32)?;

        let jwt_secret =
            env::var("JWT_SECRET").context("JWT_SECRET must be set for secure operation")?;

        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let rate_limit = var_or("RATE_LIMIT", 120usize)?;
        let page_size = var_or("PAGE_SIZE", 10u32)?;

        let offset_minutes = var_or("UTC_OFFSET_MINUTES", 0i32)?;
        let utc_offset = FixedOffset::east_opt(offset_minutes * 60)
            .ok_or_else(|| anyhow!("UTC_OFFSET_MINUTES out of range: {}", offset_minutes))?;

        let defaults = BillSettings::default();
        let bill = BillSettings {
            shop_name: env::var("SHOP_NAME").unwrap_or(defaults.shop_name),
            tagline: env::var("SHOP_TAGLINE").unwrap_or(defaults.tagline),
        };

        Ok(Config {
            server_host,
            server_port,
            database_url,
            database_max_connections,
            jwt_secret,
            allowed_origins,
            rate_limit,
            page_size,
            utc_offset,
            bill,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}
