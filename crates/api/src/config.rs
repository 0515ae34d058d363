//! Process configuration, read from environment variables.

use std::net::SocketAddr;

use anyhow::Context;

use prodreview_infra::Rate;

/// Paging defaults applied to list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationSettings {
    pub page_size: usize,
    pub max_page_size: usize,
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self {
            page_size: 10,
            max_page_size: 100,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    /// Postgres connection string; in-memory stores when unset.
    pub database_url: Option<String>,
    pub review_create_rate: Rate,
    pub pagination: PaginationSettings,
}

impl ApiConfig {
    pub const DEFAULT_BIND_ADDR: &'static str = "0.0.0.0:8080";
    pub const DEFAULT_JWT_SECRET: &'static str = "dev-secret";
    pub const DEFAULT_REVIEW_CREATE_RATE: &'static str = "10/min";

    /// Development defaults: in-memory stores, dev secret.
    pub fn new(jwt_secret: impl Into<String>) -> anyhow::Result<Self> {
        Ok(Self {
            bind_addr: Self::DEFAULT_BIND_ADDR.parse()?,
            jwt_secret: jwt_secret.into(),
            database_url: None,
            review_create_rate: Self::DEFAULT_REVIEW_CREATE_RATE.parse()?,
            pagination: PaginationSettings::default(),
        })
    }

    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let jwt_secret = var("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            Self::DEFAULT_JWT_SECRET.to_string()
        });
        let mut config = Self::new(jwt_secret)?;

        if let Some(addr) = var("BIND_ADDR") {
            config.bind_addr = addr
                .parse()
                .with_context(|| format!("BIND_ADDR is not a socket address: {addr}"))?;
        }

        config.database_url = var("DATABASE_URL");

        if let Some(rate) = var("REVIEW_CREATE_RATE") {
            config.review_create_rate = rate
                .parse()
                .with_context(|| format!("invalid REVIEW_CREATE_RATE: {rate}"))?;
        }

        if let Some(size) = var("PAGE_SIZE") {
            config.pagination.page_size = parse_positive("PAGE_SIZE", &size)?;
        }
        if let Some(size) = var("MAX_PAGE_SIZE") {
            config.pagination.max_page_size = parse_positive("MAX_PAGE_SIZE", &size)?;
        }
        anyhow::ensure!(
            config.pagination.page_size <= config.pagination.max_page_size,
            "PAGE_SIZE ({}) exceeds MAX_PAGE_SIZE ({})",
            config.pagination.page_size,
            config.pagination.max_page_size
        );

        Ok(config)
    }
}

fn parse_positive(key: &str, value: &str) -> anyhow::Result<usize> {
    let n: usize = value
        .trim()
        .parse()
        .with_context(|| format!("{key} must be a positive integer, got {value}"))?;
    anyhow::ensure!(n > 0, "{key} must be a positive integer, got {value}");
    Ok(n)
}
