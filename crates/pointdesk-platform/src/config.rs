use anyhow::{Context, Result, bail};

pub const MIN_JWT_SECRET_LEN: usize = 32;
pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 480;

#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub http_addr: String,
    /// Absent means the process keeps its data in memory.
    pub database_url: Option<String>,
    /// Absent means change events stay in-process.
    pub redis_url: Option<String>,
    pub jwt_secret: String,
    pub token_ttl_minutes: i64,
    pub admin_password: String,
}

impl ServiceConfig {
    pub fn from_env(default_http_addr: &str) -> Result<Self> {
        Self::from_lookup(default_http_addr, |key| std::env::var(key).ok())
    }

    pub fn from_lookup(
        default_http_addr: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let present = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let jwt_secret = present("JWT_SECRET").context("JWT_SECRET is required")?;
        if jwt_secret.len() < MIN_JWT_SECRET_LEN {
            bail!("JWT_SECRET must be at least {MIN_JWT_SECRET_LEN} characters");
        }

        let token_ttl_minutes = match present("TOKEN_TTL_MINUTES") {
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .context("TOKEN_TTL_MINUTES must be a whole number of minutes")?,
            None => DEFAULT_TOKEN_TTL_MINUTES,
        };
        if token_ttl_minutes <= 0 {
            bail!("TOKEN_TTL_MINUTES must be positive");
        }

        Ok(Self {
            http_addr: present("HTTP_ADDR").unwrap_or_else(|| default_http_addr.to_string()),
            database_url: present("DATABASE_URL"),
            redis_url: present("REDIS_URL"),
            jwt_secret,
            token_ttl_minutes,
            admin_password: present("ADMIN_PASSWORD")
                .unwrap_or_else(|| pointdesk_core::auth::DEFAULT_ADMIN_PASSWORD.to_string()),
        })
    }
}
