use anyhow::{bail, Context};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Which document store backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(StoreBackend::Postgres),
            "memory" | "mem" => Ok(StoreBackend::Memory),
            other => bail!("unknown STORE_BACKEND {other:?} (expected postgres or memory)"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub jwt: JwtConfig,
    /// Single allowed browser origin; permissive CORS when unset.
    pub cors_origin: Option<String>,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from `var`, which returns a variable's value if set.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let store_backend = match var("STORE_BACKEND") {
            Some(v) => v.parse()?,
            None => StoreBackend::Postgres,
        };
        let database_url = var("DATABASE_URL");
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            bail!("DATABASE_URL must be set when STORE_BACKEND is postgres");
        }

        let jwt = JwtConfig {
            secret: var("JWT_SECRET").context("JWT_SECRET must be set")?,
            issuer: var("JWT_ISSUER").unwrap_or_else(|| "forked".into()),
            audience: var("JWT_AUDIENCE").unwrap_or_else(|| "forked-users".into()),
            ttl_minutes: var("JWT_TTL_MINUTES")
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
        };

        let port = match var("APP_PORT") {
            Some(v) => v.parse::<u16>().with_context(|| format!("invalid APP_PORT {v:?}"))?,
            None => 3000,
        };

        Ok(Self {
            store_backend,
            database_url,
            jwt,
            cors_origin: var("CORS_ORIGIN").filter(|v| !v.is_empty()),
            host: var("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_store_backend() {
        assert_eq!("postgres".parse::<StoreBackend>().unwrap(), StoreBackend::Postgres);
        assert_eq!(" Memory ".parse::<StoreBackend>().unwrap(), StoreBackend::Memory);
        assert!("mongo".parse::<StoreBackend>().is_err());
    }

    fn lookup<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn applies_defaults() {
        let config =
            AppConfig::from_lookup(lookup(&[("STORE_BACKEND", "memory"), ("JWT_SECRET", "s")]))
                .unwrap();
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(config.jwt.issuer, "forked");
        assert_eq!(config.jwt.audience, "forked-users");
        assert_eq!(config.jwt.ttl_minutes, 60);
        assert_eq!(config.cors_origin, None);
        assert_eq!((config.host.as_str(), config.port), ("0.0.0.0", 3000));
    }

    #[test]
    fn missing_required_variables_abort() {
        let err = AppConfig::from_lookup(lookup(&[("JWT_SECRET", "s")])).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));

        let err = AppConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://db")])).unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));

        let err = AppConfig::from_lookup(lookup(&[
            ("STORE_BACKEND", "memory"),
            ("JWT_SECRET", "s"),
            ("APP_PORT", "http"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("APP_PORT"));
    }
}
