use anyhow::{bail, Context, Result};

/// Where uploaded resumes are kept.
#[derive(Debug, Clone, PartialEq)]
pub enum ResumeStoreConfig {
    Local {
        upload_dir: String,
    },
    S3 {
        bucket: String,
        endpoint: String,
        access_key_id: String,
        secret_access_key: String,
    },
}

/// First admin account, created at startup when no admin exists yet.
#[derive(Debug, Clone, PartialEq)]
pub struct AdminBootstrap {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: Option<String>,
    pub jwt_secret: String,
    pub access_token_expire_minutes: i64,
    pub resume_store: ResumeStoreConfig,
    pub admin_bootstrap: Option<AdminBootstrap>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("Required environment variable '{key}' is not set"))
        };

        let jwt_secret = require("JWT_SECRET")?;
        if jwt_secret.len() < 32 {
            bail!("JWT_SECRET must be at least 32 characters long");
        }

        let access_token_expire_minutes = match lookup("ACCESS_TOKEN_EXPIRE_MINUTES") {
            Some(v) => v
                .parse::<i64>()
                .ok()
                .filter(|m| *m > 0)
                .context("ACCESS_TOKEN_EXPIRE_MINUTES must be a positive integer")?,
            None => 30,
        };

        let resume_store = match lookup("RESUME_STORE").as_deref().unwrap_or("local") {
            "local" => ResumeStoreConfig::Local {
                upload_dir: lookup("UPLOAD_DIR").unwrap_or_else(|| "uploads".to_string()),
            },
            "s3" => ResumeStoreConfig::S3 {
                bucket: require("S3_BUCKET")?,
                endpoint: require("S3_ENDPOINT")?,
                access_key_id: require("AWS_ACCESS_KEY_ID")?,
                secret_access_key: require("AWS_SECRET_ACCESS_KEY")?,
            },
            other => bail!("RESUME_STORE must be 'local' or 's3', got '{other}'"),
        };

        let admin_bootstrap = match (
            lookup("ADMIN_USERNAME"),
            lookup("ADMIN_EMAIL"),
            lookup("ADMIN_PASSWORD"),
        ) {
            (Some(username), Some(email), Some(password)) => Some(AdminBootstrap {
                username,
                email,
                password,
            }),
            (None, None, None) => None,
            _ => bail!("ADMIN_USERNAME, ADMIN_EMAIL and ADMIN_PASSWORD must be set together"),
        };

        Ok(Config {
            database_url: require("DATABASE_URL")?,
            redis_url: lookup("REDIS_URL").filter(|v| !v.trim().is_empty()),
            jwt_secret,
            access_token_expire_minutes,
            resume_store,
            admin_bootstrap,
            port: lookup("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/hireops"),
            ("JWT_SECRET", SECRET),
        ]))
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.access_token_expire_minutes, 30);
        assert_eq!(config.redis_url, None);
        assert!(config.admin_bootstrap.is_none());
        assert_eq!(
            config.resume_store,
            ResumeStoreConfig::Local {
                upload_dir: "uploads".to_string()
            }
        );
    }

    #[test]
    fn test_missing_database_url_fails() {
        let err = Config::from_lookup(lookup_from(&[("JWT_SECRET", SECRET)])).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn test_short_jwt_secret_rejected() {
        let err = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/hireops"),
            ("JWT_SECRET", "short"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn test_s3_store_requires_bucket() {
        let err = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/hireops"),
            ("JWT_SECRET", SECRET),
            ("RESUME_STORE", "s3"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("S3_BUCKET"));
    }

    #[test]
    fn test_partial_admin_bootstrap_rejected() {
        let result = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/hireops"),
            ("JWT_SECRET", SECRET),
            ("ADMIN_USERNAME", "root"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_port_rejected() {
        let result = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/hireops"),
            ("JWT_SECRET", SECRET),
            ("PORT", "not-a-port"),
        ]));
        assert!(result.is_err());
    }
}
