use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use std::{env, str::FromStr, time::Duration};

use crate::{auth::jwt::JwtConfig, services::supabase_store::SupabaseConfig};

/// Where uploaded images are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackend {
    Local,
    Supabase,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(StorageBackend::Local),
            "supabase" => Ok(StorageBackend::Supabase),
            other => bail!("unknown storage backend `{}` (expected local or supabase)", other),
        }
    }
}

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub storage_backend: StorageBackend,
    pub storage_dir: String,
    pub public_base_url: String,
    pub supabase: Option<SupabaseConfig>,
    pub store_timeout: Duration,
    pub sweep_min_age: chrono::Duration,
    pub max_upload_bytes: usize,
    pub jwt: JwtConfig,
    pub cors_origins: Vec<String>,
    pub bootstrap_admin: Option<(String, String)>,
    pub reset_url_base: String,
    pub contact_inbox: Option<String>,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Content backend for the marketing site")]
pub struct Args {
    /// Host to bind to (overrides CMS_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides CMS_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides CMS_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Image storage backend (overrides CMS_STORAGE_BACKEND)
    #[arg(long, value_enum)]
    pub storage_backend: Option<StorageBackend>,

    /// Directory for the local storage backend (overrides CMS_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Apply the database schema and exit
    #[arg(long)]
    pub migrate: bool,

    /// Delete unreferenced stored images and exit
    #[arg(long)]
    pub sweep: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<(Self, Args)> {
        let args = Args::parse();
        let cfg = Self::from_env(&args)?;
        Ok((cfg, args))
    }

    /// Environment values, with anything set in `args` taking precedence.
    pub fn from_env(args: &Args) -> Result<Self> {
        let port = match &args.port {
            Some(port) => *port,
            None => env_parse("CMS_PORT", 3000)?,
        };
        let storage_backend = match args.storage_backend {
            Some(backend) => backend,
            None => env_parse("CMS_STORAGE_BACKEND", StorageBackend::Local)?,
        };

        let supabase = match storage_backend {
            StorageBackend::Supabase => Some(SupabaseConfig {
                url: env_required("SUPABASE_URL")?,
                service_key: env_required("SUPABASE_SERVICE_KEY")?,
                bucket: env_or("SUPABASE_BUCKET", "site-images"),
            }),
            StorageBackend::Local => None,
        };

        let jwt = JwtConfig {
            secret: env_required("JWT_SECRET")?,
            expiry_mins: env_parse("JWT_EXPIRY_MINS", 720)?,
        };

        let bootstrap_admin = match (env_optional("CMS_ADMIN_EMAIL"), env_optional("CMS_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some((email, password)),
            (None, None) => None,
            _ => bail!("CMS_ADMIN_EMAIL and CMS_ADMIN_PASSWORD must be set together"),
        };

        Ok(Self {
            host: args.host.clone().unwrap_or_else(|| env_or("CMS_HOST", "0.0.0.0")),
            port,
            database_url: args
                .database_url
                .clone()
                .unwrap_or_else(|| env_or("CMS_DATABASE_URL", "sqlite://./data/cms.db")),
            storage_backend,
            storage_dir: args
                .storage_dir
                .clone()
                .unwrap_or_else(|| env_or("CMS_STORAGE_DIR", "./data/objects")),
            public_base_url: env_or(
                "CMS_PUBLIC_BASE_URL",
                &format!("http://localhost:{}/storage", port),
            ),
            supabase,
            store_timeout: Duration::from_secs(env_parse("CMS_STORE_TIMEOUT_SECS", 30)?),
            sweep_min_age: sweep_min_age(env_parse("CMS_SWEEP_MIN_AGE_SECS", 3600)?)?,
            max_upload_bytes: upload_limit_bytes(env_parse("CMS_MAX_UPLOAD_MB", 20)?)?,
            jwt,
            cors_origins: env_or("CMS_CORS_ORIGINS", "http://localhost:5173")
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect(),
            bootstrap_admin,
            reset_url_base: env_or("CMS_RESET_URL_BASE", "http://localhost:5173/reset-password"),
            contact_inbox: env_optional("CMS_CONTACT_INBOX"),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn sweep_min_age(secs: i64) -> Result<chrono::Duration> {
    if secs < 0 {
        bail!("CMS_SWEEP_MIN_AGE_SECS must not be negative");
    }
    chrono::Duration::try_seconds(secs)
        .with_context(|| format!("CMS_SWEEP_MIN_AGE_SECS value {} is out of range", secs))
}

fn upload_limit_bytes(mb: usize) -> Result<usize> {
    mb.checked_mul(1024 * 1024)
        .with_context(|| format!("CMS_MAX_UPLOAD_MB value {} is too large", mb))
}

fn env_optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(name: &str, default: &str) -> String {
    env_optional(name).unwrap_or_else(|| default.to_string())
}

fn env_required(name: &str) -> Result<String> {
    env_optional(name).with_context(|| format!("{} must be set", name))
}

fn env_parse<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map_err(|err| anyhow::anyhow!("parsing {} value `{}`: {}", name, value, err)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_backend_parses_case_insensitively() {
        assert_eq!(
            "Supabase".parse::<StorageBackend>().unwrap(),
            StorageBackend::Supabase
        );
        assert!("s3".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn out_of_range_limits_are_config_errors() {
        assert_eq!(sweep_min_age(90).unwrap(), chrono::Duration::seconds(90));
        assert!(sweep_min_age(i64::MAX).is_err());
        assert!(sweep_min_age(-1).is_err());

        assert_eq!(upload_limit_bytes(20).unwrap(), 20 * 1024 * 1024);
        let err = upload_limit_bytes(usize::MAX).unwrap_err();
        assert!(err.to_string().contains("CMS_MAX_UPLOAD_MB"));
    }

    #[test]
    fn args_override_environment() {
        let args = Args::parse_from([
            "marketing-cms",
            "--port",
            "8088",
            "--database-url",
            "sqlite::memory:",
        ]);
        // JWT_SECRET is required, so only assert on parsing when it is present.
        match AppConfig::from_env(&args) {
            Ok(cfg) => {
                assert_eq!(cfg.port, 8088);
                assert_eq!(cfg.database_url, "sqlite::memory:");
            }
            Err(err) => assert!(err.to_string().contains("must be set")),
        }
        assert!(args.storage_backend.is_none());
        assert!(!args.migrate);
    }
}
