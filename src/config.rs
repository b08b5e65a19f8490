use anyhow::{Context, Result};
use clap::Parser;
use std::{env, str::FromStr};

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage_dir: String,
    pub database_url: String,
    /// Prefix for public object URLs handed back to clients.
    pub public_base_url: String,
    /// Upper bound for a whole request body, multipart framing included.
    pub max_request_bytes: usize,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Image ingestion API for communities and businesses")]
pub struct Args {
    /// Host to bind to (overrides IMAGE_INGEST_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides IMAGE_INGEST_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where objects are stored (overrides IMAGE_INGEST_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Database URL (overrides IMAGE_INGEST_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Base URL for public object addresses (overrides IMAGE_INGEST_PUBLIC_BASE_URL)
    #[arg(long)]
    pub public_base_url: Option<String>,

    /// Request body limit in bytes (overrides IMAGE_INGEST_MAX_REQUEST_BYTES)
    #[arg(long)]
    pub max_request_bytes: Option<usize>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

const DEFAULT_MAX_REQUEST_BYTES: usize = 16 * 1024 * 1024;

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();
        let migrate = args.migrate;
        Ok((Self::from_args(args)?, migrate))
    }

    /// Merge parsed CLI args over the environment; CLI wins.
    pub fn from_args(args: Args) -> Result<Self> {
        // --- Environment fallback ---
        let env_host = env::var("IMAGE_INGEST_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = env_number("IMAGE_INGEST_PORT", 3000u16)?;
        let env_storage =
            env::var("IMAGE_INGEST_STORAGE_DIR").unwrap_or_else(|_| "./data/objects".into());
        let env_db = env::var("IMAGE_INGEST_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/meta/image_ingest.db".into());
        let env_public = env::var("IMAGE_INGEST_PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000".into());
        let env_max_request =
            env_number("IMAGE_INGEST_MAX_REQUEST_BYTES", DEFAULT_MAX_REQUEST_BYTES)?;

        // --- Merge ---
        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            storage_dir: args.storage_dir.unwrap_or(env_storage),
            database_url: args.database_url.unwrap_or(env_db),
            public_base_url: args
                .public_base_url
                .unwrap_or(env_public)
                .trim_end_matches('/')
                .to_string(),
            max_request_bytes: args.max_request_bytes.unwrap_or(env_max_request),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_number<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", name, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", name)),
    }
}
