use std::path::Path;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DistributionConfig {
    /// Upper bound on (student, book) triples accepted in one submission.
    pub max_batch_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub max_requests: usize,
    pub window_seconds: u64,
    pub distribution_per_minute: usize,
    pub writes_per_minute: usize,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SecurityConfig {
    pub enable_hsts: Option<bool>,
    pub hsts_max_age: Option<u64>,
    pub hsts_include_subdomains: Option<bool>,
    pub csp: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub distribution: DistributionConfig,
    pub rate_limit: RateLimitConfig,
    pub security: Option<SecurityConfig>,
}

const DEFAULTS: &str = include_str!("../config/default.toml");

impl Default for AppConfig {
    fn default() -> Self {
        // Fallback: parse the embedded default TOML
        match ::config::Config::builder()
            .add_source(::config::File::from_str(DEFAULTS, ::config::FileFormat::Toml))
            .build()
        {
            Ok(cfg) => match cfg.try_deserialize() {
                Ok(app_cfg) => app_cfg,
                Err(e) => {
                    eprintln!("FATAL: Failed to deserialize default config: {}", e);
                    panic!("Failed to deserialize default config: {}", e);
                }
            },
            Err(e) => {
                eprintln!("FATAL: Failed to parse default config: {}", e);
                panic!("Failed to parse default config: {}", e);
            }
        }
    }
}

impl Default for DistributionConfig {
    fn default() -> Self {
        // Mirror defaults from config/default.toml
        Self { max_batch_size: 5000 }
    }
}

/// Loads configuration: embedded defaults -> `schoolhouse.toml` -> `$SCHOOLHOUSE_CONFIG` -> env.
pub fn load() -> anyhow::Result<AppConfig> {
    // Load .env first (optional)
    let _ = dotenvy::dotenv();

    let mut builder = ::config::Config::builder()
        .add_source(::config::File::from_str(DEFAULTS, ::config::FileFormat::Toml))
        // Optional local file: schoolhouse.toml (in CWD)
        .add_source(::config::File::with_name("schoolhouse").required(false));

    if let Ok(custom_path) = std::env::var("SCHOOLHOUSE_CONFIG") {
        builder = builder.add_source(::config::File::with_name(&custom_path).required(false));
    }
    // Environment variables last to have highest precedence
    builder = builder.add_source(::config::Environment::with_prefix("SCHOOLHOUSE").separator("__"));

    let cfg = builder.build()?;
    let app_cfg: AppConfig = cfg.try_deserialize()?;
    validate(&app_cfg)?;
    Ok(app_cfg)
}

pub fn validate(cfg: &AppConfig) -> anyhow::Result<()> {
    // Server
    if cfg.server.port == 0 {
        return Err(anyhow::anyhow!("invalid server.port: {}", cfg.server.port));
    }
    #[cfg(unix)]
    if cfg.server.port < 1024 {
        tracing::warn!("Using privileged port {} - may require elevated permissions", cfg.server.port);
    }
    if cfg.server.max_body_bytes < 1024 {
        return Err(anyhow::anyhow!("server.max_body_bytes must be >= 1024"));
    }

    // Database
    if cfg.database.url.trim().is_empty() {
        return Err(anyhow::anyhow!("database.url must not be empty"));
    }
    if cfg.database.max_connections == 0 {
        return Err(anyhow::anyhow!("database.max_connections must be > 0"));
    }

    // Distribution
    if cfg.distribution.max_batch_size == 0 {
        return Err(anyhow::anyhow!("distribution.max_batch_size must be > 0"));
    }

    // Rate limits
    if cfg.rate_limit.max_requests == 0 || cfg.rate_limit.window_seconds == 0 {
        return Err(anyhow::anyhow!("rate_limit.max_requests and rate_limit.window_seconds must be > 0"));
    }
    if cfg.rate_limit.distribution_per_minute == 0 || cfg.rate_limit.writes_per_minute == 0 {
        return Err(anyhow::anyhow!("rate_limit per-endpoint limits must be > 0"));
    }

    Ok(())
}

pub fn ensure_sqlite_parent_dir(url: &str) -> anyhow::Result<()> {
    if let Some(path) = url.strip_prefix("sqlite://") {
        // sqlite:///C:/... on Windows: strip the leading '/' before a drive letter
        #[cfg(windows)]
        let path = {
            let bytes = path.as_bytes();
            if bytes.len() >= 3 && bytes[0] == b'/' && bytes[2] == b':' && bytes[1].is_ascii_alphabetic() {
                &path[1..]
            } else {
                path
            }
        };
        // Query parameters (e.g. ?mode=rwc) are not part of the file path
        let path = path.split('?').next().unwrap_or(path);
        let p = Path::new(path);
        if let Some(parent) = p.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
    }
    Ok(())
}
