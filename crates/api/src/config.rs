use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// A malformed configuration value.
#[derive(Debug, thiserror::Error)]
#[error("{var} must be a valid {expected}, got {value:?}")]
pub struct ConfigError {
    pub var: &'static str,
    pub expected: &'static str,
    pub value: String,
}

/// How scrape workers are launched.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Executable to run (default: `python`).
    pub program: String,
    /// Script passed as the first argument, if any.
    pub script: Option<PathBuf>,
    /// Working directory of every worker.
    pub working_dir: PathBuf,
    /// Kill workers that run longer than this. `None` never kills.
    pub timeout: Option<Duration>,
}

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    /// A single `*` allows any origin.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for running jobs before cancelling them.
    pub shutdown_timeout_secs: u64,
    /// Evict finished sessions older than this. `None` keeps them forever.
    pub session_ttl: Option<Duration>,
    pub worker: WorkerConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `*`                        |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`| `30`                       |
    /// | `SESSION_TTL_SECS`     | unset                      |
    /// | `WORKER_PROGRAM`       | `python`                   |
    /// | `WORKER_SCRIPT`        | `execution/scrape_api.py`  |
    /// | `WORKER_DIR`           | `.`                        |
    /// | `WORKER_TIMEOUT_SECS`  | unset                      |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.into());

        let cors_origins: Vec<String> = var("CORS_ORIGINS", "*")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let script = var("WORKER_SCRIPT", "execution/scrape_api.py");
        let script = (!script.trim().is_empty()).then(|| PathBuf::from(script.trim()));

        let worker = WorkerConfig {
            program: var("WORKER_PROGRAM", "python"),
            script,
            working_dir: PathBuf::from(var("WORKER_DIR", ".")),
            timeout: parse_optional::<u64>("WORKER_TIMEOUT_SECS", lookup("WORKER_TIMEOUT_SECS"))?
                .map(Duration::from_secs),
        };

        Ok(Self {
            host: var("HOST", "0.0.0.0"),
            port: parse("PORT", var("PORT", "3000"))?,
            cors_origins,
            request_timeout_secs: parse("REQUEST_TIMEOUT_SECS", var("REQUEST_TIMEOUT_SECS", "30"))?,
            shutdown_timeout_secs: parse(
                "SHUTDOWN_TIMEOUT_SECS",
                var("SHUTDOWN_TIMEOUT_SECS", "30"),
            )?,
            session_ttl: parse_optional::<u64>("SESSION_TTL_SECS", lookup("SESSION_TTL_SECS"))?
                .map(Duration::from_secs),
            worker,
        })
    }

    /// Whether CORS should accept any origin.
    pub fn cors_allows_any(&self) -> bool {
        self.cors_origins.iter().any(|o| o == "*")
    }
}

fn parse<T: FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError {
        var,
        expected: std::any::type_name::<T>(),
        value,
    })
}

fn parse_optional<T: FromStr>(
    var: &'static str,
    value: Option<String>,
) -> Result<Option<T>, ConfigError> {
    match value {
        Some(v) if !v.trim().is_empty() => parse(var, v).map(Some),
        _ => Ok(None),
    }
}
