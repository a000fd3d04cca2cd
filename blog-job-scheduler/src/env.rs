use once_cell::sync::Lazy;
use std::cell::UnsafeCell;
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;
use std::time::Duration;
use zeroize::Zeroize;

pub static CONF: Lazy<Config> = Lazy::new(|| Config::from_env().expect("Failed to load config"));

const DB_USERNAME_VAR: &str = "BLOG_DB_USERNAME";
const DB_PASSWORD_VAR: &str = "BLOG_DB_PASSWORD";
const DB_HOSTNAME_VAR: &str = "BLOG_DB_HOSTNAME";
const DB_PORT_VAR: &str = "BLOG_DB_PORT";
const DB_NAME_VAR: &str = "BLOG_DB_NAME";
const DB_MAX_CONNECTIONS_VAR: &str = "BLOG_DB_MAX_CONNECTIONS";
const DB_IDLE_TIMEOUT_SECS_VAR: &str = "BLOG_DB_IDLE_TIMEOUT_SECS";

const RUNNER_UPDATE_FREQUENCY_SECS_VAR: &str = "BLOG_RUNNER_UPDATE_FREQUENCY_SECS";
const WORKER_THREADS_VAR: &str = "BLOG_WORKER_THREADS";
const MAX_BLOCKING_THREADS_VAR: &str = "BLOG_MAX_BLOCKING_THREADS";
const LOG_LEVEL_VAR: &str = "BLOG_LOG_LEVEL";

const PRUNE_REVOKED_TOKENS_JOB_FREQUENCY_SECS_VAR: &str =
    "BLOG_PRUNE_REVOKED_TOKENS_JOB_FREQUENCY_SECS";

#[derive(Zeroize)]
pub struct ConfigInner {
    pub db_username: String,
    pub db_password: String,
    pub db_hostname: String,
    pub db_port: u16,
    pub db_name: String,
    #[zeroize(skip)]
    pub db_max_connections: u32,
    #[zeroize(skip)]
    pub db_idle_timeout: Duration,

    #[zeroize(skip)]
    pub update_frequency: Duration,
    pub worker_threads: usize,
    pub max_blocking_threads: usize,
    #[zeroize(skip)]
    pub log_level: String,

    #[zeroize(skip)]
    pub prune_revoked_tokens_job_frequency: Duration,
}

pub struct Config {
    inner: UnsafeCell<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        // Safe as long as `unsafe Config::zeroize()` hasn't been called
        unsafe { &*self.inner.get() }
    }
}

// Safe to be shared across threads as long as `unsafe Config::zeroize()` hasn't been called
unsafe impl Sync for Config {}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        let inner = ConfigInner {
            db_username: env_var_or(DB_USERNAME_VAR, String::from("postgres")),
            db_password: env_var_or(DB_PASSWORD_VAR, String::new()),
            db_hostname: env_var_or(DB_HOSTNAME_VAR, String::from("localhost")),
            db_port: env_var(DB_PORT_VAR).or_else(|e| match e {
                ConfigError::MissingVar(_) => Ok(5432),
                ConfigError::InvalidVar(_) => Err(e),
            })?,
            db_name: env_var_or(DB_NAME_VAR, String::from("blog")),
            db_max_connections: env_var_or(DB_MAX_CONNECTIONS_VAR, 8),
            db_idle_timeout: Duration::from_secs(env_var_or(DB_IDLE_TIMEOUT_SECS_VAR, 30)),

            update_frequency: Duration::from_secs(env_var_or(
                RUNNER_UPDATE_FREQUENCY_SECS_VAR,
                60,
            )),
            worker_threads: env_var_or(WORKER_THREADS_VAR, num_cpus::get()),
            max_blocking_threads: env_var_or(MAX_BLOCKING_THREADS_VAR, 40),
            log_level: env_var_or(LOG_LEVEL_VAR, String::from("info")),

            prune_revoked_tokens_job_frequency: Duration::from_secs(env_var_or(
                PRUNE_REVOKED_TOKENS_JOB_FREQUENCY_SECS_VAR,
                3600,
            )),
        };

        Ok(Config {
            inner: UnsafeCell::new(inner),
        })
    }

    pub fn database_uri(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.db_username, self.db_password, self.db_hostname, self.db_port, self.db_name,
        )
    }

    /// # Safety
    ///
    /// Safe only if the Config isn't being used by other threads or across an async
    /// boundary. Use at the end of `main` once the runtime has shut down.
    pub unsafe fn zeroize(&self) {
        unsafe {
            (*self.inner.get()).zeroize();
        }
    }
}

fn env_var<T: FromStr>(key: &'static str) -> Result<T, ConfigError> {
    let var = std::env::var(key).map_err(|_| ConfigError::MissingVar(key))?;
    var.parse().map_err(|_| ConfigError::InvalidVar(key))
}

fn env_var_or<T: FromStr>(key: &'static str, default: T) -> T {
    let Ok(var) = std::env::var(key) else {
        return default;
    };

    var.parse().unwrap_or(default)
}

#[derive(Clone, Copy, Debug)]
pub enum ConfigError {
    MissingVar(&'static str),
    InvalidVar(&'static str),
}

impl std::error::Error for ConfigError {}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingVar(key) => write!(f, "Missing environment variable '{}'", key),
            Self::InvalidVar(key) => write!(f, "Environment variable '{}' is invalid", key),
        }
    }
}
