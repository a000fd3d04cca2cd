use base64::engine::general_purpose::STANDARD as b64;
use base64::Engine;
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

const HASHING_KEY_VAR: &str = "BLOG_HASHING_KEY_B64";
const TOKEN_SIGNING_KEY_VAR: &str = "BLOG_TOKEN_SIGNING_KEY_B64";

const HASH_LENGTH_VAR: &str = "BLOG_HASH_LENGTH";
const HASH_ITERATIONS_VAR: &str = "BLOG_HASH_ITERATIONS";
const HASH_MEM_COST_KIB_VAR: &str = "BLOG_HASH_MEM_COST_KIB";
const HASH_THREADS_VAR: &str = "BLOG_HASH_THREADS";
const HASH_SALT_LENGTH_VAR: &str = "BLOG_HASH_SALT_LENGTH";

const ACCESS_TOKEN_LIFETIME_MINS_VAR: &str = "BLOG_ACCESS_TOKEN_LIFETIME_MINS";
const REFRESH_TOKEN_LIFETIME_DAYS_VAR: &str = "BLOG_REFRESH_TOKEN_LIFETIME_DAYS";

const ACTIX_WORKER_COUNT_VAR: &str = "BLOG_ACTIX_WORKER_COUNT";
const LOG_LEVEL_VAR: &str = "BLOG_LOG_LEVEL";

const ADMIN_USERNAME_VAR: &str = "BLOG_ADMIN_USERNAME";
const ADMIN_PASSWORD_VAR: &str = "BLOG_ADMIN_PASSWORD";
const SEED_BLOGS_PATH_VAR: &str = "BLOG_SEED_BLOGS_PATH";

const MIN_HASHING_KEY_SIZE: usize = 32;
const MIN_TOKEN_SIGNING_KEY_SIZE: usize = 64;

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

    pub hashing_key: Vec<u8>,
    pub token_signing_key: Vec<u8>,

    pub hash_length: u32,
    pub hash_iterations: u32,
    pub hash_mem_cost_kib: u32,
    pub hash_threads: u32,
    pub hash_salt_length: u32,

    #[zeroize(skip)]
    pub access_token_lifetime: Duration,
    #[zeroize(skip)]
    pub refresh_token_lifetime: Duration,

    #[zeroize(skip)]
    pub actix_worker_count: usize,
    #[zeroize(skip)]
    pub log_level: String,

    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    #[zeroize(skip)]
    pub seed_blogs_path: Option<String>,
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
        let hashing_key = decode_key(HASHING_KEY_VAR, MIN_HASHING_KEY_SIZE)?;
        let token_signing_key = decode_key(TOKEN_SIGNING_KEY_VAR, MIN_TOKEN_SIGNING_KEY_SIZE)?;

        let inner = ConfigInner {
            db_username: env_var_or(DB_USERNAME_VAR, String::from("postgres")),
            db_password: env_var_or(DB_PASSWORD_VAR, String::new()),
            db_hostname: env_var_or(DB_HOSTNAME_VAR, String::from("localhost")),
            db_port: env_var_or(DB_PORT_VAR, 5432),
            db_name: env_var_or(DB_NAME_VAR, String::from("blog")),
            db_max_connections: env_var_or(DB_MAX_CONNECTIONS_VAR, 48),
            db_idle_timeout: Duration::from_secs(env_var_or(DB_IDLE_TIMEOUT_SECS_VAR, 30)),

            hashing_key,
            token_signing_key,

            hash_length: env_var_or(HASH_LENGTH_VAR, 32),
            hash_iterations: env_var_or(HASH_ITERATIONS_VAR, 2),
            hash_mem_cost_kib: env_var_or(HASH_MEM_COST_KIB_VAR, 65536),
            hash_threads: env_var_or(HASH_THREADS_VAR, 1),
            hash_salt_length: env_var_or(HASH_SALT_LENGTH_VAR, 16),

            access_token_lifetime: Duration::from_secs(
                env_var_or(ACCESS_TOKEN_LIFETIME_MINS_VAR, 15) * 60,
            ),
            refresh_token_lifetime: Duration::from_secs(
                env_var_or(REFRESH_TOKEN_LIFETIME_DAYS_VAR, 30) * 86400,
            ),

            actix_worker_count: env_var_or(ACTIX_WORKER_COUNT_VAR, num_cpus::get()),
            log_level: env_var_or(LOG_LEVEL_VAR, String::from("info")),

            admin_username: env_var_opt(ADMIN_USERNAME_VAR)?,
            admin_password: env_var_opt(ADMIN_PASSWORD_VAR)?,
            seed_blogs_path: env_var_opt(SEED_BLOGS_PATH_VAR)?,
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
    /// boundary. Generally, this should only be used at the end of the main function once
    /// all threads have been joined.
    pub unsafe fn zeroize(&self) {
        unsafe {
            (*self.inner.get()).zeroize();
        }
    }
}

fn decode_key(key: &'static str, min_size: usize) -> Result<Vec<u8>, ConfigError> {
    let mut encoded = env_var::<String>(key)?;
    let decoded = b64.decode(encoded.as_bytes());
    encoded.zeroize();

    let decoded = decoded.map_err(|_| ConfigError::invalid(key))?;

    if decoded.len() < min_size {
        return Err(ConfigError::invalid(key));
    }

    Ok(decoded)
}

fn env_var<T: FromStr>(key: &'static str) -> Result<T, ConfigError> {
    let var = std::env::var(key).map_err(|_| ConfigError::missing(key))?;
    let var: T = var.parse().map_err(|_| ConfigError::invalid(key))?;
    Ok(var)
}

fn env_var_or<T: FromStr>(key: &'static str, default: T) -> T {
    let Ok(var) = std::env::var(key) else {
        return default;
    };

    var.parse().unwrap_or(default)
}

fn env_var_opt<T: FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    match env_var(key) {
        Ok(v) => Ok(Some(v)),
        Err(ConfigError::MissingVar(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

#[derive(Clone, Copy, Debug)]
pub enum ConfigError {
    MissingVar(&'static str),
    InvalidVar(&'static str),
}

impl ConfigError {
    fn missing(var_name: &'static str) -> Self {
        Self::MissingVar(var_name)
    }

    fn invalid(var_name: &'static str) -> Self {
        Self::InvalidVar(var_name)
    }
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
