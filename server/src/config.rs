use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Redis,
    Memory,
}

impl FromStr for CacheBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(CacheBackend::Redis),
            "memory" => Ok(CacheBackend::Memory),
            other => Err(anyhow::anyhow!(
                "CACHE_BACKEND must be one of redis, memory (got {})",
                other
            )),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub server_addr: String,
    pub redis_host: String,
    pub redis_port: u16,
    pub redis_cache_db: u32,
    pub redis_ttl_seconds: u64,
    pub redis_pool_max_size: usize,
    pub redis_socket_timeout_seconds: u64,
    pub openweather_api_key: String,
    pub openweather_base_url: String,
    pub openweather_weather_path: String,
    pub openweather_timeout_seconds: u64,
    pub cache_backend: CacheBackend,
    pub cache_flush_on_start: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let is_test_env = parse_var("IS_TEST_ENV", false)?;
        let cache_backend = if is_test_env {
            CacheBackend::Memory
        } else {
            parse_var("CACHE_BACKEND", CacheBackend::Redis)?
        };

        Ok(Config {
            server_addr: env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            redis_host: env::var("REDIS_HOST").unwrap_or_else(|_| "localhost".to_string()),
            redis_port: parse_var("REDIS_PORT", 6379)?,
            redis_cache_db: parse_var("REDIS_CACHE_DB", 0)?,
            redis_ttl_seconds: parse_var("REDIS_TTL_SECONDS", 60 * 60)?,
            redis_pool_max_size: parse_var("REDIS_POOL_MAX_SIZE", 1024)?,
            redis_socket_timeout_seconds: parse_var("REDIS_SOCKET_TIMEOUT_SECONDS", 5)?,
            openweather_api_key: env::var("OPENWEATHER_API_KEY")
                .map_err(|_| anyhow::anyhow!("OPENWEATHER_API_KEY not set"))?,
            openweather_base_url: env::var("OPENWEATHER_BASE_URL")
                .unwrap_or_else(|_| "https://api.openweathermap.org".to_string()),
            openweather_weather_path: env::var("OPENWEATHER_WEATHER_PATH")
                .unwrap_or_else(|_| "/data/2.5/weather".to_string()),
            openweather_timeout_seconds: parse_var("OPENWEATHER_TIMEOUT_SECONDS", 10)?,
            cache_backend,
            cache_flush_on_start: parse_var("CACHE_FLUSH_ON_START", false)?,
        })
    }

    pub fn redis_url(&self) -> String {
        format!(
            "redis://{}:{}/{}",
            self.redis_host, self.redis_port, self.redis_cache_db
        )
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.redis_ttl_seconds)
    }

    pub fn redis_socket_timeout(&self) -> Duration {
        Duration::from_secs(self.redis_socket_timeout_seconds)
    }

    pub fn openweather_timeout(&self) -> Duration {
        Duration::from_secs(self.openweather_timeout_seconds)
    }

    /// Settings for tests: in-memory cache, upstream at `base_url`.
    #[cfg(test)]
    pub fn for_tests(base_url: &str) -> Self {
        Config {
            server_addr: "127.0.0.1:0".to_string(),
            redis_host: "127.0.0.1".to_string(),
            redis_port: 6379,
            redis_cache_db: 0,
            redis_ttl_seconds: 60 * 60,
            redis_pool_max_size: 16,
            redis_socket_timeout_seconds: 1,
            openweather_api_key: "test-key".to_string(),
            openweather_base_url: base_url.to_string(),
            openweather_weather_path: "/data/2.5/weather".to_string(),
            openweather_timeout_seconds: 2,
            cache_backend: CacheBackend::Memory,
            cache_flush_on_start: false,
        }
    }
}

fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{} is invalid: {}", name, e)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_backend_parsing() {
        assert_eq!("redis".parse::<CacheBackend>().unwrap(), CacheBackend::Redis);
        assert_eq!(" Memory ".parse::<CacheBackend>().unwrap(), CacheBackend::Memory);
        assert!("memcached".parse::<CacheBackend>().is_err());
    }

    #[test]
    fn test_redis_url() {
        let mut config = Config::for_tests("http://localhost");
        config.redis_host = "cache.internal".to_string();
        config.redis_port = 6380;
        config.redis_cache_db = 2;
        assert_eq!(config.redis_url(), "redis://cache.internal:6380/2");
    }

    #[test]
    fn test_durations() {
        let config = Config::for_tests("http://localhost");
        assert_eq!(config.default_ttl(), Duration::from_secs(3600));
        assert_eq!(config.openweather_timeout(), Duration::from_secs(2));
    }
}
