use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

/// 覆盖 `database.url` 的环境变量
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub rate_limit: RateLimitConfig,
    pub log: LogConfig,
}

/// 响应体格式（部署形态）
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// 制表符分隔的表格
    #[default]
    Tsv,
    /// JSON 行数组
    Json,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    pub max_body_bytes: usize,
    pub output: OutputFormat,
    /// 携带该请求头时输出调试响应头（绑定后的语句与参数）
    pub debug_header: String,
    /// 存在未提供的静态变量时直接拒绝请求，而不是交给数据库报错
    pub reject_unresolved_statics: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3030,
            request_timeout_secs: 30,
            max_body_bytes: 64 * 1024,
            output: OutputFormat::Tsv,
            debug_header: "X-SQL-Debug".to_string(),
            reject_unresolved_statics: true,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/postgres?sslmode=disable".to_string(),
            max_connections: 10,
            connect_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    pub max_capacity: u64,
    /// 执行耗时不足一个成本单位时使用的缓存时长
    pub default_ttl_secs: u64,
    /// 使用计数的保留时长，应长于结果缓存
    pub usage_ttl_secs: u64,
    /// 每秒执行耗时换算的缓存时长
    pub cost_unit_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
            default_ttl_secs: 5 * 60,
            usage_ttl_secs: 7 * 24 * 60 * 60,
            cost_unit_secs: 60 * 60,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// 令牌桶容量
    pub capacity: u32,
    /// 每秒补充的令牌数
    pub refill_per_sec: f64,
    /// 同时跟踪的客户端上限，超出后淘汰最久未活动的客户端
    pub max_clients: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: 10,
            refill_per_sec: 1.0,
            max_clients: 10_000,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub dir: String,
    pub file: String,
    pub max_file_size: u64,
    pub max_files: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: "logs".to_string(),
            file: "sqlrest".to_string(),
            max_file_size: 100 * 1024 * 1024, // 100MB
            max_files: 5,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = env::var(DATABASE_URL_ENV) {
            if !url.is_empty() {
                self.database.url = url;
            }
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.server.max_body_bytes == 0 {
            return Err("server.max_body_bytes 必须大于0".to_string());
        }
        if self.server.debug_header.trim().is_empty() {
            return Err("server.debug_header 不能为空".to_string());
        }
        if self.database.max_connections == 0 {
            return Err("database.max_connections 必须大于0".to_string());
        }
        if self.cache.max_capacity == 0 {
            return Err("cache.max_capacity 必须大于0".to_string());
        }
        if self.cache.default_ttl_secs == 0 {
            return Err("cache.default_ttl_secs 必须大于0".to_string());
        }
        if self.rate_limit.enabled
            && (self.rate_limit.capacity == 0 || self.rate_limit.refill_per_sec <= 0.0)
        {
            return Err("rate_limit.capacity 与 rate_limit.refill_per_sec 必须大于0".to_string());
        }
        if self.rate_limit.enabled && self.rate_limit.max_clients == 0 {
            return Err("rate_limit.max_clients 必须大于0".to_string());
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server.host, "localhost");
        assert_eq!(config.server.port, 3030);
        assert_eq!(config.server.output, OutputFormat::Tsv);
        assert_eq!(config.cache.cost_unit_secs, 3600);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_load_save() {
        let temp_file = NamedTempFile::new().expect("Failed to create temporary file");

        let mut config = Config::default();
        config.server.port = 8080;
        config.server.output = OutputFormat::Json;
        config.save(temp_file.path()).expect("Failed to save config");

        let loaded_config =
            Config::load(temp_file.path()).expect("Failed to load config from temporary file");
        assert_eq!(loaded_config.server.port, 8080);
        assert_eq!(loaded_config.server.output, OutputFormat::Json);
        assert_eq!(loaded_config.cache.max_capacity, config.cache.max_capacity);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let mut temp_file = NamedTempFile::new().expect("Failed to create temporary file");
        temp_file
            .write_all(b"[server]\nport = 9000\n\n[rate_limit]\nenabled = false\n")
            .expect("Failed to write TOML content to temporary file");

        let config = Config::load(temp_file.path()).expect("Failed to load partial config");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "localhost");
        assert!(!config.rate_limit.enabled);
        assert_eq!(config.log.file, "sqlrest");
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.cache.max_capacity = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.rate_limit.refill_per_sec = 0.0;
        assert!(config.validate().is_err());

        config.rate_limit.enabled = false;
        assert!(config.validate().is_ok());

        let mut config = Config::default();
        config.rate_limit.max_clients = 0;
        assert!(config.validate().is_err());
    }
}
