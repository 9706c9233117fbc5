use std::env;
use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;

/// 設定エラー
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing configuration value: {0}")]
    Missing(String),
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// 未設定なら既定値を返す
pub(crate) fn var_or(key: &str, default: String) -> String {
    env::var(key).unwrap_or(default)
}

/// 設定されていれば型に変換し、未設定なら既定値を返す
pub(crate) fn parse_var<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| ConfigError::InvalidValue(format!("{}={:?}: {}", key, raw, e))),
        Err(_) => Ok(default),
    }
}

/// データベース接続設定
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    /// ローカル開発用の接続先
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3306,
            database: "storefront_db".to_string(),
            username: "storefront_user".to_string(),
            password: "storefront_password".to_string(),
            max_connections: 10,
        }
    }
}

impl DatabaseConfig {
    /// `DATABASE_*` 環境変数で既定値を上書きする
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            host: var_or("DATABASE_HOST", defaults.host),
            port: parse_var("DATABASE_PORT", defaults.port)?,
            database: var_or("DATABASE_NAME", defaults.database),
            username: var_or("DATABASE_USER", defaults.username),
            password: var_or("DATABASE_PASSWORD", defaults.password),
            max_connections: parse_var("DATABASE_MAX_CONNECTIONS", defaults.max_connections)?,
        })
    }

    pub fn connection_string(&self) -> String {
        format!(
            "mysql://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database
        )
    }
}

/// HTTPサーバー設定
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: var_or("SERVER_HOST", "0.0.0.0".to_string()),
            port: parse_var("SERVER_PORT", 3000)?,
        })
    }

    /// 待ち受けアドレス
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| ConfigError::InvalidValue(format!("SERVER_HOST={:?}: {}", self.host, e)))
    }
}
