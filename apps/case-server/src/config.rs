// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read once at startup (after loading an optional `.env`
//! file) and held immutable for the lifetime of the process.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `4000` |
//! | `DATABASE_TYPE` | `sqlite` or `redb` | `sqlite` |
//! | `DATABASE_PATH` | SQLite database file | `data/database.sqlite` |
//! | `REDB_PATH` | redb database file | `data/cases.redb` |
//! | `SMS_PROVIDER` | `mock` or `sns` | `mock` |
//! | `JWT_SECRET` | Credential signing secret | development placeholder |
//! | `CLIENT_ORIGIN` | Allowed CORS origin | `http://localhost:5173` |
//! | `SNS_REGION` / `AWS_REGION` | SNS region | `us-east-1` |
//! | `SNS_SMS_TYPE` | `Transactional` or `Promotional` | `Transactional` |
//! | `SNS_SENDER_ID` | SNS sender id attribute | unset |
//! | `SNS_ORIGINATION_NUMBER` | SNS origination number attribute | unset |
//! | `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` / `AWS_SESSION_TOKEN` | SNS credentials | required for `sns` |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM files; HTTPS when both are set | unset |
//! | `RATE_LIMIT_WINDOW_MS` | Rate limit window for write routes | `900000` |
//! | `RATE_LIMIT_MAX` | Requests per client per window | `10` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::path::PathBuf;
use std::time::Duration;

use crate::sms::sigv4::AwsCredentials;
use crate::sms::SnsSettings;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const DATABASE_TYPE_ENV: &str = "DATABASE_TYPE";
pub const DATABASE_PATH_ENV: &str = "DATABASE_PATH";
pub const REDB_PATH_ENV: &str = "REDB_PATH";
pub const SMS_PROVIDER_ENV: &str = "SMS_PROVIDER";
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const CLIENT_ORIGIN_ENV: &str = "CLIENT_ORIGIN";
pub const SNS_REGION_ENV: &str = "SNS_REGION";
pub const AWS_REGION_ENV: &str = "AWS_REGION";
pub const SNS_SMS_TYPE_ENV: &str = "SNS_SMS_TYPE";
pub const SNS_SENDER_ID_ENV: &str = "SNS_SENDER_ID";
pub const SNS_ORIGINATION_NUMBER_ENV: &str = "SNS_ORIGINATION_NUMBER";
pub const AWS_ACCESS_KEY_ID_ENV: &str = "AWS_ACCESS_KEY_ID";
pub const AWS_SECRET_ACCESS_KEY_ENV: &str = "AWS_SECRET_ACCESS_KEY";
pub const AWS_SESSION_TOKEN_ENV: &str = "AWS_SESSION_TOKEN";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const RATE_LIMIT_WINDOW_MS_ENV: &str = "RATE_LIMIT_WINDOW_MS";
pub const RATE_LIMIT_MAX_ENV: &str = "RATE_LIMIT_MAX";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 4000;
pub const DEFAULT_DATABASE_PATH: &str = "data/database.sqlite";
pub const DEFAULT_REDB_PATH: &str = "data/cases.redb";
pub const DEFAULT_CLIENT_ORIGIN: &str = "http://localhost:5173";
pub const DEFAULT_SNS_REGION: &str = "us-east-1";
pub const DEFAULT_SNS_SMS_TYPE: &str = "Transactional";
pub const DEFAULT_RATE_LIMIT_WINDOW_MS: u64 = 15 * 60 * 1000;
pub const DEFAULT_RATE_LIMIT_MAX: u32 = 10;

/// Placeholder secret used when `JWT_SECRET` is unset. Startup warns about it.
pub const DEFAULT_JWT_SECRET: &str = "change-this-secret-in-production-please";

/// Default tracing filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} has unsupported value {value:?} (expected {expected})")]
    Unsupported {
        name: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("{name} is not a valid port: {value:?}")]
    InvalidPort { name: &'static str, value: String },

    #[error("{name} must be a positive integer, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },

    #[error("{0} and {1} must be set together")]
    Incomplete(&'static str, &'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseKind {
    Sqlite,
    Redb,
}

impl DatabaseKind {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "redb" => Ok(Self::Redb),
            _ => Err(ConfigError::Unsupported {
                name: DATABASE_TYPE_ENV,
                value: value.to_string(),
                expected: "sqlite or redb",
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmsProviderKind {
    Mock,
    Sns,
}

impl SmsProviderKind {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mock" => Ok(Self::Mock),
            "sns" => Ok(Self::Sns),
            _ => Err(ConfigError::Unsupported {
                name: SMS_PROVIDER_ENV,
                value: value.to_string(),
                expected: "mock or sns",
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::Unsupported {
                name: LOG_FORMAT_ENV,
                value: value.to_string(),
                expected: "json or pretty",
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub kind: DatabaseKind,
    pub sqlite_path: PathBuf,
    pub redb_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct SmsConfig {
    pub provider: SmsProviderKind,
    pub sns: SnsSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsConfig {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

/// Fixed-window limit applied per client address to the write routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub window: Duration,
    pub max_requests: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_millis(DEFAULT_RATE_LIMIT_WINDOW_MS),
            max_requests: DEFAULT_RATE_LIMIT_MAX,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage: StorageConfig,
    pub sms: SmsConfig,
    pub jwt_secret: String,
    pub client_origin: String,
    pub tls: Option<TlsConfig>,
    pub rate_limit: RateLimitConfig,
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through `lookup`. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let get_or = |name: &str, default: &str| get(name).unwrap_or_else(|| default.to_string());

        let port = match get(PORT_ENV) {
            Some(value) => value.trim().parse::<u16>().map_err(|_| ConfigError::InvalidPort {
                name: PORT_ENV,
                value,
            })?,
            None => DEFAULT_PORT,
        };

        let positive = |name: &'static str, default: u64| -> Result<u64, ConfigError> {
            match get(name) {
                Some(value) => match value.trim().parse::<u64>() {
                    Ok(n) if n > 0 => Ok(n),
                    _ => Err(ConfigError::InvalidNumber { name, value }),
                },
                None => Ok(default),
            }
        };
        let max_requests = positive(RATE_LIMIT_MAX_ENV, u64::from(DEFAULT_RATE_LIMIT_MAX))?;
        let rate_limit = RateLimitConfig {
            window: Duration::from_millis(positive(
                RATE_LIMIT_WINDOW_MS_ENV,
                DEFAULT_RATE_LIMIT_WINDOW_MS,
            )?),
            max_requests: u32::try_from(max_requests).map_err(|_| ConfigError::InvalidNumber {
                name: RATE_LIMIT_MAX_ENV,
                value: max_requests.to_string(),
            })?,
        };

        let storage = StorageConfig {
            kind: get(DATABASE_TYPE_ENV)
                .map(|v| DatabaseKind::parse(&v))
                .transpose()?
                .unwrap_or(DatabaseKind::Sqlite),
            sqlite_path: PathBuf::from(get_or(DATABASE_PATH_ENV, DEFAULT_DATABASE_PATH)),
            redb_path: PathBuf::from(get_or(REDB_PATH_ENV, DEFAULT_REDB_PATH)),
        };

        let credentials = match (get(AWS_ACCESS_KEY_ID_ENV), get(AWS_SECRET_ACCESS_KEY_ENV)) {
            (Some(access_key_id), Some(secret_access_key)) => Some(AwsCredentials {
                access_key_id,
                secret_access_key,
                session_token: get(AWS_SESSION_TOKEN_ENV),
            }),
            (None, None) => None,
            _ => {
                return Err(ConfigError::Incomplete(
                    AWS_ACCESS_KEY_ID_ENV,
                    AWS_SECRET_ACCESS_KEY_ENV,
                ))
            }
        };

        let sms = SmsConfig {
            provider: get(SMS_PROVIDER_ENV)
                .map(|v| SmsProviderKind::parse(&v))
                .transpose()?
                .unwrap_or(SmsProviderKind::Mock),
            sns: SnsSettings {
                region: get(SNS_REGION_ENV)
                    .or_else(|| get(AWS_REGION_ENV))
                    .unwrap_or_else(|| DEFAULT_SNS_REGION.to_string()),
                sms_type: get_or(SNS_SMS_TYPE_ENV, DEFAULT_SNS_SMS_TYPE),
                sender_id: get(SNS_SENDER_ID_ENV),
                origination_number: get(SNS_ORIGINATION_NUMBER_ENV),
                credentials,
            },
        };

        let tls = match (get(TLS_CERT_PATH_ENV), get(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsConfig {
                cert_path: PathBuf::from(cert),
                key_path: PathBuf::from(key),
            }),
            (None, None) => None,
            _ => return Err(ConfigError::Incomplete(TLS_CERT_PATH_ENV, TLS_KEY_PATH_ENV)),
        };

        Ok(Self {
            host: get_or(HOST_ENV, DEFAULT_HOST),
            port,
            storage,
            sms,
            jwt_secret: get_or(JWT_SECRET_ENV, DEFAULT_JWT_SECRET),
            client_origin: get_or(CLIENT_ORIGIN_ENV, DEFAULT_CLIENT_ORIGIN),
            tls,
            rate_limit,
            log_format: get(LOG_FORMAT_ENV)
                .map(|v| LogFormat::parse(&v))
                .transpose()?
                .unwrap_or_default(),
        })
    }

    pub fn uses_default_jwt_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
