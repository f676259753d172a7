//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

pub use cli::{
    BrokerKindArg, BrokerOverrides, CliArgs, Command, ConnectionOverrides, ConsumeArgs,
    DatabaseOverride, MigrateArgs, ReindexArgs,
};

use std::{
    num::{NonZeroU32, NonZeroUsize},
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::search::RefreshPolicy;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "tasklane";
const ENV_PREFIX: &str = "TASKLANE";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_CACHE_KEY_PREFIX: &str = "tasklane:";
const DEFAULT_STREAM_PREFIX: &str = "tasklane:events:";
const DEFAULT_PARTITIONS: u64 = 4;
const DEFAULT_PUBLISHER_WORKERS: u64 = 2;
const DEFAULT_QUEUE_CAPACITY: u64 = 1024;
const DEFAULT_STREAM_MAX_LEN: u64 = 100_000;
const DEFAULT_BLOCK_MS: u64 = 1_000;
const DEFAULT_LISTS_INDEX: &str = "lists";
const DEFAULT_ITEMS_INDEX: &str = "items";
const DEFAULT_MAX_HITS: u64 = 100;
const DEFAULT_SEARCH_TIMEOUT_SECS: u64 = 5;

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub cache: CacheSettings,
    pub broker: BrokerSettings,
    pub search: SearchSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enabled: bool,
    pub master_url: Option<String>,
    pub replica_url: Option<String>,
    pub key_prefix: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerKind {
    Memory,
    Redis,
}

#[derive(Debug, Clone)]
pub struct BrokerSettings {
    pub kind: BrokerKind,
    pub url: Option<String>,
    pub stream_prefix: String,
    pub partitions: NonZeroUsize,
    pub publisher_workers: NonZeroUsize,
    pub queue_capacity: NonZeroUsize,
    pub stream_max_len: NonZeroUsize,
    pub block: Duration,
}

#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub url: Option<String>,
    pub lists_index: String,
    pub items_index: String,
    pub refresh: RefreshPolicy,
    pub max_hits: NonZeroUsize,
    pub timeout: Duration,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Consume(args)) => raw.apply_consume_overrides(args),
        Some(Command::Reindex(args)) => raw.apply_connection_overrides(&args.connections),
        Some(Command::Migrate(args)) => raw.apply_database_override(&args.database),
        None => raw.apply_consume_overrides(&ConsumeArgs::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    cache: RawCacheSettings,
    broker: RawBrokerSettings,
    search: RawSearchSettings,
}

impl RawSettings {
    fn apply_consume_overrides(&mut self, args: &ConsumeArgs) {
        self.apply_connection_overrides(&args.connections);

        let overrides = &args.broker;
        if let Some(kind) = overrides.broker_kind {
            self.broker.kind = Some(
                match kind {
                    BrokerKindArg::Memory => "memory",
                    BrokerKindArg::Redis => "redis",
                }
                .to_string(),
            );
        }
        if let Some(url) = overrides.broker_url.as_ref() {
            self.broker.url = Some(url.clone());
        }
        if let Some(partitions) = overrides.broker_partitions {
            self.broker.partitions = Some(partitions);
        }
        if let Some(workers) = overrides.broker_publisher_workers {
            self.broker.publisher_workers = Some(workers);
        }
    }

    fn apply_connection_overrides(&mut self, overrides: &ConnectionOverrides) {
        self.apply_database_override(&overrides.database);

        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(max) = overrides.database_max_connections {
            self.database.max_connections = Some(max);
        }
        if let Some(url) = overrides.cache_master_url.as_ref() {
            self.cache.master_url = Some(url.clone());
        }
        if let Some(url) = overrides.cache_replica_url.as_ref() {
            self.cache.replica_url = Some(url.clone());
        }
        if let Some(url) = overrides.search_url.as_ref() {
            self.search.url = Some(url.clone());
        }
    }

    fn apply_database_override(&mut self, overrides: &DatabaseOverride) {
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            database,
            cache,
            broker,
            search,
        } = raw;

        Ok(Self {
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            cache: build_cache_settings(cache),
            broker: build_broker_settings(broker)?,
            search: build_search_settings(search)?,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let max_connections = non_zero_u32(
        database
            .max_connections
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS)
            .into(),
        "database.max_connections",
    )?;

    Ok(DatabaseSettings {
        url: non_blank(database.url),
        max_connections,
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> CacheSettings {
    CacheSettings {
        enabled: cache.enabled.unwrap_or(true),
        master_url: non_blank(cache.master_url),
        replica_url: non_blank(cache.replica_url),
        key_prefix: cache
            .key_prefix
            .unwrap_or_else(|| DEFAULT_CACHE_KEY_PREFIX.to_string()),
    }
}

fn build_broker_settings(broker: RawBrokerSettings) -> Result<BrokerSettings, LoadError> {
    let kind = match broker.kind.as_deref().map(str::trim) {
        None | Some("memory") => BrokerKind::Memory,
        Some("redis") => BrokerKind::Redis,
        Some(other) => {
            return Err(LoadError::invalid(
                "broker.kind",
                format!("expected `memory` or `redis`, got `{other}`"),
            ));
        }
    };

    let url = non_blank(broker.url);
    if kind == BrokerKind::Redis && url.is_none() {
        return Err(LoadError::invalid(
            "broker.url",
            "required when broker.kind is `redis`",
        ));
    }

    let block_ms = broker.block_ms.unwrap_or(DEFAULT_BLOCK_MS);
    if block_ms == 0 {
        return Err(LoadError::invalid(
            "broker.block_ms",
            "must be greater than zero",
        ));
    }

    Ok(BrokerSettings {
        kind,
        url,
        stream_prefix: broker
            .stream_prefix
            .unwrap_or_else(|| DEFAULT_STREAM_PREFIX.to_string()),
        partitions: non_zero_usize(
            broker.partitions.unwrap_or(DEFAULT_PARTITIONS),
            "broker.partitions",
        )?,
        publisher_workers: non_zero_usize(
            broker.publisher_workers.unwrap_or(DEFAULT_PUBLISHER_WORKERS),
            "broker.publisher_workers",
        )?,
        queue_capacity: non_zero_usize(
            broker.queue_capacity.unwrap_or(DEFAULT_QUEUE_CAPACITY),
            "broker.queue_capacity",
        )?,
        stream_max_len: non_zero_usize(
            broker.stream_max_len.unwrap_or(DEFAULT_STREAM_MAX_LEN),
            "broker.stream_max_len",
        )?,
        block: Duration::from_millis(block_ms),
    })
}

fn build_search_settings(search: RawSearchSettings) -> Result<SearchSettings, LoadError> {
    let refresh = match search.refresh.as_deref().map(str::trim) {
        None | Some("true") | Some("immediate") => RefreshPolicy::Immediate,
        Some("wait_for") => RefreshPolicy::WaitFor,
        Some("false") | Some("background") => RefreshPolicy::Background,
        Some(other) => {
            return Err(LoadError::invalid(
                "search.refresh",
                format!("expected `immediate`, `wait_for` or `background`, got `{other}`"),
            ));
        }
    };

    let timeout_secs = search.timeout_secs.unwrap_or(DEFAULT_SEARCH_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "search.timeout_secs",
            "must be greater than zero",
        ));
    }

    Ok(SearchSettings {
        url: non_blank(search.url),
        lists_index: search
            .lists_index
            .unwrap_or_else(|| DEFAULT_LISTS_INDEX.to_string()),
        items_index: search
            .items_index
            .unwrap_or_else(|| DEFAULT_ITEMS_INDEX.to_string()),
        refresh,
        max_hits: non_zero_usize(
            search.max_hits.unwrap_or(DEFAULT_MAX_HITS),
            "search.max_hits",
        )?,
        timeout: Duration::from_secs(timeout_secs),
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    enabled: Option<bool>,
    master_url: Option<String>,
    replica_url: Option<String>,
    key_prefix: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawBrokerSettings {
    kind: Option<String>,
    url: Option<String>,
    stream_prefix: Option<String>,
    partitions: Option<u64>,
    publisher_workers: Option<u64>,
    queue_capacity: Option<u64>,
    stream_max_len: Option<u64>,
    block_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSearchSettings {
    url: Option<String>,
    lists_index: Option<String>,
    items_index: Option<String>,
    refresh: Option<String>,
    max_hits: Option<u64>,
    timeout_secs: Option<u64>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    let value: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

fn non_zero_usize(value: u64, key: &'static str) -> Result<NonZeroUsize, LoadError> {
    let value: usize = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for usize"))?;
    NonZeroUsize::new(value).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

#[cfg(test)]
mod tests;
