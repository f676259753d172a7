use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the tasklane binary.
#[derive(Debug, Parser)]
#[command(
    name = "tasklane",
    version,
    about = "Keeps todo lists, their cache, and their search index in step"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "TASKLANE_CONFIG_FILE",
        value_name = "PATH",
        value_hint = ValueHint::FilePath
    )]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Subscribe every topic and keep the search indices up to date (default).
    Consume(Box<ConsumeArgs>),
    /// Rebuild both search indices from the relational store.
    Reindex(ReindexArgs),
    /// Apply the embedded database migrations and exit.
    Migrate(MigrateArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ConsumeArgs {
    #[command(flatten)]
    pub connections: ConnectionOverrides,

    #[command(flatten)]
    pub broker: BrokerOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ReindexArgs {
    #[command(flatten)]
    pub connections: ConnectionOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct MigrateArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,
}

#[derive(Debug, Args, Default, Clone)]
pub struct DatabaseOverride {
    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ConnectionOverrides {
    #[command(flatten)]
    pub database: DatabaseOverride,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT")]
    pub database_max_connections: Option<u32>,

    /// Override the cache master URL.
    #[arg(long = "cache-master-url", value_name = "URL")]
    pub cache_master_url: Option<String>,

    /// Override the cache replica URL.
    #[arg(long = "cache-replica-url", value_name = "URL")]
    pub cache_replica_url: Option<String>,

    /// Override the search engine URL.
    #[arg(long = "search-url", value_name = "URL")]
    pub search_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BrokerKindArg {
    Memory,
    Redis,
}

#[derive(Debug, Args, Default, Clone)]
pub struct BrokerOverrides {
    /// Override the broker backend.
    #[arg(long = "broker-kind", value_name = "KIND", value_enum)]
    pub broker_kind: Option<BrokerKindArg>,

    /// Override the broker URL.
    #[arg(long = "broker-url", value_name = "URL")]
    pub broker_url: Option<String>,

    /// Override the number of partitions per topic.
    #[arg(long = "broker-partitions", value_name = "COUNT")]
    pub broker_partitions: Option<u64>,

    /// Override the number of publisher workers.
    #[arg(long = "broker-publisher-workers", value_name = "COUNT")]
    pub broker_publisher_workers: Option<u64>,
}
