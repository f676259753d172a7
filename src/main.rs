use std::{process, sync::Arc};

use tasklane::{
    application::{
        error::AppError,
        items::ItemService,
        lists::ListService,
        reindex::Reindexer,
        repos::{ItemsRepo, ListsRepo},
        stores::{ItemStore, ListStore},
    },
    cache::{CacheConfig, CacheRouter},
    config::{self, BrokerKind},
    events::{
        EventConsumer, EventProducer, InMemoryBroker, MessageBroker, ProducerConfig,
        RedisStreamsBroker, RedisStreamsOptions,
    },
    infra::{db::PostgresRepositories, error::InfraError, metrics::MetricsObserver, telemetry},
    observe::Observer,
    search::{DocumentIndex, SearchConfig},
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli().map_err(InfraError::from)?;

    telemetry::init(&settings.logging)?;

    match cli_args.command {
        None | Some(config::Command::Consume(_)) => run_consume(settings).await,
        Some(config::Command::Reindex(_)) => run_reindex(settings).await,
        Some(config::Command::Migrate(_)) => run_migrate(settings).await,
    }
}

async fn run_consume(settings: config::Settings) -> Result<(), AppError> {
    let context = ApplicationContext::build(&settings).await?;
    let broker = connect_broker(&settings.broker).await?;
    let producer = Arc::new(EventProducer::start(
        broker.clone(),
        ProducerConfig {
            workers: settings.broker.publisher_workers,
            queue_capacity: settings.broker.queue_capacity,
        },
        context.observer.clone(),
    ));

    let lists = ListService::new(
        context.lists.clone(),
        context.lists_index.clone(),
        producer.clone(),
        context.observer.clone(),
    );
    let items = ItemService::new(
        context.items.clone(),
        context.lists.clone(),
        context.items_index.clone(),
        producer.clone(),
        context.observer.clone(),
    );

    let mut consumer = EventConsumer::new(broker, lists, items, context.observer.clone());
    consumer.start().await.map_err(InfraError::from)?;

    tokio::signal::ctrl_c()
        .await
        .map_err(|err| AppError::unexpected(format!("failed to listen for ctrl-c: {err}")))?;
    info!("Shutdown requested");

    consumer.stop_after_drain(&producer).await;
    Ok(())
}

async fn run_reindex(settings: config::Settings) -> Result<(), AppError> {
    let context = ApplicationContext::build(&settings).await?;
    let report = Reindexer::new(
        context.lists,
        context.items,
        context.lists_index,
        context.items_index,
    )
    .run()
    .await?;

    if report.failures > 0 {
        return Err(AppError::unexpected(format!(
            "reindex finished with {} failed documents",
            report.failures
        )));
    }
    Ok(())
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    let pool = connect_pool(&settings).await?;
    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| InfraError::database(err.to_string()))?;
    info!("Migrations applied");
    Ok(())
}

/// Stores and indices shared by every command that touches entities.
struct ApplicationContext {
    lists: ListStore,
    items: ItemStore,
    lists_index: Arc<dyn DocumentIndex>,
    items_index: Arc<dyn DocumentIndex>,
    observer: Arc<dyn Observer>,
}

impl ApplicationContext {
    async fn build(settings: &config::Settings) -> Result<Self, AppError> {
        let observer: Arc<dyn Observer> = Arc::new(MetricsObserver);

        let pool = connect_pool(settings).await?;
        let repositories = Arc::new(PostgresRepositories::new(pool));
        repositories
            .health_check()
            .await
            .map_err(|err| InfraError::database(err.to_string()))?;

        let cache: CacheRouter = CacheConfig::from(&settings.cache)
            .connect(observer.clone())
            .await
            .map_err(InfraError::from)?;
        let (lists_index, items_index) = SearchConfig::from(&settings.search)
            .connect()
            .await
            .map_err(InfraError::from)?;

        let lists_repo: Arc<dyn ListsRepo> = repositories.clone();
        let items_repo: Arc<dyn ItemsRepo> = repositories;

        Ok(Self {
            lists: ListStore::new(lists_repo, cache.clone()),
            items: ItemStore::new(items_repo, cache),
            lists_index,
            items_index,
            observer,
        })
    }
}

async fn connect_pool(settings: &config::Settings) -> Result<sqlx::PgPool, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))?;

    let pool =
        PostgresRepositories::connect(database_url, settings.database.max_connections.get())
            .await
            .map_err(|err| InfraError::database(err.to_string()))?;
    Ok(pool)
}

async fn connect_broker(
    settings: &config::BrokerSettings,
) -> Result<Arc<dyn MessageBroker>, AppError> {
    match settings.kind {
        BrokerKind::Memory => {
            info!(partitions = settings.partitions.get(), "Using in-process broker");
            Ok(Arc::new(InMemoryBroker::new(settings.partitions.get())))
        }
        BrokerKind::Redis => {
            let url = settings
                .url
                .as_deref()
                .ok_or_else(|| InfraError::configuration("broker url is not configured"))?;
            let broker = RedisStreamsBroker::connect(
                url,
                RedisStreamsOptions {
                    stream_prefix: settings.stream_prefix.clone(),
                    partitions: settings.partitions.get(),
                    max_len: settings.stream_max_len.get(),
                    block: settings.block,
                },
            )
            .await
            .map_err(InfraError::from)?;
            Ok(Arc::new(broker))
        }
    }
}
