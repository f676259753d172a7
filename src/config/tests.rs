use serial_test::serial;

use super::*;

fn parse(args: &[&str]) -> CliArgs {
    CliArgs::try_parse_from(args).expect("arguments parse")
}

#[test]
fn defaults_resolve_to_in_process_backends() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.logging.level, LevelFilter::INFO);
    assert_eq!(settings.logging.format, LogFormat::Compact);
    assert!(settings.database.url.is_none());
    assert_eq!(settings.database.max_connections.get(), 8);
    assert!(settings.cache.enabled);
    assert!(settings.cache.master_url.is_none());
    assert_eq!(settings.cache.key_prefix, "tasklane:");
    assert_eq!(settings.broker.kind, BrokerKind::Memory);
    assert_eq!(settings.broker.partitions.get(), 4);
    assert_eq!(settings.broker.block, Duration::from_secs(1));
    assert_eq!(settings.search.refresh, RefreshPolicy::Immediate);
    assert_eq!(settings.search.max_hits.get(), 100);
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("info".to_string());
    raw.broker.partitions = Some(2);

    let cli = parse(&[
        "tasklane",
        "consume",
        "--log-level",
        "debug",
        "--broker-partitions",
        "16",
        "--search-url",
        "http://localhost:9200",
    ]);
    let Some(Command::Consume(args)) = cli.command else {
        panic!("expected consume command");
    };

    raw.apply_consume_overrides(&args);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert_eq!(settings.broker.partitions.get(), 16);
    assert_eq!(
        settings.search.url.as_deref(),
        Some("http://localhost:9200")
    );
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    raw.apply_connection_overrides(&ConnectionOverrides {
        log_json: Some(true),
        ..Default::default()
    });
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.logging.format, LogFormat::Json);
}

#[test]
fn redis_broker_requires_a_url() {
    let mut raw = RawSettings::default();
    raw.broker.kind = Some("redis".to_string());

    let err = Settings::from_raw(raw).expect_err("missing url");
    assert!(matches!(err, LoadError::Invalid { key: "broker.url", .. }));
}

#[test]
fn zero_partitions_are_rejected() {
    let mut raw = RawSettings::default();
    raw.broker.partitions = Some(0);

    let err = Settings::from_raw(raw).expect_err("zero partitions");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "broker.partitions",
            ..
        }
    ));
}

#[test]
fn unknown_refresh_policy_is_rejected() {
    let mut raw = RawSettings::default();
    raw.search.refresh = Some("sometimes".to_string());
    assert!(Settings::from_raw(raw).is_err());

    let mut raw = RawSettings::default();
    raw.search.refresh = Some("wait_for".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.search.refresh, RefreshPolicy::WaitFor);
}

#[test]
fn blank_urls_count_as_unset() {
    let mut raw = RawSettings::default();
    raw.database.url = Some("   ".to_string());
    raw.cache.master_url = Some(String::new());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.database.url.is_none());
    assert!(settings.cache.master_url.is_none());
}

#[test]
fn default_to_consume_command() {
    let cli = parse(&["tasklane"]);
    assert!(cli.command.is_none());
}

#[test]
fn parse_reindex_arguments() {
    let cli = parse(&[
        "tasklane",
        "reindex",
        "--database-url",
        "postgres://localhost/tasklane",
        "--cache-master-url",
        "redis://127.0.0.1:6379",
    ]);

    match cli.command {
        Some(Command::Reindex(args)) => {
            assert_eq!(
                args.connections.database.database_url.as_deref(),
                Some("postgres://localhost/tasklane")
            );
            assert_eq!(
                args.connections.cache_master_url.as_deref(),
                Some("redis://127.0.0.1:6379")
            );
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn parse_migrate_arguments() {
    let cli = parse(&["tasklane", "migrate", "--database-url", "postgres://db"]);
    match cli.command {
        Some(Command::Migrate(args)) => {
            assert_eq!(args.database.database_url.as_deref(), Some("postgres://db"));
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
#[serial]
fn environment_overrides_file_defaults() {
    // SAFETY: serialised with every other test that touches the environment.
    unsafe {
        std::env::set_var("TASKLANE__BROKER__PUBLISHER_WORKERS", "6");
        std::env::set_var("TASKLANE__SEARCH__LISTS_INDEX", "lists-v2");
    }

    let settings = load(&parse(&["tasklane", "reindex"]));

    unsafe {
        std::env::remove_var("TASKLANE__BROKER__PUBLISHER_WORKERS");
        std::env::remove_var("TASKLANE__SEARCH__LISTS_INDEX");
    }

    let settings = settings.expect("settings load");
    assert_eq!(settings.broker.publisher_workers.get(), 6);
    assert_eq!(settings.search.lists_index, "lists-v2");
}
