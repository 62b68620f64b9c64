use clap::Parser;

use super::*;

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.public_port = Some(4000);
    raw.logging.level = Some("info".to_string());

    let overrides = ServeOverrides {
        public_port: Some(4321),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.public_addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn defaults_resolve_without_any_source() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.public_addr.port(), DEFAULT_PUBLIC_PORT);
    assert_eq!(settings.server.admin_addr.port(), DEFAULT_ADMIN_PORT);
    assert_eq!(settings.server.graceful_shutdown, Duration::from_secs(30));
    assert_eq!(
        settings.database.max_connections.get(),
        DEFAULT_DB_MAX_CONNECTIONS
    );
    assert!(settings.database.url.is_none());
    assert!(matches!(settings.logging.format, LogFormat::Compact));
}

#[test]
fn blank_database_url_is_treated_as_missing() {
    let mut raw = RawSettings::default();
    raw.database.url = Some("   ".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.database.url.is_none());
}

#[test]
fn zero_pool_size_is_rejected() {
    let mut raw = RawSettings::default();
    raw.database.max_connections = Some(0);

    let err = Settings::from_raw(raw).expect_err("zero pool");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "database.max_connections",
            ..
        }
    ));
}

#[test]
fn shared_listener_address_is_rejected() {
    let mut raw = RawSettings::default();
    raw.server.admin_port = Some(DEFAULT_PUBLIC_PORT);

    let err = Settings::from_raw(raw).expect_err("same address");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "server.admin_port",
            ..
        }
    ));
}

#[test]
fn unknown_log_level_is_rejected() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("chatty".to_string());

    let err = Settings::from_raw(raw).expect_err("bad level");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "logging.level",
            ..
        }
    ));
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["konut"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_proximity_arguments() {
    let args = CliArgs::parse_from([
        "konut",
        "proximity",
        "--database-url",
        "postgres://example",
        "--invalidate",
        "--concurrency",
        "4",
    ]);

    match args.command.expect("proximity command") {
        Command::Proximity(proximity) => {
            assert_eq!(
                proximity.database.database_url.as_deref(),
                Some("postgres://example")
            );
            assert!(proximity.invalidate);
            assert!(!proximity.invalidate_only);
            assert_eq!(proximity.concurrency, 4);
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn proximity_concurrency_defaults_to_one() {
    let args = CliArgs::parse_from(["konut", "proximity", "--invalidate-only"]);

    match args.command.expect("proximity command") {
        Command::Proximity(proximity) => {
            assert!(proximity.invalidate_only);
            assert_eq!(proximity.concurrency, 1);
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn invalidate_flags_conflict() {
    let result =
        CliArgs::try_parse_from(["konut", "proximity", "--invalidate", "--invalidate-only"]);
    assert!(result.is_err());
}

#[test]
fn proximity_command_only_overrides_database_url() {
    let args = CliArgs::parse_from(["konut", "proximity", "--database-url", "postgres://cli"]);
    let mut raw = RawSettings::default();
    raw.database.url = Some("postgres://file".to_string());
    raw.server.public_port = Some(8080);

    if let Some(Command::Proximity(proximity)) = args.command.as_ref() {
        raw.apply_database_override(&proximity.database);
    }
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.database.url.as_deref(), Some("postgres://cli"));
    assert_eq!(settings.server.public_addr.port(), 8080);
}

#[test]
fn distances_default_to_latest_listings() {
    let args = CliArgs::parse_from(["konut", "distances"]);

    match args.command.expect("distances command") {
        Command::Distances(distances) => {
            assert_eq!(distances.listing_id, None);
            assert!(!distances.all);
            assert_eq!(distances.limit, 200);
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn distances_single_listing_conflicts_with_all() {
    let args = CliArgs::parse_from(["konut", "distances", "--listing-id", "12"]);
    match args.command.expect("distances command") {
        Command::Distances(distances) => assert_eq!(distances.listing_id, Some(12)),
        _ => panic!("wrong command parsed"),
    }

    let result = CliArgs::try_parse_from(["konut", "distances", "--listing-id", "12", "--all"]);
    assert!(result.is_err());
}
