use std::collections::HashMap;

use super::*;

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn defaults_apply_when_only_database_url_set() {
    let cfg = ServerConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://x/raha")])).unwrap();
    assert_eq!(cfg.database_url, "postgres://x/raha");
    assert_eq!(cfg.port, DEFAULT_PORT);
    assert_eq!(cfg.db_max_connections, DEFAULT_DB_MAX_CONNECTIONS);
    assert_eq!(cfg.session_ttl, Duration::from_secs(24 * 3600));
    assert_eq!(cfg.ai_max_tokens, DEFAULT_AI_MAX_TOKENS);
}

#[test]
fn missing_database_url_is_error() {
    assert_eq!(ServerConfig::from_lookup(lookup(&[])), Err(ConfigError::Missing("DATABASE_URL")));
    assert_eq!(
        ServerConfig::from_lookup(lookup(&[("DATABASE_URL", "  ")])),
        Err(ConfigError::Missing("DATABASE_URL"))
    );
}

#[test]
fn overrides_parse() {
    let cfg = ServerConfig::from_lookup(lookup(&[
        ("DATABASE_URL", "postgres://x/raha"),
        ("PORT", "8080"),
        ("DB_MAX_CONNECTIONS", "12"),
        ("SESSION_TTL_HOURS", "2"),
        ("AI_MAX_TOKENS", "300"),
    ]))
    .unwrap();
    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.db_max_connections, 12);
    assert_eq!(cfg.session_ttl, Duration::from_secs(7200));
    assert_eq!(cfg.ai_max_tokens, 300);
}

#[test]
fn garbage_number_is_error() {
    let err = ServerConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://x"), ("PORT", "eighty")])).unwrap_err();
    assert_eq!(err, ConfigError::Invalid { key: "PORT", value: "eighty".into() });
}

#[test]
fn zero_ttl_is_rejected() {
    let err =
        ServerConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://x"), ("SESSION_TTL_HOURS", "0")])).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { key: "SESSION_TTL_HOURS", .. }));
}
