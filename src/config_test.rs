use super::*;

#[test]
fn default_matches_documented_values() {
    let config = ServerConfig::default();
    assert_eq!(config.port, 3000);
    assert_eq!(config.client_queue_capacity, 256);
    assert_eq!(config.cursor_min_interval, Duration::from_millis(40));
}

#[test]
fn env_parse_falls_back_for_missing_key() {
    let value: u16 = env_parse("BOARDSYNC_TEST_MISSING_KEY_7F3A", 42);
    assert_eq!(value, 42);
}

#[test]
fn cursor_default_tracks_shared_constant() {
    let config = ServerConfig::default();
    assert_eq!(
        u64::try_from(config.cursor_min_interval.as_millis()).expect("fits"),
        frames::consts::CURSOR_MIN_INTERVAL_MS
    );
}
