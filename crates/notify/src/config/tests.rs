use super::*;

#[test]
fn defaults_validate() {
	let config = ClientConfig::default();
	config.validate().unwrap();
	assert_eq!(config.max_attempts, 5);
	assert_eq!(config.retry_delay_duration(), Duration::from_secs(5));
	assert_eq!(config.settle_delay(), Duration::from_secs(1));
}

#[test]
fn destination_is_scoped_to_user() {
	let config = ClientConfig::default();
	assert_eq!(config.destination_for(&UserId::from("25")), "/user/25/queue/notifications");
}

#[test]
fn env_lookup_overrides_endpoints() {
	let config = ClientConfig::from_lookup(|key| match key {
		ENV_PUSH_URL => Some("wss://push.example/ws".into()),
		ENV_API_URL => Some("https://api.example".into()),
		ENV_TOKEN => Some(String::new()),
		_ => None,
	});
	assert_eq!(config.push_url, "wss://push.example/ws");
	assert_eq!(config.api_url, "https://api.example");
	assert_eq!(config.token, None);
}

#[test]
fn toml_fills_missing_keys_with_defaults() {
	let config = ClientConfig::from_toml_str(
		r#"
		push_url = "ws://10.0.0.2:8087/ws"
		max_attempts = 3
		"#,
	)
	.unwrap();
	assert_eq!(config.push_url, "ws://10.0.0.2:8087/ws");
	assert_eq!(config.max_attempts, 3);
	assert_eq!(config.identify_destination, "/app/subscribe");
}

#[test]
fn rejects_broadcast_style_destination() {
	let mut config = ClientConfig::default();
	config.user_destination = "/topic/notifications".into();
	assert!(matches!(config.validate(), Err(Error::Config(_))));
}

#[test]
fn rejects_unknown_keys_and_bad_schemes() {
	assert!(ClientConfig::from_toml_str("nope = 1").is_err());
	assert!(ClientConfig::from_toml_str(r#"push_url = "http://x""#).is_err());
	assert!(ClientConfig::from_toml_str("max_attempts = 0").is_err());
}
