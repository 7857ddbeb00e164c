use reqwest::header::AUTHORIZATION;
use serde_json::{Map, Value};

use portal_providers::Error;

#[test]
fn builds_bearer_auth_header() {
	let headers =
		portal_providers::auth_headers("secret", &Map::new()).expect("Failed to build headers.");
	let value = headers.get(AUTHORIZATION).expect("Missing authorization header.");

	assert_eq!(value, "Bearer secret");
}

#[test]
fn rejects_non_string_default_headers() {
	let mut defaults = Map::new();

	defaults.insert("X-Trace".to_string(), Value::from(1));

	let err = portal_providers::auth_headers("secret", &defaults)
		.expect_err("Expected invalid config error.");

	assert!(matches!(err, Error::InvalidConfig { .. }));
}

#[test]
fn unauthorized_statuses_are_recognized() {
	let rejected = Error::Status { status: 401, body: String::new() };
	let forbidden = Error::Status { status: 403, body: String::new() };
	let unavailable = Error::Status { status: 503, body: "busy".to_string() };

	assert!(rejected.is_unauthorized());
	assert!(forbidden.is_unauthorized());
	assert!(!unavailable.is_unauthorized());
}
