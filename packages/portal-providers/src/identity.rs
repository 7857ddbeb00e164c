use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::{Error, Result};

/// What the identity provider knows about the bearer of a credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityClaims {
	pub subject: String,
	pub display_name: String,
	pub email: String,
}

/// Resolves a bearer credential through the provider's user-info endpoint.
///
/// The credential is forwarded as-is and never inspected locally.
pub async fn verify(cfg: &portal_config::Identity, credential: &str) -> Result<IdentityClaims> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let res = client
		.get(url)
		.headers(crate::auth_headers(credential, &cfg.default_headers)?)
		.send()
		.await?;
	let json: Value = crate::ensure_success(res).await?.json().await?;

	parse_claims(&json)
}

fn parse_claims(json: &Value) -> Result<IdentityClaims> {
	let subject = first_string(json, &["sub", "id", "user_id"]).ok_or_else(|| {
		Error::InvalidResponse { message: "Identity response is missing a subject.".to_string() }
	})?;
	let email = first_string(json, &["email"]).unwrap_or_default();
	let display_name = first_string(json, &["name", "display_name", "nickname"]).unwrap_or_default();

	Ok(IdentityClaims { subject, display_name, email })
}

fn first_string(json: &Value, keys: &[&str]) -> Option<String> {
	keys.iter()
		.filter_map(|key| json.get(key))
		.find_map(|value| match value {
			Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
			Value::Number(number) => Some(number.to_string()),
			_ => None,
		})
}
