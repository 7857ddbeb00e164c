use std::time::Duration;

use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{Error, Result};

/// One record as returned by the store, before any schema is applied.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawRecord {
	pub id: String,
	#[serde(default)]
	pub fields: Map<String, Value>,
}
impl RawRecord {
	pub fn new(id: impl Into<String>, fields: Value) -> Self {
		let fields = match fields {
			Value::Object(map) => map,
			_ => Map::new(),
		};

		Self { id: id.into(), fields }
	}
}

#[derive(Debug)]
struct RecordPage {
	records: Vec<RawRecord>,
	offset: Option<String>,
}

/// Runs one formula query against one collection, following pagination to the end.
pub async fn query(
	cfg: &portal_config::Store,
	collection: &str,
	formula: &str,
	page_size_hint: u32,
) -> Result<Vec<RawRecord>> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = collection_url(cfg, collection)?;
	let page_size = page_size_hint.clamp(1, cfg.page_size.max(1)).to_string();
	let headers = crate::auth_headers(&cfg.api_key, &cfg.default_headers)?;
	let mut records = Vec::new();
	let mut offset: Option<String> = None;

	for _ in 0..cfg.max_pages {
		let mut params = vec![("filterByFormula", formula), ("pageSize", page_size.as_str())];

		if let Some(cursor) = offset.as_deref() {
			params.push(("offset", cursor));
		}

		let res = client.get(url.clone()).headers(headers.clone()).query(&params).send().await?;
		let json: Value = crate::ensure_success(res).await?.json().await?;
		let page = parse_record_page(json)?;

		records.extend(page.records);

		match page.offset {
			Some(next) => offset = Some(next),
			None => return Ok(records),
		}
	}

	Err(Error::InvalidResponse {
		message: format!(
			"Query against {collection} did not finish within {} pages.",
			cfg.max_pages
		),
	})
}

fn collection_url(cfg: &portal_config::Store, collection: &str) -> Result<Url> {
	let mut url = Url::parse(&cfg.api_base).map_err(|err| Error::InvalidConfig {
		message: format!("store.api_base is not a valid URL: {err}."),
	})?;

	url.path_segments_mut()
		.map_err(|_| Error::InvalidConfig {
			message: "store.api_base cannot be used as a base URL.".to_string(),
		})?
		.pop_if_empty()
		.push(&cfg.base_id)
		.push(collection);

	Ok(url)
}

fn parse_record_page(json: Value) -> Result<RecordPage> {
	let records = json
		.get("records")
		.and_then(Value::as_array)
		.ok_or_else(|| Error::InvalidResponse {
			message: "Record store response is missing records array.".to_string(),
		})?
		.iter()
		.map(|record| serde_json::from_value::<RawRecord>(record.clone()))
		.collect::<Result<Vec<_>, _>>()?;
	let offset = json
		.get("offset")
		.and_then(Value::as_str)
		.filter(|cursor| !cursor.is_empty())
		.map(str::to_string);

	Ok(RecordPage { records, offset })
}
