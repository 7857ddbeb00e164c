use std::sync::OnceLock;

use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
	#[error("subEntityId must be 1-64 letters, digits, '_' or '-'.")]
	InvalidSubEntityId,
}

/// Caller-supplied scoping for one resolution request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
	/// Empty means no status filter.
	pub statuses: Vec<String>,
	pub sub_entity_id: Option<String>,
	/// Lowercased, never blank.
	pub search_term: Option<String>,
}
impl Filter {
	pub fn parse(
		sub_entity_id: Option<&str>,
		statuses: Option<&str>,
		search: Option<&str>,
	) -> Result<Self, FilterError> {
		let sub_entity_id = match sub_entity_id.map(str::trim).filter(|id| !id.is_empty()) {
			Some(id) if is_record_id(id) => Some(id.to_string()),
			Some(_) => return Err(FilterError::InvalidSubEntityId),
			None => None,
		};

		Ok(Self {
			statuses: parse_statuses(statuses.unwrap_or_default()),
			sub_entity_id,
			search_term: search
				.map(|term| term.trim().to_lowercase())
				.filter(|term| !term.is_empty()),
		})
	}
}

/// Splits a comma-separated status list. `all` anywhere in the list disables the filter.
pub fn parse_statuses(raw: &str) -> Vec<String> {
	let mut statuses: Vec<String> = Vec::new();

	for status in raw.split(',').map(str::trim).filter(|status| !status.is_empty()) {
		if status.eq_ignore_ascii_case("all") {
			return Vec::new();
		}
		if !statuses.iter().any(|seen| seen == status) {
			statuses.push(status.to_string());
		}
	}

	statuses
}

pub fn is_record_id(value: &str) -> bool {
	static RECORD_ID: OnceLock<Option<Regex>> = OnceLock::new();

	RECORD_ID
		.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").ok())
		.as_ref()
		.map(|re| re.is_match(value))
		.unwrap_or(false)
}
