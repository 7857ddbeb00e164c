use serde_json::Value;

/// A relationship as the record store happens to hold it for one record.
///
/// Linked-record fields come back as arrays of ids. Lookup fields and relations stored as a
/// scalar come back as text. Records are not consistent about which of the two is populated.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RelationRefs {
	ByIds(Vec<String>),
	ByText(String),
}
impl RelationRefs {
	/// Reads the relation from the id field, falling back to the text field when the id field is
	/// missing or empty.
	pub fn resolve(ids: Option<&Value>, text: Option<&Value>) -> Self {
		match ids.map(Self::from_value) {
			Some(refs) if !refs.is_empty() => refs,
			_ => text.map(Self::from_value).unwrap_or_else(Self::empty),
		}
	}

	pub fn from_value(value: &Value) -> Self {
		match value {
			Value::Array(items) => {
				let strings: Vec<String> = items
					.iter()
					.filter_map(scalar_text)
					.map(|item| item.trim().to_string())
					.filter(|item| !item.is_empty())
					.collect();

				// Lookup fields yield arrays of names; callers decide whether the field holds ids.
				Self::ByIds(strings)
			},
			other => {
				let text = scalar_text(other).unwrap_or_default().trim().to_string();

				// Separators alone carry no reference.
				if text.split(',').all(|part| part.trim().is_empty()) {
					return Self::empty();
				}

				Self::ByText(text)
			},
		}
	}

	pub fn empty() -> Self {
		Self::ByIds(Vec::new())
	}

	pub fn is_empty(&self) -> bool {
		match self {
			Self::ByIds(ids) => ids.is_empty(),
			Self::ByText(_) => self.primary_id().is_none(),
		}
	}

	/// First referenced id. A text relation is treated as a scalar id, or a comma-separated list
	/// of ids.
	pub fn primary_id(&self) -> Option<&str> {
		match self {
			Self::ByIds(ids) => ids.first().map(String::as_str),
			Self::ByText(text) => text.split(',').map(str::trim).find(|part| !part.is_empty()),
		}
	}

	/// Whether `id` literally appears among the raw references.
	pub fn mentions_id(&self, id: &str) -> bool {
		let id = id.trim();

		if id.is_empty() {
			return false;
		}

		match self {
			Self::ByIds(ids) => ids.iter().any(|value| value == id),
			Self::ByText(text) => text.split(',').any(|part| part.trim() == id),
		}
	}

	/// Whether the relation points at the subject, by id for arrays and by display name for text.
	pub fn mentions_subject(&self, subject_id: &str, display_name: &str) -> bool {
		match self {
			Self::ByIds(ids) => {
				ids.iter().any(|value| value == subject_id)
					|| (!display_name.trim().is_empty()
						&& ids.iter().any(|value| value.eq_ignore_ascii_case(display_name.trim())))
			},
			Self::ByText(text) => {
				let name = display_name.trim().to_lowercase();

				text.split(',').any(|part| part.trim() == subject_id)
					|| (!name.is_empty() && text.to_lowercase().contains(&name))
			},
		}
	}
}

fn scalar_text(value: &Value) -> Option<String> {
	match value {
		Value::String(text) => Some(text.clone()),
		Value::Number(number) => Some(number.to_string()),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn id_field_wins_when_populated() {
		let refs = RelationRefs::resolve(Some(&json!(["rec1", "rec2"])), Some(&json!("Alice")));

		assert_eq!(refs, RelationRefs::ByIds(vec!["rec1".to_string(), "rec2".to_string()]));
	}

	#[test]
	fn falls_back_to_text_when_ids_are_empty() {
		let refs = RelationRefs::resolve(Some(&json!([])), Some(&json!("Alice, Bob")));

		assert_eq!(refs, RelationRefs::ByText("Alice, Bob".to_string()));
		assert!(refs.mentions_subject("sub_1", "bob"));
		assert!(!refs.mentions_subject("sub_1", "carol"));
	}

	#[test]
	fn missing_fields_are_empty() {
		let refs = RelationRefs::resolve(None, None);

		assert!(refs.is_empty());
		assert_eq!(refs.primary_id(), None);
	}

	#[test]
	fn scalar_relation_mentions_its_id() {
		let refs = RelationRefs::from_value(&json!("proj_9"));

		assert!(refs.mentions_id("proj_9"));
		assert!(!refs.mentions_id("proj_90"));
		assert_eq!(refs.primary_id(), Some("proj_9"));
	}

	#[test]
	fn separator_only_text_is_empty() {
		let refs = RelationRefs::resolve(Some(&json!([])), Some(&json!(" , ")));

		assert_eq!(refs, RelationRefs::empty());
		assert!(refs.is_empty());
		assert_eq!(refs.primary_id(), None);
		assert!(RelationRefs::ByText(",".to_string()).is_empty());
	}

	#[test]
	fn blank_name_never_matches_text() {
		let refs = RelationRefs::ByText("Alice".to_string());

		assert!(!refs.mentions_subject("sub_1", "  "));
	}
}
