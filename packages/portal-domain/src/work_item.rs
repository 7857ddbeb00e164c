use serde_json::{Map, Value};
use time::{Date, OffsetDateTime, UtcOffset, format_description::well_known::Rfc3339, macros};

use portal_config::{SubEntitySchema, WorkItemSchema};

use crate::relation::RelationRefs;

/// The calling identity as known to the record store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
	pub subject_id: String,
	pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubEntity {
	pub id: String,
	pub name: String,
}
impl SubEntity {
	pub fn from_fields(id: &str, fields: &Map<String, Value>, schema: &SubEntitySchema) -> Self {
		Self { id: id.to_string(), name: text_field(fields, &schema.name_field) }
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkItem {
	pub id: String,
	pub title: String,
	pub status: String,
	/// Completion as a fraction in `[0, 1]`.
	pub progress: Option<f64>,
	pub due_date: Option<String>,
	pub subject_refs: RelationRefs,
	pub sub_entity_refs: RelationRefs,
}
impl WorkItem {
	pub fn from_fields(id: &str, fields: &Map<String, Value>, schema: &WorkItemSchema) -> Self {
		Self {
			id: id.to_string(),
			title: text_field(fields, &schema.title_field),
			status: text_field(fields, &schema.status_field),
			progress: fields.get(&schema.progress_field).and_then(normalize_progress),
			due_date: fields
				.get(&schema.due_date_field)
				.and_then(Value::as_str)
				.and_then(normalize_due_date),
			subject_refs: RelationRefs::resolve(
				fields.get(&schema.subject_ids_field),
				fields.get(&schema.subject_names_field),
			),
			sub_entity_refs: RelationRefs::resolve(
				fields.get(&schema.sub_entity_ids_field),
				fields.get(&schema.sub_entity_text_field),
			),
		}
	}
}

/// Normalizes progress to a fraction. `%`-suffixed strings and bare values above 1 are read as
/// percentages.
pub fn normalize_progress(value: &Value) -> Option<f64> {
	let (raw, percent) = match value {
		Value::Number(number) => (number.as_f64()?, false),
		Value::String(text) => {
			let text = text.trim();
			let (number, percent) = match text.strip_suffix('%') {
				Some(number) => (number, true),
				None => (text, false),
			};

			(number.trim().parse::<f64>().ok()?, percent)
		},
		_ => return None,
	};

	if !raw.is_finite() {
		return None;
	}

	// A `%` suffix is always a percentage; bare numbers above 1 are read as one.
	let fraction = if percent || raw > 1.0 { raw / 100.0 } else { raw };

	Some(fraction.clamp(0.0, 1.0))
}

/// Re-emits timestamps in RFC 3339 UTC and keeps plain dates as `YYYY-MM-DD`.
pub fn normalize_due_date(raw: &str) -> Option<String> {
	let raw = raw.trim();

	if raw.is_empty() {
		return None;
	}
	if let Ok(ts) = OffsetDateTime::parse(raw, &Rfc3339)
		&& let Ok(formatted) = ts.to_offset(UtcOffset::UTC).format(&Rfc3339)
	{
		return Some(formatted);
	}
	if let Ok(date) = Date::parse(raw, macros::format_description!("[year]-[month]-[day]")) {
		return Some(date.to_string());
	}

	Some(raw.to_string())
}

fn text_field(fields: &Map<String, Value>, name: &str) -> String {
	match fields.get(name) {
		Some(Value::String(text)) => text.trim().to_string(),
		Some(Value::Number(number)) => number.to_string(),
		Some(Value::Array(items)) => items
			.iter()
			.filter_map(Value::as_str)
			.map(str::trim)
			.filter(|item| !item.is_empty())
			.collect::<Vec<_>>()
			.join(", "),
		_ => String::new(),
	}
}
