//! Filter expressions in the record store's formula language.
//!
//! Every builder returns `None` instead of an expression when a required input is blank, so an
//! absent clause can never be combined as a vacuous `TRUE()`.

use std::fmt::{Display, Formatter};

use portal_config::{SubEntitySchema, SubjectSchema, WorkItemSchema};

/// A boolean filter expression ready to be sent to the record store as an opaque string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Formula(String);
impl Formula {
	pub fn as_str(&self) -> &str {
		&self.0
	}

	pub fn into_string(self) -> String {
		self.0
	}
}
impl Display for Formula {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.0)
	}
}

/// Inputs shared by every clause of one resolution request.
#[derive(Debug, Clone, Copy)]
pub struct FormulaInputs<'a> {
	pub subject_id: &'a str,
	pub display_name: &'a str,
	pub sub_entity_id: Option<&'a str>,
	pub statuses: &'a [String],
	pub search_term: Option<&'a str>,
}

/// Every clause a resolution request can need, built once up front.
#[derive(Debug, Clone)]
pub struct FormulaSet {
	pub by_id: Option<Formula>,
	pub by_name: Option<Formula>,
	pub by_sub_entity_contains: Option<Formula>,
	pub by_sub_entity_equality: Option<Formula>,
	pub status: Option<Formula>,
	pub search: Option<Formula>,
}
impl FormulaSet {
	pub fn build(schema: &WorkItemSchema, inputs: &FormulaInputs<'_>) -> Self {
		let sub_entity_id = inputs.sub_entity_id.unwrap_or_default();

		Self {
			by_id: array_contains(&schema.subject_ids_field, inputs.subject_id),
			by_name: text_contains(&schema.subject_names_field, inputs.display_name),
			by_sub_entity_contains: array_contains(&schema.sub_entity_ids_field, sub_entity_id),
			by_sub_entity_equality: equals(&schema.sub_entity_text_field, sub_entity_id),
			status: any_of(&schema.status_field, inputs.statuses),
			search: text_contains(&schema.title_field, inputs.search_term.unwrap_or_default()),
		}
	}

	/// ANDs the given clauses with the request's status and search clauses.
	///
	/// Returns `None` when any of `clauses` is absent: a tier whose own clause cannot be built
	/// is inapplicable rather than unfiltered.
	pub fn filtered(&self, clauses: &[Option<&Formula>]) -> Option<Formula> {
		let mut parts = Vec::with_capacity(clauses.len() + 2);

		for clause in clauses {
			parts.push((*clause)?);
		}

		parts.extend(self.status.as_ref());
		parts.extend(self.search.as_ref());

		and(parts)
	}

	pub fn has_status_filter(&self) -> bool {
		self.status.is_some()
	}
}

/// Matches records whose id array field holds `id` as a whole element.
pub fn array_contains(field_name: &str, id: &str) -> Option<Formula> {
	let id = id.trim();

	if id.is_empty() {
		return None;
	}

	Some(Formula(format!(
		"FIND({}, ',' & ARRAYJOIN({}, ',') & ',')",
		literal(&format!(",{id},")),
		field(field_name)
	)))
}

/// Case-insensitive substring match against a text or lookup field.
pub fn text_contains(field_name: &str, needle: &str) -> Option<Formula> {
	let needle = needle.trim();

	if needle.is_empty() {
		return None;
	}

	Some(Formula(format!(
		"FIND({}, LOWER({} & ''))",
		literal(&needle.to_lowercase()),
		field(field_name)
	)))
}

/// Exact match for relations stored as a scalar rather than an array.
pub fn equals(field_name: &str, value: &str) -> Option<Formula> {
	let value = value.trim();

	if value.is_empty() {
		return None;
	}

	Some(Formula(format!("{} = {}", field(field_name), literal(value))))
}

/// Disjunction of exact matches, skipping blank values.
pub fn any_of(field_name: &str, values: &[String]) -> Option<Formula> {
	or(values.iter().filter_map(|value| equals(field_name, value)).collect())
}

/// Matches any of the given record ids. Callers keep `ids` within the store's disjunction cap.
pub fn record_ids<S>(ids: &[S]) -> Option<Formula>
where
	S: AsRef<str>,
{
	or(ids
		.iter()
		.map(|id| id.as_ref().trim())
		.filter(|id| !id.is_empty())
		.map(|id| Formula(format!("RECORD_ID() = {}", literal(id))))
		.collect())
}

/// Matches work items linked to any of the given sub-entity ids.
pub fn any_sub_entity<S>(schema: &WorkItemSchema, ids: &[S]) -> Option<Formula>
where
	S: AsRef<str>,
{
	or(ids
		.iter()
		.filter_map(|id| array_contains(&schema.sub_entity_ids_field, id.as_ref()))
		.collect())
}

/// Matches sub-entities whose owner field mentions the subject's display name.
pub fn owned_sub_entities(schema: &SubEntitySchema, display_name: &str) -> Option<Formula> {
	text_contains(&schema.owner_names_field, display_name)
}

pub fn subject_by_email(schema: &SubjectSchema, email: &str) -> Option<Formula> {
	let email = email.trim();

	if email.is_empty() {
		return None;
	}

	Some(Formula(format!(
		"LOWER({} & '') = {}",
		field(&schema.email_field),
		literal(&email.to_lowercase())
	)))
}

pub fn and(clauses: Vec<&Formula>) -> Option<Formula> {
	combine("AND", clauses.into_iter().cloned().collect())
}

fn or(clauses: Vec<Formula>) -> Option<Formula> {
	combine("OR", clauses)
}

fn combine(op: &str, mut clauses: Vec<Formula>) -> Option<Formula> {
	match clauses.len() {
		0 => None,
		1 => clauses.pop(),
		_ => {
			let joined = clauses.iter().map(Formula::as_str).collect::<Vec<_>>().join(", ");

			Some(Formula(format!("{op}({joined})")))
		},
	}
}

/// Quotes a string literal, escaping characters that would terminate it.
pub fn literal(value: &str) -> String {
	let mut out = String::with_capacity(value.len() + 2);

	out.push('\'');

	for ch in value.chars() {
		if matches!(ch, '\\' | '\'' | '"') {
			out.push('\\');
		}

		out.push(ch);
	}

	out.push('\'');

	out
}

fn field(name: &str) -> String {
	format!("{{{}}}", name.replace('}', "\\}"))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn literal_escapes_quotes_and_backslashes() {
		assert_eq!(literal(r#"O'Brien "Bob" \x"#), r#"'O\'Brien \"Bob\" \\x'"#);
	}

	#[test]
	fn field_escapes_closing_brace() {
		assert_eq!(field("Odd}Name"), "{Odd\\}Name}");
	}

	#[test]
	fn combine_returns_single_clause_bare() {
		let only = equals("Status", "Open").expect("clause");

		assert_eq!(and(vec![&only]), Some(only.clone()));
		assert_eq!(and(Vec::new()), None);
	}
}
