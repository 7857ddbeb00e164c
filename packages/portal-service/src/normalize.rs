use uuid::Uuid;

use portal_config::MAX_LIMIT;

use crate::{CascadeTrace, EnrichedItem, EnrichmentTrace};

/// Caller-facing projection of a work item.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItemView {
	pub id: String,
	pub title: String,
	pub status: String,
	/// Fraction in `[0, 1]`.
	pub progress: Option<f64>,
	pub due_date: Option<String>,
	pub sub_entity_id: Option<String>,
	pub sub_entity_name: Option<String>,
}
impl From<EnrichedItem> for WorkItemView {
	fn from(enriched: EnrichedItem) -> Self {
		let EnrichedItem { item, sub_entity_id, sub_entity_name } = enriched;

		Self {
			id: item.id,
			title: item.title,
			status: item.status,
			progress: item.progress,
			due_date: item.due_date,
			sub_entity_id,
			sub_entity_name,
		}
	}
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
	pub trace_id: Uuid,
	pub subject_id: String,
	/// Matches before truncation.
	pub total: usize,
	pub limit: u32,
	#[serde(flatten)]
	pub cascade: CascadeTrace,
	pub enrichment: EnrichmentTrace,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct WorkItemsResponse {
	pub items: Vec<WorkItemView>,
	/// Length of `items`, after truncation.
	pub count: usize,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub debug: Option<Diagnostics>,
}

/// Clamps a requested cap into `[1, MAX_LIMIT]`, using `default` when none was given.
pub fn clamp_limit(requested: Option<i64>, default: u32) -> u32 {
	let requested = requested.unwrap_or(i64::from(default));

	requested.clamp(1, i64::from(MAX_LIMIT)) as u32
}

/// Truncates the enriched list to `limit` and projects it.
///
/// Diagnostics are attached only when the caller passed them in, i.e. asked for debug output.
pub fn normalize(
	items: Vec<EnrichedItem>,
	limit: u32,
	debug: Option<Diagnostics>,
) -> WorkItemsResponse {
	let items: Vec<WorkItemView> =
		items.into_iter().take(limit as usize).map(WorkItemView::from).collect();
	let count = items.len();

	WorkItemsResponse { items, count, debug }
}

#[cfg(test)]
mod tests {
	use portal_domain::{RelationRefs, WorkItem};

	use super::*;

	fn enriched(id: &str) -> EnrichedItem {
		EnrichedItem {
			item: WorkItem {
				id: id.to_string(),
				title: format!("Item {id}"),
				status: "Open".to_string(),
				progress: Some(0.5),
				due_date: None,
				subject_refs: RelationRefs::empty(),
				sub_entity_refs: RelationRefs::ByIds(vec!["proj_1".to_string()]),
			},
			sub_entity_id: Some("proj_1".to_string()),
			sub_entity_name: Some("Website".to_string()),
		}
	}

	#[test]
	fn limit_is_clamped() {
		assert_eq!(clamp_limit(None, 50), 50);
		assert_eq!(clamp_limit(Some(0), 50), 1);
		assert_eq!(clamp_limit(Some(-7), 50), 1);
		assert_eq!(clamp_limit(Some(500), 50), 100);
		assert_eq!(clamp_limit(Some(20), 50), 20);
	}

	#[test]
	fn count_reflects_truncated_length() {
		let items = (0..5).map(|i| enriched(&format!("rec{i}"))).collect();
		let response = normalize(items, 1, None);

		assert_eq!(response.items.len(), 1);
		assert_eq!(response.count, 1);
	}

	#[test]
	fn debug_is_omitted_unless_present() {
		let response = normalize(vec![enriched("rec1")], 10, None);
		let json = serde_json::to_value(&response).expect("serialize");

		assert!(json.get("debug").is_none());
		assert_eq!(json["items"][0]["subEntityName"], "Website");
		assert_eq!(json["items"][0]["dueDate"], serde_json::Value::Null);
	}
}
