use std::collections::{HashMap, HashSet};

use portal_config::MAX_BATCH_SIZE;
use portal_domain::{SubEntity, WorkItem, formula};

use crate::{PortalService, Result, ResultSet};

const STAGE: &str = "enrichment";

/// A work item with its primary sub-entity resolved to a name.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedItem {
	pub item: WorkItem,
	pub sub_entity_id: Option<String>,
	/// `None` exactly when the item references no sub-entity.
	pub sub_entity_name: Option<String>,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentTrace {
	pub distinct_ids: usize,
	pub requested_ids: usize,
	pub resolved_ids: usize,
	pub formula: Option<String>,
}

impl PortalService {
	/// Resolves sub-entity names with one batched lookup.
	///
	/// Only the first `resolution.batch_size` distinct ids are looked up. Ids past the cap, and
	/// ids the store does not return, get the configured unresolved name.
	pub async fn enrich(&self, found: ResultSet) -> Result<(Vec<EnrichedItem>, EnrichmentTrace)> {
		let items = found.into_items();
		let mut seen = HashSet::new();
		let mut distinct: Vec<&str> = Vec::new();

		for item in &items {
			if let Some(id) = item.sub_entity_refs.primary_id()
				&& seen.insert(id)
			{
				distinct.push(id);
			}
		}

		let cap = self.cfg.resolution.batch_size.clamp(1, MAX_BATCH_SIZE) as usize;
		let requested = &distinct[..distinct.len().min(cap)];
		let mut trace = EnrichmentTrace {
			distinct_ids: distinct.len(),
			requested_ids: requested.len(),
			..Default::default()
		};
		let mut names: HashMap<String, String> = HashMap::new();

		if let Some(lookup) = formula::record_ids(requested) {
			let schema = &self.cfg.schema.sub_entities;
			let records = self.query_store(STAGE, &schema.collection, &lookup).await?;

			for record in records {
				let sub_entity = SubEntity::from_fields(&record.id, &record.fields, schema);

				if !sub_entity.name.is_empty() && requested.contains(&sub_entity.id.as_str()) {
					names.insert(sub_entity.id, sub_entity.name);
				}
			}

			trace.formula = Some(lookup.into_string());
			trace.resolved_ids = requested.iter().filter(|id| names.contains_key(**id)).count();
		}

		if distinct.len() > requested.len() {
			tracing::debug!(
				distinct = distinct.len(),
				requested = requested.len(),
				"Sub-entity ids beyond the batch cap were left unresolved."
			);
		}

		let unresolved = &self.cfg.resolution.unresolved_name;
		let enriched = items
			.iter()
			.map(|item| {
				let sub_entity_id = item.sub_entity_refs.primary_id().map(str::to_string);
				let sub_entity_name = sub_entity_id
					.as_deref()
					.map(|id| names.get(id).cloned().unwrap_or_else(|| unresolved.clone()));

				EnrichedItem { item: item.clone(), sub_entity_id, sub_entity_name }
			})
			.collect();

		Ok((enriched, trace))
	}
}
