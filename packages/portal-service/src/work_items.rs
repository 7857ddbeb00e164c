use uuid::Uuid;

use portal_domain::{Filter, Subject};

use crate::{
	Diagnostics, PortalService, Result, WorkItemsResponse,
	normalize::{self, clamp_limit},
};

/// One work item listing request, as received from the caller.
#[derive(Debug, Clone, Default)]
pub struct WorkItemsRequest {
	pub credential: Option<String>,
	pub sub_entity_id: Option<String>,
	/// Comma-separated status names; `all` disables the filter.
	pub status: Option<String>,
	pub search: Option<String>,
	pub limit: Option<i64>,
	pub debug: bool,
	pub as_subject: Option<String>,
}

impl PortalService {
	pub async fn list_work_items(&self, req: WorkItemsRequest) -> Result<WorkItemsResponse> {
		let filter = Filter::parse(
			req.sub_entity_id.as_deref(),
			req.status.as_deref(),
			req.search.as_deref(),
		)?;
		let subject = self
			.authenticate(req.credential.as_deref(), req.debug, req.as_subject.as_deref())
			.await?;

		self.resolve_work_items(&subject, &filter, req.limit, req.debug).await
	}

	/// Cascade, enrichment and normalization for an already resolved subject.
	pub async fn resolve_work_items(
		&self,
		subject: &Subject,
		filter: &Filter,
		limit: Option<i64>,
		debug: bool,
	) -> Result<WorkItemsResponse> {
		let resolution = self.resolve(subject, filter).await?;
		let (enriched, enrichment) = self.enrich(resolution.found).await?;
		let limit = clamp_limit(limit, self.cfg.resolution.default_limit);
		let total = enriched.len();
		let trace = resolution.trace;

		tracing::info!(
			subject_id = %subject.subject_id,
			escalation = trace.escalation.as_str(),
			used_equality_tier = trace.used_equality_tier,
			used_safety_net = trace.used_safety_net,
			total,
			limit,
			"Work items resolved."
		);

		let diagnostics = debug.then(|| Diagnostics {
			trace_id: Uuid::new_v4(),
			subject_id: subject.subject_id.clone(),
			total,
			limit,
			cascade: trace,
			enrichment,
		});

		Ok(normalize::normalize(enriched, limit, diagnostics))
	}
}
