//! Resolution cascade: which work items belong to a subject, optionally scoped to a sub-entity.
//!
//! The record store holds the subject and sub-entity relations in two inconsistent shapes (id
//! arrays and text/scalar fields), so no single formula finds everything. The cascade is an
//! ordered list of stages. Each stage runs a primary lane of conditional tiers and a parallel
//! lane of independent tiers, concurrently. The first stage whose union is non-empty wins; if
//! every stage is empty the result is an empty set, not an error.
//!
//! Unscoped requests have a single stage:
//!
//! - primary: `by_id`, then `by_name` only when `by_id` returned nothing, no status filter is set
//!   and the subject has a display name;
//! - parallel: `owned_sub_entities`, which discovers sub-entities naming the subject as owner and
//!   queries their work items in batches.
//!
//! Scoped requests escalate through `contains`, `equality` and `safety_net` stages. The safety
//! net re-runs the unscoped subject tiers and keeps only items whose raw sub-entity refs list the
//! requested id.

use portal_config::MAX_BATCH_SIZE;
use portal_domain::{Filter, Formula, FormulaInputs, FormulaSet, Subject, WorkItem, formula};
use portal_providers::RawRecord;

use crate::{PortalService, Result, ResultSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Escalation {
	Unscoped,
	Contains,
	Equality,
	SafetyNet,
}
impl Escalation {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Unscoped => "unscoped",
			Self::Contains => "contains",
			Self::Equality => "equality",
			Self::SafetyNet => "safety_net",
		}
	}
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierTrace {
	pub stage: Escalation,
	pub tier: &'static str,
	pub formulas: Vec<String>,
	/// Records the store returned for this tier.
	pub returned: usize,
	/// Items left after the tier's in-memory filter.
	pub kept: usize,
	pub skipped: bool,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeTrace {
	/// Last stage that ran.
	pub escalation: Escalation,
	pub used_equality_tier: bool,
	pub used_safety_net: bool,
	pub tiers: Vec<TierTrace>,
}
impl CascadeTrace {
	fn new() -> Self {
		Self {
			escalation: Escalation::Unscoped,
			used_equality_tier: false,
			used_safety_net: false,
			tiers: Vec::new(),
		}
	}

	fn enter(&mut self, stage: Escalation) {
		self.escalation = stage;

		match stage {
			Escalation::Equality => self.used_equality_tier = true,
			Escalation::SafetyNet => self.used_safety_net = true,
			Escalation::Unscoped | Escalation::Contains => {},
		}
	}
}

#[derive(Debug)]
pub struct Resolution {
	pub found: ResultSet,
	pub trace: CascadeTrace,
}

/// Everything a tier can look at while deciding whether and what to query.
pub(crate) struct TierContext<'a> {
	pub(crate) subject: &'a Subject,
	pub(crate) filter: &'a Filter,
	pub(crate) formulas: FormulaSet,
}
impl<'a> TierContext<'a> {
	pub(crate) fn new(cfg: &portal_config::Config, subject: &'a Subject, filter: &'a Filter) -> Self {
		let inputs = FormulaInputs {
			subject_id: &subject.subject_id,
			display_name: &subject.display_name,
			sub_entity_id: filter.sub_entity_id.as_deref(),
			statuses: &filter.statuses,
			search_term: filter.search_term.as_deref(),
		};

		Self { subject, filter, formulas: FormulaSet::build(&cfg.schema.work_items, &inputs) }
	}

	fn has_display_name(&self) -> bool {
		!self.subject.display_name.trim().is_empty()
	}
}

#[derive(Clone, Copy)]
struct Tier {
	name: &'static str,
	source: Source,
	applies: fn(&TierContext<'_>, &Lane) -> bool,
	keep: Keep,
}

#[derive(Clone, Copy)]
enum Source {
	/// One formula query against the work item collection.
	WorkItems(fn(&FormulaSet) -> Option<Formula>),
	/// Sub-entity discovery followed by batched work item queries.
	OwnedSubEntities,
}

#[derive(Clone, Copy)]
enum Keep {
	All,
	RelatedToSubject,
	ListsSubEntity,
}
impl Keep {
	fn allows(self, cx: &TierContext<'_>, item: &WorkItem) -> bool {
		match self {
			Self::All => true,
			Self::RelatedToSubject => item
				.subject_refs
				.mentions_subject(&cx.subject.subject_id, &cx.subject.display_name),
			Self::ListsSubEntity => cx
				.filter
				.sub_entity_id
				.as_deref()
				.map(|id| item.sub_entity_refs.mentions_id(id))
				.unwrap_or(false),
		}
	}
}

struct Stage {
	level: Escalation,
	primary: Vec<Tier>,
	parallel: Vec<Tier>,
}

/// Accumulated state of one lane within a stage.
#[derive(Default)]
struct Lane {
	/// Raw records returned by the tiers run so far.
	returned: usize,
	found: ResultSet,
	traces: Vec<TierTrace>,
}

struct Fetched {
	formulas: Vec<String>,
	records: Vec<RawRecord>,
}

fn plan(scoped: bool) -> Vec<Stage> {
	let id_tier =
		Tier { name: "by_id", source: Source::WorkItems(by_id), applies: always, keep: Keep::All };
	let name_tier = Tier {
		name: "by_name",
		source: Source::WorkItems(by_name),
		applies: name_fallback,
		keep: Keep::All,
	};

	if !scoped {
		return vec![Stage {
			level: Escalation::Unscoped,
			primary: vec![id_tier, name_tier],
			parallel: vec![Tier {
				name: "owned_sub_entities",
				source: Source::OwnedSubEntities,
				applies: named,
				keep: Keep::All,
			}],
		}];
	}

	vec![
		Stage {
			level: Escalation::Contains,
			primary: vec![
				Tier {
					name: "scoped_by_id",
					source: Source::WorkItems(scoped_by_id),
					applies: always,
					keep: Keep::All,
				},
				Tier {
					name: "scoped_by_name",
					source: Source::WorkItems(scoped_by_name),
					applies: named,
					keep: Keep::All,
				},
			],
			parallel: vec![Tier {
				name: "sub_entity_only",
				source: Source::WorkItems(sub_entity_only),
				applies: always,
				keep: Keep::RelatedToSubject,
			}],
		},
		Stage {
			level: Escalation::Equality,
			primary: vec![
				Tier {
					name: "equality_by_id",
					source: Source::WorkItems(equality_by_id),
					applies: always,
					keep: Keep::All,
				},
				Tier {
					name: "equality_by_name",
					source: Source::WorkItems(equality_by_name),
					applies: named,
					keep: Keep::All,
				},
			],
			parallel: Vec::new(),
		},
		Stage {
			level: Escalation::SafetyNet,
			primary: vec![
				Tier { keep: Keep::ListsSubEntity, ..id_tier },
				Tier { keep: Keep::ListsSubEntity, ..name_tier },
			],
			parallel: Vec::new(),
		},
	]
}

fn always(_: &TierContext<'_>, _: &Lane) -> bool {
	true
}

fn named(cx: &TierContext<'_>, _: &Lane) -> bool {
	cx.has_display_name()
}

/// The by-name fallback only runs when the by-id tier came back empty. A status filter disables
/// it outright.
fn name_fallback(cx: &TierContext<'_>, lane: &Lane) -> bool {
	lane.returned == 0 && !cx.formulas.has_status_filter() && cx.has_display_name()
}

fn by_id(f: &FormulaSet) -> Option<Formula> {
	f.filtered(&[f.by_id.as_ref()])
}

fn by_name(f: &FormulaSet) -> Option<Formula> {
	f.filtered(&[f.by_name.as_ref()])
}

fn scoped_by_id(f: &FormulaSet) -> Option<Formula> {
	f.filtered(&[f.by_id.as_ref(), f.by_sub_entity_contains.as_ref()])
}

fn scoped_by_name(f: &FormulaSet) -> Option<Formula> {
	f.filtered(&[f.by_name.as_ref(), f.by_sub_entity_contains.as_ref()])
}

fn sub_entity_only(f: &FormulaSet) -> Option<Formula> {
	f.filtered(&[f.by_sub_entity_contains.as_ref()])
}

fn equality_by_id(f: &FormulaSet) -> Option<Formula> {
	f.filtered(&[f.by_id.as_ref(), f.by_sub_entity_equality.as_ref()])
}

fn equality_by_name(f: &FormulaSet) -> Option<Formula> {
	f.filtered(&[f.by_name.as_ref(), f.by_sub_entity_equality.as_ref()])
}

impl PortalService {
	/// Runs the cascade for one subject and filter.
	///
	/// Any failed query aborts the whole cascade; partial results are never returned.
	pub async fn resolve(&self, subject: &Subject, filter: &Filter) -> Result<Resolution> {
		let cx = TierContext::new(&self.cfg, subject, filter);
		let mut trace = CascadeTrace::new();

		for stage in plan(filter.sub_entity_id.is_some()) {
			trace.enter(stage.level);

			let (primary, parallel) = tokio::try_join!(
				self.run_lane(&cx, stage.level, &stage.primary),
				self.run_lane(&cx, stage.level, &stage.parallel),
			)?;

			trace.tiers.extend(primary.traces);
			trace.tiers.extend(parallel.traces);

			let found = primary.found.union(parallel.found);

			tracing::debug!(
				stage = stage.level.as_str(),
				subject_id = %subject.subject_id,
				candidates = found.len(),
				"Cascade stage finished."
			);

			if !found.is_empty() {
				return Ok(Resolution { found, trace });
			}
		}

		Ok(Resolution { found: ResultSet::default(), trace })
	}

	async fn run_lane(
		&self,
		cx: &TierContext<'_>,
		level: Escalation,
		tiers: &[Tier],
	) -> Result<Lane> {
		let mut lane = Lane::default();

		for tier in tiers {
			if !(tier.applies)(cx, &lane) {
				lane.traces.push(skipped(level, tier.name));

				continue;
			}

			let stage = format!("{}/{}", level.as_str(), tier.name);
			let fetched = match tier.source {
				Source::WorkItems(build) => {
					let Some(formula) = build(&cx.formulas) else {
						lane.traces.push(skipped(level, tier.name));

						continue;
					};
					let records = self
						.query_store(&stage, &self.cfg.schema.work_items.collection, &formula)
						.await?;

					Fetched { formulas: vec![formula.into_string()], records }
				},
				Source::OwnedSubEntities => self.owned_sub_entity_items(cx, &stage).await?,
			};
			let returned = fetched.records.len();
			let items: Vec<WorkItem> = fetched
				.records
				.iter()
				.map(|record| {
					WorkItem::from_fields(&record.id, &record.fields, &self.cfg.schema.work_items)
				})
				.filter(|item| tier.keep.allows(cx, item))
				.collect();
			let kept = items.len();

			tracing::debug!(stage = %stage, returned, kept, "Cascade tier finished.");

			lane.returned += returned;
			lane.found = std::mem::take(&mut lane.found).union(ResultSet::from_items(items));
			lane.traces.push(TierTrace {
				stage: level,
				tier: tier.name,
				formulas: fetched.formulas,
				returned,
				kept,
				skipped: false,
			});
		}

		Ok(lane)
	}

	/// Finds sub-entities whose owner field names the subject, then fetches work items linked to
	/// any of them. Ids are split into sequential batches so none are dropped.
	async fn owned_sub_entity_items(&self, cx: &TierContext<'_>, stage: &str) -> Result<Fetched> {
		let schema = &self.cfg.schema;
		let mut formulas = Vec::new();
		let mut records = Vec::new();
		let Some(discovery) =
			formula::owned_sub_entities(&schema.sub_entities, &cx.subject.display_name)
		else {
			return Ok(Fetched { formulas, records });
		};
		let owned = self.query_store(stage, &schema.sub_entities.collection, &discovery).await?;

		formulas.push(discovery.into_string());

		let mut ids: Vec<&str> = Vec::with_capacity(owned.len());

		for record in &owned {
			if !ids.contains(&record.id.as_str()) {
				ids.push(record.id.as_str());
			}
		}

		let batch_size = self.cfg.resolution.batch_size.clamp(1, MAX_BATCH_SIZE) as usize;

		for batch in ids.chunks(batch_size) {
			let Some(batch_formula) =
				cx.formulas.filtered(&[formula::any_sub_entity(&schema.work_items, batch).as_ref()])
			else {
				continue;
			};

			records.extend(
				self.query_store(stage, &schema.work_items.collection, &batch_formula).await?,
			);
			formulas.push(batch_formula.into_string());
		}

		Ok(Fetched { formulas, records })
	}
}

fn skipped(stage: Escalation, tier: &'static str) -> TierTrace {
	TierTrace { stage, tier, formulas: Vec::new(), returned: 0, kept: 0, skipped: true }
}
