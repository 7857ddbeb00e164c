use serde_json::json;

use portal_config::{SubEntitySchema, SubjectSchema, WorkItemSchema};
use portal_domain::{
	Filter, FilterError, FormulaInputs, FormulaSet, RelationRefs, WorkItem, filter, formula,
};

fn work_item_schema() -> WorkItemSchema {
	WorkItemSchema {
		collection: "Tasks".to_string(),
		title_field: "Title".to_string(),
		status_field: "Status".to_string(),
		progress_field: "Progress".to_string(),
		due_date_field: "Due Date".to_string(),
		subject_ids_field: "Client".to_string(),
		subject_names_field: "Client Name".to_string(),
		sub_entity_ids_field: "Project".to_string(),
		sub_entity_text_field: "Project Id".to_string(),
	}
}

fn inputs<'a>(
	display_name: &'a str,
	sub_entity_id: Option<&'a str>,
	statuses: &'a [String],
	search_term: Option<&'a str>,
) -> FormulaInputs<'a> {
	FormulaInputs { subject_id: "sub_1", display_name, sub_entity_id, statuses, search_term }
}

#[test]
fn by_id_matches_whole_array_elements() {
	let set = FormulaSet::build(&work_item_schema(), &inputs("Alice", None, &[], None));
	let by_id = set.by_id.expect("by-id clause");

	assert_eq!(by_id.as_str(), "FIND(',sub_1,', ',' & ARRAYJOIN({Client}, ',') & ',')");
}

#[test]
fn by_name_is_inapplicable_for_blank_names() {
	let set = FormulaSet::build(&work_item_schema(), &inputs("   ", None, &[], None));

	assert!(set.by_name.is_none());
	assert!(set.filtered(&[set.by_name.as_ref()]).is_none());
}

#[test]
fn by_name_lowercases_and_escapes_the_needle() {
	let set = FormulaSet::build(&work_item_schema(), &inputs("O'Neil", None, &[], None));

	assert_eq!(
		set.by_name.expect("by-name clause").as_str(),
		"FIND('o\\'neil', LOWER({Client Name} & ''))"
	);
}

#[test]
fn absent_clauses_contribute_nothing() {
	let set = FormulaSet::build(&work_item_schema(), &inputs("Alice", None, &[], None));
	let composed = set.filtered(&[set.by_id.as_ref()]).expect("composed");

	assert_eq!(composed, set.by_id.clone().expect("by-id clause"));
	assert!(set.status.is_none());
	assert!(set.search.is_none());
	assert!(set.by_sub_entity_contains.is_none());
	assert!(set.by_sub_entity_equality.is_none());
}

#[test]
fn present_clauses_are_anded() {
	let statuses = vec!["Open".to_string(), "Done".to_string()];
	let set = FormulaSet::build(
		&work_item_schema(),
		&inputs("Alice", Some("proj_9"), &statuses, Some("kickoff")),
	);
	let composed =
		set.filtered(&[set.by_id.as_ref(), set.by_sub_entity_contains.as_ref()]).expect("composed");

	assert_eq!(
		composed.as_str(),
		"AND(FIND(',sub_1,', ',' & ARRAYJOIN({Client}, ',') & ','), \
		 FIND(',proj_9,', ',' & ARRAYJOIN({Project}, ',') & ','), \
		 OR({Status} = 'Open', {Status} = 'Done'), \
		 FIND('kickoff', LOWER({Title} & '')))"
	);
}

#[test]
fn equality_variant_targets_scalar_field() {
	let set = FormulaSet::build(&work_item_schema(), &inputs("Alice", Some("proj_9"), &[], None));

	assert_eq!(
		set.by_sub_entity_equality.expect("equality clause").as_str(),
		"{Project Id} = 'proj_9'"
	);
}

#[test]
fn single_status_is_not_wrapped() {
	let statuses = vec!["Open".to_string()];
	let set = FormulaSet::build(&work_item_schema(), &inputs("Alice", None, &statuses, None));

	assert_eq!(set.status.expect("status clause").as_str(), "{Status} = 'Open'");
}

#[test]
fn record_id_batches_are_ored() {
	let ids = ["recA", "recB"];

	assert_eq!(
		formula::record_ids(&ids).expect("ids clause").as_str(),
		"OR(RECORD_ID() = 'recA', RECORD_ID() = 'recB')"
	);
	assert!(formula::record_ids::<&str>(&[]).is_none());
}

#[test]
fn any_sub_entity_ors_contains_clauses() {
	let ids = vec!["p1".to_string(), "p2".to_string()];
	let clause = formula::any_sub_entity(&work_item_schema(), &ids).expect("clause");

	assert!(clause.as_str().starts_with("OR(FIND(',p1,'"));
	assert!(clause.as_str().contains("FIND(',p2,'"));
}

#[test]
fn owner_and_email_lookups() {
	let sub_entities = SubEntitySchema {
		collection: "Projects".to_string(),
		name_field: "Name".to_string(),
		owner_names_field: "Client Name".to_string(),
	};
	let subjects = SubjectSchema {
		collection: "Clients".to_string(),
		email_field: "Email".to_string(),
		name_field: "Name".to_string(),
	};

	assert_eq!(
		formula::owned_sub_entities(&sub_entities, "Alice").expect("owner clause").as_str(),
		"FIND('alice', LOWER({Client Name} & ''))"
	);
	assert!(formula::owned_sub_entities(&sub_entities, "").is_none());
	assert_eq!(
		formula::subject_by_email(&subjects, "Alice@Example.com").expect("email clause").as_str(),
		"LOWER({Email} & '') = 'alice@example.com'"
	);
}

#[test]
fn work_item_reads_both_relation_shapes() {
	let schema = work_item_schema();
	let linked = json!({
		"Title": "Kickoff",
		"Status": "Open",
		"Progress": 40,
		"Client": ["sub_1"],
		"Project": ["proj_9"],
	});
	let scalar = json!({
		"Title": "Review",
		"Status": "Done",
		"Progress": 0.5,
		"Client Name": "Alice",
		"Project Id": "proj_9",
	});
	let linked =
		WorkItem::from_fields("rec1", linked.as_object().expect("object"), &schema);
	let scalar =
		WorkItem::from_fields("rec2", scalar.as_object().expect("object"), &schema);

	assert_eq!(linked.subject_refs, RelationRefs::ByIds(vec!["sub_1".to_string()]));
	assert_eq!(linked.progress, Some(0.4));
	assert_eq!(scalar.subject_refs, RelationRefs::ByText("Alice".to_string()));
	assert_eq!(scalar.sub_entity_refs.primary_id(), Some("proj_9"));
	assert_eq!(scalar.progress, Some(0.5));
}

#[test]
fn filter_parses_status_lists() {
	assert_eq!(filter::parse_statuses("all"), Vec::<String>::new());
	assert_eq!(filter::parse_statuses(" Open, Done ,Open,"), vec!["Open", "Done"]);
	assert_eq!(filter::parse_statuses("Open,ALL"), Vec::<String>::new());
}

#[test]
fn filter_rejects_malformed_sub_entity_ids() {
	assert_eq!(
		Filter::parse(Some("proj') OR TRUE()"), None, None),
		Err(FilterError::InvalidSubEntityId)
	);
	assert_eq!(
		FilterError::InvalidSubEntityId.to_string(),
		"subEntityId must be 1-64 letters, digits, '_' or '-'."
	);

	let parsed = Filter::parse(Some(" proj_9 "), Some("Open"), Some("  KickOff "))
		.expect("valid filter");

	assert_eq!(parsed.sub_entity_id.as_deref(), Some("proj_9"));
	assert_eq!(parsed.statuses, vec!["Open".to_string()]);
	assert_eq!(parsed.search_term.as_deref(), Some("kickoff"));
}
