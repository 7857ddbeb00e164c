use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub store: Store,
	pub identity: Identity,
	pub schema: Schema,
	#[serde(default)]
	pub resolution: Resolution,
	pub security: Security,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

/// Connection settings for the formula-query record store.
#[derive(Debug, Deserialize)]
pub struct Store {
	pub api_base: String,
	pub base_id: String,
	pub api_key: String,
	pub timeout_ms: u64,
	/// Page size requested per call. The store caps this at 100.
	#[serde(default = "default_page_size")]
	pub page_size: u32,
	/// Upper bound on pagination for a single formula query.
	#[serde(default = "default_max_pages")]
	pub max_pages: u32,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct Identity {
	pub api_base: String,
	pub path: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct Schema {
	pub subjects: SubjectSchema,
	pub work_items: WorkItemSchema,
	pub sub_entities: SubEntitySchema,
}

#[derive(Debug, Deserialize)]
pub struct SubjectSchema {
	pub collection: String,
	#[serde(default = "default_email_field")]
	pub email_field: String,
	#[serde(default = "default_name_field")]
	pub name_field: String,
}

/// Field names on the work item collection.
///
/// The subject and sub-entity relations are each read from two fields: a linked-record field
/// holding an array of ids and a lookup field holding display text. Either may be empty for a
/// given record, and both may point at the same physical field.
#[derive(Debug, Deserialize)]
pub struct WorkItemSchema {
	pub collection: String,
	#[serde(default = "default_title_field")]
	pub title_field: String,
	#[serde(default = "default_status_field")]
	pub status_field: String,
	#[serde(default = "default_progress_field")]
	pub progress_field: String,
	#[serde(default = "default_due_date_field")]
	pub due_date_field: String,
	pub subject_ids_field: String,
	pub subject_names_field: String,
	pub sub_entity_ids_field: String,
	pub sub_entity_text_field: String,
}

#[derive(Debug, Deserialize)]
pub struct SubEntitySchema {
	pub collection: String,
	#[serde(default = "default_name_field")]
	pub name_field: String,
	/// Free-text field naming the subjects that own the sub-entity.
	pub owner_names_field: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Resolution {
	pub default_limit: u32,
	pub batch_size: u32,
	pub query_timeout_ms: u64,
	pub unresolved_name: String,
}
impl Default for Resolution {
	fn default() -> Self {
		Self {
			default_limit: 50,
			batch_size: 50,
			query_timeout_ms: 15_000,
			unresolved_name: "Unassigned".to_string(),
		}
	}
}

#[derive(Debug, Deserialize)]
pub struct Security {
	pub bind_localhost_only: bool,
	/// Allows `debug=true&asSubject=<id>` requests without a bearer credential.
	#[serde(default)]
	pub allow_debug_override: bool,
}

fn default_page_size() -> u32 {
	100
}

fn default_max_pages() -> u32 {
	20
}

fn default_email_field() -> String {
	"Email".to_string()
}

fn default_name_field() -> String {
	"Name".to_string()
}

fn default_title_field() -> String {
	"Title".to_string()
}

fn default_status_field() -> String {
	"Status".to_string()
}

fn default_progress_field() -> String {
	"Progress".to_string()
}

fn default_due_date_field() -> String {
	"Due Date".to_string()
}
