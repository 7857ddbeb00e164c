//! In-memory upstreams and fixtures for exercising the portal without a network.

use std::{
	sync::{Arc, Mutex},
	time::Duration,
};

use serde_json::Value;

use portal_config::{
	Config, Identity, Resolution, Schema, Security, Service, Store, SubEntitySchema,
	SubjectSchema, WorkItemSchema,
};
use portal_providers::{Error, IdentityClaims, RawRecord, Result};
use portal_service::{BoxFuture, IdentityProvider, PortalService, RecordStore, Upstreams};

type Matcher = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// One query the store received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
	pub collection: String,
	pub formula: String,
}

enum Reply {
	Records(Vec<RawRecord>),
	Fail,
	Hang,
}

struct Rule {
	collection: String,
	matcher: Matcher,
	reply: Reply,
}

/// A record store answering from a fixed list of rules.
///
/// Rules are checked in insertion order and the first one whose collection and matcher accept
/// the query answers it. Unmatched queries return no records.
#[derive(Default)]
pub struct ScriptedStore {
	rules: Vec<Rule>,
	calls: Mutex<Vec<Call>>,
}
impl ScriptedStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn on<F>(self, collection: &str, matcher: F, records: Vec<RawRecord>) -> Self
	where
		F: Fn(&str) -> bool + Send + Sync + 'static,
	{
		self.rule(collection, matcher, Reply::Records(records))
	}

	/// Answers matching queries with an upstream 503.
	pub fn fail_on<F>(self, collection: &str, matcher: F) -> Self
	where
		F: Fn(&str) -> bool + Send + Sync + 'static,
	{
		self.rule(collection, matcher, Reply::Fail)
	}

	/// Never answers matching queries.
	pub fn hang_on<F>(self, collection: &str, matcher: F) -> Self
	where
		F: Fn(&str) -> bool + Send + Sync + 'static,
	{
		self.rule(collection, matcher, Reply::Hang)
	}

	pub fn calls(&self) -> Vec<Call> {
		self.calls.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}

	/// Queries whose formula contains `needle`.
	pub fn calls_matching(&self, needle: &str) -> usize {
		self.calls().iter().filter(|call| call.formula.contains(needle)).count()
	}

	fn rule<F>(mut self, collection: &str, matcher: F, reply: Reply) -> Self
	where
		F: Fn(&str) -> bool + Send + Sync + 'static,
	{
		self.rules.push(Rule { collection: collection.to_string(), matcher: Box::new(matcher), reply });

		self
	}
}
impl RecordStore for ScriptedStore {
	fn query<'a>(
		&'a self,
		_cfg: &'a Store,
		collection: &'a str,
		formula: &'a str,
		_page_size_hint: u32,
	) -> BoxFuture<'a, Result<Vec<RawRecord>>> {
		self.calls
			.lock()
			.unwrap_or_else(|err| err.into_inner())
			.push(Call { collection: collection.to_string(), formula: formula.to_string() });

		let rule = self
			.rules
			.iter()
			.find(|rule| rule.collection == collection && (rule.matcher)(formula));

		Box::pin(async move {
			match rule.map(|rule| &rule.reply) {
				None => Ok(Vec::new()),
				Some(Reply::Records(records)) => Ok(records.clone()),
				Some(Reply::Fail) => {
					Err(Error::Status { status: 503, body: "scripted failure".to_string() })
				},
				Some(Reply::Hang) => {
					tokio::time::sleep(Duration::from_secs(3_600)).await;

					Ok(Vec::new())
				},
			}
		})
	}
}

/// An identity provider that accepts exactly one credential.
pub struct StaticIdentity {
	token: String,
	claims: IdentityClaims,
	unavailable: bool,
}
impl StaticIdentity {
	pub fn new(token: &str, subject: &str, display_name: &str, email: &str) -> Self {
		Self {
			token: token.to_string(),
			claims: IdentityClaims {
				subject: subject.to_string(),
				display_name: display_name.to_string(),
				email: email.to_string(),
			},
			unavailable: false,
		}
	}

	/// Fails every verification with an upstream 502.
	pub fn unavailable() -> Self {
		Self { unavailable: true, ..Self::new("", "", "", "") }
	}
}
impl IdentityProvider for StaticIdentity {
	fn verify<'a>(
		&'a self,
		_cfg: &'a Identity,
		credential: &'a str,
	) -> BoxFuture<'a, Result<IdentityClaims>> {
		let result = if self.unavailable {
			Err(Error::Status { status: 502, body: "identity down".to_string() })
		} else if credential == self.token {
			Ok(self.claims.clone())
		} else {
			Err(Error::Status { status: 401, body: "invalid token".to_string() })
		};

		Box::pin(async move { result })
	}
}

/// Builds a service over scripted upstreams, keeping a handle on the store for call assertions.
pub fn service(
	cfg: Config,
	store: ScriptedStore,
	identity: StaticIdentity,
) -> (PortalService, Arc<ScriptedStore>) {
	let store = Arc::new(store);
	let upstreams = Upstreams::new(store.clone(), Arc::new(identity));

	(PortalService::with_upstreams(cfg, upstreams), store)
}

pub fn record(id: &str, fields: Value) -> RawRecord {
	RawRecord::new(id, fields)
}

/// Configuration matching the field names used throughout the tests.
///
/// Work items live in `Tasks`, with subject links in `Client`/`Client Name` and sub-entity links
/// in `Project`/`Project Id`. Sub-entities live in `Projects` and subjects in `Clients`.
pub fn test_config() -> Config {
	Config {
		service: Service { http_bind: "127.0.0.1:8080".to_string(), log_level: "info".to_string() },
		store: Store {
			api_base: "http://127.0.0.1:9".to_string(),
			base_id: "appTest".to_string(),
			api_key: "test-key".to_string(),
			timeout_ms: 1_000,
			page_size: 100,
			max_pages: 20,
			default_headers: Default::default(),
		},
		identity: Identity {
			api_base: "http://127.0.0.1:9".to_string(),
			path: "/userinfo".to_string(),
			timeout_ms: 1_000,
			default_headers: Default::default(),
		},
		schema: Schema {
			subjects: SubjectSchema {
				collection: "Clients".to_string(),
				email_field: "Email".to_string(),
				name_field: "Name".to_string(),
			},
			work_items: WorkItemSchema {
				collection: "Tasks".to_string(),
				title_field: "Title".to_string(),
				status_field: "Status".to_string(),
				progress_field: "Progress".to_string(),
				due_date_field: "Due Date".to_string(),
				subject_ids_field: "Client".to_string(),
				subject_names_field: "Client Name".to_string(),
				sub_entity_ids_field: "Project".to_string(),
				sub_entity_text_field: "Project Id".to_string(),
			},
			sub_entities: SubEntitySchema {
				collection: "Projects".to_string(),
				name_field: "Name".to_string(),
				owner_names_field: "Client Name".to_string(),
			},
		},
		resolution: Resolution::default(),
		security: Security { bind_localhost_only: true, allow_debug_override: false },
	}
}
