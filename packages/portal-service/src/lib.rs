pub mod cascade;
pub mod enrichment;
pub mod normalize;
pub mod result_set;
pub mod subject;
pub mod work_items;

mod error;

pub use cascade::{CascadeTrace, Escalation, TierTrace};
pub use enrichment::{EnrichedItem, EnrichmentTrace};
pub use error::{Error, Result};
pub use normalize::{Diagnostics, WorkItemView, WorkItemsResponse};
pub use result_set::ResultSet;
pub use work_items::WorkItemsRequest;

use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use portal_config::{Config, Identity, Store};
use portal_domain::Formula;
use portal_providers::{IdentityClaims, RawRecord, identity, record_store};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Formula-query access to the record store.
pub trait RecordStore
where
	Self: Send + Sync,
{
	fn query<'a>(
		&'a self,
		cfg: &'a Store,
		collection: &'a str,
		formula: &'a str,
		page_size_hint: u32,
	) -> BoxFuture<'a, portal_providers::Result<Vec<RawRecord>>>;
}

/// Resolves a bearer credential to the identity behind it.
pub trait IdentityProvider
where
	Self: Send + Sync,
{
	fn verify<'a>(
		&'a self,
		cfg: &'a Identity,
		credential: &'a str,
	) -> BoxFuture<'a, portal_providers::Result<IdentityClaims>>;
}

#[derive(Clone)]
pub struct Upstreams {
	pub store: Arc<dyn RecordStore>,
	pub identity: Arc<dyn IdentityProvider>,
}
impl Upstreams {
	pub fn new(store: Arc<dyn RecordStore>, identity: Arc<dyn IdentityProvider>) -> Self {
		Self { store, identity }
	}
}
impl Default for Upstreams {
	fn default() -> Self {
		let upstream = Arc::new(HttpUpstreams);

		Self { store: upstream.clone(), identity: upstream }
	}
}

pub struct PortalService {
	pub cfg: Config,
	pub upstreams: Upstreams,
}
impl PortalService {
	pub fn new(cfg: Config) -> Self {
		Self { cfg, upstreams: Upstreams::default() }
	}

	pub fn with_upstreams(cfg: Config, upstreams: Upstreams) -> Self {
		Self { cfg, upstreams }
	}

	/// Runs one store query under the configured deadline.
	///
	/// Failures and timeouts become [`Error::UpstreamUnavailable`]; nothing is retried here.
	pub(crate) async fn query_store(
		&self,
		stage: &str,
		collection: &str,
		formula: &Formula,
	) -> Result<Vec<RawRecord>> {
		let deadline = Duration::from_millis(self.cfg.resolution.query_timeout_ms);
		let query = self.upstreams.store.query(
			&self.cfg.store,
			collection,
			formula.as_str(),
			self.cfg.store.page_size,
		);

		match tokio::time::timeout(deadline, query).await {
			Ok(Ok(records)) => Ok(records),
			Ok(Err(err)) => {
				tracing::warn!(
					stage,
					collection,
					formula = %formula,
					error = %err,
					"Record store query failed."
				);

				Err(Error::UpstreamUnavailable { stage: stage.to_string(), message: err.to_string() })
			},
			Err(_) => {
				tracing::warn!(
					stage,
					collection,
					formula = %formula,
					timeout_ms = self.cfg.resolution.query_timeout_ms,
					"Record store query timed out."
				);

				Err(Error::UpstreamUnavailable {
					stage: stage.to_string(),
					message: "Record store query timed out.".to_string(),
				})
			},
		}
	}
}

struct HttpUpstreams;
impl RecordStore for HttpUpstreams {
	fn query<'a>(
		&'a self,
		cfg: &'a Store,
		collection: &'a str,
		formula: &'a str,
		page_size_hint: u32,
	) -> BoxFuture<'a, portal_providers::Result<Vec<RawRecord>>> {
		Box::pin(record_store::query(cfg, collection, formula, page_size_hint))
	}
}
impl IdentityProvider for HttpUpstreams {
	fn verify<'a>(
		&'a self,
		cfg: &'a Identity,
		credential: &'a str,
	) -> BoxFuture<'a, portal_providers::Result<IdentityClaims>> {
		Box::pin(identity::verify(cfg, credential))
	}
}
