use std::time::Duration;

use portal_domain::{Formula, Subject, formula};
use portal_providers::RawRecord;

use crate::{Error, PortalService, Result};

const STAGE: &str = "subject";

impl PortalService {
	/// Resolves the caller to a subject record.
	///
	/// A bearer credential is required unless the request asks for debug output, names an
	/// override subject, and `security.allow_debug_override` is on.
	pub async fn authenticate(
		&self,
		credential: Option<&str>,
		debug: bool,
		as_subject: Option<&str>,
	) -> Result<Subject> {
		let override_id = as_subject.map(str::trim).filter(|id| !id.is_empty());

		if debug
			&& self.cfg.security.allow_debug_override
			&& let Some(subject_id) = override_id
		{
			tracing::warn!(subject_id, "Debug subject override in use.");

			return self.subject_by_id(subject_id).await;
		}

		let credential = credential.map(str::trim).filter(|token| !token.is_empty()).ok_or_else(
			|| Error::Unauthenticated { message: "A bearer credential is required.".to_string() },
		)?;
		let deadline = Duration::from_millis(self.cfg.identity.timeout_ms);
		let verify = self.upstreams.identity.verify(&self.cfg.identity, credential);
		let claims = match tokio::time::timeout(deadline, verify).await {
			Ok(Ok(claims)) => claims,
			Ok(Err(err)) if err.is_unauthorized() => {
				return Err(Error::Unauthenticated {
					message: "The credential was rejected.".to_string(),
				});
			},
			Ok(Err(err)) => {
				tracing::warn!(error = %err, "Identity provider request failed.");

				return Err(Error::UpstreamUnavailable {
					stage: "identity".to_string(),
					message: err.to_string(),
				});
			},
			Err(_) => {
				tracing::warn!("Identity provider request timed out.");

				return Err(Error::UpstreamUnavailable {
					stage: "identity".to_string(),
					message: "Identity provider request timed out.".to_string(),
				});
			},
		};
		let schema = &self.cfg.schema.subjects;
		let Some(lookup) = formula::subject_by_email(schema, &claims.email) else {
			return Err(Error::SubjectNotFound {
				message: "The identity carries no email to match.".to_string(),
			});
		};
		let record = self.first_subject(&lookup).await?.ok_or_else(|| Error::SubjectNotFound {
			message: "No subject record matches the identity.".to_string(),
		})?;

		Ok(self.subject_from_record(record, &claims.display_name))
	}

	async fn subject_by_id(&self, subject_id: &str) -> Result<Subject> {
		let lookup = formula::record_ids(&[subject_id]).ok_or_else(|| Error::InvalidRequest {
			message: "asSubject must be non-empty.".to_string(),
		})?;
		let record = self.first_subject(&lookup).await?.ok_or_else(|| Error::SubjectNotFound {
			message: format!("No subject record with id {subject_id}."),
		})?;

		Ok(self.subject_from_record(record, ""))
	}

	async fn first_subject(&self, lookup: &Formula) -> Result<Option<RawRecord>> {
		let records =
			self.query_store(STAGE, &self.cfg.schema.subjects.collection, lookup).await?;

		Ok(records.into_iter().next())
	}

	fn subject_from_record(&self, record: RawRecord, fallback_name: &str) -> Subject {
		let display_name = record
			.fields
			.get(&self.cfg.schema.subjects.name_field)
			.and_then(|value| value.as_str())
			.map(str::trim)
			.filter(|name| !name.is_empty())
			.unwrap_or(fallback_name.trim())
			.to_string();

		Subject { subject_id: record.id, display_name }
	}
}
