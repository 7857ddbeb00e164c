mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, Identity, Resolution, Schema, Security, Service, Store, SubEntitySchema, SubjectSchema,
	WorkItemSchema,
};

use std::{fs, path::Path};

/// Largest disjunction the record store accepts in one formula.
pub const MAX_BATCH_SIZE: u32 = 50;
/// Hard ceiling for the caller-facing result cap.
pub const MAX_LIMIT: u32 = 100;

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}

	for (label, value) in [
		("store.api_base", &cfg.store.api_base),
		("store.base_id", &cfg.store.base_id),
		("store.api_key", &cfg.store.api_key),
		("identity.api_base", &cfg.identity.api_base),
	] {
		if value.trim().is_empty() {
			return Err(Error::Validation { message: format!("{label} must be non-empty.") });
		}
	}

	if cfg.store.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "store.timeout_ms must be greater than zero.".to_string(),
		});
	}
	if !(1..=100).contains(&cfg.store.page_size) {
		return Err(Error::Validation {
			message: "store.page_size must be in the range 1-100.".to_string(),
		});
	}
	if cfg.store.max_pages == 0 {
		return Err(Error::Validation {
			message: "store.max_pages must be greater than zero.".to_string(),
		});
	}
	if cfg.identity.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "identity.timeout_ms must be greater than zero.".to_string(),
		});
	}

	for (label, headers) in
		[("store", &cfg.store.default_headers), ("identity", &cfg.identity.default_headers)]
	{
		if headers.values().any(|value| !value.is_string()) {
			return Err(Error::Validation {
				message: format!("{label}.default_headers values must be strings."),
			});
		}
	}

	validate_schema(&cfg.schema)?;

	let resolution = &cfg.resolution;

	if !(1..=MAX_LIMIT).contains(&resolution.default_limit) {
		return Err(Error::Validation {
			message: format!("resolution.default_limit must be in the range 1-{MAX_LIMIT}."),
		});
	}
	if !(1..=MAX_BATCH_SIZE).contains(&resolution.batch_size) {
		return Err(Error::Validation {
			message: format!("resolution.batch_size must be in the range 1-{MAX_BATCH_SIZE}."),
		});
	}
	if resolution.query_timeout_ms == 0 {
		return Err(Error::Validation {
			message: "resolution.query_timeout_ms must be greater than zero.".to_string(),
		});
	}
	if resolution.unresolved_name.trim().is_empty() {
		return Err(Error::Validation {
			message: "resolution.unresolved_name must be non-empty.".to_string(),
		});
	}

	Ok(())
}

fn validate_schema(schema: &Schema) -> Result<()> {
	let subjects = &schema.subjects;
	let work_items = &schema.work_items;
	let sub_entities = &schema.sub_entities;

	for (label, value) in [
		("schema.subjects.collection", &subjects.collection),
		("schema.subjects.email_field", &subjects.email_field),
		("schema.subjects.name_field", &subjects.name_field),
		("schema.work_items.collection", &work_items.collection),
		("schema.work_items.title_field", &work_items.title_field),
		("schema.work_items.status_field", &work_items.status_field),
		("schema.work_items.progress_field", &work_items.progress_field),
		("schema.work_items.due_date_field", &work_items.due_date_field),
		("schema.work_items.subject_ids_field", &work_items.subject_ids_field),
		("schema.work_items.subject_names_field", &work_items.subject_names_field),
		("schema.work_items.sub_entity_ids_field", &work_items.sub_entity_ids_field),
		("schema.work_items.sub_entity_text_field", &work_items.sub_entity_text_field),
		("schema.sub_entities.collection", &sub_entities.collection),
		("schema.sub_entities.name_field", &sub_entities.name_field),
		("schema.sub_entities.owner_names_field", &sub_entities.owner_names_field),
	] {
		if value.trim().is_empty() {
			return Err(Error::Validation { message: format!("{label} must be non-empty.") });
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	for base in [&mut cfg.store.api_base, &mut cfg.identity.api_base] {
		let trimmed = base.trim().trim_end_matches('/').to_string();

		*base = trimmed;
	}

	if !cfg.identity.path.is_empty() && !cfg.identity.path.starts_with('/') {
		cfg.identity.path.insert(0, '/');
	}

	cfg.resolution.unresolved_name = cfg.resolution.unresolved_name.trim().to_string();
}
