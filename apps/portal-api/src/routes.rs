use axum::{
	Json, Router,
	extract::{Query, State, rejection::QueryRejection},
	http::{HeaderMap, StatusCode, header},
	response::{IntoResponse, Response},
	routing::get,
};
use serde::{Deserialize, Serialize};

use portal_service::{Error as ServiceError, WorkItemsRequest, WorkItemsResponse};

use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItemsQuery {
	pub sub_entity_id: Option<String>,
	pub status: Option<String>,
	pub search: Option<String>,
	pub limit: Option<i64>,
	#[serde(default)]
	pub debug: bool,
	pub as_subject: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}
impl ApiError {
	fn new(
		status: StatusCode,
		error_code: impl Into<String>,
		message: impl Into<String>,
		fields: Option<Vec<String>>,
	) -> Self {
		Self { status, error_code: error_code.into(), message: message.into(), fields }
	}
}
impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		match err {
			ServiceError::Unauthenticated { message } =>
				json_error(StatusCode::UNAUTHORIZED, "unauthenticated", message, None),
			ServiceError::SubjectNotFound { message } =>
				json_error(StatusCode::NOT_FOUND, "subject_not_found", message, None),
			ServiceError::UpstreamUnavailable { stage, message } => {
				tracing::error!(stage = %stage, error = %message, "Upstream unavailable.");

				json_error(
					StatusCode::BAD_GATEWAY,
					"upstream_unavailable",
					"An upstream service failed; no partial results were returned.",
					Some(vec![stage]),
				)
			},
			ServiceError::InvalidRequest { message } =>
				json_error(StatusCode::BAD_REQUEST, "invalid_request", message, None),
		}
	}
}
impl From<QueryRejection> for ApiError {
	fn from(err: QueryRejection) -> Self {
		json_error(StatusCode::BAD_REQUEST, "invalid_request", err.body_text(), None)
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message, fields: self.fields };

		(self.status, Json(body)).into_response()
	}
}

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/work-items", get(work_items))
		.with_state(state)
}

pub fn json_error(
	status: StatusCode,
	code: &str,
	message: impl Into<String>,
	fields: Option<Vec<String>>,
) -> ApiError {
	ApiError::new(status, code, message, fields)
}

/// Reads a bearer token from the `Authorization` header. The scheme name is case-insensitive.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
	let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?.trim();
	let (scheme, token) = value.split_once(' ')?;

	if !scheme.eq_ignore_ascii_case("bearer") {
		return None;
	}

	let token = token.trim();

	(!token.is_empty()).then(|| token.to_string())
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn work_items(
	State(state): State<AppState>,
	headers: HeaderMap,
	query: Result<Query<WorkItemsQuery>, QueryRejection>,
) -> Result<Json<WorkItemsResponse>, ApiError> {
	let Query(query) = query?;
	let request = WorkItemsRequest {
		credential: bearer_token(&headers),
		sub_entity_id: query.sub_entity_id,
		status: query.status,
		search: query.search,
		limit: query.limit,
		debug: query.debug,
		as_subject: query.as_subject,
	};
	let response = state.service.list_work_items(request).await?;

	Ok(Json(response))
}
