pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Unauthenticated: {message}")]
	Unauthenticated { message: String },
	#[error("Subject not found: {message}")]
	SubjectNotFound { message: String },
	#[error("Upstream unavailable at {stage}: {message}")]
	UpstreamUnavailable { stage: String, message: String },
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
}
impl From<portal_domain::FilterError> for Error {
	fn from(err: portal_domain::FilterError) -> Self {
		Self::InvalidRequest { message: err.to_string() }
	}
}
