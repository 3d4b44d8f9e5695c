pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Ingestion failed at {step} after {attempts} attempts: {cause}")]
	Terminal { step: &'static str, attempts: u32, cause: String },
	#[error("Generation error: {message}")]
	Generation { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error("Vector index error: {message}")]
	VectorIndex { message: String },
	#[error("Session store unavailable: {message}")]
	SessionUnavailable { message: String },
}
impl From<nook_session::Error> for Error {
	fn from(err: nook_session::Error) -> Self {
		Self::SessionUnavailable { message: err.to_string() }
	}
}

pub(crate) fn storage_err(err: color_eyre::Report) -> Error {
	Error::Storage { message: err.to_string() }
}

pub(crate) fn index_err(err: color_eyre::Report) -> Error {
	Error::VectorIndex { message: err.to_string() }
}

pub(crate) fn provider_err(err: color_eyre::Report) -> Error {
	Error::Provider { message: err.to_string() }
}
