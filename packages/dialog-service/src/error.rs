pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Authorization error: {message}")]
	Authorization { message: String },
	#[error("Configuration error: {message}")]
	Config { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
}

impl From<dialog_domain::Error> for Error {
	fn from(err: dialog_domain::Error) -> Self {
		Self::InvalidRequest { message: err.to_string() }
	}
}

impl From<dialog_planner::Error> for Error {
	fn from(err: dialog_planner::Error) -> Self {
		Self::Config { message: err.to_string() }
	}
}

impl From<dialog_storage::Error> for Error {
	fn from(err: dialog_storage::Error) -> Self {
		match err {
			dialog_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			dialog_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
		}
	}
}
