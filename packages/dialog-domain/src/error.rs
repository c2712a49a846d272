pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid order: {message}")]
	InvalidOrder { message: String },
	#[error("Invalid cursor: {message}")]
	InvalidCursor { message: String },
	#[error("Invalid range: {message}")]
	InvalidRange { message: String },
	#[error("Invalid limit: {message}")]
	InvalidLimit { message: String },
}
