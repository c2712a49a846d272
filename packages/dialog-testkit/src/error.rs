pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid {env} value: {message}")]
	InvalidDsn { env: &'static str, message: String },
	#[error("No admin database reachable: {message}")]
	AdminUnavailable { message: String },
	#[error("Failed to {action} test database {name}: {source}")]
	Database {
		action: &'static str,
		name: String,
		#[source]
		source: sqlx::Error,
	},
}
