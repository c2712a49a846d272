pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Default search strategy {name} is not registered.")]
	MissingDefaultStrategy { name: String },
	#[error("Search strategy {name} is registered more than once.")]
	DuplicateStrategy { name: String },
}
