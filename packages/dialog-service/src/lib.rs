//! Dialog search for end users and service owners: authorization, planning and execution.

pub mod authorization;
pub mod search;

mod error;

pub use authorization::StaticAuthorizationProvider;
pub use error::{Error, Result};
pub use search::{DialogItem, SearchRequest, SearchResponse, ServiceOwnerSearchRequest};

use std::{future::Future, pin::Pin, sync::Arc};

use dialog_config::Config;
use dialog_domain::AuthorizationGrant;
use dialog_planner::QueryPlanner;
use dialog_storage::db::Db;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Resolves what a caller may see, narrowed to the requested parties and services.
pub trait AuthorizationProvider
where
	Self: Send + Sync,
{
	fn resolve_grant<'a>(
		&'a self,
		caller: &'a str,
		requested_parties: &'a [String],
		requested_services: &'a [String],
	) -> BoxFuture<'a, Result<AuthorizationGrant>>;
}

pub struct DialogSearchService {
	pub cfg: Config,
	pub db: Db,
	pub planner: QueryPlanner,
	pub authorization: Arc<dyn AuthorizationProvider>,
}

impl DialogSearchService {
	pub fn new(cfg: Config, db: Db, authorization: Arc<dyn AuthorizationProvider>) -> Result<Self> {
		let planner = QueryPlanner::from_config(&cfg.search)?;

		Ok(Self { cfg, db, planner, authorization })
	}
}
