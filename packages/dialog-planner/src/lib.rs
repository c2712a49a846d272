//! Authorization-aware query planning for dialog search.
//!
//! Planning is pure: the same filters and grant always compile to the same SQL text and
//! parameter list, and nothing here touches the database.

pub mod org_scoped;
pub mod selector;
pub mod shaper;
pub mod sql;
pub mod strategy;

mod error;

pub use error::{Error, Result};
pub use selector::StrategySelector;
pub use shaper::{PartyServiceGroup, ShapedGrant, shape_grant};
pub use sql::{BindScalar, BindValue, SqlBuilder};
pub use strategy::{PartyDriven, SearchContext, SearchStrategy, ServiceDriven};

use std::sync::Arc;

use serde::Serialize;

use dialog_domain::{AuthorizationGrant, SearchFilterSet};

/// Executable SQL plus its ordered parameters.
#[derive(Clone, Debug, Serialize)]
pub struct CompiledQuery {
	pub sql: String,
	pub params: Vec<BindValue>,
	pub strategy: &'static str,
}

pub struct QueryPlanner {
	selector: StrategySelector,
}

impl QueryPlanner {
	pub fn new(selector: StrategySelector) -> Self {
		Self { selector }
	}

	/// Registers the built-in strategies with party-driven probing as the default.
	pub fn from_config(cfg: &dialog_config::Search) -> Result<Self> {
		let max_services = usize::try_from(cfg.party_driven_max_services).unwrap_or(usize::MAX);
		let strategies: Vec<Arc<dyn SearchStrategy>> =
			vec![Arc::new(PartyDriven::new(max_services)), Arc::new(ServiceDriven)];
		let selector = StrategySelector::new(
			strategies,
			strategy::party_driven::NAME,
			cfg.enable_strategy_branching,
		)?;

		Ok(Self::new(selector))
	}

	pub fn plan(&self, filters: &SearchFilterSet, grant: &AuthorizationGrant) -> CompiledQuery {
		let context = SearchContext::new(filters, grant);
		let strategy = self.selector.select(&context);
		let compiled = strategy.compile(&context);

		tracing::debug!(
			strategy = compiled.strategy,
			groups = context.shaped.groups.len(),
			delegated_dialogs = grant.dialog_ids.len(),
			params = compiled.params.len(),
			"Planned dialog search."
		);

		compiled
	}

	/// Plans a service-owner listing scoped to `filters.orgs` with no grant.
	pub fn plan_org_scoped(&self, filters: &SearchFilterSet) -> CompiledQuery {
		let compiled = org_scoped::compile(filters);

		tracing::debug!(
			strategy = compiled.strategy,
			orgs = filters.orgs.len(),
			params = compiled.params.len(),
			"Planned dialog search."
		);

		compiled
	}
}
