//! Service-owner listing: every dialog owned by one of the caller's organizations.
//!
//! No grant is involved, so the query is a single filtered scan of `dialogs` rather than a
//! union of permission candidates.

use dialog_domain::SearchFilterSet;

use crate::{
	CompiledQuery,
	sql::{BindValue, SqlBuilder},
	strategy,
};

pub const NAME: &str = "OrgScoped";

/// Compiles `filters` with `filters.orgs` as the mandatory ownership scope.
///
/// An empty org list matches nothing.
pub fn compile(filters: &SearchFilterSet) -> CompiledQuery {
	let mut builder = SqlBuilder::new();

	if filters.search_term().is_some() {
		builder.push("WITH ");
		strategy::push_search_cte(&mut builder, filters);
		builder.push("\n");
	}

	builder.push(&format!("SELECT {}\nFROM dialogs d", strategy::DIALOG_PROJECTION));
	strategy::push_search_join(&mut builder, filters);

	let orgs = builder.bind(BindValue::TextArray(filters.orgs.clone()));

	builder.push(&format!("\nWHERE d.org = ANY({orgs})"));
	strategy::push_search_match(&mut builder, filters);
	builder
		.append_many_filter("d.party", &filters.parties)
		.append_many_filter("d.service_resource", &filters.service_resources);

	let unscoped = SearchFilterSet { orgs: Vec::new(), ..filters.clone() };

	strategy::push_post_permission_filters(&mut builder, &unscoped);
	builder
		.apply_pagination_condition(&filters.order, filters.cursor.as_ref(), "d")
		.apply_pagination_order(&filters.order, "d")
		.apply_pagination_limit(filters.limit);

	strategy::finish(builder, NAME)
}
