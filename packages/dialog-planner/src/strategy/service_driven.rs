//! Probes dialogs service by service.
//!
//! With many services per caller each probe applies every filter and the seek condition inline
//! and stops after one page plus one row. The union is still ordered and limited globally.

use crate::{
	CompiledQuery,
	sql::SqlBuilder,
	strategy::{self, SearchContext, SearchStrategy},
};

pub const NAME: &str = "ServiceDriven";

const SCORE: i32 = 100;

#[derive(Clone, Debug, Default)]
pub struct ServiceDriven;

impl ServiceDriven {
	fn push_filtered_tail(builder: &mut SqlBuilder, context: &SearchContext<'_>) {
		let filters = context.filters;

		strategy::push_post_permission_filters(builder, filters);
		builder
			.apply_pagination_condition(&filters.order, filters.cursor.as_ref(), "d")
			.apply_pagination_order(&filters.order, "d")
			.apply_pagination_limit(filters.limit);
	}
}

impl SearchStrategy for ServiceDriven {
	fn name(&self) -> &'static str {
		NAME
	}

	fn score(&self, _context: &SearchContext<'_>) -> i32 {
		SCORE
	}

	fn compile(&self, context: &SearchContext<'_>) -> CompiledQuery {
		let filters = context.filters;
		let mut builder = SqlBuilder::new();

		strategy::push_common_ctes(&mut builder, context);
		builder.push(
			"service_permission_map AS (\n\
			\tSELECT service, array_agg(DISTINCT party) AS allowed_parties\n\
			\tFROM raw_permissions\n\
			\tGROUP BY service\n\
			),\n\
			permission_candidates AS (\n\
			\tSELECT probe.id\n\
			\tFROM service_permission_map spm\n\
			\tCROSS JOIN LATERAL (\n\
			\t\tSELECT d.id\n\
			\t\tFROM dialogs d",
		);
		strategy::push_search_join(&mut builder, filters);
		builder.push(
			"\n\t\tWHERE d.service_resource = spm.service AND d.party = ANY(spm.allowed_parties)",
		);
		strategy::push_search_match(&mut builder, filters);
		Self::push_filtered_tail(&mut builder, context);
		builder.push("\n\t) probe\n),\ndelegated_dialogs AS (\n");
		strategy::push_delegated_source(&mut builder, context);
		Self::push_filtered_tail(&mut builder, context);
		builder.push("\n),\n");
		strategy::push_candidate_union(&mut builder);
		builder
			.apply_pagination_order(&filters.order, "d")
			.apply_pagination_limit(filters.limit);

		strategy::finish(builder, NAME)
	}
}

#[cfg(test)]
mod tests {
	use time::macros::datetime;
	use uuid::Uuid;

	use dialog_domain::{AuthorizationGrant, Cursor, OrderSpec, SearchFilterSet};

	use super::*;

	#[test]
	fn always_scores_high() {
		let filters = SearchFilterSet::default();
		let grant = AuthorizationGrant::default();

		assert_eq!(ServiceDriven.score(&SearchContext::new(&filters, &grant)), SCORE);
	}

	#[test]
	fn each_probe_is_filtered_and_limited() {
		let order = OrderSpec::default();
		let cursor = Cursor::after_row(&order, Uuid::from_u128(5), |_| {
			Some(datetime!(2026-01-01 00:00 UTC))
		});
		let filters = SearchFilterSet {
			extended_statuses: vec!["pending".to_string()],
			order,
			cursor: Some(cursor),
			limit: 20,
			..Default::default()
		};
		let grant = AuthorizationGrant::default()
			.with_party("a", (1..=8).map(|index| format!("svc-{index}")))
			.with_dialog(Uuid::from_u128(77));
		let compiled = ServiceDriven.compile(&SearchContext::new(&filters, &grant));

		assert_eq!(compiled.strategy, NAME);
		assert_eq!(compiled.sql.matches(" LIMIT 21").count(), 3, "{}", compiled.sql);
		assert_eq!(compiled.sql.matches("d.extended_status = ").count(), 2, "{}", compiled.sql);
		assert_eq!(compiled.sql.matches("d.id > ").count(), 2, "{}", compiled.sql);
		assert!(
			compiled.sql.contains("WHERE d.service_resource = spm.service"),
			"{}",
			compiled.sql
		);
	}

	#[test]
	fn search_joins_the_index_inside_each_probe() {
		let filters = SearchFilterSet { search: Some("invoice".to_string()), ..Default::default() };
		let grant = AuthorizationGrant::default().with_party("a", ["x"]);
		let compiled = ServiceDriven.compile(&SearchContext::new(&filters, &grant));
		let probe = compiled
			.sql
			.split("delegated_dialogs AS")
			.next()
			.expect("Missing permission candidates.");

		assert!(probe.contains("JOIN dialog_search ds ON ds.dialog_id = d.id"), "{probe}");
		assert!(probe.contains("AND ds.search_vector @@ ss.query"), "{probe}");
	}
}
