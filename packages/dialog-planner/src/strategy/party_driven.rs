//! Probes dialogs party by party.
//!
//! Each party's probe is cheap because a single party owns few dialogs, so the probes stay
//! unbounded and filtering, seeking and limiting happen once after the union.

use crate::{
	CompiledQuery,
	sql::SqlBuilder,
	strategy::{self, SearchContext, SearchStrategy},
};

pub const NAME: &str = "PartyDriven";

const PREFERRED_SCORE: i32 = 100;
const FALLBACK_SCORE: i32 = 1;

#[derive(Clone, Debug)]
pub struct PartyDriven {
	max_services: usize,
}

impl PartyDriven {
	/// Preferred while the caller's distinct service count is at most `max_services`.
	pub fn new(max_services: usize) -> Self {
		Self { max_services }
	}
}

impl SearchStrategy for PartyDriven {
	fn name(&self) -> &'static str {
		NAME
	}

	fn score(&self, context: &SearchContext<'_>) -> i32 {
		if context.shaped.total_service_count <= self.max_services {
			PREFERRED_SCORE
		} else {
			FALLBACK_SCORE
		}
	}

	fn compile(&self, context: &SearchContext<'_>) -> CompiledQuery {
		let filters = context.filters;
		let mut builder = SqlBuilder::new();

		strategy::push_common_ctes(&mut builder, context);
		builder.push(
			"party_permission_map AS (\n\
			\tSELECT party, array_agg(DISTINCT service) AS allowed_services\n\
			\tFROM raw_permissions\n\
			\tGROUP BY party\n\
			),\n\
			permission_candidates AS (\n\
			\tSELECT probe.id\n\
			\tFROM party_permission_map ppm\n\
			\tCROSS JOIN LATERAL (\n",
		);

		if context.has_search() {
			builder.push(
				"\t\tSELECT d.id\n\
				\t\tFROM dialog_search ds\n\
				\t\tJOIN dialogs d ON d.id = ds.dialog_id AND d.party = ds.party\n\
				\t\tCROSS JOIN search_string ss\n\
				\t\tWHERE ds.party = ppm.party AND ds.search_vector @@ ss.query\n",
			);
		} else {
			builder.push("\t\tSELECT d.id\n\t\tFROM dialogs d\n\t\tWHERE d.party = ppm.party\n");
		}

		builder.push(
			"\t\tAND d.service_resource = ANY(ppm.allowed_services)\n\
			\t) probe\n\
			),\n\
			delegated_dialogs AS (\n",
		);
		strategy::push_delegated_source(&mut builder, context);
		builder.push("\n),\n");
		strategy::push_candidate_union(&mut builder);
		builder.push("\nWHERE TRUE");
		strategy::push_post_permission_filters(&mut builder, filters);
		builder
			.apply_pagination_condition(&filters.order, filters.cursor.as_ref(), "d")
			.apply_pagination_order(&filters.order, "d")
			.apply_pagination_limit(filters.limit);

		strategy::finish(builder, NAME)
	}
}

#[cfg(test)]
mod tests {
	use dialog_domain::{AuthorizationGrant, SearchFilterSet};

	use super::*;

	#[test]
	fn prefers_small_service_sets() {
		let filters = SearchFilterSet::default();
		let small = AuthorizationGrant::default().with_party("a", ["x"]).with_party("b", ["x"]);
		let large = AuthorizationGrant::default()
			.with_party("a", (1..=10).map(|index| format!("svc-{index}")));
		let strategy = PartyDriven::new(5);

		assert_eq!(strategy.score(&SearchContext::new(&filters, &small)), PREFERRED_SCORE);
		assert_eq!(strategy.score(&SearchContext::new(&filters, &large)), FALLBACK_SCORE);
	}

	#[test]
	fn threshold_is_inclusive() {
		let filters = SearchFilterSet::default();
		let grant = AuthorizationGrant::default()
			.with_party("a", (1..=5).map(|index| format!("svc-{index}")));

		assert_eq!(PartyDriven::new(5).score(&SearchContext::new(&filters, &grant)), 100);
		assert_eq!(PartyDriven::new(4).score(&SearchContext::new(&filters, &grant)), 1);
	}

	#[test]
	fn probes_by_party_and_filters_after_the_union() {
		let filters =
			SearchFilterSet { orgs: vec!["digdir".to_string()], limit: 10, ..Default::default() };
		let grant = AuthorizationGrant::default().with_party("a", ["x"]);
		let compiled = PartyDriven::new(5).compile(&SearchContext::new(&filters, &grant));
		let union_at = compiled.sql.find("candidate_dialogs AS").expect("Missing union.");
		let org_at = compiled.sql.find("d.org = ").expect("Missing org filter.");

		assert_eq!(compiled.strategy, NAME);
		assert!(compiled.sql.contains("WHERE d.party = ppm.party"), "{}", compiled.sql);
		assert!(!compiled.sql.contains("search_string"), "{}", compiled.sql);
		assert!(org_at > union_at, "{}", compiled.sql);
		assert!(compiled.sql.ends_with("ORDER BY d.created_at DESC, d.id ASC LIMIT 11"));
	}

	#[test]
	fn search_term_is_matched_per_party() {
		let filters = SearchFilterSet {
			search: Some("tax return".to_string()),
			search_language: Some("NB".to_string()),
			..Default::default()
		};
		let grant = AuthorizationGrant::default().with_party("a", ["x"]);
		let compiled = PartyDriven::new(5).compile(&SearchContext::new(&filters, &grant));

		assert!(compiled.sql.starts_with("WITH search_string AS ("), "{}", compiled.sql);
		assert!(
			compiled.sql.contains("WHERE ds.party = ppm.party AND ds.search_vector @@ ss.query"),
			"{}",
			compiled.sql
		);
		assert!(compiled.params.contains(&crate::BindValue::Text("nb".to_string())));
	}

	#[test]
	fn search_index_rows_only_match_the_owning_party() {
		let filters = SearchFilterSet { search: Some("permit".to_string()), ..Default::default() };
		let grant = AuthorizationGrant::default().with_party("a", ["svc-1"]);
		let compiled = PartyDriven::new(5).compile(&SearchContext::new(&filters, &grant));

		assert!(
			compiled.sql.contains("JOIN dialogs d ON d.id = ds.dialog_id AND d.party = ds.party"),
			"{}",
			compiled.sql
		);
	}
}
