//! Candidate-query strategies and the SQL fragments they share.

pub mod party_driven;
pub mod service_driven;

pub use party_driven::PartyDriven;
pub use service_driven::ServiceDriven;

use dialog_domain::{AuthorizationGrant, SearchFilterSet};

use crate::{
	CompiledQuery,
	shaper::{self, ShapedGrant},
	sql::{BindValue, SqlBuilder},
};

pub(crate) const DIALOG_PROJECTION: &str = "\
d.id, d.party, d.service_resource, d.org, d.status_id, d.extended_status, d.external_reference, \
d.process, d.is_api_only, d.deleted, d.created_at, d.updated_at, d.content_updated_at, d.due_at, \
d.visible_from, d.expires_at";

/// Per-request inputs handed to a strategy.
#[derive(Debug)]
pub struct SearchContext<'a> {
	pub filters: &'a SearchFilterSet,
	pub grant: &'a AuthorizationGrant,
	pub shaped: ShapedGrant,
}

impl<'a> SearchContext<'a> {
	pub fn new(filters: &'a SearchFilterSet, grant: &'a AuthorizationGrant) -> Self {
		let shaped = shaper::shape_grant(grant, &filters.parties, &filters.service_resources);

		Self { filters, grant, shaped }
	}

	pub fn has_search(&self) -> bool {
		self.filters.search_term().is_some()
	}
}

pub trait SearchStrategy
where
	Self: Send + Sync,
{
	fn name(&self) -> &'static str;

	/// Preference for this request; values at or below zero opt out.
	fn score(&self, context: &SearchContext<'_>) -> i32;

	fn compile(&self, context: &SearchContext<'_>) -> CompiledQuery;
}

/// Opens the `WITH` list with the search-term and raw permission CTEs.
fn push_common_ctes(builder: &mut SqlBuilder, context: &SearchContext<'_>) {
	builder.push("WITH ");

	if context.has_search() {
		push_search_cte(builder, context.filters);
		builder.push(",\n");
	}

	let groups = builder.bind(BindValue::Json(context.shaped.to_wire()));

	builder.push(&format!(
		"raw_permissions AS (\n\
		\tSELECT p.party, s.service\n\
		\tFROM jsonb_to_recordset({groups} -> 'groups') AS g(parties text[], services text[])\n\
		\tCROSS JOIN LATERAL unnest(g.parties) AS p(party)\n\
		\tCROSS JOIN LATERAL unnest(g.services) AS s(service)\n\
		),\n"
	));
}

/// Emits the `search_string` CTE; a no-op without a search term.
pub(crate) fn push_search_cte(builder: &mut SqlBuilder, filters: &SearchFilterSet) {
	if let Some(term) = filters.search_term() {
		let term = builder.bind(BindValue::Text(term.to_string()));
		let language = match filters.search_language.as_deref().map(str::trim) {
			Some(language) if !language.is_empty() =>
				builder.bind(BindValue::Text(language.to_ascii_lowercase())),
			_ => "'simple'".to_string(),
		};

		builder.push(&format!(
			"search_string AS (\n\
			\tSELECT websearch_to_tsquery(coalesce(cfg.ts_config, 'simple')::regconfig, {term}) AS query\n\
			\tFROM (VALUES ({language})) AS v(language_code)\n\
			\tLEFT JOIN search_language_configs cfg ON cfg.language_code = v.language_code\n\
			\tLIMIT 1\n\
			)"
		));
	}
}

/// Joins the search index for dialog alias `d`; pair with [`push_search_match`].
pub(crate) fn push_search_join(builder: &mut SqlBuilder, filters: &SearchFilterSet) {
	builder.append_if(filters.search_term().is_some(), |builder| {
		builder.push(
			" JOIN dialog_search ds ON ds.dialog_id = d.id AND ds.party = d.party \
			 CROSS JOIN search_string ss",
		);
	});
}

pub(crate) fn push_search_match(builder: &mut SqlBuilder, filters: &SearchFilterSet) {
	builder.append_if(filters.search_term().is_some(), |builder| {
		builder.push(" AND ds.search_vector @@ ss.query");
	});
}

/// Individually delegated dialogs, narrowed by search and the requested parties and services.
fn push_delegated_source(builder: &mut SqlBuilder, context: &SearchContext<'_>) {
	let dialog_ids = builder.bind(BindValue::UuidArray(context.grant.dialog_ids.clone()));

	builder.push(&format!(
		"\tSELECT d.id\n\tFROM unnest({dialog_ids}) AS dd(id)\n\tJOIN dialogs d ON d.id = dd.id"
	));
	push_search_join(builder, context.filters);
	builder.push("\n\tWHERE TRUE");
	push_search_match(builder, context.filters);
	builder
		.append_many_filter("d.party", &context.filters.parties)
		.append_many_filter("d.service_resource", &context.filters.service_resources);
}

/// Filters that apply once a dialog is known to be visible to the caller.
pub(crate) fn push_post_permission_filters(builder: &mut SqlBuilder, filters: &SearchFilterSet) {
	let statuses: Vec<i32> = filters.statuses.iter().map(|status| status.id()).collect();

	builder
		.append_many_filter("d.org", &filters.orgs)
		.append_many_filter("d.status_id", &statuses)
		.append_many_filter("d.extended_status", &filters.extended_statuses)
		.append_opt(filters.visible_at, |builder, at| {
			let at = builder.bind(BindValue::Timestamp(at));

			builder.push(&format!(" AND (d.visible_from IS NULL OR d.visible_from <= {at})"));
		})
		.append_opt(filters.expires_after, |builder, after| {
			let after = builder.bind(BindValue::Timestamp(after));

			builder.push(&format!(" AND (d.expires_at IS NULL OR d.expires_at > {after})"));
		})
		.append_opt(filters.deleted.required_value(), |builder, deleted| {
			builder.push(if deleted { " AND d.deleted" } else { " AND NOT d.deleted" });
		})
		.append_eq("d.external_reference", filters.external_reference.clone())
		.append_eq("d.process", filters.process.clone())
		.append_range("d.created_at", &filters.created)
		.append_range("d.updated_at", &filters.updated)
		.append_range("d.content_updated_at", &filters.content_updated)
		.append_range("d.due_at", &filters.due)
		.append_range("d.visible_from", &filters.visible_from)
		.append_if(filters.exclude_api_only, |builder| {
			builder.push(" AND NOT d.is_api_only");
		})
		.append_system_label_filter("d", &filters.system_labels);
}

fn push_candidate_union(builder: &mut SqlBuilder) {
	builder.push(
		"candidate_dialogs AS (\n\
		\tSELECT id FROM permission_candidates\n\
		\tUNION\n\
		\tSELECT id FROM delegated_dialogs\n\
		)\n",
	);
	builder.push(&format!(
		"SELECT {DIALOG_PROJECTION}\nFROM candidate_dialogs cd\nJOIN dialogs d ON d.id = cd.id"
	));
}

pub(crate) fn finish(builder: SqlBuilder, strategy: &'static str) -> CompiledQuery {
	let (sql, params) = builder.finish();

	CompiledQuery { sql, params, strategy }
}
