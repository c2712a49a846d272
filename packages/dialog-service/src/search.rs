use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{DialogSearchService, Error, Result};
use dialog_domain::{
	AuthorizationGrant, Cursor, DateRange, DeletedFilter, DialogStatus, OrderKey, OrderSpec,
	SearchFilterSet, SystemLabel,
};
use dialog_planner::CompiledQuery;
use dialog_storage::{models::DialogRow, queries};

/// Most values accepted in a single list filter, for end users and service owners alike.
pub const MAX_LIST_ENTRIES: usize = 20;
pub const MIN_SEARCH_LENGTH: usize = 3;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchRequest {
	pub party: Vec<String>,
	pub service_resource: Vec<String>,
	pub org: Vec<String>,
	pub status: Vec<DialogStatus>,
	pub extended_status: Vec<String>,
	pub system_label: Vec<SystemLabel>,
	#[serde(with = "dialog_domain::time_serde::option")]
	pub created_after: Option<OffsetDateTime>,
	#[serde(with = "dialog_domain::time_serde::option")]
	pub created_before: Option<OffsetDateTime>,
	#[serde(with = "dialog_domain::time_serde::option")]
	pub updated_after: Option<OffsetDateTime>,
	#[serde(with = "dialog_domain::time_serde::option")]
	pub updated_before: Option<OffsetDateTime>,
	#[serde(with = "dialog_domain::time_serde::option")]
	pub content_updated_after: Option<OffsetDateTime>,
	#[serde(with = "dialog_domain::time_serde::option")]
	pub content_updated_before: Option<OffsetDateTime>,
	#[serde(with = "dialog_domain::time_serde::option")]
	pub due_after: Option<OffsetDateTime>,
	#[serde(with = "dialog_domain::time_serde::option")]
	pub due_before: Option<OffsetDateTime>,
	#[serde(with = "dialog_domain::time_serde::option")]
	pub visible_after: Option<OffsetDateTime>,
	#[serde(with = "dialog_domain::time_serde::option")]
	pub visible_before: Option<OffsetDateTime>,
	pub search: Option<String>,
	pub search_language_code: Option<String>,
	pub external_reference: Option<String>,
	pub process: Option<String>,
	pub exclude_api_only: bool,
	pub deleted: DeletedFilter,
	pub order_by: Option<String>,
	pub continuation_token: Option<String>,
	pub limit: Option<u32>,
}

impl SearchRequest {
	/// Validates the request and turns it into planner input as of `now`.
	pub fn into_filters(
		self,
		cfg: &dialog_config::Search,
		now: OffsetDateTime,
	) -> Result<SearchFilterSet> {
		if self.party.is_empty() && self.service_resource.is_empty() {
			return Err(invalid("party or service_resource must be provided."));
		}

		check_list_sizes(&[
			("party", &self.party),
			("service_resource", &self.service_resource),
			("org", &self.org),
			("extended_status", &self.extended_status),
		])?;

		let mut filters = self.build_filters(cfg)?;

		filters.visible_at = Some(now);
		filters.expires_after = Some(now);
		filters.validate()?;

		Ok(filters)
	}

	fn has_search(&self) -> bool {
		self.search.as_deref().is_some_and(|term| !term.trim().is_empty())
	}

	/// Shared conversion; callers add their audience's scope and validate.
	fn build_filters(self, cfg: &dialog_config::Search) -> Result<SearchFilterSet> {
		let search = self.search.map(|term| term.trim().to_string()).filter(|term| !term.is_empty());

		if let Some(term) = search.as_deref()
			&& term.chars().count() < MIN_SEARCH_LENGTH
		{
			return Err(invalid(&format!(
				"search must be at least {MIN_SEARCH_LENGTH} characters."
			)));
		}

		let limit = self.limit.unwrap_or(cfg.default_limit);

		if limit == 0 || limit > cfg.max_limit {
			return Err(invalid(&format!("limit must be between 1 and {}.", cfg.max_limit)));
		}

		let order = match self.order_by.as_deref() {
			Some(raw) => OrderSpec::parse(raw)?,
			None => OrderSpec::default(),
		};
		let cursor = match self.continuation_token.as_deref().map(str::trim) {
			Some(raw) if !raw.is_empty() => Some(Cursor::decode(raw, &order)?),
			_ => None,
		};

		Ok(SearchFilterSet {
			parties: self.party,
			service_resources: self.service_resource,
			statuses: self.status,
			extended_statuses: self.extended_status,
			system_labels: self.system_label,
			orgs: self.org,
			created: DateRange { after: self.created_after, before: self.created_before },
			updated: DateRange { after: self.updated_after, before: self.updated_before },
			content_updated: DateRange {
				after: self.content_updated_after,
				before: self.content_updated_before,
			},
			due: DateRange { after: self.due_after, before: self.due_before },
			visible_from: DateRange { after: self.visible_after, before: self.visible_before },
			search,
			search_language: self.search_language_code,
			external_reference: self.external_reference,
			process: self.process,
			exclude_api_only: self.exclude_api_only,
			deleted: self.deleted,
			visible_at: None,
			expires_after: None,
			order,
			cursor,
			limit,
		})
	}
}

/// A search issued by a service owner over the dialogs of its own organizations.
///
/// Visibility and expiry windows are not applied. With `end_user_id` set the result is further
/// bounded by that end user's authorization grant.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ServiceOwnerSearchRequest {
	#[serde(flatten)]
	pub query: SearchRequest,
	#[serde(default)]
	pub end_user_id: Option<String>,
}

impl ServiceOwnerSearchRequest {
	pub fn end_user(&self) -> Option<&str> {
		self.end_user_id.as_deref().map(str::trim).filter(|id| !id.is_empty())
	}

	/// Validates the request and scopes it to the dialogs owned by `owner_orgs`.
	pub fn into_filters(
		self,
		cfg: &dialog_config::Search,
		owner_orgs: &[String],
	) -> Result<SearchFilterSet> {
		if owner_orgs.is_empty() {
			return Err(Error::Authorization {
				message: "Caller does not own any organization.".to_string(),
			});
		}

		let impersonating = self.end_user().is_some();
		let mut query = self.query;

		if query.has_search() && !impersonating {
			return Err(invalid("search requires end_user_id."));
		}
		if impersonating && query.party.is_empty() && query.service_resource.is_empty() {
			return Err(invalid("party or service_resource must be provided with end_user_id."));
		}

		check_list_sizes(&[
			("party", &query.party),
			("service_resource", &query.service_resource),
			("extended_status", &query.extended_status),
		])?;

		let orgs = scope_orgs(std::mem::take(&mut query.org), owner_orgs)?;
		let mut filters = query.build_filters(cfg)?;

		filters.orgs = orgs;
		filters.validate()?;

		Ok(filters)
	}
}

#[derive(Clone, Debug, Serialize)]
pub struct DialogItem {
	pub id: Uuid,
	pub party: String,
	pub service_resource: String,
	pub org: String,
	pub status_id: i32,
	pub extended_status: Option<String>,
	pub external_reference: Option<String>,
	pub process: Option<String>,
	pub is_api_only: bool,
	pub deleted: bool,
	#[serde(with = "dialog_domain::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "dialog_domain::time_serde")]
	pub updated_at: OffsetDateTime,
	#[serde(with = "dialog_domain::time_serde")]
	pub content_updated_at: OffsetDateTime,
	#[serde(with = "dialog_domain::time_serde::option")]
	pub due_at: Option<OffsetDateTime>,
	#[serde(with = "dialog_domain::time_serde::option")]
	pub visible_from: Option<OffsetDateTime>,
	#[serde(with = "dialog_domain::time_serde::option")]
	pub expires_at: Option<OffsetDateTime>,
}

impl From<DialogRow> for DialogItem {
	fn from(row: DialogRow) -> Self {
		Self {
			id: row.id,
			party: row.party,
			service_resource: row.service_resource,
			org: row.org,
			status_id: row.status_id,
			extended_status: row.extended_status,
			external_reference: row.external_reference,
			process: row.process,
			is_api_only: row.is_api_only,
			deleted: row.deleted,
			created_at: row.created_at,
			updated_at: row.updated_at,
			content_updated_at: row.content_updated_at,
			due_at: row.due_at,
			visible_from: row.visible_from,
			expires_at: row.expires_at,
		}
	}
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct SearchResponse {
	pub items: Vec<DialogItem>,
	pub has_next_page: bool,
	pub continuation_token: Option<String>,
	pub order_by: String,
}

impl SearchResponse {
	/// Trims the look-ahead row and builds the token that resumes after the last kept row.
	///
	/// Fails when the last kept row's ordered values cannot be encoded into a token.
	pub fn from_rows(mut rows: Vec<DialogRow>, filters: &SearchFilterSet) -> Result<Self> {
		let limit = usize::try_from(filters.limit).unwrap_or(usize::MAX);
		let has_next_page = rows.len() > limit;

		rows.truncate(limit);

		let continuation_token = match rows.last() {
			Some(last) if has_next_page => Some(
				Cursor::after_row(&filters.order, last.id, |key| order_value(last, key))
					.encode()
					.map_err(|err| Error::Storage {
						message: format!("Dialog {} cannot resume a page: {err}", last.id),
					})?,
			),
			_ => None,
		};

		Ok(Self {
			items: rows.into_iter().map(DialogItem::from).collect(),
			has_next_page,
			continuation_token,
			order_by: filters.order.to_string(),
		})
	}

	fn empty(filters: &SearchFilterSet) -> Self {
		Self { order_by: filters.order.to_string(), ..Default::default() }
	}
}

impl DialogSearchService {
	pub async fn search(&self, caller: &str, req: SearchRequest) -> Result<SearchResponse> {
		let filters = req.into_filters(&self.cfg.search, OffsetDateTime::now_utc())?;
		let grant = self.resolve_grant(caller, &filters).await?;

		if grant.is_empty() {
			tracing::info!(caller, "Caller has no authorized dialogs.");

			return Ok(SearchResponse::empty(&filters));
		}

		let compiled = self.planner.plan(&filters, &grant);
		let rows = queries::fetch_dialogs(&self.db.pool, &compiled).await?;
		let response = SearchResponse::from_rows(rows, &filters)?;

		tracing::info!(
			caller,
			strategy = compiled.strategy,
			items = response.items.len(),
			has_next_page = response.has_next_page,
			"Dialog search completed."
		);

		Ok(response)
	}

	/// Plans the request as [`DialogSearchService::search`] would without executing it.
	pub async fn explain(&self, caller: &str, req: SearchRequest) -> Result<CompiledQuery> {
		let filters = req.into_filters(&self.cfg.search, OffsetDateTime::now_utc())?;
		let grant = self.resolve_grant(caller, &filters).await?;

		Ok(self.planner.plan(&filters, &grant))
	}

	/// Searches the dialogs owned by `owner_orgs`, impersonating `end_user_id` when given.
	pub async fn search_as_service_owner(
		&self,
		owner_orgs: &[String],
		req: ServiceOwnerSearchRequest,
	) -> Result<SearchResponse> {
		let end_user = req.end_user().map(str::to_string);
		let filters = req.into_filters(&self.cfg.search, owner_orgs)?;
		let compiled = match end_user.as_deref() {
			Some(end_user) => {
				let grant = self.resolve_grant(end_user, &filters).await?;

				if grant.is_empty() {
					tracing::info!(end_user, "Impersonated end user has no authorized dialogs.");

					return Ok(SearchResponse::empty(&filters));
				}

				self.planner.plan(&filters, &grant)
			},
			None => self.planner.plan_org_scoped(&filters),
		};
		let rows = queries::fetch_dialogs(&self.db.pool, &compiled).await?;
		let response = SearchResponse::from_rows(rows, &filters)?;

		tracing::info!(
			orgs = ?owner_orgs,
			end_user = end_user.as_deref(),
			strategy = compiled.strategy,
			items = response.items.len(),
			has_next_page = response.has_next_page,
			"Service owner dialog search completed."
		);

		Ok(response)
	}

	/// Plans the request as [`DialogSearchService::search_as_service_owner`] would.
	pub async fn explain_as_service_owner(
		&self,
		owner_orgs: &[String],
		req: ServiceOwnerSearchRequest,
	) -> Result<CompiledQuery> {
		let end_user = req.end_user().map(str::to_string);
		let filters = req.into_filters(&self.cfg.search, owner_orgs)?;

		match end_user.as_deref() {
			Some(end_user) => {
				let grant = self.resolve_grant(end_user, &filters).await?;

				Ok(self.planner.plan(&filters, &grant))
			},
			None => Ok(self.planner.plan_org_scoped(&filters)),
		}
	}

	async fn resolve_grant(
		&self,
		caller: &str,
		filters: &SearchFilterSet,
	) -> Result<AuthorizationGrant> {
		self.authorization
			.resolve_grant(caller, &filters.parties, &filters.service_resources)
			.await
			.inspect_err(|err| {
				tracing::warn!(caller, error = %err, "Failed to resolve authorization grant.");
			})
	}
}

fn order_value(row: &DialogRow, key: OrderKey) -> Option<OffsetDateTime> {
	match key {
		OrderKey::CreatedAt => Some(row.created_at),
		OrderKey::UpdatedAt => Some(row.updated_at),
		OrderKey::ContentUpdatedAt => Some(row.content_updated_at),
		OrderKey::DueAt => row.due_at,
	}
}

fn check_list_sizes(lists: &[(&str, &Vec<String>)]) -> Result<()> {
	for (label, values) in lists {
		if values.len() > MAX_LIST_ENTRIES {
			return Err(invalid(&format!("{label} must hold at most {MAX_LIST_ENTRIES} entries.")));
		}
	}

	Ok(())
}

/// Narrows a requested org filter to the caller's own organizations.
fn scope_orgs(requested: Vec<String>, owner_orgs: &[String]) -> Result<Vec<String>> {
	if requested.is_empty() {
		return Ok(owner_orgs.to_vec());
	}

	if let Some(foreign) = requested.iter().find(|org| !owner_orgs.contains(org)) {
		return Err(Error::Authorization {
			message: format!("Caller does not own organization '{foreign}'."),
		});
	}

	Ok(requested)
}

fn invalid(message: &str) -> Error {
	Error::InvalidRequest { message: message.to_string() }
}
