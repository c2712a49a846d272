use sqlx::PgExecutor;
use uuid::Uuid;

use crate::{Error, Result, models::DialogRow};
use dialog_planner::{BindValue, CompiledQuery};

/// Runs a planned search, binding each parameter with the Rust type matching its cast.
pub async fn fetch_dialogs<'e, E>(executor: E, query: &CompiledQuery) -> Result<Vec<DialogRow>>
where
	E: PgExecutor<'e>,
{
	let mut statement = sqlx::query_as::<_, DialogRow>(&query.sql);

	for param in &query.params {
		statement = match param {
			BindValue::Text(value) => statement.bind(value.as_str()),
			BindValue::TextArray(values) => statement.bind(values.clone()),
			BindValue::Int(value) => statement.bind(*value),
			BindValue::IntArray(values) => statement.bind(values.clone()),
			BindValue::Bool(value) => statement.bind(*value),
			BindValue::Timestamp(value) => statement.bind(*value),
			BindValue::Uuid(value) => statement.bind(*value),
			BindValue::UuidArray(values) => statement.bind(values.clone()),
			BindValue::Json(value) => statement.bind(value.clone()),
		};
	}

	let rows = statement.fetch_all(executor).await?;

	tracing::debug!(strategy = query.strategy, rows = rows.len(), "Fetched dialog candidates.");

	Ok(rows)
}

pub async fn insert_dialog<'e, E>(executor: E, dialog: &DialogRow) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO dialogs (
	id,
	party,
	service_resource,
	org,
	status_id,
	extended_status,
	external_reference,
	process,
	is_api_only,
	deleted,
	created_at,
	updated_at,
	content_updated_at,
	due_at,
	visible_from,
	expires_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
	)
	.bind(dialog.id)
	.bind(dialog.party.as_str())
	.bind(dialog.service_resource.as_str())
	.bind(dialog.org.as_str())
	.bind(dialog.status_id)
	.bind(dialog.extended_status.as_deref())
	.bind(dialog.external_reference.as_deref())
	.bind(dialog.process.as_deref())
	.bind(dialog.is_api_only)
	.bind(dialog.deleted)
	.bind(dialog.created_at)
	.bind(dialog.updated_at)
	.bind(dialog.content_updated_at)
	.bind(dialog.due_at)
	.bind(dialog.visible_from)
	.bind(dialog.expires_at)
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn add_system_labels<'e, E>(executor: E, dialog_id: Uuid, label_ids: &[i32]) -> Result<()>
where
	E: PgExecutor<'e>,
{
	if label_ids.is_empty() {
		return Err(Error::InvalidArgument("label_ids must be non-empty.".to_string()));
	}

	sqlx::query(
		"\
INSERT INTO dialog_system_labels (dialog_id, system_label_id)
SELECT $1::uuid, label_id
FROM unnest($2::int[]) AS l(label_id)
ON CONFLICT DO NOTHING",
	)
	.bind(dialog_id)
	.bind(label_ids)
	.execute(executor)
	.await?;

	Ok(())
}

/// Indexes `text` for one (dialog, party) pair using the configuration mapped to `language_code`.
pub async fn index_dialog_search<'e, E>(
	executor: E,
	dialog_id: Uuid,
	party: &str,
	text: &str,
	language_code: Option<&str>,
) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO dialog_search (dialog_id, party, search_vector)
SELECT $1::uuid, $2::text, to_tsvector(coalesce(cfg.ts_config, 'simple')::regconfig, $3::text)
FROM (VALUES (coalesce($4::text, 'simple'))) AS v(language_code)
LEFT JOIN search_language_configs cfg ON cfg.language_code = v.language_code
ON CONFLICT (dialog_id, party) DO UPDATE SET search_vector = EXCLUDED.search_vector",
	)
	.bind(dialog_id)
	.bind(party)
	.bind(text)
	.bind(language_code)
	.execute(executor)
	.await?;

	Ok(())
}
