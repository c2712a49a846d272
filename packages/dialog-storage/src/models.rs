use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, sqlx::FromRow)]
pub struct DialogRow {
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
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
	pub content_updated_at: OffsetDateTime,
	pub due_at: Option<OffsetDateTime>,
	pub visible_from: Option<OffsetDateTime>,
	pub expires_at: Option<OffsetDateTime>,
}
