//! Parameterized SQL assembly.
//!
//! Values never enter the SQL text. Each one becomes a `$n::type` placeholder and identical
//! values share a placeholder. Predicate fragments start with ` AND ` and expect to follow a
//! `WHERE TRUE`.

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use dialog_domain::{Cursor, DateRange, OrderDirection, OrderKey, OrderSpec, SystemLabel};

/// Bind values for `sqlx` queries, in placeholder order.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum BindValue {
	Text(String),
	TextArray(Vec<String>),
	Int(i32),
	IntArray(Vec<i32>),
	Bool(bool),
	Timestamp(#[serde(with = "dialog_domain::time_serde")] OffsetDateTime),
	Uuid(Uuid),
	UuidArray(Vec<Uuid>),
	Json(serde_json::Value),
}

impl BindValue {
	pub fn sql_type(&self) -> &'static str {
		match self {
			Self::Text(_) => "text",
			Self::TextArray(_) => "text[]",
			Self::Int(_) => "int",
			Self::IntArray(_) => "int[]",
			Self::Bool(_) => "boolean",
			Self::Timestamp(_) => "timestamptz",
			Self::Uuid(_) => "uuid",
			Self::UuidArray(_) => "uuid[]",
			Self::Json(_) => "jsonb",
		}
	}
}

/// Scalar types that can be matched against a column singly or as a set.
pub trait BindScalar: Clone {
	fn scalar(self) -> BindValue;

	fn array(values: Vec<Self>) -> BindValue;
}

impl BindScalar for String {
	fn scalar(self) -> BindValue {
		BindValue::Text(self)
	}

	fn array(values: Vec<Self>) -> BindValue {
		BindValue::TextArray(values)
	}
}

impl BindScalar for i32 {
	fn scalar(self) -> BindValue {
		BindValue::Int(self)
	}

	fn array(values: Vec<Self>) -> BindValue {
		BindValue::IntArray(values)
	}
}

impl BindScalar for Uuid {
	fn scalar(self) -> BindValue {
		BindValue::Uuid(self)
	}

	fn array(values: Vec<Self>) -> BindValue {
		BindValue::UuidArray(values)
	}
}

#[derive(Debug, Default)]
pub struct SqlBuilder {
	sql: String,
	params: Vec<BindValue>,
}

impl SqlBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push(&mut self, fragment: &str) -> &mut Self {
		self.sql.push_str(fragment);

		self
	}

	/// Registers `value` and returns its cast placeholder without emitting it.
	pub fn bind(&mut self, value: BindValue) -> String {
		let cast = value.sql_type();
		let index = match self.params.iter().position(|existing| *existing == value) {
			Some(position) => position + 1,
			None => {
				self.params.push(value);

				self.params.len()
			},
		};

		format!("${index}::{cast}")
	}

	pub fn push_bind(&mut self, value: BindValue) -> &mut Self {
		let placeholder = self.bind(value);

		self.sql.push_str(&placeholder);

		self
	}

	pub fn append_if<F>(&mut self, condition: bool, fragment: F) -> &mut Self
	where
		F: FnOnce(&mut Self),
	{
		if condition {
			fragment(self);
		}

		self
	}

	pub fn append_opt<T, F>(&mut self, value: Option<T>, fragment: F) -> &mut Self
	where
		F: FnOnce(&mut Self, T),
	{
		if let Some(value) = value {
			fragment(self, value);
		}

		self
	}

	pub fn append_eq<T>(&mut self, column: &str, value: Option<T>) -> &mut Self
	where
		T: BindScalar,
	{
		self.append_opt(value, |builder, value| {
			let placeholder = builder.bind(value.scalar());

			builder.push(&format!(" AND {column} = {placeholder}"));
		})
	}

	/// Inclusive bounds: `after <= column` and `column <= before`.
	pub fn append_range(&mut self, column: &str, range: &DateRange) -> &mut Self {
		self.append_opt(range.after, |builder, after| {
			let placeholder = builder.bind(BindValue::Timestamp(after));

			builder.push(&format!(" AND {placeholder} <= {column}"));
		})
		.append_opt(range.before, |builder, before| {
			let placeholder = builder.bind(BindValue::Timestamp(before));

			builder.push(&format!(" AND {column} <= {placeholder}"));
		})
	}

	pub fn append_many_filter<T>(&mut self, column: &str, values: &[T]) -> &mut Self
	where
		T: BindScalar,
	{
		match values {
			[] => {},
			[value] => {
				let placeholder = self.bind(value.clone().scalar());

				self.push(&format!(" AND {column} = {placeholder}"));
			},
			_ => {
				let placeholder = self.bind(T::array(values.to_vec()));

				self.push(&format!(" AND {column} = ANY({placeholder})"));
			},
		}

		self
	}

	/// Requires every label in `labels` to be present on the dialog.
	pub fn append_system_label_filter(&mut self, alias: &str, labels: &[SystemLabel]) -> &mut Self {
		if labels.is_empty() {
			return self;
		}

		let mut ids: Vec<i32> = labels.iter().map(|label| label.id()).collect();

		ids.sort_unstable();
		ids.dedup();

		let placeholder = self.bind(BindValue::IntArray(ids));

		self.push(&format!(
			" AND {placeholder} <@ ARRAY(SELECT sl.system_label_id FROM dialog_system_labels sl WHERE sl.dialog_id = {alias}.id)"
		))
	}

	/// Seek predicate selecting rows strictly after `cursor` in `order` plus the id tie-break.
	pub fn apply_pagination_condition(
		&mut self,
		order: &OrderSpec,
		cursor: Option<&Cursor>,
		alias: &str,
	) -> &mut Self {
		let Some(cursor) = cursor else {
			return self;
		};
		let mut equal_prefix: Vec<String> = Vec::new();
		let mut terms: Vec<String> = Vec::new();

		for entry in order.entries() {
			let column = format!("{alias}.{}", entry.key.column());
			let value = cursor.value_for(entry.key);

			if let Some(after) = self.strictly_after(&column, entry.key, entry.direction, value) {
				terms.push(conjunction(&equal_prefix, &after));
			}

			let equal = match value {
				Some(value) => format!("{column} = {}", self.bind(BindValue::Timestamp(value))),
				None => format!("{column} IS NULL"),
			};

			equal_prefix.push(equal);
		}

		let id_after = format!("{alias}.id > {}", self.bind(BindValue::Uuid(cursor.id)));

		terms.push(conjunction(&equal_prefix, &id_after));

		self.push(&format!(" AND ({})", terms.join(" OR ")))
	}

	pub fn apply_pagination_order(&mut self, order: &OrderSpec, alias: &str) -> &mut Self {
		let mut columns: Vec<String> = order
			.entries()
			.iter()
			.map(|entry| {
				let direction = match entry.direction {
					OrderDirection::Asc => "ASC",
					OrderDirection::Desc => "DESC",
				};
				let nulls = if entry.key.is_nullable() { " NULLS LAST" } else { "" };

				format!("{alias}.{} {direction}{nulls}", entry.key.column())
			})
			.collect();

		columns.push(format!("{alias}.id ASC"));

		self.push(&format!(" ORDER BY {}", columns.join(", ")))
	}

	/// Fetches one row past the page so callers can tell whether another page exists.
	pub fn apply_pagination_limit(&mut self, limit: u32) -> &mut Self {
		let limit = u64::from(limit) + 1;

		self.push(&format!(" LIMIT {limit}"))
	}

	pub fn sql(&self) -> &str {
		&self.sql
	}

	pub fn params(&self) -> &[BindValue] {
		&self.params
	}

	pub fn finish(self) -> (String, Vec<BindValue>) {
		(self.sql, self.params)
	}

	fn strictly_after(
		&mut self,
		column: &str,
		key: OrderKey,
		direction: OrderDirection,
		value: Option<OffsetDateTime>,
	) -> Option<String> {
		// Nulls sort last in both directions, so nothing follows a null value.
		let value = value?;
		let placeholder = self.bind(BindValue::Timestamp(value));
		let operator = match direction {
			OrderDirection::Asc => ">",
			OrderDirection::Desc => "<",
		};

		if key.is_nullable() {
			Some(format!("({column} {operator} {placeholder} OR {column} IS NULL)"))
		} else {
			Some(format!("{column} {operator} {placeholder}"))
		}
	}
}

fn conjunction(prefix: &[String], last: &str) -> String {
	if prefix.is_empty() {
		return last.to_string();
	}

	format!("({} AND {last})", prefix.join(" AND "))
}

#[cfg(test)]
mod tests {
	use time::macros::datetime;

	use super::*;

	#[test]
	fn many_filter_switches_between_equality_and_any() {
		let mut builder = SqlBuilder::new();

		builder
			.append_many_filter::<String>("d.org", &[])
			.append_many_filter("d.org", &["digdir".to_string()])
			.append_many_filter("d.status_id", &[2, 4]);

		let (sql, params) = builder.finish();

		assert_eq!(sql, " AND d.org = $1::text AND d.status_id = ANY($2::int[])");
		assert_eq!(params, vec![BindValue::Text("digdir".into()), BindValue::IntArray(vec![2, 4])]);
	}

	#[test]
	fn identical_values_share_a_placeholder() {
		let instant = datetime!(2026-01-01 00:00 UTC);
		let mut builder = SqlBuilder::new();

		builder
			.append_range("d.created_at", &DateRange { after: Some(instant), before: None })
			.append_range("d.updated_at", &DateRange { after: None, before: Some(instant) });

		let (sql, params) = builder.finish();

		assert_eq!(
			sql,
			" AND $1::timestamptz <= d.created_at AND d.updated_at <= $1::timestamptz"
		);
		assert_eq!(params.len(), 1);
	}

	#[test]
	fn absent_optional_filters_emit_nothing() {
		let mut builder = SqlBuilder::new();

		builder
			.append_eq::<String>("d.process", None)
			.append_range("d.due_at", &DateRange::default())
			.append_system_label_filter("d", &[])
			.append_if(false, |builder| {
				builder.push(" AND FALSE");
			})
			.apply_pagination_condition(&OrderSpec::default(), None, "d");

		assert!(builder.sql().is_empty());
		assert!(builder.params().is_empty());
	}

	#[test]
	fn system_labels_bind_one_sorted_array() {
		let mut builder = SqlBuilder::new();

		builder.append_system_label_filter(
			"d",
			&[SystemLabel::Archive, SystemLabel::Default, SystemLabel::Archive],
		);

		let (sql, params) = builder.finish();

		assert!(sql.starts_with(" AND $1::int[] <@ ARRAY(SELECT sl.system_label_id"), "{sql}");
		assert!(sql.ends_with("WHERE sl.dialog_id = d.id)"), "{sql}");
		assert_eq!(params, vec![BindValue::IntArray(vec![1, 3])]);
	}

	#[test]
	fn seek_condition_expands_tuple_comparison() {
		let order = OrderSpec::parse("createdAt_desc").expect("Failed to parse order.");
		let cursor = Cursor::after_row(&order, Uuid::from_u128(9), |_| {
			Some(datetime!(2026-02-02 00:00 UTC))
		});
		let mut builder = SqlBuilder::new();

		builder.apply_pagination_condition(&order, Some(&cursor), "d");

		assert_eq!(
			builder.sql(),
			" AND (d.created_at < $1::timestamptz OR (d.created_at = $1::timestamptz AND d.id > $2::uuid))"
		);
		assert_eq!(builder.params()[1], BindValue::Uuid(Uuid::from_u128(9)));
	}

	#[test]
	fn seek_condition_handles_null_due_date() {
		let order = OrderSpec::parse("dueAt_asc,createdAt_desc").expect("Failed to parse order.");
		let cursor = Cursor::after_row(&order, Uuid::from_u128(1), |key| match key {
			OrderKey::CreatedAt => Some(datetime!(2026-02-02 00:00 UTC)),
			_ => None,
		});
		let mut builder = SqlBuilder::new();

		builder.apply_pagination_condition(&order, Some(&cursor), "d");

		assert_eq!(
			builder.sql(),
			" AND ((d.due_at IS NULL AND d.created_at < $1::timestamptz) OR (d.due_at IS NULL AND d.created_at = $1::timestamptz AND d.id > $2::uuid))"
		);
	}

	#[test]
	fn seek_condition_admits_nulls_after_non_null_due_date() {
		let order = OrderSpec::parse("dueAt_desc").expect("Failed to parse order.");
		let cursor = Cursor::after_row(&order, Uuid::from_u128(1), |_| {
			Some(datetime!(2026-02-02 00:00 UTC))
		});
		let mut builder = SqlBuilder::new();

		builder.apply_pagination_condition(&order, Some(&cursor), "d");

		assert_eq!(
			builder.sql(),
			" AND ((d.due_at < $1::timestamptz OR d.due_at IS NULL) OR (d.due_at = $1::timestamptz AND d.id > $2::uuid))"
		);
	}

	#[test]
	fn order_ends_with_id_tie_break_and_limit_overfetches() {
		let order = OrderSpec::parse("dueAt_desc,updatedAt_asc").expect("Failed to parse order.");
		let mut builder = SqlBuilder::new();

		builder.apply_pagination_order(&order, "d").apply_pagination_limit(100);

		assert_eq!(
			builder.sql(),
			" ORDER BY d.due_at DESC NULLS LAST, d.updated_at ASC, d.id ASC LIMIT 101"
		);
	}
}
