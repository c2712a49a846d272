//! Order specifications and the opaque continuation cursor.
//!
//! Every ordering ends with the dialog ID ascending as a hidden tie-break, so a cursor always
//! carries one value per ordered column plus the last row's ID.

use std::fmt;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, Result};

pub const CURSOR_SCHEMA_V1: &str = "dialog_cursor/v1";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OrderKey {
	CreatedAt,
	UpdatedAt,
	ContentUpdatedAt,
	DueAt,
}

impl OrderKey {
	pub const ALL: [Self; 4] = [Self::CreatedAt, Self::UpdatedAt, Self::ContentUpdatedAt, Self::DueAt];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::CreatedAt => "createdAt",
			Self::UpdatedAt => "updatedAt",
			Self::ContentUpdatedAt => "contentUpdatedAt",
			Self::DueAt => "dueAt",
		}
	}

	/// Column on the `dialogs` table.
	pub fn column(self) -> &'static str {
		match self {
			Self::CreatedAt => "created_at",
			Self::UpdatedAt => "updated_at",
			Self::ContentUpdatedAt => "content_updated_at",
			Self::DueAt => "due_at",
		}
	}

	pub fn is_nullable(self) -> bool {
		matches!(self, Self::DueAt)
	}

	fn parse(raw: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|key| key.as_str().eq_ignore_ascii_case(raw))
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OrderDirection {
	Asc,
	Desc,
}

impl OrderDirection {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Asc => "asc",
			Self::Desc => "desc",
		}
	}

	fn parse(raw: &str) -> Option<Self> {
		if raw.eq_ignore_ascii_case("asc") {
			Some(Self::Asc)
		} else if raw.eq_ignore_ascii_case("desc") {
			Some(Self::Desc)
		} else {
			None
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OrderEntry {
	pub key: OrderKey,
	pub direction: OrderDirection,
}

impl OrderEntry {
	fn parse(raw: &str) -> Result<Self> {
		let (key_raw, direction) = match raw.rsplit_once('_') {
			Some((key_raw, direction_raw)) => {
				let direction = OrderDirection::parse(direction_raw).ok_or_else(|| {
					Error::InvalidOrder {
						message: format!("'{direction_raw}' is not a direction; use asc or desc."),
					}
				})?;

				(key_raw, direction)
			},
			None => (raw, OrderDirection::Desc),
		};

		if key_raw.eq_ignore_ascii_case("id") {
			return Err(Error::InvalidOrder {
				message: "id is always the final tie-break and cannot be ordered explicitly."
					.to_string(),
			});
		}

		let key = OrderKey::parse(key_raw).ok_or_else(|| Error::InvalidOrder {
			message: format!(
				"unknown order key '{key_raw}'; expected one of {}.",
				OrderKey::ALL.map(OrderKey::as_str).join(", ")
			),
		})?;

		Ok(Self { key, direction })
	}
}

impl fmt::Display for OrderEntry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}_{}", self.key.as_str(), self.direction.as_str())
	}
}

/// Ordered list of sort columns, written as `createdAt_desc,dueAt_asc`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OrderSpec {
	entries: Vec<OrderEntry>,
}

impl OrderSpec {
	pub fn parse(raw: &str) -> Result<Self> {
		let raw = raw.trim();

		if raw.is_empty() {
			return Ok(Self::default());
		}

		let mut entries: Vec<OrderEntry> = Vec::new();

		for part in raw.split(',') {
			let part = part.trim();

			if part.is_empty() {
				return Err(Error::InvalidOrder {
					message: "order entries must be non-empty.".to_string(),
				});
			}

			let entry = OrderEntry::parse(part)?;

			if entries.iter().any(|existing| existing.key == entry.key) {
				return Err(Error::InvalidOrder {
					message: format!("order key '{}' appears more than once.", entry.key.as_str()),
				});
			}

			entries.push(entry);
		}

		Ok(Self { entries })
	}

	pub fn entries(&self) -> &[OrderEntry] {
		&self.entries
	}
}

impl Default for OrderSpec {
	fn default() -> Self {
		Self {
			entries: vec![OrderEntry { key: OrderKey::CreatedAt, direction: OrderDirection::Desc }],
		}
	}
}

impl fmt::Display for OrderSpec {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for (index, entry) in self.entries.iter().enumerate() {
			if index > 0 {
				f.write_str(",")?;
			}

			write!(f, "{entry}")?;
		}

		Ok(())
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CursorValue {
	pub entry: OrderEntry,
	pub value: Option<OffsetDateTime>,
}

/// Position of the last row of a page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cursor {
	pub values: Vec<CursorValue>,
	pub id: Uuid,
}

impl Cursor {
	/// Builds the cursor for a row, reading each ordered column through `value_of`.
	pub fn after_row<F>(order: &OrderSpec, id: Uuid, mut value_of: F) -> Self
	where
		F: FnMut(OrderKey) -> Option<OffsetDateTime>,
	{
		let values = order
			.entries()
			.iter()
			.map(|entry| CursorValue { entry: *entry, value: value_of(entry.key) })
			.collect();

		Self { values, id }
	}

	pub fn value_for(&self, key: OrderKey) -> Option<OffsetDateTime> {
		self.values.iter().find(|value| value.entry.key == key).and_then(|value| value.value)
	}

	/// Fails when a value cannot be written as an RFC 3339 timestamp.
	pub fn encode(&self) -> Result<String> {
		let wire = CursorWire {
			schema: CURSOR_SCHEMA_V1.to_string(),
			values: self
				.values
				.iter()
				.map(|value| CursorWireValue { key: value.entry.to_string(), value: value.value })
				.collect(),
			id: self.id,
		};
		let json = serde_json::to_vec(&wire).map_err(|err| Error::InvalidCursor {
			message: format!("cursor could not be encoded: {err}."),
		})?;

		Ok(URL_SAFE_NO_PAD.encode(json))
	}

	/// Decodes `raw` and checks that it was issued for `order`.
	pub fn decode(raw: &str, order: &OrderSpec) -> Result<Self> {
		let bytes = URL_SAFE_NO_PAD.decode(raw.trim()).map_err(|err| Error::InvalidCursor {
			message: format!("cursor is not valid base64url: {err}."),
		})?;
		let wire: CursorWire = serde_json::from_slice(&bytes).map_err(|err| {
			Error::InvalidCursor { message: format!("cursor payload is malformed: {err}.") }
		})?;

		if wire.schema != CURSOR_SCHEMA_V1 {
			return Err(Error::InvalidCursor {
				message: format!("unsupported cursor schema '{}'.", wire.schema),
			});
		}

		let mut values = Vec::with_capacity(wire.values.len());

		for value in wire.values {
			let entry = OrderEntry::parse(&value.key).map_err(|err| Error::InvalidCursor {
				message: err.to_string(),
			})?;

			if value.value.is_none() && !entry.key.is_nullable() {
				return Err(Error::InvalidCursor {
					message: format!("cursor value for {} must not be null.", entry.key.as_str()),
				});
			}

			values.push(CursorValue { entry, value: value.value });
		}

		let cursor = Self { values, id: wire.id };

		cursor.check_order(order)?;

		Ok(cursor)
	}

	pub fn check_order(&self, order: &OrderSpec) -> Result<()> {
		let matches = self.values.len() == order.entries().len()
			&& self.values.iter().zip(order.entries()).all(|(value, entry)| value.entry == *entry);

		if !matches {
			return Err(Error::InvalidCursor {
				message: format!("cursor was issued for a different order than '{order}'."),
			});
		}

		Ok(())
	}
}

#[derive(Serialize, Deserialize)]
struct CursorWire {
	schema: String,
	values: Vec<CursorWireValue>,
	id: Uuid,
}

#[derive(Serialize, Deserialize)]
struct CursorWireValue {
	key: String,
	#[serde(default, with = "crate::time_serde::option")]
	value: Option<OffsetDateTime>,
}

#[cfg(test)]
mod tests {
	use time::{Duration, macros::datetime};

	use super::*;

	#[test]
	fn parses_multiple_entries_case_insensitively() {
		let order = OrderSpec::parse("DueAt_ASC, updatedat").expect("Failed to parse order.");

		assert_eq!(
			order.entries(),
			&[
				OrderEntry { key: OrderKey::DueAt, direction: OrderDirection::Asc },
				OrderEntry { key: OrderKey::UpdatedAt, direction: OrderDirection::Desc },
			]
		);
		assert_eq!(order.to_string(), "dueAt_asc,updatedAt_desc");
	}

	#[test]
	fn empty_order_falls_back_to_created_desc() {
		let order = OrderSpec::parse("  ").expect("Failed to parse order.");

		assert_eq!(order.to_string(), "createdAt_desc");
	}

	#[test]
	fn rejects_unknown_duplicate_and_id_keys() {
		for raw in ["title_asc", "createdAt,createdAt_asc", "id_asc", "createdAt_sideways", ","] {
			let err = OrderSpec::parse(raw).expect_err("Expected order parse error.");

			assert!(matches!(err, Error::InvalidOrder { .. }), "Unexpected error for {raw}: {err}");
		}
	}

	#[test]
	fn cursor_survives_encoding_with_null_due_date() {
		let order = OrderSpec::parse("dueAt_asc,createdAt_desc").expect("Failed to parse order.");
		let id = Uuid::from_u128(7);
		let cursor = Cursor::after_row(&order, id, |key| match key {
			OrderKey::CreatedAt => Some(datetime!(2026-03-04 05:06:07 UTC)),
			_ => None,
		});
		let decoded = Cursor::decode(&cursor.encode().expect("Failed to encode cursor."), &order)
			.expect("Failed to decode cursor.");

		assert_eq!(decoded, cursor);
		assert_eq!(decoded.value_for(OrderKey::DueAt), None);
		assert_eq!(decoded.value_for(OrderKey::CreatedAt), Some(datetime!(2026-03-04 05:06:07 UTC)));
	}

	#[test]
	fn cursor_for_other_order_is_rejected() {
		let issued = OrderSpec::parse("createdAt_desc").expect("Failed to parse order.");
		let active = OrderSpec::parse("createdAt_asc").expect("Failed to parse order.");
		let cursor = Cursor::after_row(&issued, Uuid::from_u128(1), |_| {
			Some(datetime!(2026-01-01 00:00 UTC))
		});
		let raw = cursor.encode().expect("Failed to encode cursor.");
		let err = Cursor::decode(&raw, &active).expect_err("Expected order mismatch.");

		assert!(err.to_string().contains("different order"), "Unexpected error: {err}");
	}

	#[test]
	fn garbage_cursor_is_rejected() {
		let order = OrderSpec::default();

		for raw in ["not base64 !!", "e30"] {
			assert!(matches!(Cursor::decode(raw, &order), Err(Error::InvalidCursor { .. })));
		}
	}

	#[test]
	fn null_value_for_required_column_is_rejected() {
		let order = OrderSpec::default();
		let cursor = Cursor::after_row(&order, Uuid::from_u128(3), |_| None);
		let raw = cursor.encode().expect("Failed to encode cursor.");
		let err = Cursor::decode(&raw, &order).expect_err("Expected null error.");

		assert!(err.to_string().contains("must not be null"), "Unexpected error: {err}");
	}

	#[test]
	fn timestamps_outside_rfc3339_fail_to_encode() {
		let order = OrderSpec::default();
		let before_year_zero = OffsetDateTime::UNIX_EPOCH - Duration::days(800_000);
		let cursor = Cursor::after_row(&order, Uuid::from_u128(9), |_| Some(before_year_zero));
		let err = cursor.encode().expect_err("Expected encode error.");

		assert!(matches!(err, Error::InvalidCursor { .. }), "Unexpected error: {err}");
	}
}
