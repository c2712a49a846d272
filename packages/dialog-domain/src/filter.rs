use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Cursor, Error, OrderSpec, Result};

pub const DEFAULT_LIMIT: u32 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogStatus {
	NotApplicable,
	InProgress,
	Draft,
	Awaiting,
	RequiresAttention,
	Completed,
}

impl DialogStatus {
	/// Identifier stored in `dialogs.status_id`.
	pub fn id(self) -> i32 {
		match self {
			Self::NotApplicable => 1,
			Self::InProgress => 2,
			Self::Draft => 3,
			Self::Awaiting => 4,
			Self::RequiresAttention => 5,
			Self::Completed => 6,
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemLabel {
	Default,
	Bin,
	Archive,
	MarkedAsUnopened,
	Sent,
}

impl SystemLabel {
	/// Identifier stored in `dialog_system_labels.system_label_id`.
	pub fn id(self) -> i32 {
		match self {
			Self::Default => 1,
			Self::Bin => 2,
			Self::Archive => 3,
			Self::MarkedAsUnopened => 4,
			Self::Sent => 5,
		}
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletedFilter {
	Include,
	#[default]
	Exclude,
	Only,
}

impl DeletedFilter {
	/// Value the `deleted` column must hold, or `None` when both states match.
	pub fn required_value(self) -> Option<bool> {
		match self {
			Self::Include => None,
			Self::Exclude => Some(false),
			Self::Only => Some(true),
		}
	}
}

/// Inclusive bounds on one timestamp column.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
	#[serde(default, with = "crate::time_serde::option")]
	pub after: Option<OffsetDateTime>,
	#[serde(default, with = "crate::time_serde::option")]
	pub before: Option<OffsetDateTime>,
}

impl DateRange {
	pub fn is_unbounded(&self) -> bool {
		self.after.is_none() && self.before.is_none()
	}

	fn validate(&self, label: &str) -> Result<()> {
		if let (Some(after), Some(before)) = (self.after, self.before)
			&& after > before
		{
			return Err(Error::InvalidRange {
				message: format!("{label}.after must not be later than {label}.before."),
			});
		}

		Ok(())
	}
}

/// Everything a caller may narrow an end-user dialog search by.
///
/// Empty lists and `None` values mean "no restriction" and never match `NULL`.
#[derive(Clone, Debug)]
pub struct SearchFilterSet {
	pub parties: Vec<String>,
	pub service_resources: Vec<String>,
	pub statuses: Vec<DialogStatus>,
	pub extended_statuses: Vec<String>,
	pub system_labels: Vec<SystemLabel>,
	pub orgs: Vec<String>,
	pub created: DateRange,
	pub updated: DateRange,
	pub content_updated: DateRange,
	pub due: DateRange,
	pub visible_from: DateRange,
	pub search: Option<String>,
	pub search_language: Option<String>,
	pub external_reference: Option<String>,
	pub process: Option<String>,
	pub exclude_api_only: bool,
	pub deleted: DeletedFilter,
	/// Hides dialogs that only become visible after this instant.
	pub visible_at: Option<OffsetDateTime>,
	/// Hides dialogs that expired at or before this instant.
	pub expires_after: Option<OffsetDateTime>,
	pub order: OrderSpec,
	pub cursor: Option<Cursor>,
	pub limit: u32,
}

impl SearchFilterSet {
	pub fn search_term(&self) -> Option<&str> {
		self.search.as_deref().map(str::trim).filter(|term| !term.is_empty())
	}

	pub fn validate(&self) -> Result<()> {
		for (label, range) in [
			("created", &self.created),
			("updated", &self.updated),
			("content_updated", &self.content_updated),
			("due", &self.due),
			("visible_from", &self.visible_from),
		] {
			range.validate(label)?;
		}

		if self.limit == 0 {
			return Err(Error::InvalidLimit { message: "limit must be greater than zero.".into() });
		}
		if let Some(cursor) = self.cursor.as_ref() {
			cursor.check_order(&self.order)?;
		}

		Ok(())
	}
}

impl Default for SearchFilterSet {
	fn default() -> Self {
		Self {
			parties: Vec::new(),
			service_resources: Vec::new(),
			statuses: Vec::new(),
			extended_statuses: Vec::new(),
			system_labels: Vec::new(),
			orgs: Vec::new(),
			created: DateRange::default(),
			updated: DateRange::default(),
			content_updated: DateRange::default(),
			due: DateRange::default(),
			visible_from: DateRange::default(),
			search: None,
			search_language: None,
			external_reference: None,
			process: None,
			exclude_api_only: false,
			deleted: DeletedFilter::default(),
			visible_at: None,
			expires_after: None,
			order: OrderSpec::default(),
			cursor: None,
			limit: DEFAULT_LIMIT,
		}
	}
}

#[cfg(test)]
mod tests {
	use time::macros::datetime;

	use super::*;

	#[test]
	fn inverted_range_is_rejected() {
		let filters = SearchFilterSet {
			due: DateRange {
				after: Some(datetime!(2026-02-01 00:00 UTC)),
				before: Some(datetime!(2026-01-01 00:00 UTC)),
			},
			..Default::default()
		};
		let err = filters.validate().expect_err("Expected range validation error.");

		assert!(err.to_string().contains("due.after"), "Unexpected error: {err}");
	}

	#[test]
	fn equal_bounds_are_accepted() {
		let instant = datetime!(2026-01-01 00:00 UTC);
		let filters = SearchFilterSet {
			created: DateRange { after: Some(instant), before: Some(instant) },
			..Default::default()
		};

		assert!(filters.validate().is_ok());
	}

	#[test]
	fn zero_limit_is_rejected() {
		let filters = SearchFilterSet { limit: 0, ..Default::default() };

		assert!(matches!(filters.validate(), Err(Error::InvalidLimit { .. })));
	}

	#[test]
	fn blank_search_term_is_ignored() {
		let filters = SearchFilterSet { search: Some("   ".to_string()), ..Default::default() };

		assert_eq!(filters.search_term(), None);
	}

	#[test]
	fn deleted_filter_maps_to_column_value() {
		assert_eq!(DeletedFilter::Include.required_value(), None);
		assert_eq!(DeletedFilter::Exclude.required_value(), Some(false));
		assert_eq!(DeletedFilter::Only.required_value(), Some(true));
	}
}
