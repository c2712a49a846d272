use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What a caller may see: per-party service authorizations plus dialogs delegated one by one.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationGrant {
	#[serde(default)]
	pub party_to_services: BTreeMap<String, BTreeSet<String>>,
	#[serde(default)]
	pub dialog_ids: Vec<Uuid>,
}

impl AuthorizationGrant {
	pub fn is_empty(&self) -> bool {
		self.dialog_ids.is_empty()
			&& self.party_to_services.values().all(|services| services.is_empty())
	}

	pub fn with_party<I, S>(mut self, party: impl Into<String>, services: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.party_to_services
			.entry(party.into())
			.or_default()
			.extend(services.into_iter().map(Into::into));

		self
	}

	pub fn with_dialog(mut self, dialog_id: Uuid) -> Self {
		self.dialog_ids.push(dialog_id);

		self
	}
}
