use std::{collections::BTreeMap, fs, path::Path};

use serde::Deserialize;

use crate::{AuthorizationProvider, BoxFuture, Error, Result};
use dialog_domain::AuthorizationGrant;

/// Grants read once from a JSON document of the form `{"callers": {"<caller>": <grant>}}`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct StaticAuthorizationProvider {
	#[serde(default)]
	callers: BTreeMap<String, AuthorizationGrant>,
}

impl StaticAuthorizationProvider {
	pub fn new(callers: BTreeMap<String, AuthorizationGrant>) -> Self {
		Self { callers }
	}

	pub fn from_path(path: &Path) -> Result<Self> {
		let raw = fs::read_to_string(path).map_err(|err| Error::Config {
			message: format!("Failed to read grants at {path:?}: {err}."),
		})?;

		Self::from_json(&raw)
	}

	pub fn from_json(raw: &str) -> Result<Self> {
		serde_json::from_str(raw).map_err(|err| Error::Config {
			message: format!("Failed to parse grants: {err}."),
		})
	}

	/// Narrows the caller's parties to `requested_parties` when any are given.
	fn grant_for(&self, caller: &str, requested_parties: &[String]) -> AuthorizationGrant {
		let Some(grant) = self.callers.get(caller) else {
			tracing::debug!(caller, "No grant configured for caller.");

			return AuthorizationGrant::default();
		};
		let mut grant = grant.clone();

		if !requested_parties.is_empty() {
			grant.party_to_services.retain(|party, _| requested_parties.contains(party));
		}

		grant
	}
}

impl AuthorizationProvider for StaticAuthorizationProvider {
	fn resolve_grant<'a>(
		&'a self,
		caller: &'a str,
		requested_parties: &'a [String],
		_requested_services: &'a [String],
	) -> BoxFuture<'a, Result<AuthorizationGrant>> {
		let grant = self.grant_for(caller, requested_parties);

		Box::pin(async move { Ok(grant) })
	}
}

#[cfg(test)]
mod tests {
	use uuid::Uuid;

	use super::*;

	const GRANTS: &str = r#"{
		"callers": {
			"user-1": {
				"party_to_services": {
					"urn:party:a": ["svc-1", "svc-2"],
					"urn:party:b": ["svc-1"]
				},
				"dialog_ids": ["00000000-0000-0000-0000-000000000007"]
			}
		}
	}"#;

	#[test]
	fn loads_grants_keyed_by_caller() {
		let provider = StaticAuthorizationProvider::from_json(GRANTS).expect("Failed to parse.");
		let grant = provider.grant_for("user-1", &[]);

		assert_eq!(grant.party_to_services.len(), 2);
		assert_eq!(grant.dialog_ids, vec![Uuid::from_u128(7)]);
	}

	#[test]
	fn unknown_callers_get_an_empty_grant() {
		let provider = StaticAuthorizationProvider::from_json(GRANTS).expect("Failed to parse.");

		assert!(provider.grant_for("user-2", &[]).is_empty());
	}

	#[test]
	fn requested_parties_narrow_the_grant() {
		let provider = StaticAuthorizationProvider::from_json(GRANTS).expect("Failed to parse.");
		let grant = provider.grant_for("user-1", &["urn:party:b".to_string()]);

		assert_eq!(grant.party_to_services.keys().collect::<Vec<_>>(), vec!["urn:party:b"]);
		assert_eq!(grant.dialog_ids.len(), 1);
	}

	#[test]
	fn malformed_documents_are_config_errors() {
		let err = StaticAuthorizationProvider::from_json("{\"callers\": []}")
			.expect_err("Expected parse failure.");

		assert!(matches!(err, Error::Config { .. }), "{err:?}");
	}
}
