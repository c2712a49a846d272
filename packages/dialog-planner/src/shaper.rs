use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::Serialize;
use serde_json::Value;

use dialog_domain::AuthorizationGrant;

pub const PERMISSION_GROUPS_SCHEMA_V1: &str = "permission_groups/v1";

/// Parties that share exactly the same authorized service set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PartyServiceGroup {
	pub parties: Vec<String>,
	pub services: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShapedGrant {
	pub groups: Vec<PartyServiceGroup>,
	/// Distinct authorized services after the request filters, compared case-insensitively.
	pub total_service_count: usize,
}

impl ShapedGrant {
	pub fn party_count(&self) -> usize {
		self.groups.iter().map(|group| group.parties.len()).sum()
	}

	pub fn group_service_count(&self) -> usize {
		self.groups.iter().map(|group| group.services.len()).sum()
	}

	/// The single `jsonb` parameter the strategies unpack with `jsonb_to_recordset`.
	pub fn to_wire(&self) -> Value {
		serde_json::json!({
			"schema": PERMISSION_GROUPS_SCHEMA_V1,
			"groups": self.groups,
		})
	}
}

/// Collapses `grant` into groups of parties with identical service sets.
///
/// Empty `requested_parties` or `requested_services` leave that side unrestricted. Parties whose
/// service set becomes empty are dropped.
pub fn shape_grant(
	grant: &AuthorizationGrant,
	requested_parties: &[String],
	requested_services: &[String],
) -> ShapedGrant {
	let party_allowed =
		|party: &str| requested_parties.is_empty() || requested_parties.iter().any(|p| p == party);
	let service_allowed = |service: &str| {
		requested_services.is_empty() || requested_services.iter().any(|s| s == service)
	};
	let mut by_services: BTreeMap<BTreeSet<&str>, Vec<&str>> = BTreeMap::new();
	let mut distinct_services: HashSet<String> = HashSet::new();

	for (party, services) in &grant.party_to_services {
		if !party_allowed(party) {
			continue;
		}

		let services: BTreeSet<&str> = services
			.iter()
			.map(String::as_str)
			.filter(|service| service_allowed(service))
			.collect();

		if services.is_empty() {
			continue;
		}

		distinct_services.extend(services.iter().map(|service| service.to_lowercase()));
		by_services.entry(services).or_default().push(party);
	}

	let groups = by_services
		.into_iter()
		.map(|(services, parties)| PartyServiceGroup {
			parties: parties.into_iter().map(str::to_string).collect(),
			services: services.into_iter().map(str::to_string).collect(),
		})
		.collect();
	let shaped = ShapedGrant { groups, total_service_count: distinct_services.len() };

	tracing::debug!(
		total_parties = shaped.party_count(),
		total_services = shaped.group_service_count(),
		groups = shaped.groups.len(),
		distinct_services = shaped.total_service_count,
		"Shaped authorization grant."
	);

	shaped
}

#[cfg(test)]
mod tests {
	use super::*;

	fn strings(values: &[&str]) -> Vec<String> {
		values.iter().map(|value| value.to_string()).collect()
	}

	#[test]
	fn parties_with_equal_service_sets_share_a_group() {
		let grant = AuthorizationGrant::default()
			.with_party("a", ["x", "y"])
			.with_party("b", ["y", "x"])
			.with_party("c", ["x"]);
		let shaped = shape_grant(&grant, &[], &[]);

		assert_eq!(
			shaped.groups,
			vec![
				PartyServiceGroup { parties: strings(&["c"]), services: strings(&["x"]) },
				PartyServiceGroup { parties: strings(&["a", "b"]), services: strings(&["x", "y"]) },
			]
		);
		assert_eq!(shaped.total_service_count, 2);
	}

	#[test]
	fn request_filters_narrow_and_drop_groups() {
		let grant = AuthorizationGrant::default()
			.with_party("a", ["x", "y"])
			.with_party("b", ["z"])
			.with_party("c", ["x"]);
		let shaped = shape_grant(&grant, &strings(&["a", "b", "c"]), &strings(&["x"]));

		assert_eq!(
			shaped.groups,
			vec![PartyServiceGroup { parties: strings(&["a", "c"]), services: strings(&["x"]) }]
		);
		assert_eq!(shaped.total_service_count, 1);

		let shaped = shape_grant(&grant, &strings(&["b"]), &strings(&["x"]));

		assert!(shaped.groups.is_empty());
		assert_eq!(shaped.total_service_count, 0);
	}

	#[test]
	fn service_count_ignores_case() {
		let grant =
			AuthorizationGrant::default().with_party("a", ["Svc"]).with_party("b", ["svc"]);
		let shaped = shape_grant(&grant, &[], &[]);

		assert_eq!(shaped.groups.len(), 2);
		assert_eq!(shaped.total_service_count, 1);
	}

	#[test]
	fn wire_format_is_versioned() {
		let grant = AuthorizationGrant::default().with_party("a", ["x"]);
		let wire = shape_grant(&grant, &[], &[]).to_wire();

		assert_eq!(
			wire,
			serde_json::json!({
				"schema": "permission_groups/v1",
				"groups": [{ "parties": ["a"], "services": ["x"] }],
			})
		);
	}
}
