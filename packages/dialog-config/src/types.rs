use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub search: Search,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Search {
	/// When false, every search uses the default strategy without scoring.
	#[serde(default = "default_enable_strategy_branching")]
	pub enable_strategy_branching: bool,
	/// Largest authorized service count for which party-driven probing is preferred.
	#[serde(default = "default_party_driven_max_services")]
	pub party_driven_max_services: u32,
	#[serde(default = "default_limit")]
	pub default_limit: u32,
	#[serde(default = "default_max_limit")]
	pub max_limit: u32,
}

impl Default for Search {
	fn default() -> Self {
		Self {
			enable_strategy_branching: default_enable_strategy_branching(),
			party_driven_max_services: default_party_driven_max_services(),
			default_limit: default_limit(),
			max_limit: default_max_limit(),
		}
	}
}

fn default_enable_strategy_branching() -> bool {
	true
}

fn default_party_driven_max_services() -> u32 {
	5
}

fn default_limit() -> u32 {
	100
}

fn default_max_limit() -> u32 {
	1_000
}
