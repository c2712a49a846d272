use std::{
	fs,
	path::{Path, PathBuf},
	sync::Arc,
};

use clap::{Parser, Subcommand};
use color_eyre::eyre;
use serde::de::DeserializeOwned;
use time::OffsetDateTime;
use tracing_subscriber::EnvFilter;

use dialog_config::Config;
use dialog_domain::AuthorizationGrant;
use dialog_planner::{CompiledQuery, QueryPlanner};
use dialog_service::{
	DialogSearchService, SearchRequest, ServiceOwnerSearchRequest, StaticAuthorizationProvider,
};
use dialog_storage::db::Db;

#[derive(Debug, Parser)]
#[command(
	version = dialog_cli::VERSION,
	rename_all = "kebab",
	styles = dialog_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE", global = true, default_value = "dialog.toml")]
	pub config: PathBuf,
	#[command(subcommand)]
	pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
	/// Print the strategy, SQL and parameters for a request without touching the database.
	Plan {
		#[arg(long, short = 'r', value_name = "FILE")]
		request: PathBuf,
		/// A single authorization grant as JSON.
		#[arg(long, short = 'g', value_name = "FILE")]
		grant: PathBuf,
	},
	/// Run a request against Postgres and print the resulting page.
	Search {
		#[arg(long, short = 'r', value_name = "FILE")]
		request: PathBuf,
		/// Grants keyed by caller, as `{"callers": {...}}`.
		#[arg(long, short = 'g', value_name = "FILE")]
		grants: PathBuf,
		#[arg(long, value_name = "ID")]
		caller: String,
	},
	/// Run a service-owner request over the dialogs of the given organizations.
	OwnerSearch {
		#[arg(long, short = 'r', value_name = "FILE")]
		request: PathBuf,
		/// Grants keyed by end user, consulted when the request sets `end_user_id`.
		#[arg(long, short = 'g', value_name = "FILE")]
		grants: PathBuf,
		#[arg(long = "org", value_name = "ORG", required = true)]
		orgs: Vec<String>,
	},
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = dialog_config::load(&args.config)?;
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

	match args.command {
		Command::Plan { request, grant } => {
			let request: SearchRequest = read_json(&request)?;
			let grant: AuthorizationGrant = read_json(&grant)?;
			let compiled = plan_request(&config, request, &grant, OffsetDateTime::now_utc())?;

			println!("{}", serde_json::to_string_pretty(&compiled)?);
		},
		Command::Search { request, grants, caller } => {
			let request: SearchRequest = read_json(&request)?;
			let provider = StaticAuthorizationProvider::from_path(&grants)?;
			let db = Db::connect(&config.storage.postgres).await?;

			db.ensure_schema().await?;

			let service = DialogSearchService::new(config, db, Arc::new(provider))?;
			let page = service.search(&caller, request).await?;

			println!("{}", serde_json::to_string_pretty(&page)?);
		},
		Command::OwnerSearch { request, grants, orgs } => {
			let request: ServiceOwnerSearchRequest = read_json(&request)?;
			let provider = StaticAuthorizationProvider::from_path(&grants)?;
			let db = Db::connect(&config.storage.postgres).await?;

			db.ensure_schema().await?;

			let service = DialogSearchService::new(config, db, Arc::new(provider))?;
			let page = service.search_as_service_owner(&orgs, request).await?;

			println!("{}", serde_json::to_string_pretty(&page)?);
		},
	}

	Ok(())
}

pub fn plan_request(
	config: &Config,
	request: SearchRequest,
	grant: &AuthorizationGrant,
	now: OffsetDateTime,
) -> color_eyre::Result<CompiledQuery> {
	let filters = request.into_filters(&config.search, now)?;
	let planner = QueryPlanner::from_config(&config.search)?;

	Ok(planner.plan(&filters, grant))
}

fn read_json<T>(path: &Path) -> color_eyre::Result<T>
where
	T: DeserializeOwned,
{
	let raw = fs::read_to_string(path)
		.map_err(|err| eyre::eyre!("Failed to read {}: {err}", path.display()))?;

	serde_json::from_str(&raw).map_err(|err| eyre::eyre!("Failed to parse {}: {err}", path.display()))
}
