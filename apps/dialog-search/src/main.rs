use clap::Parser;

use dialog_search::Args;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = Args::parse();

	dialog_search::run(args).await
}
