use clap::Parser;
use tracing_subscriber::EnvFilter;

use nook_service::Service;

pub mod worker;

#[derive(Debug, Parser)]
#[command(rename_all = "kebab")]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: std::path::PathBuf,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = nook_config::load(&args.config)?;
	let filter = EnvFilter::new(config.service.log_level.clone());

	tracing_subscriber::fmt().with_env_filter(filter).init();

	let service = Service::connect(config).await?;

	worker::run_worker(service).await
}
