use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	nook_worker::run(nook_worker::Args::parse()).await
}
