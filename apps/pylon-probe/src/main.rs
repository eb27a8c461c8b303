use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	pylon_probe::run(pylon_probe::Args::parse()).await
}
