use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use pylon_service::{
	QosService, RecordOutcomeRequest, SelectApplicationRequest, SelectNodeRequest,
};
use pylon_storage::store::RedisStore;

#[derive(Debug, Parser)]
#[command(
	version = pylon_cli::VERSION,
	rename_all = "kebab",
	styles = pylon_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: std::path::PathBuf,
	#[command(subcommand)]
	pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
	/// Select an application id for a load balancer's candidate pool.
	SelectApp {
		#[arg(long)]
		load_balancer: String,
		#[arg(long)]
		domain: String,
		/// Comma-separated application ids.
		#[arg(long, value_delimiter = ',')]
		candidates: Vec<String>,
	},
	/// Select a node from a JSON session document.
	SelectNode {
		#[arg(long)]
		application: String,
		#[arg(long)]
		domain: String,
		#[arg(long, value_name = "FILE")]
		session: std::path::PathBuf,
	},
	/// Record one relay outcome against both counters.
	Record {
		#[arg(long)]
		domain: String,
		#[arg(long)]
		application: String,
		#[arg(long)]
		node: String,
		#[arg(long)]
		elapsed_ms: f64,
		#[arg(long)]
		code: u16,
	},
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = pylon_config::load(&args.config)?;
	let filter = EnvFilter::new(config.service.log_level.clone());
	tracing_subscriber::fmt().with_env_filter(filter).init();

	let store = RedisStore::connect(&config.storage.redis).await?;
	let service = QosService::new(config, Arc::new(store));
	let request_id = Uuid::new_v4().to_string();

	match args.command {
		Command::SelectApp { load_balancer, domain, candidates } => {
			let chosen = service
				.select_application(&SelectApplicationRequest {
					load_balancer_id: load_balancer,
					candidate_ids: candidates,
					domain,
					request_id,
				})
				.await?;

			println!("{chosen}");
		},
		Command::SelectNode { application, domain, session } => {
			let raw = std::fs::read_to_string(&session)?;
			let session = serde_json::from_str(&raw)?;
			let node = service
				.select_node(&SelectNodeRequest {
					application_id: application,
					session,
					domain,
					request_id,
				})
				.await?;

			println!("{} {}", node.public_key, node.service_url);
		},
		Command::Record { domain, application, node, elapsed_ms, code } => {
			service
				.record_outcome(&RecordOutcomeRequest {
					domain,
					application_id: application,
					node_id: node,
					elapsed_ms,
					outcome_code: code,
				})
				.await?;
		},
	}

	Ok(())
}
