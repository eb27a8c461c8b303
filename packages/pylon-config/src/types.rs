use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	#[serde(default)]
	pub qos: Qos,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub redis: Redis,
}

#[derive(Debug, Deserialize)]
pub struct Redis {
	pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct Qos {
	/// Expiry for application-scoped counters. Shorter than the node TTL so
	/// application history decays faster.
	#[serde(default = "default_app_ttl_seconds")]
	pub app_ttl_seconds: u64,
	#[serde(default = "default_node_ttl_seconds")]
	pub node_ttl_seconds: u64,
	/// Zero-success attempts tolerated per hour bucket before an
	/// application is shelved.
	#[serde(default = "default_app_max_failures")]
	pub app_max_failures: u64,
	#[serde(default = "default_node_max_failures")]
	pub node_max_failures: u64,
	/// Emits the full ranked sequence at debug level on every selection.
	#[serde(default)]
	pub log_ranking: bool,
}
impl Default for Qos {
	fn default() -> Self {
		Self {
			app_ttl_seconds: default_app_ttl_seconds(),
			node_ttl_seconds: default_node_ttl_seconds(),
			app_max_failures: default_app_max_failures(),
			node_max_failures: default_node_max_failures(),
			log_ranking: false,
		}
	}
}

fn default_app_ttl_seconds() -> u64 {
	900
}

fn default_node_ttl_seconds() -> u64 {
	3_600
}

fn default_app_max_failures() -> u64 {
	15
}

fn default_node_max_failures() -> u64 {
	3
}
