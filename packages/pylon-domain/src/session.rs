use serde::{Deserialize, Serialize};

/// A dispatchable network node inside a session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
	pub public_key: String,
	pub service_url: String,
}

/// The node set an application may relay through for one chain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
	pub key: String,
	pub chain: String,
	pub nodes: Vec<Node>,
}
impl Session {
	pub fn node(&self, public_key: &str) -> Option<&Node> {
		self.nodes.iter().find(|node| node.public_key == public_key)
	}

	pub fn node_ids(&self) -> Vec<String> {
		self.nodes.iter().map(|node| node.public_key.clone()).collect()
	}
}
