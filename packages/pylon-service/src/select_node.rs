use serde::{Deserialize, Serialize};

use crate::{Error, QosService, Result, pool, rank};
use pylon_domain::session::{Node, Session};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SelectNodeRequest {
	pub application_id: String,
	pub session: Session,
	pub domain: String,
	pub request_id: String,
}

impl QosService {
	/// Picks one node from the session's set, biased by recent quality.
	/// Always resolves to a node of the supplied session.
	pub async fn select_node(&self, req: &SelectNodeRequest) -> Result<Node> {
		let candidate_ids = req.session.node_ids();
		let logs = self.build_logs(&req.domain, &candidate_ids).await?;
		let ranked = rank::rank_logs(logs);

		if self.cfg.qos.log_ranking {
			tracing::debug!(
				application_id = %req.application_id,
				request_id = %req.request_id,
				domain = %req.domain,
				ranked = ?ranked,
				"Ranked node logs."
			);
		}

		let pool = pool::build_weighted_pool(&ranked, self.cfg.qos.node_max_failures);
		let chosen = self.choose(&req.domain, &req.request_id, &pool, &candidate_ids)?;
		let node = req
			.session
			.node(chosen)
			.ok_or_else(|| Error::UnknownNode { public_key: chosen.to_string() })?;

		Ok(node.clone())
	}
}
