use serde::{Deserialize, Serialize};

use crate::{QosService, Result, pool, rank};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SelectApplicationRequest {
	pub load_balancer_id: String,
	pub candidate_ids: Vec<String>,
	pub domain: String,
	pub request_id: String,
}

impl QosService {
	/// Picks one application id from the load balancer's pool, biased by
	/// recent quality. Always returns a member of `candidate_ids`.
	pub async fn select_application(&self, req: &SelectApplicationRequest) -> Result<String> {
		let logs = self.build_logs(&req.domain, &req.candidate_ids).await?;
		let ranked = rank::rank_logs(logs);

		if self.cfg.qos.log_ranking {
			tracing::debug!(
				load_balancer_id = %req.load_balancer_id,
				request_id = %req.request_id,
				domain = %req.domain,
				ranked = ?ranked,
				"Ranked application logs."
			);
		}

		let pool = pool::build_weighted_pool(&ranked, self.cfg.qos.app_max_failures);
		let chosen = self.choose(&req.domain, &req.request_id, &pool, &req.candidate_ids)?;

		Ok(chosen.to_string())
	}
}
