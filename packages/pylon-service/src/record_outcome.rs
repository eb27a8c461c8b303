use serde::{Deserialize, Serialize};

use crate::{QosService, Result, decode_record, encode_record};
use pylon_domain::quality::QualityRecord;

const MAX_CAS_ATTEMPTS: u32 = 4;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecordOutcomeRequest {
	pub domain: String,
	pub application_id: String,
	pub node_id: String,
	pub elapsed_ms: f64,
	pub outcome_code: u16,
}

impl QosService {
	/// Folds one relay outcome into both the application-scoped and the
	/// node-scoped counters. The two folds window independently: the
	/// application record expires faster than the node record.
	pub async fn record_outcome(&self, req: &RecordOutcomeRequest) -> Result<()> {
		self.fold(
			&req.domain,
			&req.application_id,
			self.cfg.qos.app_ttl_seconds,
			req.elapsed_ms,
			req.outcome_code,
		)
		.await?;
		self.fold(
			&req.domain,
			&req.node_id,
			self.cfg.qos.node_ttl_seconds,
			req.elapsed_ms,
			req.outcome_code,
		)
		.await?;

		Ok(())
	}

	/// Read-modify-write of one counter, retried through the store's
	/// conditional persist so concurrent relays never lose an increment.
	/// After the attempt quota the write degrades to a plain overwrite,
	/// keeping last-write-wins semantics under sustained contention.
	async fn fold(
		&self,
		domain: &str,
		candidate_id: &str,
		ttl_seconds: u64,
		elapsed_ms: f64,
		outcome_code: u16,
	) -> Result<()> {
		for _ in 0..MAX_CAS_ATTEMPTS {
			let raw = self.store.fetch(domain, candidate_id).await?;
			let encoded =
				folded_record(domain, candidate_id, raw.as_deref(), outcome_code, elapsed_ms)?;

			if self
				.store
				.persist_if(domain, candidate_id, raw.as_deref(), &encoded, ttl_seconds)
				.await?
			{
				return Ok(());
			}

			tracing::debug!(
				domain = %domain,
				candidate = %candidate_id,
				"Lost a concurrent counter update. Retrying."
			);
		}

		tracing::warn!(
			domain = %domain,
			candidate = %candidate_id,
			"Counter update stayed contended. Overwriting."
		);

		let raw = self.store.fetch(domain, candidate_id).await?;
		let encoded = folded_record(domain, candidate_id, raw.as_deref(), outcome_code, elapsed_ms)?;

		self.store.persist(domain, candidate_id, &encoded, ttl_seconds).await?;

		Ok(())
	}
}

fn folded_record(
	domain: &str,
	candidate_id: &str,
	raw: Option<&str>,
	outcome_code: u16,
	elapsed_ms: f64,
) -> Result<String> {
	let record = match raw {
		Some(text) => {
			let mut record = decode_record(domain, candidate_id, text)?;

			record.fold(outcome_code, elapsed_ms);

			record
		},
		None => QualityRecord::first(outcome_code, elapsed_ms),
	};

	encode_record(domain, candidate_id, &record)
}
