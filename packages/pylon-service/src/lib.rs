pub mod pool;
pub mod rank;
pub mod record_outcome;
pub mod select_application;
pub mod select_node;

use std::sync::Arc;

use rand::Rng;

pub use record_outcome::RecordOutcomeRequest;
pub use select_application::SelectApplicationRequest;
pub use select_node::SelectNodeRequest;

use pylon_config::Config;
use pylon_domain::quality::{QualityRecord, ServiceLog};
use pylon_storage::QualityStore;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Store(#[from] pylon_storage::Error),
	#[error("Malformed quality record for {candidate_id} on {domain}.")]
	Decode { domain: String, candidate_id: String, source: serde_json::Error },
	#[error("Failed to encode the quality record for {candidate_id} on {domain}.")]
	Encode { domain: String, candidate_id: String, source: serde_json::Error },
	#[error("No candidates supplied for {domain}.")]
	EmptyCandidates { domain: String },
	#[error("Selected node {public_key} is missing from the session.")]
	UnknownNode { public_key: String },
}

/// Uniform random index source. Injectable so tests can fix the draw.
pub trait Sampler
where
	Self: Send + Sync,
{
	/// Returns an index in `0..bound`. Callers never pass a zero bound.
	fn pick(&self, bound: usize) -> usize;
}

/// Default sampler backed by the thread-local generator.
pub struct ThreadRngSampler;
impl Sampler for ThreadRngSampler {
	fn pick(&self, bound: usize) -> usize {
		rand::thread_rng().gen_range(0..bound)
	}
}

/// Quality-weighted selection over relay candidates, backed by the
/// hour-bucketed counters in the quality store.
pub struct QosService {
	pub cfg: Config,
	pub store: Arc<dyn QualityStore>,
	pub sampler: Arc<dyn Sampler>,
}
impl QosService {
	pub fn new(cfg: Config, store: Arc<dyn QualityStore>) -> Self {
		Self { cfg, store, sampler: Arc::new(ThreadRngSampler) }
	}

	pub fn with_sampler(
		cfg: Config,
		store: Arc<dyn QualityStore>,
		sampler: Arc<dyn Sampler>,
	) -> Self {
		Self { cfg, store, sampler }
	}

	/// Fetches the current-hour record for each candidate and derives its
	/// service log.
	pub(crate) async fn build_logs(
		&self,
		domain: &str,
		candidate_ids: &[String],
	) -> Result<Vec<ServiceLog>> {
		let mut logs = Vec::with_capacity(candidate_ids.len());

		for id in candidate_ids {
			let raw = self.store.fetch(domain, id).await?;
			let record = match raw.as_deref() {
				Some(text) => Some(decode_record(domain, id, text)?),
				None => None,
			};

			logs.push(ServiceLog::from_record(id.clone(), record.as_ref()));
		}

		Ok(logs)
	}

	/// Uniform draw from the weighted pool. When every candidate was
	/// shelved the draw falls back to the unweighted candidate list, so a
	/// non-empty input always yields one of its members.
	pub(crate) fn choose<'a>(
		&self,
		domain: &str,
		request_id: &str,
		pool: &'a [String],
		candidates: &'a [String],
	) -> Result<&'a str> {
		if candidates.is_empty() {
			return Err(Error::EmptyCandidates { domain: domain.to_string() });
		}
		if pool.is_empty() {
			tracing::warn!(
				domain = %domain,
				request_id = %request_id,
				"Weighted pool is empty. Falling back to the unweighted candidate list."
			);

			return Ok(candidates[self.sampler.pick(candidates.len())].as_str());
		}

		Ok(pool[self.sampler.pick(pool.len())].as_str())
	}
}

pub(crate) fn decode_record(domain: &str, candidate_id: &str, text: &str) -> Result<QualityRecord> {
	serde_json::from_str(text).map_err(|err| Error::Decode {
		domain: domain.to_string(),
		candidate_id: candidate_id.to_string(),
		source: err,
	})
}

pub(crate) fn encode_record(
	domain: &str,
	candidate_id: &str,
	record: &QualityRecord,
) -> Result<String> {
	serde_json::to_string(record).map_err(|err| Error::Encode {
		domain: domain.to_string(),
		candidate_id: candidate_id.to_string(),
		source: err,
	})
}
