use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, UtcOffset};

/// Outcome code a relay reports when the upstream served a usable response.
pub const SUCCESS_CODE: u16 = 200;

const LATENCY_SCALE: f64 = 100_000.0;

/// Per-candidate outcome counters for one hour bucket, as persisted in the
/// quality store.
///
/// `results` maps an HTTP-style outcome code to its occurrence count. The
/// running `average_success_latency` divides by the total attempt count
/// rather than the success count, so failures dilute the mean. Deployed
/// selection bias depends on that recurrence; keep it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityRecord {
	pub results: BTreeMap<u16, u64>,
	pub average_success_latency: f64,
}
impl QualityRecord {
	/// Counters for the first outcome observed under a key.
	pub fn first(outcome: u16, elapsed_ms: f64) -> Self {
		let mut results = BTreeMap::new();

		results.insert(outcome, 1);

		let average_success_latency =
			if outcome == SUCCESS_CODE { round_latency(elapsed_ms) } else { 0.0 };

		Self { results, average_success_latency }
	}

	pub fn attempts(&self) -> u64 {
		self.results.values().sum()
	}

	pub fn successes(&self) -> u64 {
		self.results.get(&SUCCESS_CODE).copied().unwrap_or(0)
	}

	/// Folds one relay outcome into the counters.
	pub fn fold(&mut self, outcome: u16, elapsed_ms: f64) {
		*self.results.entry(outcome).or_insert(0) += 1;

		if outcome != SUCCESS_CODE {
			return;
		}

		let total = self.attempts();
		let prior = self.average_success_latency;

		self.average_success_latency =
			round_latency(((total - 1) as f64 * prior + elapsed_ms) / total as f64);
	}
}

/// Derived per-candidate summary. Lives only for one selection call.
#[derive(Clone, Debug, PartialEq)]
pub struct ServiceLog {
	pub id: String,
	pub attempts: u64,
	pub success_rate: f64,
	pub average_success_latency: f64,
}
impl ServiceLog {
	/// Builds the log for one candidate from its stored record, if any.
	///
	/// A candidate with no record yet scores a full success rate so new
	/// candidates keep getting explored.
	pub fn from_record(id: String, record: Option<&QualityRecord>) -> Self {
		let Some(record) = record else {
			return Self { id, attempts: 0, success_rate: 1.0, average_success_latency: 0.0 };
		};
		let attempts = record.attempts();
		let successes = record.successes();

		if successes == 0 {
			return Self { id, attempts, success_rate: 0.0, average_success_latency: 0.0 };
		}

		Self {
			id,
			attempts,
			success_rate: successes as f64 / attempts as f64,
			average_success_latency: round_latency(record.average_success_latency),
		}
	}
}

/// Rounds a latency to the stored 5-decimal precision.
pub fn round_latency(value: f64) -> f64 {
	(value * LATENCY_SCALE).round() / LATENCY_SCALE
}

/// Hour-of-day bucket for quality keys. Local time when the offset is
/// known, UTC otherwise.
pub fn current_hour() -> u8 {
	let now = OffsetDateTime::now_utc();

	match UtcOffset::current_local_offset() {
		Ok(offset) => now.to_offset(offset).hour(),
		Err(_) => now.hour(),
	}
}
