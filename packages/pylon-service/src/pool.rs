use pylon_domain::quality::ServiceLog;

const STARTING_WEIGHT_FACTOR: i64 = 10;
const TOP_TIER_RATE: f64 = 0.95;
const MID_TIER_RATE: f64 = 0.85;

/// Expands ranked logs into the biased selection pool.
///
/// The weight factor carries across the whole ranked sequence instead of
/// resetting per tier, so earlier candidates inside a tier get strictly
/// more copies than later ones. Candidates with any success stay eligible
/// with at least one copy; zero-success candidates at or past the failure
/// quota are shelved for the rest of the hour bucket.
pub fn build_weighted_pool(ranked: &[ServiceLog], max_failures_per_period: u64) -> Vec<String> {
	let mut pool = Vec::new();
	let mut weight_factor = STARTING_WEIGHT_FACTOR;

	for log in ranked {
		if log.success_rate > TOP_TIER_RATE {
			for _ in 0..weight_factor {
				pool.push(log.id.clone());
			}

			weight_factor -= 2;
		} else if log.success_rate > MID_TIER_RATE {
			for _ in 0..weight_factor {
				pool.push(log.id.clone());
			}

			weight_factor -= 3;

			if weight_factor <= 0 {
				weight_factor = 1;
			}
		} else if log.success_rate > 0.0 {
			pool.push(log.id.clone());
		} else if log.attempts < max_failures_per_period {
			pool.push(log.id.clone());
		} else {
			tracing::debug!(
				candidate = %log.id,
				attempts = log.attempts,
				"Candidate shelved for the rest of the hour bucket."
			);
		}
	}

	pool
}
