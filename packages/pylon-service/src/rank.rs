use std::cmp::Ordering;

use pylon_domain::quality::ServiceLog;

/// Orders logs best first: success rate descending, then average success
/// latency ascending. The sort is stable, so ties keep input order.
pub fn rank_logs(mut logs: Vec<ServiceLog>) -> Vec<ServiceLog> {
	logs.sort_by(|a, b| {
		cmp_f64_desc(a.success_rate, b.success_rate)
			.then_with(|| cmp_f64_asc(a.average_success_latency, b.average_success_latency))
	});

	logs
}

fn cmp_f64_desc(a: f64, b: f64) -> Ordering {
	b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

fn cmp_f64_asc(a: f64, b: f64) -> Ordering {
	a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}
