use pylon_domain::quality;

/// Counter key for one candidate in one hour bucket.
pub fn quality_key(domain: &str, candidate_id: &str, hour: u8) -> String {
	format!("{domain}-{candidate_id}-{hour}")
}

/// Counter key for the current hour bucket.
pub fn current_quality_key(domain: &str, candidate_id: &str) -> String {
	quality_key(domain, candidate_id, quality::current_hour())
}
