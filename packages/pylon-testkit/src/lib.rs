use std::{
	collections::HashMap,
	sync::Mutex,
	time::{Duration, Instant},
};

use pylon_domain::quality;
use pylon_storage::{BoxFuture, QualityStore, Result, keys};

struct Entry {
	value: String,
	ttl_seconds: u64,
	expires_at: Instant,
}

/// In-memory stand-in for the TTL key-value cache.
///
/// The hour bucket is pinned at construction so a test never straddles an
/// hour boundary between seeding the store and asserting on it.
pub struct MemoryStore {
	entries: Mutex<HashMap<String, Entry>>,
	hour: u8,
}
impl MemoryStore {
	pub fn new() -> Self {
		Self { entries: Mutex::new(HashMap::new()), hour: quality::current_hour() }
	}

	/// The stored text for a candidate, expiry included.
	pub fn raw(&self, domain: &str, candidate_id: &str) -> Option<String> {
		let entries = self.entries.lock().unwrap_or_else(|err| err.into_inner());

		entries
			.get(&self.key(domain, candidate_id))
			.filter(|entry| entry.expires_at > Instant::now())
			.map(|entry| entry.value.clone())
	}

	/// The TTL the last persist attached to a candidate's record.
	pub fn ttl_seconds(&self, domain: &str, candidate_id: &str) -> Option<u64> {
		let entries = self.entries.lock().unwrap_or_else(|err| err.into_inner());

		entries.get(&self.key(domain, candidate_id)).map(|entry| entry.ttl_seconds)
	}

	/// Forces every stored record past its expiry.
	pub fn expire_all(&self) {
		let mut entries = self.entries.lock().unwrap_or_else(|err| err.into_inner());

		for entry in entries.values_mut() {
			entry.expires_at = Instant::now();
		}
	}

	fn key(&self, domain: &str, candidate_id: &str) -> String {
		keys::quality_key(domain, candidate_id, self.hour)
	}

	fn live_value(entries: &HashMap<String, Entry>, key: &str) -> Option<String> {
		entries
			.get(key)
			.filter(|entry| entry.expires_at > Instant::now())
			.map(|entry| entry.value.clone())
	}
}
impl Default for MemoryStore {
	fn default() -> Self {
		Self::new()
	}
}
impl QualityStore for MemoryStore {
	fn fetch<'a>(
		&'a self,
		domain: &'a str,
		candidate_id: &'a str,
	) -> BoxFuture<'a, Result<Option<String>>> {
		Box::pin(async move {
			let entries = self.entries.lock().unwrap_or_else(|err| err.into_inner());

			Ok(Self::live_value(&entries, &self.key(domain, candidate_id)))
		})
	}

	fn persist<'a>(
		&'a self,
		domain: &'a str,
		candidate_id: &'a str,
		value: &'a str,
		ttl_seconds: u64,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let mut entries = self.entries.lock().unwrap_or_else(|err| err.into_inner());

			entries.insert(
				self.key(domain, candidate_id),
				Entry {
					value: value.to_string(),
					ttl_seconds,
					expires_at: Instant::now() + Duration::from_secs(ttl_seconds),
				},
			);

			Ok(())
		})
	}

	fn persist_if<'a>(
		&'a self,
		domain: &'a str,
		candidate_id: &'a str,
		expected: Option<&'a str>,
		value: &'a str,
		ttl_seconds: u64,
	) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move {
			let mut entries = self.entries.lock().unwrap_or_else(|err| err.into_inner());
			let key = self.key(domain, candidate_id);

			if Self::live_value(&entries, &key).as_deref() != expected {
				return Ok(false);
			}

			entries.insert(
				key,
				Entry {
					value: value.to_string(),
					ttl_seconds,
					expires_at: Instant::now() + Duration::from_secs(ttl_seconds),
				},
			);

			Ok(true)
		})
	}
}
