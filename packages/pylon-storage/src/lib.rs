pub mod keys;
pub mod store;

mod error;

pub use error::Error;

use std::{future::Future, pin::Pin};

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Minimal surface of the TTL-capable counter cache.
///
/// Every call rebuilds its key from the current hour bucket, so a persist
/// that crosses an hour boundary lands in the read-time bucket rather than
/// the bucket the relay started in.
pub trait QualityStore
where
	Self: Send + Sync,
{
	fn fetch<'a>(
		&'a self,
		domain: &'a str,
		candidate_id: &'a str,
	) -> BoxFuture<'a, Result<Option<String>>>;

	/// Overwrites any stored value and resets its expiry.
	fn persist<'a>(
		&'a self,
		domain: &'a str,
		candidate_id: &'a str,
		value: &'a str,
		ttl_seconds: u64,
	) -> BoxFuture<'a, Result<()>>;

	/// Stores `value` only when the current stored text equals `expected`
	/// (`None` meaning the key must be absent). Returns whether the write
	/// happened.
	fn persist_if<'a>(
		&'a self,
		domain: &'a str,
		candidate_id: &'a str,
		expected: Option<&'a str>,
		value: &'a str,
		ttl_seconds: u64,
	) -> BoxFuture<'a, Result<bool>>;
}
