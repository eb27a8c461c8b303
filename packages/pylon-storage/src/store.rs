use redis::{AsyncCommands, Script, aio::ConnectionManager};

use crate::{BoxFuture, QualityStore, Result, keys};

// Conditional set: the stored text must match the caller's expectation
// (or the key must be absent) for the write to land.
const PERSIST_IF_SCRIPT: &str = r#"
local current = redis.call('GET', KEYS[1])
if ARGV[1] == '1' then
  if current ~= ARGV[2] then
    return 0
  end
elseif current then
  return 0
end
redis.call('SET', KEYS[1], ARGV[3], 'EX', tonumber(ARGV[4]))
return 1
"#;

/// Redis-backed quality store.
pub struct RedisStore {
	conn: ConnectionManager,
	persist_script: Script,
}
impl RedisStore {
	pub async fn connect(cfg: &pylon_config::Redis) -> Result<Self> {
		let client = redis::Client::open(cfg.url.as_str())?;
		let conn = ConnectionManager::new(client).await?;

		Ok(Self { conn, persist_script: Script::new(PERSIST_IF_SCRIPT) })
	}
}
impl QualityStore for RedisStore {
	fn fetch<'a>(
		&'a self,
		domain: &'a str,
		candidate_id: &'a str,
	) -> BoxFuture<'a, Result<Option<String>>> {
		let mut conn = self.conn.clone();

		Box::pin(async move {
			let key = keys::current_quality_key(domain, candidate_id);
			let value: Option<String> = conn.get(key).await?;

			Ok(value)
		})
	}

	fn persist<'a>(
		&'a self,
		domain: &'a str,
		candidate_id: &'a str,
		value: &'a str,
		ttl_seconds: u64,
	) -> BoxFuture<'a, Result<()>> {
		let mut conn = self.conn.clone();

		Box::pin(async move {
			let key = keys::current_quality_key(domain, candidate_id);

			conn.set_ex::<_, _, ()>(key, value, ttl_seconds).await?;

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
		let mut conn = self.conn.clone();

		Box::pin(async move {
			let key = keys::current_quality_key(domain, candidate_id);
			let stored: i64 = self
				.persist_script
				.key(key)
				.arg(if expected.is_some() { "1" } else { "0" })
				.arg(expected.unwrap_or(""))
				.arg(value)
				.arg(ttl_seconds)
				.invoke_async(&mut conn)
				.await?;

			Ok(stored == 1)
		})
	}
}
