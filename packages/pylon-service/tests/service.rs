use std::sync::{
	Arc, Mutex,
	atomic::{AtomicBool, Ordering},
};

use rand::{Rng, SeedableRng, rngs::StdRng};

use pylon_config::{Config, Qos, Redis, Service, Storage};
use pylon_domain::quality::QualityRecord;
use pylon_domain::session::{Node, Session};
use pylon_service::{
	Error, QosService, RecordOutcomeRequest, Sampler, SelectApplicationRequest, SelectNodeRequest,
};
use pylon_storage::QualityStore;
use pylon_testkit::MemoryStore;

struct FixedSampler(usize);
impl Sampler for FixedSampler {
	fn pick(&self, bound: usize) -> usize {
		self.0.min(bound - 1)
	}
}

struct SeededSampler(Mutex<StdRng>);
impl SeededSampler {
	fn new(seed: u64) -> Self {
		Self(Mutex::new(StdRng::seed_from_u64(seed)))
	}
}
impl Sampler for SeededSampler {
	fn pick(&self, bound: usize) -> usize {
		self.0.lock().unwrap_or_else(|err| err.into_inner()).gen_range(0..bound)
	}
}

/// Injects one competing write before the first conditional persist, so the
/// caller's compare-and-swap round is lost exactly once.
struct ContendedStore {
	inner: MemoryStore,
	contested: AtomicBool,
	competing: String,
}
impl ContendedStore {
	fn new(competing: String) -> Self {
		Self { inner: MemoryStore::new(), contested: AtomicBool::new(true), competing }
	}
}
impl QualityStore for ContendedStore {
	fn fetch<'a>(
		&'a self,
		domain: &'a str,
		candidate_id: &'a str,
	) -> pylon_storage::BoxFuture<'a, pylon_storage::Result<Option<String>>> {
		self.inner.fetch(domain, candidate_id)
	}

	fn persist<'a>(
		&'a self,
		domain: &'a str,
		candidate_id: &'a str,
		value: &'a str,
		ttl_seconds: u64,
	) -> pylon_storage::BoxFuture<'a, pylon_storage::Result<()>> {
		self.inner.persist(domain, candidate_id, value, ttl_seconds)
	}

	fn persist_if<'a>(
		&'a self,
		domain: &'a str,
		candidate_id: &'a str,
		expected: Option<&'a str>,
		value: &'a str,
		ttl_seconds: u64,
	) -> pylon_storage::BoxFuture<'a, pylon_storage::Result<bool>> {
		if self.contested.swap(false, Ordering::SeqCst) {
			return Box::pin(async move {
				self.inner.persist(domain, candidate_id, &self.competing, ttl_seconds).await?;

				Ok(false)
			});
		}

		self.inner.persist_if(domain, candidate_id, expected, value, ttl_seconds)
	}
}

fn test_config() -> Config {
	Config {
		service: Service { log_level: "info".to_string() },
		storage: Storage { redis: Redis { url: "redis://localhost:6379".to_string() } },
		qos: Qos::default(),
	}
}

fn service_with(store: Arc<dyn QualityStore>, sampler: Arc<dyn Sampler>) -> QosService {
	QosService::with_sampler(test_config(), store, sampler)
}

async fn seed(store: &MemoryStore, domain: &str, candidate_id: &str, record: &QualityRecord) {
	let text = serde_json::to_string(record).expect("Failed to encode record.");

	store.persist(domain, candidate_id, &text, 900).await.expect("Failed to seed store.");
}

fn record(entries: &[(u16, u64)], average_success_latency: f64) -> QualityRecord {
	let mut record = QualityRecord::default();

	for (code, count) in entries {
		record.results.insert(*code, *count);
	}

	record.average_success_latency = average_success_latency;

	record
}

fn app_request(candidate_ids: &[&str]) -> SelectApplicationRequest {
	SelectApplicationRequest {
		load_balancer_id: "lb-1".to_string(),
		candidate_ids: candidate_ids.iter().map(|id| id.to_string()).collect(),
		domain: "eth".to_string(),
		request_id: "req-1".to_string(),
	}
}

fn two_node_session() -> Session {
	Session {
		key: "session-1".to_string(),
		chain: "eth".to_string(),
		nodes: vec![
			Node { public_key: "node-a".to_string(), service_url: "https://a.example".to_string() },
			Node { public_key: "node-b".to_string(), service_url: "https://b.example".to_string() },
		],
	}
}

#[tokio::test]
async fn weighted_pool_layout_matches_the_ranked_tiers() {
	let store = Arc::new(MemoryStore::new());

	// A: 19/20 at 120 average. B: untested. C: three straight failures.
	seed(&store, "eth", "A", &record(&[(200, 19), (500, 1)], 120.0)).await;
	seed(&store, "eth", "C", &record(&[(500, 3)], 0.0)).await;

	// The ranked pool is B x10, A x8, C x1. Fixed draws probe its layout.
	for (index, expected) in [(0, "B"), (9, "B"), (10, "A"), (17, "A"), (18, "C")] {
		let service = service_with(store.clone(), Arc::new(FixedSampler(index)));
		let chosen = service
			.select_application(&app_request(&["A", "B", "C"]))
			.await
			.expect("Failed to select an application.");

		assert_eq!(chosen, expected, "draw at index {index}");
	}
}

#[tokio::test]
async fn selection_always_returns_a_member_of_the_input() {
	let store = Arc::new(MemoryStore::new());

	seed(&store, "eth", "app-1", &record(&[(200, 5), (500, 5)], 90.0)).await;
	seed(&store, "eth", "app-3", &record(&[(500, 2)], 0.0)).await;

	for seed_value in 0..20 {
		let service = service_with(store.clone(), Arc::new(SeededSampler::new(seed_value)));
		let chosen = service
			.select_application(&app_request(&["app-1", "app-2", "app-3"]))
			.await
			.expect("Failed to select an application.");

		assert!(["app-1", "app-2", "app-3"].contains(&chosen.as_str()));
	}
}

#[tokio::test]
async fn fully_shelved_pools_fall_back_to_the_unweighted_list() {
	let store = Arc::new(MemoryStore::new());

	seed(&store, "eth", "app-1", &record(&[(500, 15)], 0.0)).await;
	seed(&store, "eth", "app-2", &record(&[(500, 20)], 0.0)).await;

	let service = service_with(store.clone(), Arc::new(FixedSampler(1)));
	let chosen = service
		.select_application(&app_request(&["app-1", "app-2"]))
		.await
		.expect("Failed to select an application.");

	assert_eq!(chosen, "app-2");
}

#[tokio::test]
async fn empty_candidate_lists_are_rejected() {
	let store = Arc::new(MemoryStore::new());
	let service = service_with(store, Arc::new(FixedSampler(0)));
	let result = service.select_application(&app_request(&[])).await;

	assert!(matches!(result, Err(Error::EmptyCandidates { .. })));
}

#[tokio::test]
async fn malformed_stored_records_fail_the_selection() {
	let store = Arc::new(MemoryStore::new());

	store.persist("eth", "app-1", "not a record", 900).await.expect("Failed to seed store.");

	let service = service_with(store, Arc::new(FixedSampler(0)));
	let result = service.select_application(&app_request(&["app-1"])).await;

	assert!(matches!(result, Err(Error::Decode { .. })));
}

#[tokio::test]
async fn select_node_returns_the_only_unshelved_node() {
	let store = Arc::new(MemoryStore::new());

	// node-a hits the node-flow failure quota of three; node-b is untested.
	seed(&store, "eth", "node-a", &record(&[(500, 3)], 0.0)).await;

	for seed_value in 0..10 {
		let service = service_with(store.clone(), Arc::new(SeededSampler::new(seed_value)));
		let node = service
			.select_node(&SelectNodeRequest {
				application_id: "app-1".to_string(),
				session: two_node_session(),
				domain: "eth".to_string(),
				request_id: "req-1".to_string(),
			})
			.await
			.expect("Failed to select a node.");

		assert_eq!(node.public_key, "node-b");
		assert_eq!(node.service_url, "https://b.example");
	}
}

#[tokio::test]
async fn select_node_falls_back_when_every_node_is_shelved() {
	let store = Arc::new(MemoryStore::new());

	seed(&store, "eth", "node-a", &record(&[(500, 3)], 0.0)).await;
	seed(&store, "eth", "node-b", &record(&[(500, 4)], 0.0)).await;

	let service = service_with(store, Arc::new(FixedSampler(0)));
	let node = service
		.select_node(&SelectNodeRequest {
			application_id: "app-1".to_string(),
			session: two_node_session(),
			domain: "eth".to_string(),
			request_id: "req-1".to_string(),
		})
		.await
		.expect("Failed to select a node.");

	assert_eq!(node.public_key, "node-a");
}

#[tokio::test]
async fn record_outcome_writes_both_counters_with_their_windows() {
	let store = Arc::new(MemoryStore::new());
	let service = service_with(store.clone(), Arc::new(FixedSampler(0)));

	service
		.record_outcome(&RecordOutcomeRequest {
			domain: "eth".to_string(),
			application_id: "app-1".to_string(),
			node_id: "node-a".to_string(),
			elapsed_ms: 120.0,
			outcome_code: 200,
		})
		.await
		.expect("Failed to record the outcome.");

	let app: QualityRecord =
		serde_json::from_str(&store.raw("eth", "app-1").expect("Missing application record."))
			.expect("Failed to decode the application record.");
	let node: QualityRecord =
		serde_json::from_str(&store.raw("eth", "node-a").expect("Missing node record."))
			.expect("Failed to decode the node record.");

	assert_eq!(app.results.get(&200), Some(&1));
	assert_eq!(app.average_success_latency, 120.0);
	assert_eq!(node, app);
	assert_eq!(store.ttl_seconds("eth", "app-1"), Some(900));
	assert_eq!(store.ttl_seconds("eth", "node-a"), Some(3_600));
}

#[tokio::test]
async fn sequential_successes_average_their_latency() {
	let store = Arc::new(MemoryStore::new());
	let service = service_with(store.clone(), Arc::new(FixedSampler(0)));

	for elapsed_ms in [100.0, 300.0] {
		service
			.record_outcome(&RecordOutcomeRequest {
				domain: "eth".to_string(),
				application_id: "app-1".to_string(),
				node_id: "node-a".to_string(),
				elapsed_ms,
				outcome_code: 200,
			})
			.await
			.expect("Failed to record the outcome.");
	}

	let app: QualityRecord =
		serde_json::from_str(&store.raw("eth", "app-1").expect("Missing application record."))
			.expect("Failed to decode the application record.");

	assert_eq!(app.results.get(&200), Some(&2));
	assert_eq!(app.average_success_latency, 200.0);
}

#[tokio::test]
async fn failures_never_move_the_success_average() {
	let store = Arc::new(MemoryStore::new());
	let service = service_with(store.clone(), Arc::new(FixedSampler(0)));

	for (elapsed_ms, outcome_code) in [(100.0, 200), (999.0, 500)] {
		service
			.record_outcome(&RecordOutcomeRequest {
				domain: "eth".to_string(),
				application_id: "app-1".to_string(),
				node_id: "node-a".to_string(),
				elapsed_ms,
				outcome_code,
			})
			.await
			.expect("Failed to record the outcome.");
	}

	let app: QualityRecord =
		serde_json::from_str(&store.raw("eth", "app-1").expect("Missing application record."))
			.expect("Failed to decode the application record.");

	assert_eq!(app.attempts(), 2);
	assert_eq!(app.average_success_latency, 100.0);
}

#[tokio::test]
async fn a_lost_compare_and_swap_round_folds_on_top_of_the_winner() {
	let competing = serde_json::to_string(&QualityRecord::first(200, 100.0))
		.expect("Failed to encode the competing record.");
	let store = Arc::new(ContendedStore::new(competing));
	let service = service_with(store.clone(), Arc::new(FixedSampler(0)));

	service
		.record_outcome(&RecordOutcomeRequest {
			domain: "eth".to_string(),
			application_id: "app-1".to_string(),
			node_id: "node-a".to_string(),
			elapsed_ms: 300.0,
			outcome_code: 200,
		})
		.await
		.expect("Failed to record the outcome.");

	// The competing relay's 100 ms success and this relay's 300 ms success
	// both survive the race.
	let app: QualityRecord =
		serde_json::from_str(&store.inner.raw("eth", "app-1").expect("Missing application record."))
			.expect("Failed to decode the application record.");

	assert_eq!(app.results.get(&200), Some(&2));
	assert_eq!(app.average_success_latency, 200.0);
}
