use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	pub ingest: Ingest,
	#[serde(default)]
	pub retrieval: Retrieval,
	#[serde(default)]
	pub session: Session,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
	pub qdrant: Qdrant,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub collection: String,
	pub vector_dim: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub generation: GenerationProviderConfig,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct GenerationProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

/// Retry policy for the step-based ingestion pipeline. Each step is bounded
/// by `step_timeout_ms` per attempt and retried up to `max_attempts` times
/// with exponential backoff.
#[derive(Debug, Deserialize)]
pub struct Ingest {
	pub max_attempts: u32,
	pub base_backoff_ms: u64,
	pub max_backoff_ms: u64,
	pub step_timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Retrieval {
	pub top_k: u32,
}
impl Default for Retrieval {
	fn default() -> Self {
		Self { top_k: 1 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Session {
	pub ttl_hours: i64,
}
impl Default for Session {
	fn default() -> Self {
		Self { ttl_hours: 24 }
	}
}
