//! Core service for the note-taking pipeline. Owns the durable ingestion
//! workflow, retrieval-augmented answering, note CRUD, and the session
//! facade. Storage and model providers sit behind traits so the whole
//! service runs against in-memory fakes in tests.

pub mod answer;
pub mod delete;
pub mod ingest;
pub mod notes;
pub mod sessions;

mod error;

pub use answer::{AnswerRequest, AnswerResponse, DEFAULT_QUESTION};
pub use error::{Error, Result};
pub use ingest::{
	IngestRequest, IngestResponse, STEP_COMPUTE_EMBEDDING, STEP_CREATE_RECORD, STEP_UPSERT_VECTOR,
};

use std::{future::Future, pin::Pin, sync::Arc};

use serde_json::Value;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use nook_config::{Config, EmbeddingProviderConfig, GenerationProviderConfig};
use nook_session::SessionRegistry;
use nook_storage::{
	db::Db,
	models::{IngestRunRecord, NoteRecord},
	qdrant::{QdrantStore, VectorHit, VectorPoint},
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait NoteStore: Send + Sync {
	fn insert_note<'a>(
		&'a self,
		owner_id: &'a str,
		text: &'a str,
		created_at: OffsetDateTime,
	) -> BoxFuture<'a, color_eyre::Result<Uuid>>;
	fn get_note(&self, note_id: Uuid) -> BoxFuture<'_, color_eyre::Result<Option<NoteRecord>>>;
	fn list_notes<'a>(&'a self, owner_id: &'a str)
	-> BoxFuture<'a, color_eyre::Result<Vec<NoteRecord>>>;
	fn delete_note(&self, note_id: Uuid) -> BoxFuture<'_, color_eyre::Result<()>>;
	fn mark_indexed(
		&self,
		note_id: Uuid,
		indexed_at: OffsetDateTime,
	) -> BoxFuture<'_, color_eyre::Result<()>>;
}

pub trait RunStore: Send + Sync {
	fn fetch_run<'a>(
		&'a self,
		idempotency_key: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<Option<IngestRunRecord>>>;
	fn save_run<'a>(&'a self, run: &'a IngestRunRecord) -> BoxFuture<'a, color_eyre::Result<()>>;
	fn fetch_stalled_runs(
		&self,
		cutoff: OffsetDateTime,
		limit: u32,
	) -> BoxFuture<'_, color_eyre::Result<Vec<IngestRunRecord>>>;
}

pub trait VectorIndex: Send + Sync {
	fn upsert<'a>(&'a self, points: &'a [VectorPoint]) -> BoxFuture<'a, color_eyre::Result<()>>;
	fn query_top_k<'a>(
		&'a self,
		vector: &'a [f32],
		k: u32,
	) -> BoxFuture<'a, color_eyre::Result<Vec<VectorHit>>>;
	fn delete_by_ids<'a>(&'a self, note_ids: &'a [Uuid]) -> BoxFuture<'a, color_eyre::Result<()>>;
}

pub trait EmbeddingProvider: Send + Sync {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>>;
}

pub trait GenerationProvider: Send + Sync {
	fn generate<'a>(
		&'a self,
		cfg: &'a GenerationProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, color_eyre::Result<Option<String>>>;
}

#[derive(Clone)]
pub struct Stores {
	pub notes: Arc<dyn NoteStore>,
	pub runs: Arc<dyn RunStore>,
	pub vectors: Arc<dyn VectorIndex>,
}
impl Stores {
	/// Production wiring: Postgres rows plus a Qdrant collection.
	pub fn postgres(db: Arc<Db>, qdrant: Arc<QdrantStore>) -> Self {
		Self {
			notes: Arc::new(PgNoteStore { db: db.clone() }),
			runs: Arc::new(PgRunStore { db }),
			vectors: Arc::new(QdrantVectorIndex { store: qdrant }),
		}
	}
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub generation: Arc<dyn GenerationProvider>,
}
impl Providers {
	pub fn remote() -> Self {
		Self { embedding: Arc::new(HttpProviders), generation: Arc::new(HttpProviders) }
	}
}

struct PgNoteStore {
	db: Arc<Db>,
}
impl NoteStore for PgNoteStore {
	fn insert_note<'a>(
		&'a self,
		owner_id: &'a str,
		text: &'a str,
		created_at: OffsetDateTime,
	) -> BoxFuture<'a, color_eyre::Result<Uuid>> {
		Box::pin(async move {
			Ok(nook_storage::notes::insert_note(&self.db, owner_id, text, created_at).await?)
		})
	}

	fn get_note(&self, note_id: Uuid) -> BoxFuture<'_, color_eyre::Result<Option<NoteRecord>>> {
		Box::pin(async move { Ok(nook_storage::notes::get_note(&self.db, note_id).await?) })
	}

	fn list_notes<'a>(
		&'a self,
		owner_id: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<Vec<NoteRecord>>> {
		Box::pin(async move { Ok(nook_storage::notes::list_notes(&self.db, owner_id).await?) })
	}

	fn delete_note(&self, note_id: Uuid) -> BoxFuture<'_, color_eyre::Result<()>> {
		Box::pin(async move { Ok(nook_storage::notes::delete_note(&self.db, note_id).await?) })
	}

	fn mark_indexed(
		&self,
		note_id: Uuid,
		indexed_at: OffsetDateTime,
	) -> BoxFuture<'_, color_eyre::Result<()>> {
		Box::pin(async move {
			Ok(nook_storage::notes::mark_indexed(&self.db, note_id, indexed_at).await?)
		})
	}
}

struct PgRunStore {
	db: Arc<Db>,
}
impl RunStore for PgRunStore {
	fn fetch_run<'a>(
		&'a self,
		idempotency_key: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<Option<IngestRunRecord>>> {
		Box::pin(
			async move { Ok(nook_storage::runs::fetch_run(&self.db, idempotency_key).await?) },
		)
	}

	fn save_run<'a>(&'a self, run: &'a IngestRunRecord) -> BoxFuture<'a, color_eyre::Result<()>> {
		Box::pin(async move { Ok(nook_storage::runs::save_run(&self.db, run).await?) })
	}

	fn fetch_stalled_runs(
		&self,
		cutoff: OffsetDateTime,
		limit: u32,
	) -> BoxFuture<'_, color_eyre::Result<Vec<IngestRunRecord>>> {
		Box::pin(async move {
			Ok(nook_storage::runs::fetch_stalled_runs(&self.db, cutoff, limit).await?)
		})
	}
}

struct QdrantVectorIndex {
	store: Arc<QdrantStore>,
}
impl VectorIndex for QdrantVectorIndex {
	fn upsert<'a>(&'a self, points: &'a [VectorPoint]) -> BoxFuture<'a, color_eyre::Result<()>> {
		Box::pin(async move { Ok(self.store.upsert_points(points).await?) })
	}

	fn query_top_k<'a>(
		&'a self,
		vector: &'a [f32],
		k: u32,
	) -> BoxFuture<'a, color_eyre::Result<Vec<VectorHit>>> {
		Box::pin(async move { Ok(self.store.query_top_k(vector, k).await?) })
	}

	fn delete_by_ids<'a>(&'a self, note_ids: &'a [Uuid]) -> BoxFuture<'a, color_eyre::Result<()>> {
		Box::pin(async move { Ok(self.store.delete_by_ids(note_ids).await?) })
	}
}

struct HttpProviders;
impl EmbeddingProvider for HttpProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		Box::pin(nook_providers::embedding::embed(cfg, texts))
	}
}
impl GenerationProvider for HttpProviders {
	fn generate<'a>(
		&'a self,
		cfg: &'a GenerationProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, color_eyre::Result<Option<String>>> {
		Box::pin(nook_providers::generation::generate(cfg, messages))
	}
}

pub struct Service {
	pub cfg: Config,
	pub stores: Stores,
	pub providers: Providers,
	pub sessions: SessionRegistry,
}
impl Service {
	pub fn new(cfg: Config, stores: Stores, providers: Providers) -> Self {
		let sessions = SessionRegistry::new(Duration::hours(cfg.session.ttl_hours));

		Self { cfg, stores, providers, sessions }
	}

	/// Connects to Postgres and Qdrant, bootstraps schema and collection, and
	/// wires the remote model providers.
	pub async fn connect(cfg: Config) -> Result<Self> {
		let db = Db::connect(&cfg.storage.postgres).await.map_err(|err| Error::Storage {
			message: err.to_string(),
		})?;

		db.ensure_schema().await.map_err(|err| Error::Storage { message: err.to_string() })?;

		let qdrant = QdrantStore::new(&cfg.storage.qdrant)
			.map_err(|err| Error::VectorIndex { message: err.to_string() })?;

		qdrant
			.ensure_collection()
			.await
			.map_err(|err| Error::VectorIndex { message: err.to_string() })?;

		let stores = Stores::postgres(Arc::new(db), Arc::new(qdrant));

		Ok(Self::new(cfg, stores, Providers::remote()))
	}
}
