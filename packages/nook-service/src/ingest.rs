//! Durable three-step ingestion. Each run is keyed by a caller-supplied
//! idempotency key and persists its progress after every step, so a crashed
//! or failed run can be re-driven with the same key and resume where it
//! stopped instead of duplicating work.

use std::{future::Future, time::Duration as StdDuration};

use color_eyre::eyre;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use nook_storage::{
	models::{
		IngestRunRecord, RUN_STATUS_COMPLETE, RUN_STATUS_FAILED, RUN_STATUS_RUNNING,
		RUN_STEP_EMBEDDING_COMPUTED, RUN_STEP_RECORD_CREATED, RUN_STEP_VECTOR_INDEXED,
	},
	qdrant::VectorPoint,
};

use crate::{
	EmbeddingProvider as _, Error, NoteStore as _, Result, RunStore as _, Service,
	VectorIndex as _, error::storage_err,
};

pub const STEP_CREATE_RECORD: &str = "create-record";
pub const STEP_COMPUTE_EMBEDDING: &str = "compute-embedding";
pub const STEP_UPSERT_VECTOR: &str = "upsert-vector";

#[derive(Clone, Debug, Deserialize)]
pub struct IngestRequest {
	pub text: String,
	pub owner_id: String,
	pub idempotency_key: String,
}

#[derive(Clone, Copy, Debug, Serialize)]
pub struct IngestResponse {
	pub note_id: Uuid,
}

impl Service {
	/// Drives one note through create-record, compute-embedding and
	/// upsert-vector. Re-invoking with the key of a COMPLETE run returns the
	/// stored note id without touching any collaborator; re-invoking a FAILED
	/// or stalled run resumes from its recorded step.
	pub async fn ingest_note(&self, req: IngestRequest) -> Result<IngestResponse> {
		let text = req.text.trim();
		let owner_id = req.owner_id.trim();
		let idempotency_key = req.idempotency_key.trim();

		if text.is_empty() {
			return Err(Error::InvalidRequest { message: "Note text must be non-empty.".into() });
		}
		if owner_id.is_empty() {
			return Err(Error::InvalidRequest { message: "owner_id is required.".into() });
		}
		if idempotency_key.is_empty() {
			return Err(Error::InvalidRequest { message: "idempotency_key is required.".into() });
		}

		let now = OffsetDateTime::now_utc();
		let mut run = match self.stores.runs.fetch_run(idempotency_key).await.map_err(storage_err)?
		{
			Some(run) if run.status == RUN_STATUS_COMPLETE => {
				let Some(note_id) = run.note_id else {
					return Err(Error::Storage {
						message: "Completed run is missing its note id.".into(),
					});
				};

				tracing::info!(idempotency_key, note_id = %note_id, "Run already complete. Skipping.");

				return Ok(IngestResponse { note_id });
			},
			Some(mut run) => {
				tracing::info!(idempotency_key, step = %run.step, "Resuming ingestion run.");

				run.status = RUN_STATUS_RUNNING.to_string();
				run.last_error = None;

				run
			},
			None => {
				let run = IngestRunRecord::new(idempotency_key, owner_id, text, now);

				self.stores.runs.save_run(&run).await.map_err(storage_err)?;

				run
			},
		};
		let owner = run.owner_id.clone();
		let note_text = run.text.clone();

		// Step 1: create the note row. Skipped on resume once an id is
		// recorded; rerunning it would insert a duplicate note.
		let note_id = match run.note_id {
			Some(note_id) => note_id,
			None => {
				let created = OffsetDateTime::now_utc();
				let note_id = self
					.run_step(STEP_CREATE_RECORD, &mut run, || {
						self.stores.notes.insert_note(&owner, &note_text, created)
					})
					.await?;

				run.note_id = Some(note_id);
				run.step = RUN_STEP_RECORD_CREATED.to_string();
				self.save_progress(&mut run).await?;

				note_id
			},
		};

		// Step 2: compute the embedding. The vector is not persisted, so a
		// resume past RECORD_CREATED recomputes it; the call has no side
		// effects beyond provider cost.
		let expected_dim = self.cfg.storage.qdrant.vector_dim as usize;
		let texts = [note_text.clone()];
		let vector = self
			.run_step(STEP_COMPUTE_EMBEDDING, &mut run, || {
				let embedding = &self.providers.embedding;
				let cfg = &self.cfg.providers.embedding;
				let texts = &texts;

				async move {
					let vectors = embedding.embed(cfg, texts).await?;

					if vectors.len() != 1 {
						return Err(eyre::eyre!(
							"Embedding provider returned {} vectors for one text.",
							vectors.len()
						));
					}

					let Some(vector) = vectors.into_iter().next() else {
						return Err(eyre::eyre!("Embedding provider returned no vector."));
					};

					if vector.len() != expected_dim {
						return Err(eyre::eyre!(
							"Embedding vector has dimension {}, expected {expected_dim}.",
							vector.len()
						));
					}

					Ok(vector)
				}
			})
			.await?;

		run.step = RUN_STEP_EMBEDDING_COMPUTED.to_string();
		self.save_progress(&mut run).await?;

		// Step 3: upsert the vector point and flip the note to indexed. The
		// upsert is idempotent on the point id, so a retry after a partial
		// failure overwrites the same point.
		let points = [VectorPoint { note_id, owner_id: owner.clone(), vector }];

		self.run_step(STEP_UPSERT_VECTOR, &mut run, || {
			let stores = &self.stores;
			let points = &points;

			async move {
				stores.vectors.upsert(points).await?;
				stores.notes.mark_indexed(note_id, OffsetDateTime::now_utc()).await?;

				Ok(())
			}
		})
		.await?;

		run.step = RUN_STEP_VECTOR_INDEXED.to_string();
		run.status = RUN_STATUS_COMPLETE.to_string();
		self.save_progress(&mut run).await?;

		tracing::info!(idempotency_key, note_id = %note_id, "Ingestion complete.");

		Ok(IngestResponse { note_id })
	}

	/// Runs one step with a per-attempt timeout and bounded exponential
	/// backoff. Exhausting the attempts marks the run FAILED and surfaces a
	/// terminal error carrying the step name and the attempt count of this
	/// step alone; the run row keeps a cumulative counter across all steps.
	async fn run_step<T, F, Fut>(
		&self,
		step: &'static str,
		run: &mut IngestRunRecord,
		mut op: F,
	) -> Result<T>
	where
		F: FnMut() -> Fut,
		Fut: Future<Output = color_eyre::Result<T>>,
	{
		let policy = &self.cfg.ingest;
		let timeout = StdDuration::from_millis(policy.step_timeout_ms);
		let mut last_error = String::new();

		for attempt in 1..=policy.max_attempts {
			run.attempts = run.attempts.saturating_add(1);

			match tokio::time::timeout(timeout, op()).await {
				Ok(Ok(value)) => return Ok(value),
				Ok(Err(err)) => last_error = err.to_string(),
				Err(_) =>
					last_error = format!("Step timed out after {}ms.", policy.step_timeout_ms),
			}

			tracing::warn!(step, attempt, error = %last_error, "Ingestion step attempt failed.");

			if attempt < policy.max_attempts {
				tokio::time::sleep(backoff_for_attempt(policy, attempt)).await;
			}
		}

		run.status = RUN_STATUS_FAILED.to_string();
		run.last_error = Some(last_error.clone());
		self.save_progress(run).await?;

		Err(Error::Terminal { step, attempts: policy.max_attempts, cause: last_error })
	}

	async fn save_progress(&self, run: &mut IngestRunRecord) -> Result<()> {
		run.updated_at = OffsetDateTime::now_utc();

		self.stores.runs.save_run(run).await.map_err(storage_err)
	}
}

fn backoff_for_attempt(policy: &nook_config::Ingest, attempt: u32) -> StdDuration {
	// Shift saturates well before u64 overflow for any sane attempt count.
	let exp = attempt.saturating_sub(1).min(16);
	let backoff = policy.base_backoff_ms.saturating_mul(1 << exp);

	StdDuration::from_millis(backoff.min(policy.max_backoff_ms))
}
