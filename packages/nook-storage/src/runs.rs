use time::OffsetDateTime;

use crate::{
	Result,
	db::Db,
	models::{IngestRunRecord, RUN_STATUS_RUNNING},
};

pub async fn fetch_run(db: &Db, idempotency_key: &str) -> Result<Option<IngestRunRecord>> {
	let run = sqlx::query_as("SELECT * FROM ingest_runs WHERE idempotency_key = $1")
		.bind(idempotency_key)
		.fetch_optional(&db.pool)
		.await?;

	Ok(run)
}

/// Upserts the full run row. The primary key is the idempotency key, so a
/// resumed run overwrites its own earlier snapshot.
pub async fn save_run(db: &Db, run: &IngestRunRecord) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO ingest_runs (
	idempotency_key,
	owner_id,
	text,
	step,
	status,
	note_id,
	attempts,
	last_error,
	created_at,
	updated_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
ON CONFLICT (idempotency_key) DO UPDATE
SET
	step = EXCLUDED.step,
	status = EXCLUDED.status,
	note_id = EXCLUDED.note_id,
	attempts = EXCLUDED.attempts,
	last_error = EXCLUDED.last_error,
	updated_at = EXCLUDED.updated_at",
	)
	.bind(run.idempotency_key.as_str())
	.bind(run.owner_id.as_str())
	.bind(run.text.as_str())
	.bind(run.step.as_str())
	.bind(run.status.as_str())
	.bind(run.note_id)
	.bind(run.attempts)
	.bind(run.last_error.as_deref())
	.bind(run.created_at)
	.bind(run.updated_at)
	.execute(&db.pool)
	.await?;

	Ok(())
}

/// Runs that were in flight when a process died: still RUNNING but not
/// touched since the cutoff. FAILED runs are excluded; re-enqueueing those is
/// the caller's decision.
pub async fn fetch_stalled_runs(
	db: &Db,
	cutoff: OffsetDateTime,
	limit: u32,
) -> Result<Vec<IngestRunRecord>> {
	let runs = sqlx::query_as(
		"\
SELECT *
FROM ingest_runs
WHERE status = $1 AND updated_at <= $2
ORDER BY updated_at ASC
LIMIT $3",
	)
	.bind(RUN_STATUS_RUNNING)
	.bind(cutoff)
	.bind(limit as i64)
	.fetch_all(&db.pool)
	.await?;

	Ok(runs)
}
