use time::OffsetDateTime;
use uuid::Uuid;

pub const RUN_STATUS_RUNNING: &str = "RUNNING";
pub const RUN_STATUS_COMPLETE: &str = "COMPLETE";
pub const RUN_STATUS_FAILED: &str = "FAILED";

pub const RUN_STEP_PENDING: &str = "PENDING";
pub const RUN_STEP_RECORD_CREATED: &str = "RECORD_CREATED";
pub const RUN_STEP_EMBEDDING_COMPUTED: &str = "EMBEDDING_COMPUTED";
pub const RUN_STEP_VECTOR_INDEXED: &str = "VECTOR_INDEXED";

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct NoteRecord {
	pub note_id: Uuid,
	pub owner_id: String,
	pub text: String,
	/// NULL until the vector upsert step completes. A row with NULL here is
	/// readable in listings but absent from retrieval results.
	pub indexed_at: Option<OffsetDateTime>,
	pub created_at: OffsetDateTime,
}

/// Durable state of one ingestion run, keyed by the caller-supplied
/// idempotency key. Resume reads this row and skips completed steps.
#[derive(Clone, Debug, sqlx::FromRow)]
pub struct IngestRunRecord {
	pub idempotency_key: String,
	pub owner_id: String,
	pub text: String,
	pub step: String,
	pub status: String,
	pub note_id: Option<Uuid>,
	pub attempts: i32,
	pub last_error: Option<String>,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}
impl IngestRunRecord {
	pub fn new(idempotency_key: &str, owner_id: &str, text: &str, now: OffsetDateTime) -> Self {
		Self {
			idempotency_key: idempotency_key.to_string(),
			owner_id: owner_id.to_string(),
			text: text.to_string(),
			step: RUN_STEP_PENDING.to_string(),
			status: RUN_STATUS_RUNNING.to_string(),
			note_id: None,
			attempts: 0,
			last_error: None,
			created_at: now,
			updated_at: now,
		}
	}
}
