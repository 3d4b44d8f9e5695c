use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Result, db::Db, models::NoteRecord};

/// Inserts a note row and reads back the generated id. The id doubles as the
/// vector point id, so it must be stable for the rest of the run.
pub async fn insert_note(
	db: &Db,
	owner_id: &str,
	text: &str,
	created_at: OffsetDateTime,
) -> Result<Uuid> {
	let note_id: Uuid = sqlx::query_scalar(
		"\
INSERT INTO notes (note_id, owner_id, text, created_at)
VALUES ($1, $2, $3, $4)
RETURNING note_id",
	)
	.bind(Uuid::new_v4())
	.bind(owner_id)
	.bind(text)
	.bind(created_at)
	.fetch_one(&db.pool)
	.await?;

	Ok(note_id)
}

pub async fn get_note(db: &Db, note_id: Uuid) -> Result<Option<NoteRecord>> {
	let note = sqlx::query_as("SELECT * FROM notes WHERE note_id = $1")
		.bind(note_id)
		.fetch_optional(&db.pool)
		.await?;

	Ok(note)
}

pub async fn list_notes(db: &Db, owner_id: &str) -> Result<Vec<NoteRecord>> {
	let notes =
		sqlx::query_as("SELECT * FROM notes WHERE owner_id = $1 ORDER BY created_at DESC")
			.bind(owner_id)
			.fetch_all(&db.pool)
			.await?;

	Ok(notes)
}

pub async fn delete_note(db: &Db, note_id: Uuid) -> Result<()> {
	sqlx::query("DELETE FROM notes WHERE note_id = $1")
		.bind(note_id)
		.execute(&db.pool)
		.await?;

	Ok(())
}

pub async fn mark_indexed(db: &Db, note_id: Uuid, indexed_at: OffsetDateTime) -> Result<()> {
	sqlx::query("UPDATE notes SET indexed_at = $1 WHERE note_id = $2")
		.bind(indexed_at)
		.bind(note_id)
		.execute(&db.pool)
		.await?;

	Ok(())
}
