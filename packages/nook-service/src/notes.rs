use uuid::Uuid;

use nook_storage::models::NoteRecord;

use crate::{Error, NoteStore as _, Result, Service, error::storage_err};

impl Service {
	pub async fn fetch_note(&self, note_id: Uuid) -> Result<NoteRecord> {
		self.stores
			.notes
			.get_note(note_id)
			.await
			.map_err(storage_err)?
			.ok_or_else(|| Error::NotFound { message: format!("Note {note_id} does not exist.") })
	}

	/// Lists every note the owner has committed, newest first. Rows that have
	/// not finished indexing are included; only retrieval hides them.
	pub async fn list_notes(&self, owner_id: &str) -> Result<Vec<NoteRecord>> {
		let owner_id = owner_id.trim();

		if owner_id.is_empty() {
			return Err(Error::InvalidRequest { message: "owner_id is required.".into() });
		}

		self.stores.notes.list_notes(owner_id).await.map_err(storage_err)
	}
}
